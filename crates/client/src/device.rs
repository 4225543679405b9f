//! Stable device identity derived from the user agent.
//!
//! The id disambiguates multiple subscriptions of the same user. It is pure
//! and deterministic: the same browser produces the same id across sessions,
//! with no random or time-based component. Classification failures fall back
//! to a fixed sentinel instead of erroring, because identity resolution must
//! never block subscription.

use std::fmt;

/// Browser family, coarse-grained.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BrowserFamily {
    /// Google Chrome and Chromium.
    Chrome,
    /// Mozilla Firefox.
    Firefox,
    /// Apple Safari.
    Safari,
    /// Microsoft Edge.
    Edge,
    /// Opera.
    Opera,
    /// Anything else.
    Unknown,
}

impl fmt::Display for BrowserFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Chrome => "Chrome",
            Self::Firefox => "Firefox",
            Self::Safari => "Safari",
            Self::Edge => "Edge",
            Self::Opera => "Opera",
            Self::Unknown => "Unknown",
        };
        write!(f, "{name}")
    }
}

/// Operating system family.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OsFamily {
    /// Microsoft Windows.
    Windows,
    /// Apple macOS.
    MacOs,
    /// Apple iOS and iPadOS.
    Ios,
    /// Android.
    Android,
    /// Linux.
    Linux,
    /// Anything else.
    Unknown,
}

impl fmt::Display for OsFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Windows => "Windows",
            Self::MacOs => "macOS",
            Self::Ios => "iOS",
            Self::Android => "Android",
            Self::Linux => "Linux",
            Self::Unknown => "Unknown",
        };
        write!(f, "{name}")
    }
}

/// Device class, as used in the id suffix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceClass {
    /// Phone-sized device.
    Mobile,
    /// Tablet.
    Tablet,
    /// Everything else.
    Desktop,
}

impl fmt::Display for DeviceClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Mobile => "mobile",
            Self::Tablet => "tablet",
            Self::Desktop => "desktop",
        };
        write!(f, "{name}")
    }
}

/// Classified (browser, os, device class) triple.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceIdentity {
    /// Browser family.
    pub browser: BrowserFamily,
    /// Operating system family.
    pub os: OsFamily,
    /// Device class.
    pub class: DeviceClass,
}

impl DeviceIdentity {
    /// Classify a user agent string. Never fails; unknown parts stay unknown.
    #[must_use]
    pub fn from_user_agent(user_agent: &str) -> Self {
        Self {
            browser: classify_browser(user_agent),
            os: classify_os(user_agent),
            class: classify_class(user_agent),
        }
    }

    /// Render the stable device id, e.g. `Chrome_Windows_desktop`.
    #[must_use]
    pub fn id(&self) -> String {
        format!("{}_{}_{}", self.browser, self.os, self.class)
    }
}

/// Resolve the device id for a user agent string.
#[must_use]
pub fn resolve_device_id(user_agent: &str) -> String {
    DeviceIdentity::from_user_agent(user_agent).id()
}

fn classify_browser(ua: &str) -> BrowserFamily {
    // Edge and Opera embed "Chrome"; Chrome embeds "Safari". Order matters.
    if ua.contains("Edg/") || ua.contains("Edge/") {
        BrowserFamily::Edge
    } else if ua.contains("OPR/") || ua.contains("Opera") {
        BrowserFamily::Opera
    } else if ua.contains("Firefox/") || ua.contains("FxiOS") {
        BrowserFamily::Firefox
    } else if ua.contains("Chrome/") || ua.contains("CriOS") {
        BrowserFamily::Chrome
    } else if ua.contains("Safari/") {
        BrowserFamily::Safari
    } else {
        BrowserFamily::Unknown
    }
}

fn classify_os(ua: &str) -> OsFamily {
    // iOS before macOS (iPads report "like Mac OS X"), Android before Linux.
    if ua.contains("iPhone") || ua.contains("iPad") || ua.contains("iPod") {
        OsFamily::Ios
    } else if ua.contains("Android") {
        OsFamily::Android
    } else if ua.contains("Windows") {
        OsFamily::Windows
    } else if ua.contains("Mac OS X") || ua.contains("Macintosh") {
        OsFamily::MacOs
    } else if ua.contains("Linux") {
        OsFamily::Linux
    } else {
        OsFamily::Unknown
    }
}

fn classify_class(ua: &str) -> DeviceClass {
    if ua.contains("iPad") || (ua.contains("Android") && !ua.contains("Mobile")) || ua.contains("Tablet") {
        DeviceClass::Tablet
    } else if ua.contains("Mobi") || ua.contains("iPhone") || ua.contains("iPod") {
        DeviceClass::Mobile
    } else {
        DeviceClass::Desktop
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CHROME_WINDOWS: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
        AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";
    const SAFARI_IPHONE: &str = "Mozilla/5.0 (iPhone; CPU iPhone OS 17_0 like Mac OS X) \
        AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.0 Mobile/15E148 Safari/604.1";
    const FIREFOX_LINUX: &str =
        "Mozilla/5.0 (X11; Linux x86_64; rv:121.0) Gecko/20100101 Firefox/121.0";
    const EDGE_WINDOWS: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
        AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36 Edg/120.0.0.0";
    const CHROME_ANDROID_PHONE: &str = "Mozilla/5.0 (Linux; Android 14; Pixel 8) \
        AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Mobile Safari/537.36";
    const SAFARI_IPAD: &str = "Mozilla/5.0 (iPad; CPU OS 17_0 like Mac OS X) \
        AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.0 Mobile/15E148 Safari/604.1";

    #[test]
    fn chrome_windows_desktop() {
        assert_eq!(resolve_device_id(CHROME_WINDOWS), "Chrome_Windows_desktop");
    }

    #[test]
    fn safari_ios_mobile() {
        assert_eq!(resolve_device_id(SAFARI_IPHONE), "Safari_iOS_mobile");
    }

    #[test]
    fn firefox_linux_desktop() {
        assert_eq!(resolve_device_id(FIREFOX_LINUX), "Firefox_Linux_desktop");
    }

    #[test]
    fn edge_wins_over_embedded_chrome_token() {
        assert_eq!(resolve_device_id(EDGE_WINDOWS), "Edge_Windows_desktop");
    }

    #[test]
    fn android_phone_is_mobile_and_android_not_linux() {
        assert_eq!(
            resolve_device_id(CHROME_ANDROID_PHONE),
            "Chrome_Android_mobile"
        );
    }

    #[test]
    fn ipad_is_tablet() {
        assert_eq!(resolve_device_id(SAFARI_IPAD), "Safari_iOS_tablet");
    }

    #[test]
    fn unknown_agent_yields_sentinel() {
        assert_eq!(resolve_device_id("curl/8.4.0"), "Unknown_Unknown_desktop");
        assert_eq!(resolve_device_id(""), "Unknown_Unknown_desktop");
    }

    #[test]
    fn resolution_is_deterministic() {
        let first = resolve_device_id(CHROME_WINDOWS);
        for _ in 0..10 {
            assert_eq!(resolve_device_id(CHROME_WINDOWS), first);
        }
    }
}
