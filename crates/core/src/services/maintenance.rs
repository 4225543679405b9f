//! Background maintenance loops.
//!
//! Spawned from the server binary: a periodic heuristic cleanup sweep, and a
//! purge of rows that have been inactive longer than the retention policy
//! allows. Errors are logged and the loops keep running.

use std::time::Duration;

use chrono::Utc;
use tokio::time::interval;

use farmvisit_common::config::PushConfig;
use farmvisit_db::repositories::PushSubscriptionRepository;

use super::cleanup::{CheckType, CleanupService};

/// Maintenance loop configuration.
#[derive(Debug, Clone)]
pub struct MaintenanceConfig {
    /// Interval between sweeps.
    pub sweep_interval: Duration,
    /// Days a deactivated subscription is kept before it is purged.
    pub purge_inactive_days: i64,
}

impl MaintenanceConfig {
    /// Derive the maintenance configuration from the push configuration.
    #[must_use]
    pub const fn from_config(config: &PushConfig) -> Self {
        Self {
            sweep_interval: Duration::from_secs(config.maintenance_interval_secs),
            purge_inactive_days: config.purge_inactive_days,
        }
    }
}

impl Default for MaintenanceConfig {
    fn default() -> Self {
        Self {
            sweep_interval: Duration::from_secs(3600),
            purge_inactive_days: 7,
        }
    }
}

/// Spawn the maintenance loops.
pub fn spawn_maintenance(
    config: MaintenanceConfig,
    cleanup: CleanupService,
    repo: PushSubscriptionRepository,
) {
    let sweep_interval = config.sweep_interval;
    let purge_inactive_days = config.purge_inactive_days;

    // Heuristic cleanup sweep
    tokio::spawn(async move {
        let mut interval = interval(sweep_interval);
        loop {
            interval.tick().await;
            match cleanup.run(CheckType::Heuristic).await {
                Ok(summary) => {
                    if summary.cleaned_count > 0 {
                        tracing::info!(
                            cleaned = summary.cleaned_count,
                            total = summary.total_checked,
                            "Maintenance sweep removed stale subscriptions"
                        );
                    }
                }
                Err(e) => {
                    tracing::error!(error = %e, "Maintenance sweep failed");
                }
            }
        }
    });

    // Purge of long-inactive rows
    tokio::spawn(async move {
        let mut interval = interval(sweep_interval);
        loop {
            interval.tick().await;
            let cutoff = Utc::now() - chrono::Duration::days(purge_inactive_days);
            match repo.purge_inactive(cutoff.into()).await {
                Ok(count) => {
                    if count > 0 {
                        tracing::info!(count, "Purged inactive subscriptions");
                    }
                }
                Err(e) => {
                    tracing::error!(error = %e, "Inactive subscription purge failed");
                }
            }
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_from_push_config() {
        let push = PushConfig {
            maintenance_interval_secs: 120,
            purge_inactive_days: 3,
            ..PushConfig::default()
        };

        let config = MaintenanceConfig::from_config(&push);
        assert_eq!(config.sweep_interval, Duration::from_secs(120));
        assert_eq!(config.purge_inactive_days, 3);
    }

    #[test]
    fn test_config_default() {
        let config = MaintenanceConfig::default();
        assert_eq!(config.sweep_interval, Duration::from_secs(3600));
        assert_eq!(config.purge_inactive_days, 7);
    }
}
