use crate::model::config::SyncConfig;
use crate::ops::ledger_ops::{is_valid_project_key, normalize_project_key};

const DEFAULT_FALLBACK: &str = "others";

/// Fail-open defaults and thresholds the sync engine runs with
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Policy {
    /// Catch-all project for tasks nothing else could place
    pub fallback_project: String,
    pub capture_archive_threshold: usize,
    pub capture_archive_keep: usize,
    pub inbox_retention_days: i64,
}

impl Default for Policy {
    fn default() -> Self {
        Policy::from(&SyncConfig::default())
    }
}

impl From<&SyncConfig> for Policy {
    fn from(config: &SyncConfig) -> Self {
        let fallback_project = if is_valid_project_key(&config.fallback_project) {
            config.fallback_project.clone()
        } else {
            let normalized = normalize_project_key(&config.fallback_project)
                .unwrap_or_else(|| DEFAULT_FALLBACK.to_string());
            tracing::warn!(
                configured = %config.fallback_project,
                using = %normalized,
                "fallback project is not a valid key"
            );
            normalized
        };
        Policy {
            fallback_project,
            capture_archive_threshold: config.capture_archive_threshold,
            capture_archive_keep: config.capture_archive_keep,
            inbox_retention_days: config.inbox_retention_days.max(0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let policy = Policy::default();
        assert_eq!(policy.fallback_project, "others");
        assert_eq!(policy.capture_archive_threshold, 50);
        assert_eq!(policy.capture_archive_keep, 20);
        assert_eq!(policy.inbox_retention_days, 30);
    }

    #[test]
    fn fallback_is_normalized() {
        let config = SyncConfig {
            fallback_project: "Misc Stuff".into(),
            ..SyncConfig::default()
        };
        assert_eq!(Policy::from(&config).fallback_project, "misc-stuff");

        let config = SyncConfig {
            fallback_project: "!!!".into(),
            ..SyncConfig::default()
        };
        assert_eq!(Policy::from(&config).fallback_project, "others");
    }
}
