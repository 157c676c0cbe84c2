//! Worker configuration.

use std::time::Duration;

/// Worker configuration.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Pool width: jobs processed concurrently, one per slot
    pub max_concurrent_jobs: usize,
    /// Per-job wall-clock timeout; on expiry the job is force-terminated
    pub job_timeout: Duration,
    /// Graceful shutdown timeout
    pub shutdown_timeout: Duration,
    /// Root directory for per-job working directories
    pub work_dir: String,
    /// Download size ceiling in MiB
    pub max_download_mb: u64,
    /// Per-extraction-attempt timeout
    pub download_attempt_timeout: Duration,
    /// Transcoder timeout for the trim stage
    pub trim_timeout: Duration,
    /// Expiry of presigned access references
    pub presign_expiry: Duration,
    /// How often the reaper scans for orphaned pending jobs
    pub reap_interval: Duration,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            max_concurrent_jobs: 2,
            job_timeout: Duration::from_secs(1800),
            shutdown_timeout: Duration::from_secs(30),
            work_dir: "/tmp/cliplet".to_string(),
            max_download_mb: 2048,
            download_attempt_timeout: Duration::from_secs(600),
            trim_timeout: Duration::from_secs(600),
            presign_expiry: Duration::from_secs(900),
            reap_interval: Duration::from_secs(60),
        }
    }
}

impl WorkerConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            max_concurrent_jobs: env_parse("WORKER_MAX_JOBS", defaults.max_concurrent_jobs),
            job_timeout: Duration::from_secs(env_parse(
                "WORKER_JOB_TIMEOUT_SECS",
                defaults.job_timeout.as_secs(),
            )),
            shutdown_timeout: Duration::from_secs(env_parse(
                "WORKER_SHUTDOWN_TIMEOUT_SECS",
                defaults.shutdown_timeout.as_secs(),
            )),
            work_dir: std::env::var("WORKER_WORK_DIR").unwrap_or(defaults.work_dir),
            max_download_mb: env_parse("WORKER_MAX_DOWNLOAD_MB", defaults.max_download_mb),
            download_attempt_timeout: Duration::from_secs(env_parse(
                "WORKER_DOWNLOAD_ATTEMPT_TIMEOUT_SECS",
                defaults.download_attempt_timeout.as_secs(),
            )),
            trim_timeout: Duration::from_secs(env_parse(
                "WORKER_TRIM_TIMEOUT_SECS",
                defaults.trim_timeout.as_secs(),
            )),
            presign_expiry: Duration::from_secs(env_parse(
                "WORKER_PRESIGN_EXPIRY_SECS",
                defaults.presign_expiry.as_secs(),
            )),
            reap_interval: Duration::from_secs(env_parse(
                "WORKER_REAP_INTERVAL_SECS",
                defaults.reap_interval.as_secs(),
            )),
        }
    }
}

fn env_parse<T: std::str::FromStr>(name: &str, default: T) -> T {
    std::env::var(name)
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sane() {
        let config = WorkerConfig::default();
        assert!(config.max_concurrent_jobs >= 1);
        assert!(config.job_timeout > config.download_attempt_timeout);
        assert!(config.work_dir.starts_with('/'));
    }
}
