//! Dispatcher configuration, read from the environment.

use std::path::PathBuf;

use crate::error::AppError;

const WORKER_THREADS_KEY: &str = "EVENT_DISPATCH_WORKER_THREADS";
const MAX_BLOCKING_THREADS_KEY: &str = "EVENT_DISPATCH_MAX_BLOCKING_THREADS";
const THREAD_NAME_KEY: &str = "EVENT_DISPATCH_THREAD_NAME";
const LOGS_PATH_KEY: &str = "EVENT_DISPATCH_LOGS_PATH";
const LOG_FILTER_KEY: &str = "EVENT_DISPATCH_LOG_FILTER";

#[derive(Clone, Debug)]
pub struct Config {
    /// Worker threads of the runtime owned by a `TokioExecutor`.
    pub worker_threads: usize,
    /// Upper bound of the blocking pool that runs asynchronous dispatch passes.
    pub max_blocking_threads: usize,
    pub thread_name: String,
    /// Directory for rolling log files. Console-only logging when `None`.
    pub logs_path: Option<PathBuf>,
    /// Fallback filter used when `RUST_LOG` is not set.
    pub log_filter: String,
}

impl Config {
    pub fn new() -> Self {
        Self {
            worker_threads: 1,
            max_blocking_threads: 64,
            thread_name: "event-dispatch".to_string(),
            logs_path: None,
            log_filter: "event_dispatch=info".to_string(),
        }
    }

    /// Overrides the defaults with values from the process environment.
    pub fn load(&mut self) -> Result<(), AppError> {
        self.load_from(|key| std::env::var(key).ok())
    }

    /// Overrides the defaults with values returned by `lookup`.
    pub fn load_from<F>(&mut self, lookup: F) -> Result<(), AppError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(value) = lookup(WORKER_THREADS_KEY) {
            self.worker_threads = parse_thread_count(WORKER_THREADS_KEY, &value)?;
        }
        if let Some(value) = lookup(MAX_BLOCKING_THREADS_KEY) {
            self.max_blocking_threads = parse_thread_count(MAX_BLOCKING_THREADS_KEY, &value)?;
        }
        if let Some(value) = lookup(THREAD_NAME_KEY) {
            let value = value.trim();
            if value.is_empty() {
                return Err(AppError::InvalidConfig {
                    key: THREAD_NAME_KEY.to_string(),
                    reason: "thread name must not be empty".to_string(),
                });
            }
            self.thread_name = value.to_string();
        }
        if let Some(value) = lookup(LOGS_PATH_KEY) {
            let value = value.trim();
            self.logs_path = (!value.is_empty()).then(|| PathBuf::from(value));
        }
        if let Some(value) = lookup(LOG_FILTER_KEY) {
            self.log_filter = value;
        }
        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}

fn parse_thread_count(key: &str, value: &str) -> Result<usize, AppError> {
    match value.trim().parse::<usize>() {
        Ok(0) => Err(AppError::InvalidConfig {
            key: key.to_string(),
            reason: "must be at least 1".to_string(),
        }),
        Ok(count) => Ok(count),
        Err(e) => Err(AppError::InvalidConfig {
            key: key.to_string(),
            reason: format!("`{value}` is not a number ({e})"),
        }),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn load(vars: &[(&str, &str)]) -> Result<Config, AppError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        let mut config = Config::new();
        config.load_from(|key| vars.get(key).cloned())?;
        Ok(config)
    }

    #[test]
    fn test_defaults_without_env() {
        let config = load(&[]).unwrap();
        assert_eq!(config.worker_threads, 1);
        assert_eq!(config.max_blocking_threads, 64);
        assert_eq!(config.thread_name, "event-dispatch");
        assert!(config.logs_path.is_none());
        assert_eq!(config.log_filter, "event_dispatch=info");
    }

    #[test]
    fn test_overrides_from_env() {
        let config = load(&[
            (WORKER_THREADS_KEY, "4"),
            (MAX_BLOCKING_THREADS_KEY, " 8 "),
            (THREAD_NAME_KEY, "dispatch-worker"),
            (LOGS_PATH_KEY, "/var/log/dispatch"),
            (LOG_FILTER_KEY, "event_dispatch=trace"),
        ])
        .unwrap();
        assert_eq!(config.worker_threads, 4);
        assert_eq!(config.max_blocking_threads, 8);
        assert_eq!(config.thread_name, "dispatch-worker");
        assert_eq!(config.logs_path, Some(PathBuf::from("/var/log/dispatch")));
        assert_eq!(config.log_filter, "event_dispatch=trace");
    }

    #[test]
    fn test_empty_logs_path_disables_file_logging() {
        let config = load(&[(LOGS_PATH_KEY, "  ")]).unwrap();
        assert!(config.logs_path.is_none());
    }

    #[test]
    fn test_rejects_zero_threads() {
        let err = load(&[(WORKER_THREADS_KEY, "0")]).unwrap_err();
        assert!(matches!(err, AppError::InvalidConfig { ref key, .. } if key == WORKER_THREADS_KEY));
    }

    #[test]
    fn test_rejects_non_numeric_threads() {
        let err = load(&[(MAX_BLOCKING_THREADS_KEY, "many")]).unwrap_err();
        assert!(err.to_string().contains("`many` is not a number"));
    }

    #[test]
    fn test_rejects_blank_thread_name() {
        assert!(load(&[(THREAD_NAME_KEY, "")]).is_err());
    }
}
