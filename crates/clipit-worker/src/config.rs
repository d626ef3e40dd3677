//! Worker configuration.

use std::path::PathBuf;

/// Default processing program, looked up on `PATH`.
pub const DEFAULT_PROCESSOR_CMD: &str = "best-clips";

/// Worker configuration.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// External clip processing program
    pub processor_cmd: String,
    /// Parent directory for per-job scratch directories
    pub work_dir: PathBuf,
    /// Run the processor in enhanced mode
    pub enhanced_mode: bool,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            processor_cmd: DEFAULT_PROCESSOR_CMD.to_string(),
            work_dir: std::env::temp_dir(),
            enhanced_mode: true,
        }
    }
}

impl WorkerConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            processor_cmd: std::env::var("CLIP_PROCESSOR_CMD")
                .ok()
                .filter(|s| !s.trim().is_empty())
                .unwrap_or(defaults.processor_cmd),
            work_dir: std::env::var("CLIP_WORK_DIR")
                .ok()
                .filter(|s| !s.is_empty())
                .map(PathBuf::from)
                .unwrap_or(defaults.work_dir),
            enhanced_mode: defaults.enhanced_mode,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    #[serial]
    fn test_from_env_defaults() {
        std::env::remove_var("CLIP_PROCESSOR_CMD");
        std::env::remove_var("CLIP_WORK_DIR");

        let config = WorkerConfig::from_env();
        assert_eq!(config.processor_cmd, "best-clips");
        assert_eq!(config.work_dir, std::env::temp_dir());
        assert!(config.enhanced_mode);
    }

    #[test]
    #[serial]
    fn test_from_env_overrides() {
        std::env::set_var("CLIP_PROCESSOR_CMD", "/opt/clipit/bin/best-clips");
        std::env::set_var("CLIP_WORK_DIR", "/var/tmp/clipit");

        let config = WorkerConfig::from_env();
        assert_eq!(config.processor_cmd, "/opt/clipit/bin/best-clips");
        assert_eq!(config.work_dir, PathBuf::from("/var/tmp/clipit"));

        std::env::remove_var("CLIP_PROCESSOR_CMD");
        std::env::remove_var("CLIP_WORK_DIR");
    }
}
