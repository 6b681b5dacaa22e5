//! Data directory layout

use std::path::{Path, PathBuf};

/// Environment variable overriding the data directory
pub const HOME_ENV: &str = "MEDTRIAGE_HOME";

/// Resolves where config, logs and the symptom database live
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Paths {
    pub data_dir: PathBuf,
}

impl Paths {
    /// `$MEDTRIAGE_HOME` when set, else `~/.medtriage`
    pub fn new() -> std::io::Result<Self> {
        if let Some(dir) = std::env::var_os(HOME_ENV).filter(|v| !v.is_empty()) {
            return Ok(Self::at(PathBuf::from(dir)));
        }

        let home = dirs::home_dir().ok_or_else(|| {
            std::io::Error::new(std::io::ErrorKind::NotFound, "home directory not found")
        })?;

        Ok(Self::at(home.join(".medtriage")))
    }

    pub fn at(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn config_file(&self) -> PathBuf {
        self.data_dir.join("config.json")
    }

    pub fn emergency_log_file(&self) -> PathBuf {
        self.data_dir.join("emergency_log.jsonl")
    }

    pub fn requests_file(&self) -> PathBuf {
        self.data_dir.join("requests.jsonl")
    }

    /// SQLite database backing the symptom log
    pub fn symptom_db(&self) -> PathBuf {
        self.data_dir.join("symptoms.db")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    #[serial]
    fn test_env_override() {
        std::env::set_var(HOME_ENV, "/tmp/medtriage-test-home");
        let paths = Paths::new().unwrap();
        std::env::remove_var(HOME_ENV);

        assert_eq!(paths.data_dir(), Path::new("/tmp/medtriage-test-home"));
    }

    #[test]
    #[serial]
    fn test_default_under_home() {
        std::env::remove_var(HOME_ENV);
        let paths = Paths::new().unwrap();
        assert!(paths.data_dir.ends_with(".medtriage"));
    }

    #[test]
    fn test_file_layout() {
        let paths = Paths::at("/data");
        assert_eq!(paths.config_file(), PathBuf::from("/data/config.json"));
        assert_eq!(
            paths.emergency_log_file(),
            PathBuf::from("/data/emergency_log.jsonl")
        );
        assert_eq!(paths.requests_file(), PathBuf::from("/data/requests.jsonl"));
        assert_eq!(paths.symptom_db(), PathBuf::from("/data/symptoms.db"));
    }
}
