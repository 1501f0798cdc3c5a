use std::path::PathBuf;

// ---------------------------------------------------------------------------
// Runtime configuration
// ---------------------------------------------------------------------------

/// Environment variable naming the folder that holds the challenge datasets.
pub const DATA_DIR_ENV: &str = "RUSTY_WOW_DATA_DIR";
pub const DEFAULT_DATA_DIR: &str = "assets/data";
pub const DEFAULT_MEMO_CAPACITY: usize = 64;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Folder containing `superstore.csv` and the other dataset files.
    pub data_dir: PathBuf,
    /// Number of evaluations kept by the gallery before the oldest is dropped.
    pub memo_capacity: usize,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
            memo_capacity: DEFAULT_MEMO_CAPACITY,
        }
    }
}

impl Config {
    /// Command-line flags win over the environment, which wins over defaults.
    pub fn resolve(data_dir: Option<PathBuf>, memo_capacity: Option<usize>) -> Self {
        Self::resolve_with(data_dir, memo_capacity, std::env::var_os(DATA_DIR_ENV).map(PathBuf::from))
    }

    fn resolve_with(
        data_dir: Option<PathBuf>,
        memo_capacity: Option<usize>,
        env_data_dir: Option<PathBuf>,
    ) -> Self {
        let defaults = Config::default();
        let config = Config {
            data_dir: data_dir
                .or(env_data_dir.filter(|p| !p.as_os_str().is_empty()))
                .unwrap_or(defaults.data_dir),
            memo_capacity: memo_capacity.unwrap_or(defaults.memo_capacity).max(1),
        };
        log::debug!("{config:?}");
        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flag_beats_environment() {
        let config = Config::resolve_with(
            Some(PathBuf::from("/flag")),
            None,
            Some(PathBuf::from("/env")),
        );
        assert_eq!(config.data_dir, PathBuf::from("/flag"));
        assert_eq!(config.memo_capacity, DEFAULT_MEMO_CAPACITY);
    }

    #[test]
    fn environment_beats_default() {
        let config = Config::resolve_with(None, Some(3), Some(PathBuf::from("/env")));
        assert_eq!(config.data_dir, PathBuf::from("/env"));
        assert_eq!(config.memo_capacity, 3);

        let config = Config::resolve_with(None, Some(0), Some(PathBuf::new()));
        assert_eq!(config.data_dir, PathBuf::from(DEFAULT_DATA_DIR));
        assert_eq!(config.memo_capacity, 1);
    }
}
