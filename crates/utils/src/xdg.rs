use std::env;
use std::path::PathBuf;

/// XDG Base Directory paths for hyvve
pub struct XdgPaths;

impl XdgPaths {
    /// Get XDG_CONFIG_HOME/hyvve or fallback
    pub fn config_dir() -> PathBuf {
        env::var("XDG_CONFIG_HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| {
                dirs::home_dir()
                    .map(|home| home.join(".config"))
                    .unwrap_or_else(|| PathBuf::from(".config"))
            })
            .join("hyvve")
    }

    /// Get XDG_DATA_HOME/hyvve or fallback
    pub fn data_dir() -> PathBuf {
        env::var("XDG_DATA_HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| {
                dirs::home_dir()
                    .map(|home| home.join(".local/share"))
                    .unwrap_or_else(|| PathBuf::from(".local/share"))
            })
            .join("hyvve")
    }

    /// Default location of the file-backed host store
    pub fn store_file() -> PathBuf {
        Self::data_dir().join("storage.json")
    }

    /// Default location of the persistence configuration file
    pub fn config_file() -> PathBuf {
        Self::config_dir().join("config.json")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    #[serial]
    fn test_xdg_paths_with_env() {
        let config_orig = env::var("XDG_CONFIG_HOME").ok();
        let data_orig = env::var("XDG_DATA_HOME").ok();

        env::set_var("XDG_CONFIG_HOME", "/tmp/config");
        env::set_var("XDG_DATA_HOME", "/tmp/data");

        assert_eq!(XdgPaths::config_dir(), PathBuf::from("/tmp/config/hyvve"));
        assert_eq!(
            XdgPaths::store_file(),
            PathBuf::from("/tmp/data/hyvve/storage.json")
        );
        assert_eq!(
            XdgPaths::config_file(),
            PathBuf::from("/tmp/config/hyvve/config.json")
        );

        match config_orig {
            Some(val) => env::set_var("XDG_CONFIG_HOME", val),
            None => env::remove_var("XDG_CONFIG_HOME"),
        }
        match data_orig {
            Some(val) => env::set_var("XDG_DATA_HOME", val),
            None => env::remove_var("XDG_DATA_HOME"),
        }
    }
}
