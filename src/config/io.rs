use std::env::current_exe;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::Mutex;
use directories_next::ProjectDirs;
use tokio::fs::File;
use tokio::io::AsyncReadExt;
use serde_json;
use fd_lock::{RwLock, RwLockWriteGuard};
use std::fs::OpenOptions;
use std::str;
use log::{info, warn};

use crate::config::types::Config;
use crate::error::ConfigError;

// F:\progressor-jump.exe => F:\progressor-jump.json, for running from a usb stick
fn get_portable_config_path() -> Option<PathBuf> {
    match current_exe() {
        Ok(mut path) => {
            if !path.set_extension("json") {
                warn!("current exe has no filename: {}", path.to_string_lossy());
                return None
            }

            Some(path)
        },
        Err(err) => {
            warn!("failed to get current exe path: {:?}", err);
            None
        },
    }
}

// %AppData% on windows, ~/.config on linux, etc
fn get_local_config_path() -> Option<PathBuf> {
    ProjectDirs::from("org", "progressor-jump", "progressor-jump").map(|dirs| {
        dirs.config_dir().join("progressor-jump.json")
    })
}

fn get_config_path() -> Result<PathBuf, ConfigError> {
    if let Some(path) = get_portable_config_path() {
        match std::fs::metadata(&path) {
            Ok(attr) if attr.is_file() => return Ok(path),
            Ok(_) => {},
            Err(err) => {
                info!("No portable config at {} ({}), using local path instead", path.to_string_lossy(), err);
            },
        }
    }

    get_local_config_path().ok_or(ConfigError::NoConfigPath)
}

pub struct ConfigIOLocker {
    rw_lock: RwLock<std::fs::File>,
}

impl ConfigIOLocker {
    /// Holds the config file exclusively for as long as the guard lives, so that only one
    /// instance controls the scale.
    pub fn lock(&mut self) -> Result<RwLockWriteGuard<std::fs::File>, ConfigError> {
        self.rw_lock.try_write().map_err(|source| ConfigError::CanNotLock { source })
    }
}

/// Read-only access to the config file. The application never writes it.
#[derive(Clone)]
pub struct ConfigIO {
    file: Arc<Mutex<std::fs::File>>,
}

impl ConfigIO {
    pub fn new_sync() -> Result<Self, ConfigError> {
        let path = get_config_path()?;
        Self::open_sync(&path)
    }

    pub fn open_sync(path: &Path) -> Result<Self, ConfigError> {
        info!("Using config file {}", path.to_string_lossy());

        if let Some(directory) = path.parent() {
            std::fs::create_dir_all(directory)?;
        }

        // created when missing, so that there is something to lock
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .truncate(false)
            .create(true)
            .open(path)?;

        Ok(ConfigIO { file: Arc::new(Mutex::new(file)) })
    }

    pub fn locker(&self) -> Result<ConfigIOLocker, ConfigError> {
        let file = self.file.lock().expect("Failed to lock ConfigIO file");

        Ok(ConfigIOLocker {
            rw_lock: RwLock::new(file.try_clone()?),
        })
    }

    pub async fn read(&self) -> Result<Config, ConfigError> {
        let file = self.file.lock().expect("Failed to lock ConfigIO file").try_clone()?;
        let mut file = File::from_std(file);
        info!("Reading config file");

        let mut content = vec![];
        file.read_to_end(&mut content).await?;

        if content.iter().all(u8::is_ascii_whitespace) {
            return Ok(Config::default());
        }

        let content = str::from_utf8(&content)?;
        Ok(serde_json::from_str(content)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::types::Button;

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir()
            .join(format!("progressor-jump-test-{}", std::process::id()))
            .join(name)
    }

    #[tokio::test]
    async fn empty_file_reads_as_default() {
        let path = temp_path("empty.json");
        let _ = std::fs::remove_file(&path);

        let config_io = ConfigIO::open_sync(&path).unwrap();

        assert_eq!(config_io.read().await.unwrap(), Config::default());
        assert!(path.is_file());
    }

    #[tokio::test]
    async fn reads_existing_file() {
        let path = temp_path("existing.json");
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, r#"{ "threshold": 12, "jumpButton": "MouseLeft" }"#).unwrap();

        let config = ConfigIO::open_sync(&path).unwrap().read().await.unwrap();

        assert_eq!(config.threshold, 12.0);
        assert_eq!(config.jump_button, Button::MouseLeft);
    }

    #[tokio::test]
    async fn invalid_json_is_an_error() {
        let path = temp_path("invalid.json");
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, "{ threshold").unwrap();

        let result = ConfigIO::open_sync(&path).unwrap().read().await;

        assert!(matches!(result, Err(ConfigError::JsonError { .. })));
    }
}
