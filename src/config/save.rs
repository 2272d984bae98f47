use super::{ClientConfig, ConfigError};
use crate::runtime::SessionPaths;
use crate::shared::fs_atomic::atomic_write_file;
use std::fs;
use std::path::PathBuf;

pub fn save_client_config(
    paths: &SessionPaths,
    config: &ClientConfig,
) -> Result<PathBuf, ConfigError> {
    config.validate()?;
    let path = paths.config_file();
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|source| ConfigError::CreateDir {
            path: parent.display().to_string(),
            source,
        })?;
    }
    let encoded = serde_yaml::to_string(config).map_err(|source| ConfigError::Encode {
        path: path.display().to_string(),
        source,
    })?;
    atomic_write_file(&path, encoded.as_bytes()).map_err(|source| ConfigError::Write {
        path: path.display().to_string(),
        source,
    })?;
    Ok(path)
}
