use super::{ClientConfig, ConfigError};
use crate::runtime::SessionPaths;
use std::fs;

// Absent config means defaults; a present but malformed file is an error the
// caller should see rather than silently ignore.
pub fn load_client_config(paths: &SessionPaths) -> Result<ClientConfig, ConfigError> {
    let path = paths.config_file();
    if !path.exists() {
        return Ok(ClientConfig::default());
    }
    let raw = fs::read_to_string(&path).map_err(|source| ConfigError::Read {
        path: path.display().to_string(),
        source,
    })?;
    let config: ClientConfig =
        serde_yaml::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.display().to_string(),
            source,
        })?;
    config.validate()?;
    Ok(config)
}
