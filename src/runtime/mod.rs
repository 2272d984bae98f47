use std::fs;
use std::path::PathBuf;

pub use crate::shared::errors::SessionError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionPaths {
    pub root: PathBuf,
}

impl SessionPaths {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn required_directories(&self) -> Vec<PathBuf> {
        vec![self.root.join("session"), self.root.join("logs")]
    }

    pub fn config_file(&self) -> PathBuf {
        self.root.join("config.yaml")
    }

    pub fn session_dir(&self) -> PathBuf {
        self.root.join("session")
    }

    pub fn state_file(&self) -> PathBuf {
        self.session_dir().join("wizard_state.json")
    }

    pub fn wizard_log_path(&self) -> PathBuf {
        self.root.join("logs/wizard.log")
    }
}

pub const DEFAULT_STATE_ROOT_DIR: &str = ".formwork";
pub const STATE_ROOT_ENV: &str = "FORMWORK_STATE_ROOT";

pub fn default_state_root_path() -> Result<PathBuf, SessionError> {
    if let Some(root) = std::env::var_os(STATE_ROOT_ENV) {
        return Ok(PathBuf::from(root));
    }
    let home = std::env::var_os("HOME").ok_or(SessionError::HomeDirectoryUnavailable)?;
    Ok(PathBuf::from(home).join(DEFAULT_STATE_ROOT_DIR))
}

pub fn bootstrap_state_root(paths: &SessionPaths) -> Result<(), SessionError> {
    for path in paths.required_directories() {
        fs::create_dir_all(&path).map_err(|source| SessionError::CreateDir {
            path: path.display().to_string(),
            source,
        })?;
    }
    Ok(())
}

pub fn discard_session_state(paths: &SessionPaths) -> Result<bool, SessionError> {
    let state_file = paths.state_file();
    if !state_file.exists() {
        return Ok(false);
    }
    fs::remove_file(&state_file).map_err(|source| SessionError::RemoveState {
        path: state_file.display().to_string(),
        source,
    })?;
    Ok(true)
}
