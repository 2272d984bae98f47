#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("failed to create session path {path}: {source}")]
    CreateDir {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to resolve home directory for wizard state root")]
    HomeDirectoryUnavailable,
    #[error("failed to remove session state {path}: {source}")]
    RemoveState {
        path: String,
        #[source]
        source: std::io::Error,
    },
}
