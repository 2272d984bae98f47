pub mod errors;
pub mod fs_atomic;
pub mod logging;
pub mod serde_ext;

pub use errors::SessionError;
