use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

pub fn wizard_log_path(state_root: &Path) -> PathBuf {
    state_root.join("logs/wizard.log")
}

pub fn append_wizard_log_line(state_root: &Path, line: &str) -> std::io::Result<()> {
    let path = wizard_log_path(state_root);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let mut file = fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)?;
    writeln!(file, "{} {line}", chrono::Utc::now().timestamp())
}

// Swallowed failures still leave a trace; logging itself is best-effort.
pub fn log_swallowed(state_root: &Path, context: &str, detail: &str) {
    let _ = append_wizard_log_line(state_root, &format!("swallowed {context}: {detail}"));
}
