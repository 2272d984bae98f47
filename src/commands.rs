use crate::client::HttpFetcher;
use crate::config::load_client_config;
use crate::runtime::{
    bootstrap_state_root, default_state_root_path, discard_session_state, SessionPaths,
};
use crate::tui;
use crate::wizard::state::set_fields;
use crate::wizard::{SetupType, StateStore, WizardSession};
use std::fs;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CliVerb {
    Run,
    Status,
    Reset,
    Export,
    Import,
    Help,
    Unknown,
}

pub fn parse_cli_verb(input: &str) -> CliVerb {
    match input {
        "run" => CliVerb::Run,
        "status" => CliVerb::Status,
        "reset" => CliVerb::Reset,
        "export" => CliVerb::Export,
        "import" => CliVerb::Import,
        "help" | "--help" | "-h" => CliVerb::Help,
        _ => CliVerb::Unknown,
    }
}

pub fn cli_help_lines() -> Vec<String> {
    vec![
        "Commands:".to_string(),
        "  run [--setup-type simple|custom] [--server URL]   Start or continue the wizard"
            .to_string(),
        "  status                                            Summarize the stored answers"
            .to_string(),
        "  reset                                             Discard the session state".to_string(),
        "  export                                            Print the serialized wizard state"
            .to_string(),
        "  import <file>                                     Replace the session state from a file"
            .to_string(),
        "  help                                              Show this help".to_string(),
    ]
}

pub fn run_cli(args: Vec<String>) -> Result<String, String> {
    let Some(verb) = args.first() else {
        return Ok(cli_help_lines().join("\n"));
    };
    match parse_cli_verb(verb) {
        CliVerb::Run => cmd_run(&args[1..]),
        CliVerb::Status => cmd_status(),
        CliVerb::Reset => cmd_reset(),
        CliVerb::Export => cmd_export(),
        CliVerb::Import => cmd_import(&args[1..]),
        CliVerb::Help => Ok(cli_help_lines().join("\n")),
        CliVerb::Unknown => Err(format!("unknown command `{verb}`; run `formwork help`")),
    }
}

fn ensure_session_root() -> Result<SessionPaths, String> {
    let root = default_state_root_path().map_err(|err| err.to_string())?;
    let paths = SessionPaths::new(root);
    bootstrap_state_root(&paths).map_err(|err| err.to_string())?;
    Ok(paths)
}

fn cmd_run(args: &[String]) -> Result<String, String> {
    let paths = ensure_session_root()?;
    let mut config = load_client_config(&paths).map_err(|err| err.to_string())?;

    let mut requested_setup: Option<SetupType> = None;
    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--setup-type" => {
                let value = iter
                    .next()
                    .ok_or_else(|| "--setup-type requires a value".to_string())?;
                requested_setup = Some(SetupType::parse(value)?);
            }
            "--server" => {
                let value = iter
                    .next()
                    .ok_or_else(|| "--server requires a value".to_string())?;
                config.server_url = value.clone();
            }
            other => return Err(format!("unknown run flag `{other}`")),
        }
    }
    config.validate().map_err(|err| err.to_string())?;

    if let Some(setup_type) = requested_setup {
        // The variant is fixed once a session has chosen it.
        if paths.state_file().exists() {
            let stored = StateStore::new(&paths, setup_type).load();
            if stored.setup_type != setup_type {
                return Err(format!(
                    "session already uses setup type `{}`; run `formwork reset` to start over",
                    stored.setup_type
                ));
            }
        }
        config.setup_type = setup_type;
    }

    let store = StateStore::new(&paths, config.setup_type);
    let fetcher = HttpFetcher::new(
        config.server_url.clone(),
        Duration::from_secs(config.request_timeout_secs),
    );
    let mut session = WizardSession::new(store, Box::new(fetcher));
    tui::run_wizard(&mut session)
}

fn cmd_status() -> Result<String, String> {
    let paths = ensure_session_root()?;
    let store = StateStore::new(&paths, SetupType::default());
    let state = store.load();
    let completed = state
        .completed_steps
        .iter()
        .map(u32::to_string)
        .collect::<Vec<_>>()
        .join(",");
    let mut lines = vec![
        "wizard session".to_string(),
        format!("setup_type={}", state.setup_type),
        format!(
            "step={}/{}",
            state.current_step,
            crate::wizard::max_step(state.setup_type)
        ),
        format!("completed=[{completed}]"),
        format!("project_name={}", state.project_name),
        format!("preset={}", state.preset),
        format!("output_dir={}", state.output_dir),
    ];
    for field in set_fields() {
        let values = state
            .set_values(field)
            .map(|values| values.iter().cloned().collect::<Vec<_>>().join(","))
            .unwrap_or_default();
        lines.push(format!("{field}=[{values}]"));
    }
    lines.push(format!("framework={}", state.framework));
    Ok(lines.join("\n"))
}

fn cmd_reset() -> Result<String, String> {
    let paths = ensure_session_root()?;
    let removed = discard_session_state(&paths).map_err(|err| err.to_string())?;
    Ok(if removed {
        "session state cleared".to_string()
    } else {
        "no session state to clear".to_string()
    })
}

fn cmd_export() -> Result<String, String> {
    let paths = ensure_session_root()?;
    let store = StateStore::new(&paths, SetupType::default());
    Ok(store.export_payload())
}

fn cmd_import(args: &[String]) -> Result<String, String> {
    let Some(file) = args.first() else {
        return Err("import requires a file path".to_string());
    };
    let raw =
        fs::read_to_string(file).map_err(|err| format!("failed to read {file}: {err}"))?;
    let paths = ensure_session_root()?;
    let mut store = StateStore::new(&paths, SetupType::default());
    let state = store
        .import_payload(&raw)
        .map_err(|err| format!("import rejected: {err}"))?;
    Ok(format!(
        "imported wizard state (setup_type={}, step={})",
        state.setup_type, state.current_step
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verbs_parse_to_their_commands() {
        assert_eq!(parse_cli_verb("run"), CliVerb::Run);
        assert_eq!(parse_cli_verb("status"), CliVerb::Status);
        assert_eq!(parse_cli_verb("--help"), CliVerb::Help);
        assert_eq!(parse_cli_verb("frobnicate"), CliVerb::Unknown);
    }

    #[test]
    fn unknown_command_names_the_offender() {
        let err = run_cli(vec!["frobnicate".to_string()]).expect_err("unknown command");
        assert!(err.contains("frobnicate"));
    }

    #[test]
    fn empty_invocation_prints_help() {
        let output = run_cli(Vec::new()).expect("help output");
        assert!(output.contains("Commands:"));
    }
}
