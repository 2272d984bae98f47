use crate::runtime::SessionPaths;
use crate::shared::fs_atomic::atomic_write_file;
use crate::shared::logging::log_swallowed;
use crate::wizard::migrate;
use crate::wizard::state::{apply_patch, normalize, SetupType, StatePatch, WizardState};
use serde_json::Value;
use std::fs;
use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("wizard state payload is not valid JSON: {0}")]
    Undecodable(String),
    #[error("wizard state payload is structurally invalid: {0}")]
    Structural(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubscriptionId(u64);

pub type Subscriber = Box<dyn FnMut(&WizardState) -> Result<(), String>>;

// Owns the canonical persisted record. Everything returned by `load` has been
// normalized, so callers never re-check the state invariants.
pub struct StateStore {
    root: PathBuf,
    state_file: PathBuf,
    default_setup_type: SetupType,
    subscribers: Vec<(SubscriptionId, Subscriber)>,
    next_subscription: u64,
    // Holds the latest state when persistence is unavailable; cleared by the
    // next successful write.
    fallback: Option<WizardState>,
}

impl StateStore {
    pub fn new(paths: &SessionPaths, default_setup_type: SetupType) -> Self {
        Self {
            root: paths.root.clone(),
            state_file: paths.state_file(),
            default_setup_type,
            subscribers: Vec::new(),
            next_subscription: 0,
            fallback: None,
        }
    }

    pub fn load(&self) -> WizardState {
        if let Some(fallback) = &self.fallback {
            return fallback.clone();
        }
        if !self.state_file.exists() {
            let mut state = WizardState::defaults(self.default_setup_type);
            normalize(&mut state);
            return state;
        }
        let raw = match fs::read_to_string(&self.state_file) {
            Ok(raw) => raw,
            Err(err) => {
                log_swallowed(&self.root, "state read", &err.to_string());
                let mut state = WizardState::defaults(self.default_setup_type);
                normalize(&mut state);
                return state;
            }
        };
        match self.decode(&raw) {
            Ok((state, migrated)) => {
                if migrated {
                    // Best effort; a failed write here just repeats the
                    // migration on the next load.
                    if let Err(err) = self.persist(&state) {
                        log_swallowed(&self.root, "migration persist", &err);
                    }
                }
                state
            }
            Err(err) => {
                log_swallowed(&self.root, "state decode", &err.to_string());
                let mut state = WizardState::defaults(self.default_setup_type);
                normalize(&mut state);
                state
            }
        }
    }

    fn decode(&self, raw: &str) -> Result<(WizardState, bool), StoreError> {
        let value: Value =
            serde_json::from_str(raw).map_err(|err| StoreError::Undecodable(err.to_string()))?;
        let migrated = migrate::needs_migration(&value);
        let mut value = if migrated { migrate::upgrade(value) } else { value };
        if let Value::Object(record) = &mut value {
            record
                .entry("setupType")
                .or_insert_with(|| Value::String(self.default_setup_type.as_str().to_string()));
        }
        let mut state: WizardState = serde_json::from_value(value)
            .map_err(|err| StoreError::Structural(err.to_string()))?;
        normalize(&mut state);
        Ok((state, migrated))
    }

    // Infallible for typed candidates: normalization coerces, persistence
    // failures degrade to the in-memory fallback, and the wizard carries on.
    pub fn save(&mut self, mut candidate: WizardState) -> WizardState {
        normalize(&mut candidate);
        candidate.last_updated = chrono::Utc::now().timestamp();
        match self.persist(&candidate) {
            Ok(()) => self.fallback = None,
            Err(err) => {
                log_swallowed(&self.root, "state persist", &err);
                self.fallback = Some(candidate.clone());
            }
        }
        self.notify(&candidate);
        candidate
    }

    fn persist(&self, state: &WizardState) -> Result<(), String> {
        let encoded = serde_json::to_vec_pretty(state)
            .map_err(|err| format!("failed to encode wizard state: {err}"))?;
        if let Some(parent) = self.state_file.parent() {
            fs::create_dir_all(parent).map_err(|err| {
                format!("failed to create {}: {err}", parent.display())
            })?;
        }
        atomic_write_file(&self.state_file, &encoded).map_err(|err| {
            format!("failed to write {}: {err}", self.state_file.display())
        })
    }

    // Read-merge-write; absent patch fields are untouched.
    pub fn update(&mut self, patch: &StatePatch) -> WizardState {
        let mut state = self.load();
        apply_patch(&mut state, patch);
        self.save(state)
    }

    pub fn subscribe(&mut self, subscriber: Subscriber) -> SubscriptionId {
        let id = SubscriptionId(self.next_subscription);
        self.next_subscription += 1;
        self.subscribers.push((id, subscriber));
        id
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.subscribers.len();
        self.subscribers.retain(|(existing, _)| *existing != id);
        self.subscribers.len() != before
    }

    fn notify(&mut self, state: &WizardState) {
        for (id, subscriber) in &mut self.subscribers {
            if let Err(err) = subscriber(state) {
                log_swallowed(&self.root, "subscriber", &format!("{id:?}: {err}"));
            }
        }
    }

    // The explicit import operation is the one place a structural failure
    // surfaces to the caller instead of degrading to defaults.
    pub fn import_payload(&mut self, raw: &str) -> Result<WizardState, StoreError> {
        let (state, _) = self.decode(raw)?;
        Ok(self.save(state))
    }

    pub fn export_payload(&self) -> String {
        serde_json::to_string_pretty(&self.load()).unwrap_or_else(|_| "{}".to_string())
    }

    pub fn state_file(&self) -> &PathBuf {
        &self.state_file
    }
}
