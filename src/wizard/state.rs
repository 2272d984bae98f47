use crate::shared::serde_ext::parse_via_string;
use crate::wizard::steps;
use serde::ser::Serializer;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeSet;

pub const STATE_VERSION: &str = "2";

pub const PROJECT_NAME_MAX_LEN: usize = 64;
pub const DESCRIPTION_MAX_LEN: usize = 280;
pub const PRESET_MAX_LEN: usize = 32;
pub const OUTPUT_DIR_MAX_LEN: usize = 160;
pub const SET_VALUE_MAX_LEN: usize = 48;

pub const DEFAULT_PRESET: &str = "standard";
pub const DEFAULT_OUTPUT_DIR: &str = ".";

pub const PRESET_OPTIONS: [&str; 3] = ["standard", "minimal", "complete"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SetupType {
    #[default]
    Simple,
    Custom,
}

impl SetupType {
    pub fn parse(raw: &str) -> Result<Self, String> {
        match raw.trim() {
            "simple" => Ok(SetupType::Simple),
            "custom" => Ok(SetupType::Custom),
            other => Err(format!("unknown setup type `{other}`")),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SetupType::Simple => "simple",
            SetupType::Custom => "custom",
        }
    }
}

impl std::fmt::Display for SetupType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for SetupType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for SetupType {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        parse_via_string(deserializer, "setup type", Self::parse)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Scalar,
    Set,
    Flag,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum FieldId {
    ProjectName,
    Description,
    Preset,
    OutputDir,
    CssFrameworks,
    JsFrameworks,
    Agents,
    Editors,
    Framework,
    FrameworkDocs,
    FrameworkExamples,
}

pub const ALL_FIELDS: [FieldId; 11] = [
    FieldId::ProjectName,
    FieldId::Description,
    FieldId::Preset,
    FieldId::OutputDir,
    FieldId::CssFrameworks,
    FieldId::JsFrameworks,
    FieldId::Agents,
    FieldId::Editors,
    FieldId::Framework,
    FieldId::FrameworkDocs,
    FieldId::FrameworkExamples,
];

impl FieldId {
    pub fn as_str(self) -> &'static str {
        match self {
            FieldId::ProjectName => "projectName",
            FieldId::Description => "description",
            FieldId::Preset => "preset",
            FieldId::OutputDir => "outputDir",
            FieldId::CssFrameworks => "css",
            FieldId::JsFrameworks => "js",
            FieldId::Agents => "agents",
            FieldId::Editors => "editors",
            FieldId::Framework => "framework",
            FieldId::FrameworkDocs => "frameworkDocs",
            FieldId::FrameworkExamples => "frameworkExamples",
        }
    }

    pub fn parse(raw: &str) -> Result<Self, String> {
        ALL_FIELDS
            .iter()
            .copied()
            .find(|field| field.as_str() == raw)
            .ok_or_else(|| format!("unknown wizard field `{raw}`"))
    }

    pub fn kind(self) -> FieldKind {
        match self {
            FieldId::ProjectName | FieldId::Description | FieldId::Preset | FieldId::OutputDir => {
                FieldKind::Scalar
            }
            FieldId::CssFrameworks | FieldId::JsFrameworks | FieldId::Agents | FieldId::Editors => {
                FieldKind::Set
            }
            FieldId::Framework | FieldId::FrameworkDocs | FieldId::FrameworkExamples => {
                FieldKind::Flag
            }
        }
    }

    pub fn default_value(self) -> Option<&'static str> {
        match self {
            FieldId::ProjectName | FieldId::Description => Some(""),
            FieldId::Preset => Some(DEFAULT_PRESET),
            FieldId::OutputDir => Some(DEFAULT_OUTPUT_DIR),
            _ => None,
        }
    }

    pub fn max_len(self) -> Option<usize> {
        match self {
            FieldId::ProjectName => Some(PROJECT_NAME_MAX_LEN),
            FieldId::Description => Some(DESCRIPTION_MAX_LEN),
            FieldId::Preset => Some(PRESET_MAX_LEN),
            FieldId::OutputDir => Some(OUTPUT_DIR_MAX_LEN),
            _ => None,
        }
    }

    pub fn parent_flag(self) -> Option<FieldId> {
        match self {
            FieldId::FrameworkDocs | FieldId::FrameworkExamples => Some(FieldId::Framework),
            _ => None,
        }
    }
}

impl std::fmt::Display for FieldId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

pub fn set_fields() -> impl Iterator<Item = FieldId> {
    ALL_FIELDS
        .iter()
        .copied()
        .filter(|field| field.kind() == FieldKind::Set)
}

fn default_preset() -> String {
    DEFAULT_PRESET.to_string()
}

fn default_output_dir() -> String {
    DEFAULT_OUTPUT_DIR.to_string()
}

fn default_version() -> String {
    STATE_VERSION.to_string()
}

fn default_current_step() -> u32 {
    1
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct WizardState {
    pub setup_type: SetupType,
    #[serde(default = "default_current_step")]
    pub current_step: u32,
    #[serde(default)]
    pub completed_steps: Vec<u32>,
    #[serde(default)]
    pub project_name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default = "default_preset")]
    pub preset: String,
    #[serde(default = "default_output_dir")]
    pub output_dir: String,
    #[serde(default)]
    pub css_frameworks: BTreeSet<String>,
    #[serde(default)]
    pub js_frameworks: BTreeSet<String>,
    #[serde(default)]
    pub agents: BTreeSet<String>,
    #[serde(default)]
    pub editors: BTreeSet<String>,
    #[serde(default)]
    pub framework: bool,
    #[serde(default)]
    pub framework_docs: bool,
    #[serde(default)]
    pub framework_examples: bool,
    #[serde(default)]
    pub last_updated: i64,
    #[serde(default = "default_version")]
    pub version: String,
}

impl WizardState {
    pub fn defaults(setup_type: SetupType) -> Self {
        Self {
            setup_type,
            current_step: 1,
            completed_steps: Vec::new(),
            project_name: String::new(),
            description: String::new(),
            preset: default_preset(),
            output_dir: default_output_dir(),
            css_frameworks: BTreeSet::new(),
            js_frameworks: BTreeSet::new(),
            agents: BTreeSet::new(),
            editors: BTreeSet::new(),
            framework: false,
            framework_docs: false,
            framework_examples: false,
            last_updated: 0,
            version: default_version(),
        }
    }

    pub fn scalar(&self, field: FieldId) -> Option<&str> {
        match field {
            FieldId::ProjectName => Some(&self.project_name),
            FieldId::Description => Some(&self.description),
            FieldId::Preset => Some(&self.preset),
            FieldId::OutputDir => Some(&self.output_dir),
            _ => None,
        }
    }

    pub fn set_scalar(&mut self, field: FieldId, value: String) {
        match field {
            FieldId::ProjectName => self.project_name = value,
            FieldId::Description => self.description = value,
            FieldId::Preset => self.preset = value,
            FieldId::OutputDir => self.output_dir = value,
            _ => {}
        }
    }

    pub fn set_values(&self, field: FieldId) -> Option<&BTreeSet<String>> {
        match field {
            FieldId::CssFrameworks => Some(&self.css_frameworks),
            FieldId::JsFrameworks => Some(&self.js_frameworks),
            FieldId::Agents => Some(&self.agents),
            FieldId::Editors => Some(&self.editors),
            _ => None,
        }
    }

    pub fn replace_set(&mut self, field: FieldId, values: BTreeSet<String>) {
        match field {
            FieldId::CssFrameworks => self.css_frameworks = values,
            FieldId::JsFrameworks => self.js_frameworks = values,
            FieldId::Agents => self.agents = values,
            FieldId::Editors => self.editors = values,
            _ => {}
        }
    }

    pub fn flag(&self, field: FieldId) -> Option<bool> {
        match field {
            FieldId::Framework => Some(self.framework),
            FieldId::FrameworkDocs => Some(self.framework_docs),
            FieldId::FrameworkExamples => Some(self.framework_examples),
            _ => None,
        }
    }

    pub fn set_flag(&mut self, field: FieldId, value: bool) {
        match field {
            FieldId::Framework => self.framework = value,
            FieldId::FrameworkDocs => self.framework_docs = value,
            FieldId::FrameworkExamples => self.framework_examples = value,
            _ => {}
        }
    }
}

// Strips markup-significant and control characters, trims, and clamps to the
// field's declared maximum (in characters, not bytes).
pub fn sanitize_scalar(raw: &str, max_len: usize) -> String {
    let cleaned: String = raw
        .chars()
        .filter(|ch| !ch.is_control() && !matches!(ch, '<' | '>' | '&' | '"' | '\'' | '`'))
        .collect();
    cleaned.trim().chars().take(max_len).collect()
}

pub fn sanitize_set_values(values: &BTreeSet<String>) -> BTreeSet<String> {
    values
        .iter()
        .map(|value| sanitize_scalar(value, SET_VALUE_MAX_LEN))
        .filter(|value| !value.is_empty())
        .collect()
}

// Every state that leaves the store has passed through here; downstream
// components rely on that and do not re-check the invariants.
pub fn normalize(state: &mut WizardState) {
    for field in ALL_FIELDS {
        match field.kind() {
            FieldKind::Scalar => {
                let max_len = field.max_len().unwrap_or(usize::MAX);
                let cleaned = sanitize_scalar(state.scalar(field).unwrap_or(""), max_len);
                state.set_scalar(field, cleaned);
            }
            FieldKind::Set => {
                if let Some(values) = state.set_values(field) {
                    state.replace_set(field, sanitize_set_values(values));
                }
            }
            FieldKind::Flag => {}
        }
    }

    if state.preset.is_empty() {
        state.preset = default_preset();
    }
    if state.output_dir.is_empty() {
        state.output_dir = default_output_dir();
    }

    if !state.framework {
        state.framework_docs = false;
        state.framework_examples = false;
    }

    let max_step = steps::max_step(state.setup_type);
    state.current_step = state.current_step.clamp(1, max_step);
    state.completed_steps.retain(|step| (1..=max_step).contains(step));
    state.completed_steps.sort_unstable();
    state.completed_steps.dedup();

    state.version = STATE_VERSION.to_string();
}

#[derive(Debug, Clone, Default)]
pub struct StatePatch {
    pub setup_type: Option<SetupType>,
    pub current_step: Option<u32>,
    pub completed_steps: Option<Vec<u32>>,
    pub scalars: Vec<(FieldId, String)>,
    pub sets: Vec<(FieldId, BTreeSet<String>)>,
    pub flags: Vec<(FieldId, bool)>,
}

impl StatePatch {
    pub fn is_empty(&self) -> bool {
        self.setup_type.is_none()
            && self.current_step.is_none()
            && self.completed_steps.is_none()
            && self.scalars.is_empty()
            && self.sets.is_empty()
            && self.flags.is_empty()
    }

    pub fn with_scalar(mut self, field: FieldId, value: impl Into<String>) -> Self {
        self.scalars.push((field, value.into()));
        self
    }

    pub fn with_set<I, S>(mut self, field: FieldId, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.sets
            .push((field, values.into_iter().map(Into::into).collect()));
        self
    }

    pub fn with_flag(mut self, field: FieldId, value: bool) -> Self {
        self.flags.push((field, value));
        self
    }

    pub fn with_current_step(mut self, step: u32) -> Self {
        self.current_step = Some(step);
        self
    }

    pub fn with_completed(mut self, steps: Vec<u32>) -> Self {
        self.completed_steps = Some(steps);
        self
    }
}

pub fn apply_patch(state: &mut WizardState, patch: &StatePatch) {
    if let Some(setup_type) = patch.setup_type {
        state.setup_type = setup_type;
    }
    if let Some(step) = patch.current_step {
        state.current_step = step;
    }
    if let Some(completed) = &patch.completed_steps {
        state.completed_steps = completed.clone();
    }
    for (field, value) in &patch.scalars {
        state.set_scalar(*field, value.clone());
    }
    for (field, values) in &patch.sets {
        state.replace_set(*field, values.clone());
    }
    for (field, value) in &patch.flags {
        state.set_flag(*field, *value);
    }
}
