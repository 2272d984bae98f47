use crate::wizard::state::{FieldId, WizardState, PRESET_OPTIONS};
use crate::wizard::steps::StepDefinition;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatternKind {
    ProjectSlug,
    RelativePath,
}

#[derive(Debug, Clone, Copy)]
pub enum FieldRule {
    MinLength(usize),
    MaxLength(usize),
    Pattern(PatternKind),
    Custom(&'static str, fn(&str) -> bool),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    pub field: FieldId,
    pub message: String,
}

impl std::fmt::Display for FieldError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

fn is_known_preset(value: &str) -> bool {
    PRESET_OPTIONS.contains(&value)
}

pub fn rules_for(field: FieldId) -> &'static [FieldRule] {
    match field {
        FieldId::ProjectName => &[
            FieldRule::MinLength(3),
            FieldRule::MaxLength(64),
            FieldRule::Pattern(PatternKind::ProjectSlug),
        ],
        FieldId::Description => &[FieldRule::MaxLength(280)],
        FieldId::Preset => &[
            FieldRule::MaxLength(32),
            FieldRule::Custom("preset is not one of the known presets", is_known_preset),
        ],
        FieldId::OutputDir => &[
            FieldRule::MaxLength(160),
            FieldRule::Pattern(PatternKind::RelativePath),
        ],
        _ => &[],
    }
}

// Lowercase slug: letters, digits and hyphens, starting with a letter.
fn matches_project_slug(value: &str) -> bool {
    let mut chars = value.chars();
    match chars.next() {
        Some(first) if first.is_ascii_lowercase() => {}
        _ => return false,
    }
    chars.all(|ch| ch.is_ascii_lowercase() || ch.is_ascii_digit() || ch == '-')
}

fn matches_relative_path(value: &str) -> bool {
    if value.starts_with('/') {
        return false;
    }
    if value.split('/').any(|segment| segment == "..") {
        return false;
    }
    value
        .chars()
        .all(|ch| ch.is_ascii_alphanumeric() || matches!(ch, '-' | '_' | '.' | '/'))
}

fn pattern_failure(kind: PatternKind, value: &str) -> Option<String> {
    match kind {
        PatternKind::ProjectSlug => (!matches_project_slug(value)).then(|| {
            "must be lowercase letters, digits and hyphens, starting with a letter".to_string()
        }),
        PatternKind::RelativePath => (!matches_relative_path(value))
            .then(|| "must be a relative path without `..` segments".to_string()),
    }
}

// First failing rule wins; an empty optional value passes everything.
pub fn validate_field(field: FieldId, value: &str, mandated: bool) -> Result<(), String> {
    if value.is_empty() {
        if mandated {
            return Err("is required".to_string());
        }
        return Ok(());
    }
    for rule in rules_for(field) {
        match rule {
            FieldRule::MinLength(min) => {
                if value.chars().count() < *min {
                    return Err(format!("must be at least {min} characters"));
                }
            }
            FieldRule::MaxLength(max) => {
                if value.chars().count() > *max {
                    return Err(format!("must be at most {max} characters"));
                }
            }
            FieldRule::Pattern(kind) => {
                if let Some(message) = pattern_failure(*kind, value) {
                    return Err(message);
                }
            }
            FieldRule::Custom(message, predicate) => {
                if !predicate(value) {
                    return Err((*message).to_string());
                }
            }
        }
    }
    Ok(())
}

// Gate for "may this step advance": first error across the step's mandated
// fields, in declaration order.
pub fn validate_step(step: &StepDefinition, state: &WizardState) -> Result<(), FieldError> {
    for field in step.requires {
        let result = match state.scalar(*field) {
            Some(value) => validate_field(*field, value, true),
            None => match state.set_values(*field) {
                Some(values) if values.is_empty() => Err("requires at least one choice".to_string()),
                _ => Ok(()),
            },
        };
        if let Err(message) = result {
            return Err(FieldError {
                field: *field,
                message,
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wizard::state::SetupType;
    use crate::wizard::steps;

    #[test]
    fn project_name_rules_apply_in_order() {
        assert!(validate_field(FieldId::ProjectName, "ab", false).is_err());
        assert!(validate_field(FieldId::ProjectName, "My Project", false).is_err());
        assert!(validate_field(FieldId::ProjectName, "my-project", false).is_ok());
    }

    #[test]
    fn empty_value_fails_only_when_mandated() {
        assert!(validate_field(FieldId::ProjectName, "", false).is_ok());
        assert_eq!(
            validate_field(FieldId::ProjectName, "", true),
            Err("is required".to_string())
        );
    }

    #[test]
    fn output_dir_rejects_escaping_paths() {
        assert!(validate_field(FieldId::OutputDir, "out/site", false).is_ok());
        assert!(validate_field(FieldId::OutputDir, "/etc", false).is_err());
        assert!(validate_field(FieldId::OutputDir, "../up", false).is_err());
    }

    #[test]
    fn preset_must_be_known() {
        assert!(validate_field(FieldId::Preset, "standard", false).is_ok());
        assert!(validate_field(FieldId::Preset, "bespoke", false).is_err());
    }

    #[test]
    fn step_validation_reports_the_first_failing_field() {
        let step = steps::step_by_number(SetupType::Simple, 1).expect("step 1");
        let mut state = WizardState::defaults(SetupType::Simple);
        let err = validate_step(step, &state).expect_err("empty project name");
        assert_eq!(err.field, FieldId::ProjectName);

        state.project_name = "my-project".to_string();
        assert!(validate_step(step, &state).is_ok());
    }
}
