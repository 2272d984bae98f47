use crate::wizard::state::{FieldId, SetupType};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StepDefinition {
    pub number: u32,
    pub route: &'static str,
    pub label: &'static str,
    pub mandatory: bool,
    // Fields that must validate before the wizard may advance past this step.
    pub requires: &'static [FieldId],
    // Fields whose controls this step's fragment is expected to render.
    pub renders: &'static [FieldId],
}

pub const REVIEW_ROUTE: &str = "review";

pub const SIMPLE_STEPS: [StepDefinition; 3] = [
    StepDefinition {
        number: 1,
        route: "essentials",
        label: "Project essentials",
        mandatory: true,
        requires: &[FieldId::ProjectName],
        renders: &[
            FieldId::ProjectName,
            FieldId::Description,
            FieldId::Preset,
            FieldId::CssFrameworks,
        ],
    },
    StepDefinition {
        number: 2,
        route: "tooling",
        label: "Editors & agents",
        mandatory: false,
        requires: &[],
        renders: &[FieldId::Editors, FieldId::Agents],
    },
    StepDefinition {
        number: 3,
        route: REVIEW_ROUTE,
        label: "Review & generate",
        mandatory: true,
        requires: &[FieldId::OutputDir],
        renders: &[FieldId::OutputDir],
    },
];

pub const CUSTOM_STEPS: [StepDefinition; 7] = [
    StepDefinition {
        number: 1,
        route: "project",
        label: "Project details",
        mandatory: true,
        requires: &[FieldId::ProjectName],
        renders: &[FieldId::ProjectName, FieldId::Description],
    },
    StepDefinition {
        number: 2,
        route: "presets",
        label: "Preset",
        mandatory: false,
        requires: &[],
        renders: &[FieldId::Preset],
    },
    StepDefinition {
        number: 3,
        route: "css",
        label: "CSS frameworks",
        mandatory: false,
        requires: &[],
        renders: &[FieldId::CssFrameworks],
    },
    StepDefinition {
        number: 4,
        route: "frameworks",
        label: "JS frameworks",
        mandatory: false,
        requires: &[],
        renders: &[
            FieldId::JsFrameworks,
            FieldId::Framework,
            FieldId::FrameworkDocs,
            FieldId::FrameworkExamples,
        ],
    },
    StepDefinition {
        number: 5,
        route: "agents",
        label: "Agents",
        mandatory: false,
        requires: &[],
        renders: &[FieldId::Agents],
    },
    StepDefinition {
        number: 6,
        route: "editors",
        label: "Editor targets",
        mandatory: false,
        requires: &[],
        renders: &[FieldId::Editors],
    },
    StepDefinition {
        number: 7,
        route: REVIEW_ROUTE,
        label: "Review & generate",
        mandatory: true,
        requires: &[FieldId::OutputDir],
        renders: &[FieldId::OutputDir],
    },
];

pub fn steps_for(setup_type: SetupType) -> &'static [StepDefinition] {
    match setup_type {
        SetupType::Simple => &SIMPLE_STEPS,
        SetupType::Custom => &CUSTOM_STEPS,
    }
}

pub fn max_step(setup_type: SetupType) -> u32 {
    steps_for(setup_type).len() as u32
}

pub fn step_by_number(setup_type: SetupType, number: u32) -> Option<&'static StepDefinition> {
    steps_for(setup_type)
        .iter()
        .find(|step| step.number == number)
}

pub fn step_by_route(setup_type: SetupType, route: &str) -> Option<&'static StepDefinition> {
    steps_for(setup_type).iter().find(|step| step.route == route)
}

pub fn is_review_step(setup_type: SetupType, number: u32) -> bool {
    step_by_number(setup_type, number)
        .map(|step| step.route == REVIEW_ROUTE)
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn variants_number_steps_contiguously_from_one() {
        for setup_type in [SetupType::Simple, SetupType::Custom] {
            for (index, step) in steps_for(setup_type).iter().enumerate() {
                assert_eq!(step.number, index as u32 + 1);
            }
        }
    }

    #[test]
    fn routes_are_unique_within_a_variant() {
        for setup_type in [SetupType::Simple, SetupType::Custom] {
            let steps = steps_for(setup_type);
            for step in steps {
                assert_eq!(
                    steps.iter().filter(|s| s.route == step.route).count(),
                    1,
                    "duplicate route {}",
                    step.route
                );
            }
        }
    }

    #[test]
    fn required_fields_are_rendered_by_their_step() {
        for setup_type in [SetupType::Simple, SetupType::Custom] {
            for step in steps_for(setup_type) {
                for field in step.requires {
                    assert!(step.renders.contains(field));
                }
            }
        }
    }

    #[test]
    fn review_is_the_terminal_step_of_each_variant() {
        for setup_type in [SetupType::Simple, SetupType::Custom] {
            assert!(is_review_step(setup_type, max_step(setup_type)));
        }
    }
}
