use crate::wizard::state::FieldId;
use std::collections::BTreeSet;

// One rendered control inside the current step's fragment. The form is a
// projection of the persisted state, never authoritative for absent fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormControl {
    Text {
        field: FieldId,
        value: String,
        placeholder: String,
    },
    Choice {
        field: FieldId,
        value: String,
        checked: bool,
    },
    Radio {
        field: FieldId,
        value: String,
        selected: bool,
    },
    FlagToggle {
        field: FieldId,
        checked: bool,
    },
    Hidden {
        name: String,
        value: String,
    },
}

impl FormControl {
    pub fn field(&self) -> Option<FieldId> {
        match self {
            FormControl::Text { field, .. }
            | FormControl::Choice { field, .. }
            | FormControl::Radio { field, .. }
            | FormControl::FlagToggle { field, .. } => Some(*field),
            FormControl::Hidden { .. } => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepTarget {
    pub step: u32,
    pub route: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepForm {
    pub step: u32,
    pub route: String,
    // Assigned when the session mounts the fragment; events carry it so a
    // listener set never acts on a form that has left the page.
    pub generation: u64,
    controls: Vec<FormControl>,
    pub nav_targets: Vec<StepTarget>,
}

impl StepForm {
    pub fn new(step: u32, route: impl Into<String>) -> Self {
        Self {
            step,
            route: route.into(),
            generation: 0,
            controls: Vec::new(),
            nav_targets: Vec::new(),
        }
    }

    pub fn controls(&self) -> &[FormControl] {
        &self.controls
    }

    pub fn push_control(&mut self, control: FormControl) {
        self.controls.push(control);
    }

    pub fn push_text(&mut self, field: FieldId, value: impl Into<String>) {
        self.controls.push(FormControl::Text {
            field,
            value: value.into(),
            placeholder: String::new(),
        });
    }

    pub fn push_choice(&mut self, field: FieldId, value: impl Into<String>, checked: bool) {
        self.controls.push(FormControl::Choice {
            field,
            value: value.into(),
            checked,
        });
    }

    pub fn push_radio(&mut self, field: FieldId, value: impl Into<String>, selected: bool) {
        self.controls.push(FormControl::Radio {
            field,
            value: value.into(),
            selected,
        });
    }

    pub fn push_flag(&mut self, field: FieldId, checked: bool) {
        self.controls.push(FormControl::FlagToggle { field, checked });
    }

    pub fn push_nav_target(&mut self, step: u32, route: impl Into<String>) {
        self.nav_targets.push(StepTarget {
            step,
            route: route.into(),
        });
    }

    pub fn has_field(&self, field: FieldId) -> bool {
        self.controls
            .iter()
            .any(|control| control.field() == Some(field))
    }

    pub fn fields_present(&self) -> BTreeSet<FieldId> {
        self.controls
            .iter()
            .filter_map(|control| control.field())
            .collect()
    }

    // Scalar read: a text input's value, or the selected radio of the group.
    // A rendered radio group with nothing selected reads as no answer.
    pub fn scalar_value(&self, field: FieldId) -> Option<String> {
        for control in &self.controls {
            match control {
                FormControl::Text {
                    field: f, value, ..
                } if *f == field => return Some(value.clone()),
                FormControl::Radio {
                    field: f,
                    value,
                    selected,
                } if *f == field && *selected => return Some(value.clone()),
                _ => {}
            }
        }
        None
    }

    pub fn set_text_value(&mut self, field: FieldId, new_value: &str) -> bool {
        for control in &mut self.controls {
            if let FormControl::Text {
                field: f, value, ..
            } = control
            {
                if *f == field {
                    *value = new_value.to_string();
                    return true;
                }
            }
        }
        false
    }

    pub fn checked_values(&self, field: FieldId) -> BTreeSet<String> {
        self.controls
            .iter()
            .filter_map(|control| match control {
                FormControl::Choice {
                    field: f,
                    value,
                    checked: true,
                } if *f == field => Some(value.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn set_checked(&mut self, field: FieldId, choice: &str, checked: bool) -> bool {
        for control in &mut self.controls {
            if let FormControl::Choice {
                field: f,
                value,
                checked: state,
            } = control
            {
                if *f == field && value == choice {
                    *state = checked;
                    return true;
                }
            }
        }
        false
    }

    pub fn select_radio(&mut self, field: FieldId, choice: &str) -> bool {
        let mut found = false;
        for control in &mut self.controls {
            if let FormControl::Radio {
                field: f,
                value,
                selected,
            } = control
            {
                if *f == field {
                    *selected = value == choice;
                    found = found || *selected;
                }
            }
        }
        found
    }

    pub fn flag_checked(&self, field: FieldId) -> Option<bool> {
        self.controls.iter().find_map(|control| match control {
            FormControl::FlagToggle { field: f, checked } if *f == field => Some(*checked),
            _ => None,
        })
    }

    pub fn set_flag_checked(&mut self, field: FieldId, new_checked: bool) -> bool {
        for control in &mut self.controls {
            if let FormControl::FlagToggle { field: f, checked } = control {
                if *f == field {
                    *checked = new_checked;
                    return true;
                }
            }
        }
        false
    }

    pub fn hidden_fields(&self) -> Vec<(String, String)> {
        self.controls
            .iter()
            .filter_map(|control| match control {
                FormControl::Hidden { name, value } => Some((name.clone(), value.clone())),
                _ => None,
            })
            .collect()
    }

    pub fn target_for_step(&self, step: u32) -> Option<&StepTarget> {
        self.nav_targets.iter().find(|target| target.step == step)
    }
}

// User edits observed on the rendered form. Restore writes go through
// `apply_state_to_form` and never surface here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormEvent {
    TextChanged {
        generation: u64,
        field: FieldId,
        value: String,
    },
    ChoiceToggled {
        generation: u64,
        field: FieldId,
        value: String,
        checked: bool,
    },
    RadioSelected {
        generation: u64,
        field: FieldId,
        value: String,
    },
    FlagToggled {
        generation: u64,
        field: FieldId,
        checked: bool,
    },
}

impl FormEvent {
    pub fn generation(&self) -> u64 {
        match self {
            FormEvent::TextChanged { generation, .. }
            | FormEvent::ChoiceToggled { generation, .. }
            | FormEvent::RadioSelected { generation, .. }
            | FormEvent::FlagToggled { generation, .. } => *generation,
        }
    }

    // Text edits are debounced; discrete choices sync immediately.
    pub fn is_discrete(&self) -> bool {
        !matches!(self, FormEvent::TextChanged { .. })
    }

    pub fn field(&self) -> FieldId {
        match self {
            FormEvent::TextChanged { field, .. }
            | FormEvent::ChoiceToggled { field, .. }
            | FormEvent::RadioSelected { field, .. }
            | FormEvent::FlagToggled { field, .. } => *field,
        }
    }
}
