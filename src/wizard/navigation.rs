use crate::client::{FetchError, FragmentFetcher};
use crate::wizard::form::{FormControl, StepForm, StepTarget};
use crate::wizard::fragment::parse_fragment;
use crate::wizard::state::{set_fields, FieldKind, SetupType, StatePatch, WizardState, ALL_FIELDS};
use crate::wizard::steps::{self, StepDefinition};
use crate::wizard::store::StateStore;
use crate::wizard::sync::FormSync;
use std::time::Instant;

#[derive(Debug, thiserror::Error)]
pub enum NavError {
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error("step fragment for `{route}` contained no form")]
    MissingForm { route: String },
    #[error("no step form is mounted")]
    NothingMounted,
}

pub fn steps_for(setup_type: SetupType) -> &'static [StepDefinition] {
    steps::steps_for(setup_type)
}

// Prefers the stored step but trusts the rendered form's declared route on a
// mismatch, writing the correction back.
pub fn current_step(store: &mut StateStore, form: Option<&StepForm>) -> u32 {
    let state = store.load();
    if let Some(form) = form {
        if let Some(definition) = steps::step_by_route(state.setup_type, &form.route) {
            if definition.number != state.current_step {
                let corrected =
                    store.update(&StatePatch::default().with_current_step(definition.number));
                return corrected.current_step;
            }
        }
    }
    state.current_step
}

pub fn next_step(setup_type: SetupType, current: u32) -> Option<&'static StepDefinition> {
    steps::step_by_number(setup_type, current + 1)
}

pub fn previous_step(setup_type: SetupType, current: u32) -> Option<&'static StepDefinition> {
    current.checked_sub(1).and_then(|previous| {
        (previous >= 1)
            .then(|| steps::step_by_number(setup_type, previous))
            .flatten()
    })
}

// Every answer field flattens into request parameters: one pair per set
// element, flags as true/false, scalars when non-empty. An empty set is
// omitted entirely rather than sent empty. Bookkeeping fields stay out.
pub fn state_to_url_params(state: &WizardState) -> Vec<(String, String)> {
    let mut params = vec![(
        "setupType".to_string(),
        state.setup_type.as_str().to_string(),
    )];
    for field in ALL_FIELDS {
        let name = field.as_str().to_string();
        match field.kind() {
            FieldKind::Scalar => {
                if let Some(value) = state.scalar(field) {
                    if !value.is_empty() {
                        params.push((name, value.to_string()));
                    }
                }
            }
            FieldKind::Set => {
                if let Some(values) = state.set_values(field) {
                    for value in values {
                        params.push((name.clone(), value.clone()));
                    }
                }
            }
            FieldKind::Flag => {
                if let Some(value) = state.flag(field) {
                    params.push((name, if value { "true" } else { "false" }.to_string()));
                }
            }
        }
    }
    params
}

// Terminal POST body: the review form's visible fields plus the full
// serialized record, so the generator holds the complete answer set even if
// the fragment's hidden mirroring was incomplete.
pub fn submission_fields(state: &WizardState, form: &StepForm) -> Vec<(String, String)> {
    let mut fields = Vec::new();
    for control in form.controls() {
        match control {
            FormControl::Text { field, value, .. } => {
                fields.push((field.as_str().to_string(), value.clone()));
            }
            FormControl::Choice {
                field,
                value,
                checked: true,
            } => fields.push((field.as_str().to_string(), value.clone())),
            FormControl::Radio {
                field,
                value,
                selected: true,
            } => fields.push((field.as_str().to_string(), value.clone())),
            FormControl::FlagToggle { field, checked } => fields.push((
                field.as_str().to_string(),
                if *checked { "true" } else { "false" }.to_string(),
            )),
            FormControl::Hidden { name, value } => fields.push((name.clone(), value.clone())),
            _ => {}
        }
    }
    fields.push((
        "wizardState".to_string(),
        serde_json::to_string(state).unwrap_or_else(|_| "{}".to_string()),
    ));
    fields
}

// Flush, double-check the merge rule, mark progress, then ask the server for
// the target fragment. The flush is durable before the request goes out.
pub fn navigate_to_step(
    store: &mut StateStore,
    sync: &mut FormSync,
    form: &StepForm,
    fetcher: &dyn FragmentFetcher,
    target: &StepTarget,
    now: Instant,
) -> Result<StepForm, NavError> {
    let snapshot = store.load();
    sync.sync_form_to_state(store, form, true, now);

    // Defensive re-verify: a set the form never rendered must not have
    // shrunk across the flush; restore the snapshot value if it did.
    let flushed = store.load();
    let mut repair = StatePatch::default();
    for field in set_fields() {
        if form.has_field(field) {
            continue;
        }
        let before = snapshot.set_values(field).cloned().unwrap_or_default();
        let after = flushed.set_values(field).cloned().unwrap_or_default();
        if !before.is_subset(&after) {
            repair.sets.push((field, before));
        }
    }
    if !repair.is_empty() {
        store.update(&repair);
    }

    let mut progress = StatePatch::default().with_current_step(target.step);
    if target.step > form.step {
        let mut completed = flushed.completed_steps;
        completed.push(form.step);
        progress = progress.with_completed(completed);
    }
    let state = store.update(&progress);

    let params = state_to_url_params(&state);
    let markup = fetcher.fetch_step(&target.route, &params)?;
    parse_fragment(&markup).ok_or_else(|| NavError::MissingForm {
        route: target.route.clone(),
    })
}
