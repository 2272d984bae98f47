pub mod form;
pub mod fragment;
pub mod migrate;
pub mod navigation;
pub mod session;
pub mod state;
pub mod steps;
pub mod store;
pub mod sync;
pub mod validator;

pub use form::{FormControl, FormEvent, StepForm, StepTarget};
pub use fragment::parse_fragment;
pub use navigation::{
    current_step, next_step, previous_step, state_to_url_params, submission_fields, NavError,
};
pub use session::{NavigateOutcome, SubmitOutcome, WizardSession, CONTENT_SETTLE};
pub use state::{
    normalize, sanitize_scalar, FieldId, FieldKind, SetupType, StatePatch, WizardState,
    ALL_FIELDS, STATE_VERSION,
};
pub use steps::{max_step, step_by_number, step_by_route, steps_for, StepDefinition};
pub use store::{StateStore, StoreError, SubscriptionId};
pub use sync::{FormSync, RESTORE_LINGER, TEXT_SYNC_DEBOUNCE};
pub use validator::{validate_field, validate_step, FieldError, FieldRule, PatternKind};
