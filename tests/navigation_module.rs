use formwork::client::{FetchError, FragmentFetcher};
use formwork::runtime::SessionPaths;
use formwork::wizard::form::{StepForm, StepTarget};
use formwork::wizard::navigation::{
    current_step, navigate_to_step, next_step, previous_step, state_to_url_params,
};
use formwork::wizard::state::{FieldId, SetupType, StatePatch, WizardState};
use formwork::wizard::store::StateStore;
use formwork::wizard::sync::FormSync;
use std::cell::RefCell;
use std::time::Instant;

struct RecordingFetcher {
    requests: RefCell<Vec<(String, Vec<(String, String)>)>>,
}

impl RecordingFetcher {
    fn new() -> Self {
        Self {
            requests: RefCell::new(Vec::new()),
        }
    }
}

impl FragmentFetcher for RecordingFetcher {
    fn fetch_step(&self, route: &str, params: &[(String, String)]) -> Result<String, FetchError> {
        self.requests
            .borrow_mut()
            .push((route.to_string(), params.to_vec()));
        Ok(format!(
            "<form data-step=\"2\" data-route=\"{route}\">\
             <input type=\"checkbox\" name=\"editors\" value=\"cursor\">\
             <input type=\"checkbox\" name=\"editors\" value=\"claude\">\
             </form>"
        ))
    }

    fn submit(&self, _route: &str, _fields: &[(String, String)]) -> Result<String, FetchError> {
        Ok("ok".to_string())
    }
}

fn fixture() -> (tempfile::TempDir, StateStore) {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = StateStore::new(&SessionPaths::new(dir.path()), SetupType::Simple);
    (dir, store)
}

#[test]
fn navigation_module_adjacency_respects_variant_bounds() {
    assert!(next_step(SetupType::Simple, 3).is_none());
    assert!(previous_step(SetupType::Simple, 1).is_none());
    assert!(next_step(SetupType::Custom, 7).is_none());
    assert_eq!(next_step(SetupType::Simple, 1).map(|s| s.number), Some(2));
    assert_eq!(
        previous_step(SetupType::Custom, 4).map(|s| s.route),
        Some("css")
    );
}

#[test]
fn navigation_module_current_step_heals_stored_desync() {
    let (_dir, mut store) = fixture();
    store.update(&StatePatch::default().with_current_step(3));
    let form = StepForm::new(1, "essentials");
    assert_eq!(current_step(&mut store, Some(&form)), 1);
    assert_eq!(store.load().current_step, 1);
    // Without a rendered form the stored value stands.
    assert_eq!(current_step(&mut store, None), 1);
}

#[test]
fn navigation_module_url_params_flatten_the_answer_set() {
    let mut state = WizardState::defaults(SetupType::Custom);
    state.project_name = "my-app".to_string();
    state.editors.insert("cursor".to_string());
    state.editors.insert("claude".to_string());
    state.framework = true;
    state.last_updated = 1754000000;

    let params = state_to_url_params(&state);
    let editors: Vec<&str> = params
        .iter()
        .filter(|(name, _)| name == "editors")
        .map(|(_, value)| value.as_str())
        .collect();
    assert_eq!(editors, ["claude", "cursor"]);
    assert!(params.contains(&("setupType".to_string(), "custom".to_string())));
    assert!(params.contains(&("framework".to_string(), "true".to_string())));
    // Empty sets are omitted rather than sent empty, and bookkeeping fields
    // never travel.
    assert!(!params.iter().any(|(name, _)| name == "css"));
    assert!(!params.iter().any(|(name, _)| name == "lastUpdated"));
    assert!(!params.iter().any(|(name, _)| name == "version"));
}

#[test]
fn navigation_module_forward_transition_flushes_then_fetches() {
    let (_dir, mut store) = fixture();
    let mut sync = FormSync::new();
    let fetcher = RecordingFetcher::new();

    let mut form = StepForm::new(1, "essentials");
    form.generation = 1;
    form.push_text(FieldId::ProjectName, "my-app");
    form.push_choice(FieldId::CssFrameworks, "tailwind", true);

    let target = StepTarget {
        step: 2,
        route: "tooling".to_string(),
    };
    let next_form = navigate_to_step(&mut store, &mut sync, &form, &fetcher, &target, Instant::now())
        .expect("navigation succeeds");
    assert_eq!(next_form.step, 2);

    let state = store.load();
    assert_eq!(state.project_name, "my-app");
    assert!(state.css_frameworks.contains("tailwind"));
    assert_eq!(state.current_step, 2);
    assert_eq!(state.completed_steps, vec![1]);

    let requests = fetcher.requests.borrow();
    assert_eq!(requests.len(), 1);
    let (route, params) = &requests[0];
    assert_eq!(route, "tooling");
    // The flush is durable before the request goes out.
    assert!(params.contains(&("projectName".to_string(), "my-app".to_string())));
    assert!(params.contains(&("css".to_string(), "tailwind".to_string())));
}

#[test]
fn navigation_module_backward_transition_keeps_completed_steps() {
    let (_dir, mut store) = fixture();
    let mut sync = FormSync::new();
    let fetcher = RecordingFetcher::new();
    store.update(
        &StatePatch::default()
            .with_current_step(2)
            .with_completed(vec![1]),
    );

    let mut form = StepForm::new(2, "tooling");
    form.generation = 1;
    form.push_choice(FieldId::Editors, "cursor", false);

    let target = StepTarget {
        step: 1,
        route: "essentials".to_string(),
    };
    navigate_to_step(&mut store, &mut sync, &form, &fetcher, &target, Instant::now())
        .expect("navigation succeeds");

    let state = store.load();
    assert_eq!(state.current_step, 1);
    assert_eq!(state.completed_steps, vec![1]);
}

#[test]
fn navigation_module_sets_survive_transitions_whose_forms_never_render_them() {
    let (_dir, mut store) = fixture();
    let mut sync = FormSync::new();
    let fetcher = RecordingFetcher::new();
    store.update(&StatePatch::default().with_set(FieldId::CssFrameworks, ["tailwind"]));

    let mut form = StepForm::new(2, "tooling");
    form.generation = 1;
    form.push_choice(FieldId::Editors, "cursor", false);

    let target = StepTarget {
        step: 3,
        route: "review".to_string(),
    };
    navigate_to_step(&mut store, &mut sync, &form, &fetcher, &target, Instant::now())
        .expect("navigation succeeds");
    assert!(store.load().css_frameworks.contains("tailwind"));
}

#[test]
fn navigation_module_surfaces_formless_fragments() {
    struct EmptyFetcher;
    impl FragmentFetcher for EmptyFetcher {
        fn fetch_step(&self, _: &str, _: &[(String, String)]) -> Result<String, FetchError> {
            Ok("<div>no form here</div>".to_string())
        }
        fn submit(&self, _: &str, _: &[(String, String)]) -> Result<String, FetchError> {
            Ok(String::new())
        }
    }

    let (_dir, mut store) = fixture();
    let mut sync = FormSync::new();
    let form = StepForm::new(1, "essentials");
    let target = StepTarget {
        step: 2,
        route: "tooling".to_string(),
    };
    let result = navigate_to_step(
        &mut store,
        &mut sync,
        &form,
        &EmptyFetcher,
        &target,
        Instant::now(),
    );
    assert!(result.is_err());
}
