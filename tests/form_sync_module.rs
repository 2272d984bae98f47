use formwork::runtime::SessionPaths;
use formwork::wizard::form::{FormEvent, StepForm};
use formwork::wizard::state::{FieldId, SetupType, StatePatch};
use formwork::wizard::store::StateStore;
use formwork::wizard::sync::{FormSync, RESTORE_LINGER, TEXT_SYNC_DEBOUNCE};
use std::time::Instant;

fn fixture() -> (tempfile::TempDir, StateStore) {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = StateStore::new(&SessionPaths::new(dir.path()), SetupType::Simple);
    (dir, store)
}

fn review_form(generation: u64) -> StepForm {
    let mut form = StepForm::new(3, "review");
    form.generation = generation;
    form.push_text(FieldId::OutputDir, "out");
    form
}

fn editors_form(generation: u64) -> StepForm {
    let mut form = StepForm::new(2, "tooling");
    form.generation = generation;
    form.push_choice(FieldId::Editors, "cursor", false);
    form.push_choice(FieldId::Editors, "claude", false);
    form
}

#[test]
fn form_sync_module_merge_never_shrinks_absent_fields() {
    let (_dir, mut store) = fixture();
    store.update(&StatePatch::default().with_set(FieldId::Editors, ["cursor", "claude"]));
    let mut sync = FormSync::new();

    // The review form renders no editor controls; a flush must carry them.
    let form = review_form(1);
    sync.sync_form_to_state(&mut store, &form, true, Instant::now());
    let state = store.load();
    assert_eq!(state.editors.len(), 2);
    assert_eq!(state.output_dir, "out");
}

#[test]
fn form_sync_module_all_unchecked_present_controls_zero_the_set() {
    let (_dir, mut store) = fixture();
    store.update(&StatePatch::default().with_set(FieldId::Editors, ["cursor", "claude"]));
    let mut sync = FormSync::new();

    let form = editors_form(1);
    sync.sync_form_to_state(&mut store, &form, true, Instant::now());
    assert!(store.load().editors.is_empty());
}

#[test]
fn form_sync_module_debounce_coalesces_text_edits() {
    let (_dir, mut store) = fixture();
    let mut sync = FormSync::new();
    let mut form = StepForm::new(1, "essentials");
    form.generation = 1;
    form.push_text(FieldId::ProjectName, "");
    sync.attach_listeners(&form);

    let start = Instant::now();
    for (offset_ms, value) in [(0u64, "m"), (50, "my"), (100, "my-app")] {
        form.set_text_value(FieldId::ProjectName, value);
        sync.handle_event(
            &mut store,
            &form,
            &FormEvent::TextChanged {
                generation: 1,
                field: FieldId::ProjectName,
                value: value.to_string(),
            },
            start + std::time::Duration::from_millis(offset_ms),
        );
    }
    // Nothing has landed yet; the window restarts with each keystroke.
    assert_eq!(store.load().project_name, "");
    sync.tick(
        &mut store,
        Some(&form),
        start + std::time::Duration::from_millis(100) + TEXT_SYNC_DEBOUNCE,
    );
    assert_eq!(store.load().project_name, "my-app");
}

#[test]
fn form_sync_module_restore_writes_are_not_observed_as_edits() {
    let (_dir, mut store) = fixture();
    store.update(&StatePatch::default().with_set(FieldId::Editors, ["claude"]));
    let mut sync = FormSync::new();
    let mut form = editors_form(1);
    sync.attach_listeners(&form);

    let now = Instant::now();
    sync.restore_state_to_form(&store, &mut form, now);
    assert!(form.checked_values(FieldId::Editors).contains("claude"));

    // The echo of the restore write lands inside the linger window and must
    // not trigger a sync; unchecked boxes would otherwise wipe the set.
    sync.handle_event(
        &mut store,
        &form,
        &FormEvent::ChoiceToggled {
            generation: 1,
            field: FieldId::Editors,
            value: "claude".to_string(),
            checked: true,
        },
        now,
    );
    assert!(!sync.has_pending_sync());
    assert!(store.load().editors.contains("claude"));
    assert!(!sync.restore_suppressed(now + RESTORE_LINGER));
}

#[test]
fn form_sync_module_detach_clears_pending_work() {
    let (_dir, mut store) = fixture();
    let mut sync = FormSync::new();
    let mut form = StepForm::new(1, "essentials");
    form.generation = 1;
    form.push_text(FieldId::ProjectName, "");
    sync.attach_listeners(&form);

    let now = Instant::now();
    form.set_text_value(FieldId::ProjectName, "half-typed");
    sync.handle_event(
        &mut store,
        &form,
        &FormEvent::TextChanged {
            generation: 1,
            field: FieldId::ProjectName,
            value: "half-typed".to_string(),
        },
        now,
    );
    assert!(sync.has_pending_sync());
    sync.detach_listeners();
    assert!(!sync.has_pending_sync());
    sync.tick(&mut store, Some(&form), now + TEXT_SYNC_DEBOUNCE);
    assert_eq!(store.load().project_name, "");
}

#[test]
fn form_sync_module_events_from_replaced_forms_are_ignored() {
    let (_dir, mut store) = fixture();
    let mut sync = FormSync::new();
    let old = editors_form(1);
    sync.attach_listeners(&old);
    let new = editors_form(2);
    sync.attach_listeners(&new);

    sync.handle_event(
        &mut store,
        &new,
        &FormEvent::ChoiceToggled {
            generation: 1,
            field: FieldId::Editors,
            value: "cursor".to_string(),
            checked: true,
        },
        Instant::now(),
    );
    assert!(store.load().editors.is_empty());
}

#[test]
fn form_sync_module_collect_prefers_form_values_for_rendered_fields() {
    let (_dir, mut store) = fixture();
    store.update(
        &StatePatch::default()
            .with_scalar(FieldId::OutputDir, "stale")
            .with_set(FieldId::CssFrameworks, ["bulma"]),
    );
    let sync = FormSync::new();
    let form = review_form(1);
    let collected = sync.collect_form_data(&store, &form);
    assert_eq!(collected.output_dir, "out");
    assert!(collected.css_frameworks.contains("bulma"));
}
