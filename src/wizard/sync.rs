use crate::wizard::form::{FormControl, FormEvent, StepForm};
use crate::wizard::state::{FieldId, FieldKind, WizardState, ALL_FIELDS};
use crate::wizard::store::StateStore;
use std::time::{Duration, Instant};

// Keystrokes coalesce inside this window before they hit the store; discrete
// choices and flushes skip it.
pub const TEXT_SYNC_DEBOUNCE: Duration = Duration::from_millis(400);
// Events arriving this soon after a restore write are the write's own echo.
pub const RESTORE_LINGER: Duration = Duration::from_millis(150);

#[derive(Debug, Clone, Copy)]
struct PendingSync {
    due: Instant,
    generation: u64,
}

// Reentrancy guard for restore writes: a depth counter while a restore scope
// is open, plus a linger deadline after the last scope closes. A plain
// boolean cannot survive overlapping restores.
#[derive(Debug, Default)]
struct RestoreGuard {
    depth: u32,
    linger_until: Option<Instant>,
}

impl RestoreGuard {
    fn suppressed(&self, now: Instant) -> bool {
        self.depth > 0 || self.linger_until.is_some_and(|until| now < until)
    }

    fn enter(&mut self) {
        self.depth += 1;
    }

    fn exit(&mut self, now: Instant) {
        self.depth = self.depth.saturating_sub(1);
        self.linger_until = Some(now + RESTORE_LINGER);
    }
}

// Bidirectional bridge between the rendered form and the state store. The
// store wins every conflict except the field the user is actively editing.
#[derive(Debug, Default)]
pub struct FormSync {
    attached: Option<u64>,
    pending: Option<PendingSync>,
    guard: RestoreGuard,
}

impl FormSync {
    pub fn new() -> Self {
        Self::default()
    }

    // At most one listener set exists at a time; attaching for a new form
    // first drops the old set and any debounce it still had in flight.
    pub fn attach_listeners(&mut self, form: &StepForm) {
        self.detach_listeners();
        self.attached = Some(form.generation);
    }

    pub fn detach_listeners(&mut self) {
        self.attached = None;
        self.pending = None;
    }

    pub fn listeners_attached_to(&self, generation: u64) -> bool {
        self.attached == Some(generation)
    }

    pub fn has_pending_sync(&self) -> bool {
        self.pending.is_some()
    }

    pub fn restore_suppressed(&self, now: Instant) -> bool {
        self.guard.suppressed(now)
    }

    // Fresh stored state overlaid with whatever the form renders. A set field
    // whose controls exist anywhere in the form takes the form's checked
    // values, all-unchecked included; absent controls carry the stored value.
    pub fn collect_form_data(&self, store: &StateStore, form: &StepForm) -> WizardState {
        let mut state = store.load();
        for field in ALL_FIELDS {
            match field.kind() {
                FieldKind::Scalar => {
                    if let Some(value) = form.scalar_value(field) {
                        state.set_scalar(field, value);
                    }
                }
                FieldKind::Set => {
                    if form.has_field(field) {
                        state.replace_set(field, form.checked_values(field));
                    }
                }
                FieldKind::Flag => {
                    if let Some(checked) = form.flag_checked(field) {
                        state.set_flag(field, checked);
                    }
                }
            }
        }
        state.current_step = form.step;
        state
    }

    // Writes stored values into matching controls. Scalars whose stored value
    // equals the field default are left to the fragment's own rendering.
    pub fn apply_state_to_form(&self, form: &mut StepForm, state: &WizardState) {
        let rendered = form.fields_present();
        let choice_pairs: Vec<(FieldId, String)> = form
            .controls()
            .iter()
            .filter_map(|control| match control {
                FormControl::Choice { field, value, .. } => Some((*field, value.clone())),
                _ => None,
            })
            .collect();

        for field in rendered {
            match field.kind() {
                FieldKind::Scalar => {
                    let Some(stored) = state.scalar(field) else { continue };
                    if field.default_value() == Some(stored) {
                        continue;
                    }
                    let stored = stored.to_string();
                    if !form.set_text_value(field, &stored) {
                        form.select_radio(field, &stored);
                    }
                }
                FieldKind::Set => {
                    let Some(stored) = state.set_values(field) else { continue };
                    let stored = stored.clone();
                    for (choice_field, value) in &choice_pairs {
                        if *choice_field == field {
                            form.set_checked(field, value, stored.contains(value));
                        }
                    }
                }
                FieldKind::Flag => {
                    if let Some(stored) = state.flag(field) {
                        form.set_flag_checked(field, stored);
                    }
                }
            }
        }
    }

    pub fn sync_form_to_state(
        &mut self,
        store: &mut StateStore,
        form: &StepForm,
        immediate: bool,
        now: Instant,
    ) {
        if immediate {
            self.pending = None;
            self.flush(store, form);
        } else {
            self.pending = Some(PendingSync {
                due: now + TEXT_SYNC_DEBOUNCE,
                generation: form.generation,
            });
        }
    }

    fn flush(&mut self, store: &mut StateStore, form: &StepForm) {
        let collected = self.collect_form_data(store, form);
        store.save(collected);
    }

    pub fn restore_state_to_form(
        &mut self,
        store: &StateStore,
        form: &mut StepForm,
        now: Instant,
    ) {
        let state = store.load();
        self.guard.enter();
        self.apply_state_to_form(form, &state);
        self.guard.exit(now);
    }

    // Listener path. Events are noise while detached, while a restore scope
    // is open or lingering, and when they carry a stale form generation.
    pub fn handle_event(
        &mut self,
        store: &mut StateStore,
        form: &StepForm,
        event: &FormEvent,
        now: Instant,
    ) {
        if self.attached != Some(event.generation()) || form.generation != event.generation() {
            return;
        }
        if self.guard.suppressed(now) {
            return;
        }
        // An edit for a field this form does not render cannot be real.
        if !form.has_field(event.field()) {
            return;
        }
        self.sync_form_to_state(store, form, event.is_discrete(), now);
    }

    // Pump: runs the debounce when it comes due. Stale pending work from a
    // replaced form is discarded instead of flushed.
    pub fn tick(&mut self, store: &mut StateStore, form: Option<&StepForm>, now: Instant) {
        let Some(pending) = self.pending else { return };
        if now < pending.due {
            return;
        }
        self.pending = None;
        let Some(form) = form else { return };
        if form.generation != pending.generation || self.attached != Some(pending.generation) {
            return;
        }
        self.flush(store, form);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::SessionPaths;
    use crate::wizard::state::{SetupType, StatePatch};

    fn fixture() -> (tempfile::TempDir, StateStore) {
        let dir = tempfile::tempdir().expect("tempdir");
        let paths = SessionPaths::new(dir.path());
        let store = StateStore::new(&paths, SetupType::Simple);
        (dir, store)
    }

    fn editors_form(generation: u64) -> StepForm {
        let mut form = StepForm::new(2, "tooling");
        form.generation = generation;
        form.push_choice(FieldId::Editors, "cursor", false);
        form.push_choice(FieldId::Editors, "claude", false);
        form
    }

    #[test]
    fn absent_controls_carry_the_stored_value() {
        let (_dir, mut store) = fixture();
        store.update(&StatePatch::default().with_set(FieldId::Editors, ["cursor", "claude"]));
        let sync = FormSync::new();
        let mut form = StepForm::new(3, "review");
        form.push_text(FieldId::OutputDir, "out");
        let collected = sync.collect_form_data(&store, &form);
        assert_eq!(collected.editors.len(), 2);
        assert_eq!(collected.output_dir, "out");
    }

    #[test]
    fn present_but_unchecked_controls_zero_the_set() {
        let (_dir, mut store) = fixture();
        store.update(&StatePatch::default().with_set(FieldId::Editors, ["cursor", "claude"]));
        let sync = FormSync::new();
        let collected = sync.collect_form_data(&store, &editors_form(1));
        assert!(collected.editors.is_empty());
    }

    #[test]
    fn debounced_text_sync_waits_for_its_window() {
        let (_dir, mut store) = fixture();
        let mut sync = FormSync::new();
        let mut form = StepForm::new(1, "essentials");
        form.generation = 1;
        form.push_text(FieldId::ProjectName, "");
        sync.attach_listeners(&form);

        let start = Instant::now();
        form.set_text_value(FieldId::ProjectName, "my-app");
        sync.handle_event(
            &mut store,
            &form,
            &FormEvent::TextChanged {
                generation: 1,
                field: FieldId::ProjectName,
                value: "my-app".to_string(),
            },
            start,
        );
        assert!(sync.has_pending_sync());
        sync.tick(&mut store, Some(&form), start + Duration::from_millis(100));
        assert_eq!(store.load().project_name, "");
        sync.tick(&mut store, Some(&form), start + TEXT_SYNC_DEBOUNCE);
        assert_eq!(store.load().project_name, "my-app");
        assert!(!sync.has_pending_sync());
    }

    #[test]
    fn discrete_choices_sync_immediately() {
        let (_dir, mut store) = fixture();
        let mut sync = FormSync::new();
        let mut form = editors_form(1);
        sync.attach_listeners(&form);
        form.set_checked(FieldId::Editors, "cursor", true);
        sync.handle_event(
            &mut store,
            &form,
            &FormEvent::ChoiceToggled {
                generation: 1,
                field: FieldId::Editors,
                value: "cursor".to_string(),
                checked: true,
            },
            Instant::now(),
        );
        assert!(store.load().editors.contains("cursor"));
    }

    #[test]
    fn events_during_a_restore_scope_are_noise() {
        let (_dir, mut store) = fixture();
        store.update(&StatePatch::default().with_set(FieldId::Editors, ["cursor"]));
        let mut sync = FormSync::new();
        let mut form = editors_form(1);
        sync.attach_listeners(&form);

        let now = Instant::now();
        sync.restore_state_to_form(&store, &mut form, now);
        assert!(form.checked_values(FieldId::Editors).contains("cursor"));

        // The restore write's echo arrives within the linger window.
        sync.handle_event(
            &mut store,
            &form,
            &FormEvent::ChoiceToggled {
                generation: 1,
                field: FieldId::Editors,
                value: "cursor".to_string(),
                checked: true,
            },
            now + Duration::from_millis(10),
        );
        assert!(!sync.has_pending_sync());

        // Past the linger window, edits count again.
        assert!(!sync.restore_suppressed(now + RESTORE_LINGER));
    }

    #[test]
    fn stale_generation_events_are_discarded() {
        let (_dir, mut store) = fixture();
        let mut sync = FormSync::new();
        let old_form = editors_form(1);
        sync.attach_listeners(&old_form);
        let new_form = editors_form(2);
        sync.attach_listeners(&new_form);
        sync.handle_event(
            &mut store,
            &new_form,
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
    fn reattaching_listeners_drops_pending_debounce() {
        let (_dir, mut store) = fixture();
        let mut sync = FormSync::new();
        let mut form = StepForm::new(1, "essentials");
        form.generation = 1;
        form.push_text(FieldId::ProjectName, "");
        sync.attach_listeners(&form);
        let now = Instant::now();
        sync.sync_form_to_state(&mut store, &form, false, now);
        assert!(sync.has_pending_sync());

        let mut next = StepForm::new(2, "tooling");
        next.generation = 2;
        sync.attach_listeners(&next);
        assert!(!sync.has_pending_sync());
    }

    #[test]
    fn restore_skips_scalars_still_at_their_default() {
        let (_dir, mut store) = fixture();
        store.update(&StatePatch::default());
        let mut sync = FormSync::new();
        let mut form = StepForm::new(1, "essentials");
        form.generation = 1;
        form.push_radio(FieldId::Preset, "standard", false);
        form.push_radio(FieldId::Preset, "minimal", false);
        sync.restore_state_to_form(&store, &mut form, Instant::now());
        // "standard" is the declared default, so the fragment keeps its own
        // rendering instead of a forced selection.
        assert_eq!(form.scalar_value(FieldId::Preset), None);
    }

    #[test]
    fn overlapping_restores_keep_suppressing_until_both_close() {
        let now = Instant::now();
        let mut guard = RestoreGuard::default();
        guard.enter();
        guard.enter();
        guard.exit(now);
        assert!(guard.suppressed(now + Duration::from_secs(5)));
        guard.exit(now + Duration::from_secs(5));
        assert!(guard.suppressed(now + Duration::from_secs(5)));
        assert!(!guard.suppressed(now + Duration::from_secs(5) + RESTORE_LINGER));
    }
}
