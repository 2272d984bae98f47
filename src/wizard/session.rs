use crate::client::FragmentFetcher;
use crate::wizard::form::{FormEvent, StepForm, StepTarget};
use crate::wizard::fragment::parse_fragment;
use crate::wizard::navigation::{self, NavError};
use crate::wizard::steps;
use crate::wizard::store::StateStore;
use crate::wizard::sync::FormSync;
use crate::wizard::validator::{self, FieldError};
use std::time::{Duration, Instant};

// Content replacement and script re-initialization are not atomic; restore
// waits out a settle window, then polls for the step's controls up to a
// bounded deadline and proceeds with whatever it found.
pub const CONTENT_SETTLE: Duration = Duration::from_millis(60);
pub const RESTORE_POLL_TIMEOUT: Duration = Duration::from_millis(1200);

#[derive(Debug, Clone, Copy)]
struct PendingRestore {
    due: Instant,
    deadline: Instant,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NavigateOutcome {
    Moved(u32),
    Blocked(FieldError),
    AtBoundary,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    Accepted(String),
    Blocked(FieldError),
}

// Drives the page lifecycle: mount → settle → guarded restore → listeners,
// then transitions and the terminal submit. Owns the content region.
pub struct WizardSession {
    store: StateStore,
    sync: FormSync,
    fetcher: Box<dyn FragmentFetcher>,
    form: Option<StepForm>,
    next_generation: u64,
    pending_restore: Option<PendingRestore>,
}

impl WizardSession {
    pub fn new(store: StateStore, fetcher: Box<dyn FragmentFetcher>) -> Self {
        Self {
            store,
            sync: FormSync::new(),
            fetcher,
            form: None,
            next_generation: 0,
            pending_restore: None,
        }
    }

    pub fn store(&self) -> &StateStore {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut StateStore {
        &mut self.store
    }

    pub fn form(&self) -> Option<&StepForm> {
        self.form.as_ref()
    }

    pub fn form_mut(&mut self) -> Option<&mut StepForm> {
        self.form.as_mut()
    }

    pub fn restore_pending(&self) -> bool {
        self.pending_restore.is_some()
    }

    // Initial load: fetch the fragment for the stored step and mount it.
    pub fn start(&mut self, now: Instant) -> Result<u32, NavError> {
        let state = self.store.load();
        let definition = steps::step_by_number(state.setup_type, state.current_step)
            .unwrap_or(&steps::steps_for(state.setup_type)[0]);
        let params = navigation::state_to_url_params(&state);
        let markup = self.fetcher.fetch_step(definition.route, &params)?;
        let form = parse_fragment(&markup).ok_or_else(|| NavError::MissingForm {
            route: definition.route.to_string(),
        })?;
        self.mount(form, now);
        Ok(definition.number)
    }

    fn mount(&mut self, mut form: StepForm, now: Instant) {
        // Old listeners go before the new fragment exists anywhere.
        self.sync.detach_listeners();
        self.next_generation += 1;
        form.generation = self.next_generation;
        self.form = Some(form);
        self.pending_restore = Some(PendingRestore {
            due: now + CONTENT_SETTLE,
            deadline: now + CONTENT_SETTLE + RESTORE_POLL_TIMEOUT,
        });
    }

    fn controls_ready(&self) -> bool {
        let Some(form) = &self.form else {
            return false;
        };
        let state = self.store.load();
        match steps::step_by_route(state.setup_type, &form.route) {
            Some(definition) => definition
                .renders
                .iter()
                .all(|field| form.has_field(*field)),
            None => true,
        }
    }

    pub fn tick(&mut self, now: Instant) {
        if let Some(pending) = self.pending_restore {
            if now >= pending.due && (self.controls_ready() || now >= pending.deadline) {
                self.pending_restore = None;
                if let Some(form) = self.form.as_mut() {
                    self.sync.restore_state_to_form(&self.store, form, now);
                }
                if let Some(form) = self.form.as_ref() {
                    self.sync.attach_listeners(form);
                }
            }
        }
        self.sync.tick(&mut self.store, self.form.as_ref(), now);
    }

    pub fn handle_event(&mut self, event: &FormEvent, now: Instant) {
        let Some(form) = self.form.as_ref() else {
            return;
        };
        self.sync.handle_event(&mut self.store, form, event, now);
    }

    pub fn navigate_next(&mut self, now: Instant) -> Result<NavigateOutcome, NavError> {
        let current = navigation::current_step(&mut self.store, self.form.as_ref());
        let setup_type = self.store.load().setup_type;
        let Some(next) = navigation::next_step(setup_type, current) else {
            return Ok(NavigateOutcome::AtBoundary);
        };
        let target = self.declared_target(next.number, next.route);
        self.navigate_to(&target, now)
    }

    pub fn navigate_previous(&mut self, now: Instant) -> Result<NavigateOutcome, NavError> {
        let current = navigation::current_step(&mut self.store, self.form.as_ref());
        let setup_type = self.store.load().setup_type;
        let Some(previous) = navigation::previous_step(setup_type, current) else {
            return Ok(NavigateOutcome::AtBoundary);
        };
        let target = self.declared_target(previous.number, previous.route);
        self.navigate_to(&target, now)
    }

    // Fragment buttons declare their targets via data attributes; they win
    // over the static graph so the server can re-route a step.
    fn declared_target(&self, step: u32, fallback_route: &str) -> StepTarget {
        self.form
            .as_ref()
            .and_then(|form| form.target_for_step(step).cloned())
            .unwrap_or(StepTarget {
                step,
                route: fallback_route.to_string(),
            })
    }

    pub fn navigate_to(
        &mut self,
        target: &StepTarget,
        now: Instant,
    ) -> Result<NavigateOutcome, NavError> {
        let Some(form) = self.form.as_ref() else {
            return Err(NavError::NothingMounted);
        };

        // Forward moves gate on the step being left plus any mandatory step
        // the jump would skip, checked against what the flush will write.
        if target.step > form.step {
            let state = self.store.load();
            let collected = self.sync.collect_form_data(&self.store, form);
            for definition in steps::steps_for(state.setup_type) {
                if definition.number >= target.step {
                    break;
                }
                let leaving = definition.number == form.step;
                let skipped = definition.number > form.step && definition.mandatory;
                if !leaving && !skipped {
                    continue;
                }
                if let Err(error) = validator::validate_step(definition, &collected) {
                    return Ok(NavigateOutcome::Blocked(error));
                }
            }
        }

        let next_form = navigation::navigate_to_step(
            &mut self.store,
            &mut self.sync,
            form,
            self.fetcher.as_ref(),
            target,
            now,
        )?;
        self.mount(next_form, now);
        Ok(NavigateOutcome::Moved(target.step))
    }

    // Terminal POST from the review step; never blocked by sync failures,
    // only by review-step validation.
    pub fn submit(&mut self, now: Instant) -> Result<SubmitOutcome, NavError> {
        let Some(form) = self.form.as_ref() else {
            return Err(NavError::NothingMounted);
        };
        let state = self.store.load();
        if let Some(definition) = steps::step_by_route(state.setup_type, &form.route) {
            let collected = self.sync.collect_form_data(&self.store, form);
            if let Err(error) = validator::validate_step(definition, &collected) {
                return Ok(SubmitOutcome::Blocked(error));
            }
        }
        self.sync.sync_form_to_state(&mut self.store, form, true, now);
        let state = self.store.load();
        let fields = navigation::submission_fields(&state, form);
        let body = self.fetcher.submit(&form.route, &fields)?;
        Ok(SubmitOutcome::Accepted(body))
    }
}
