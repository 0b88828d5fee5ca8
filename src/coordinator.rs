//! # Request Coordinator
//!
//! Turns a stream of serving-count changes into at most one outstanding remote
//! scaling call.
//!
//! ## Flow
//!
//! 1. Original serving count: reset to original quantities, no call.
//! 2. Cached target: adopt the cached result, no call.
//!    A target whose call is already in flight keeps that call.
//! 3. Otherwise debounce. Every new request cancels the pending timer, so only
//!    the latest target survives the quiet period.
//! 4. When the timer fires the previous in-flight call is cancelled and a new
//!    one is issued.
//! 5. Completion caches the result under the target it was issued for and
//!    publishes it only if that target is still the desired one.
//!
//! All state sits behind one mutex that is never held across an `.await`.
//! Timers and calls run as tasks on the runtime captured at construction; each
//! owns a child token of the session token, so [`RequestCoordinator::shutdown`]
//! stops them all.

use anyhow::{Context, Result};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::circuit_breaker::CircuitBreaker;
use crate::ingredient_model::{IngredientSpec, ScaleRequest, ScaleResult};
use crate::scale_cache::ScaleResultCache;
use crate::scaling_config::ScalingConfig;
use crate::scaling_errors::ScaleError;
use crate::scaling_service::ScalingService;
use crate::servings::ServingCountModel;

/// Where the session currently is in the scaling lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScalingPhase {
    /// Original quantities, nothing pending
    Idle,
    /// Waiting for the quiet period to elapse
    Debouncing,
    /// A remote call for the desired target is in flight
    Calling,
    /// A scaled result for the desired target is active
    Published,
    /// The last call failed; original quantities are shown
    Reverted,
}

/// Readable view of the session, published on every change
#[derive(Debug, Clone, PartialEq)]
pub struct ScalingSnapshot {
    pub servings: u32,
    pub original_servings: u32,
    pub phase: ScalingPhase,
    pub active: Option<Arc<ScaleResult>>,
    pub error: Option<String>,
}

impl ScalingSnapshot {
    pub fn is_scaling(&self) -> bool {
        self.phase == ScalingPhase::Calling
    }

    pub fn cooking_notes(&self) -> Option<&str> {
        self.active.as_deref().and_then(ScaleResult::cooking_notes)
    }
}

/// Recipe input the coordinator scales
#[derive(Debug, Clone)]
pub struct ScalingInput {
    pub servings: ServingCountModel,
    pub recipe_title: Option<String>,
    pub ingredients: Vec<IngredientSpec>,
}

#[derive(Debug)]
struct InFlightRequest {
    target: u32,
    generation: u64,
    cancel: CancellationToken,
}

#[derive(Debug)]
struct CoordinatorState {
    input: ScalingInput,
    cache: ScaleResultCache,
    active: Option<Arc<ScaleResult>>,
    phase: ScalingPhase,
    error: Option<String>,
    /// Bumped by every request; a debounce timer only fires for its own generation
    generation: u64,
    pending: Option<CancellationToken>,
    in_flight: Option<InFlightRequest>,
}

impl CoordinatorState {
    fn snapshot(&self) -> ScalingSnapshot {
        ScalingSnapshot {
            servings: self.input.servings.current(),
            original_servings: self.input.servings.original(),
            phase: self.phase,
            active: self.active.clone(),
            error: self.error.clone(),
        }
    }

    fn cancel_pending(&mut self) {
        if let Some(timer) = self.pending.take() {
            timer.cancel();
        }
    }

    fn cancel_in_flight(&mut self) {
        if let Some(call) = self.in_flight.take() {
            debug!(target_servings = call.target, "Cancelling in-flight scale call");
            call.cancel.cancel();
        }
    }

    fn show_original(&mut self) {
        self.active = None;
        self.error = None;
        self.phase = ScalingPhase::Idle;
    }

    fn adopt(&mut self, result: Arc<ScaleResult>) {
        self.active = Some(result);
        self.error = None;
        self.phase = ScalingPhase::Published;
    }

    fn desired(&self) -> u32 {
        self.input.servings.current()
    }

    fn has_scalable_ingredients(&self) -> bool {
        self.input.ingredients.iter().any(IngredientSpec::has_quantity)
    }
}

struct Shared {
    service: Arc<dyn ScalingService>,
    breaker: CircuitBreaker,
    debounce: Duration,
    operation_timeout: Duration,
    runtime: Handle,
    session: CancellationToken,
    state: Mutex<CoordinatorState>,
    updates: watch::Sender<ScalingSnapshot>,
}

/// Debounces, cancels and publishes remote scaling calls for one session
pub struct RequestCoordinator {
    shared: Arc<Shared>,
}

impl RequestCoordinator {
    /// Create a coordinator bound to the current tokio runtime
    ///
    /// # Errors
    ///
    /// Fails when called outside a tokio runtime.
    pub fn new(
        input: ScalingInput,
        service: Arc<dyn ScalingService>,
        config: &ScalingConfig,
    ) -> Result<Self> {
        let runtime = Handle::try_current()
            .context("Scaling coordinator must be created inside a tokio runtime")?;

        let state = CoordinatorState {
            input,
            cache: ScaleResultCache::new(),
            active: None,
            phase: ScalingPhase::Idle,
            error: None,
            generation: 0,
            pending: None,
            in_flight: None,
        };
        let (updates, _) = watch::channel(state.snapshot());

        Ok(Self {
            shared: Arc::new(Shared {
                service,
                breaker: CircuitBreaker::new(config.recovery.clone()),
                debounce: config.debounce(),
                operation_timeout: config.recovery.operation_timeout(),
                runtime,
                session: CancellationToken::new(),
                state: Mutex::new(state),
                updates,
            }),
        })
    }

    /// Clamp `count` into the serving range, make it current and request its
    /// quantities; returns the clamped count
    pub fn request_scale(&self, count: i64) -> u32 {
        let shared = &self.shared;
        let mut state = shared.lock();
        let target = state.input.servings.update(count);
        if shared.session.is_cancelled() {
            return target;
        }

        state.generation += 1;
        state.cancel_pending();

        if state.input.servings.is_original(target) {
            debug!(target_servings = target, "Back to original servings");
            state.show_original();
            shared.publish(&state);
            return target;
        }

        // already being fetched: keep that call instead of restarting the debounce
        if state
            .in_flight
            .as_ref()
            .is_some_and(|call| call.target == target)
        {
            debug!(target_servings = target, "Scale call for target already in flight");
            state.phase = ScalingPhase::Calling;
            shared.publish(&state);
            return target;
        }

        if let Some(cached) = state.cache.get(target) {
            debug!(target_servings = target, "Using cached scale result");
            state.adopt(cached);
            shared.publish(&state);
            return target;
        }

        if !state.has_scalable_ingredients() {
            debug!("No ingredient quantities to scale");
            state.show_original();
            shared.publish(&state);
            return target;
        }

        let timer = shared.session.child_token();
        state.pending = Some(timer.clone());
        state.phase = ScalingPhase::Debouncing;
        shared.publish(&state);

        let generation = state.generation;
        drop(state);

        let task = Arc::clone(shared);
        shared.runtime.spawn(async move {
            tokio::select! {
                _ = timer.cancelled() => {}
                _ = tokio::time::sleep(task.debounce) => task.issue(generation).await,
            }
        });
        target
    }

    /// Swap the ingredient set: cancels outstanding work, clears the cache and
    /// returns to the original serving count
    pub fn replace_ingredients(&self, ingredients: Vec<IngredientSpec>) {
        let shared = &self.shared;
        let mut state = shared.lock();
        if shared.session.is_cancelled() {
            return;
        }

        state.generation += 1;
        state.cancel_pending();
        state.cancel_in_flight();
        state.cache.clear();
        state.input.ingredients = ingredients;
        let original = state.input.servings.original();
        state.input.servings.update(i64::from(original));
        state.show_original();
        shared.publish(&state);
        info!(
            ingredients = state.input.ingredients.len(),
            "Ingredient set replaced, scale cache cleared"
        );
    }

    pub fn snapshot(&self) -> ScalingSnapshot {
        self.shared.lock().snapshot()
    }

    pub fn subscribe(&self) -> watch::Receiver<ScalingSnapshot> {
        self.shared.updates.subscribe()
    }

    pub fn cached_targets(&self) -> usize {
        self.shared.lock().cache.len()
    }

    /// Cancel the pending timer and any in-flight call; later completions are ignored
    pub fn shutdown(&self) {
        let shared = &self.shared;
        if shared.session.is_cancelled() {
            return;
        }
        shared.session.cancel();

        let mut state = shared.lock();
        state.pending = None;
        state.in_flight = None;
        if state.phase == ScalingPhase::Debouncing || state.phase == ScalingPhase::Calling {
            state.phase = if state.active.is_some() {
                ScalingPhase::Published
            } else {
                ScalingPhase::Idle
            };
        }
        shared.publish(&state);
        debug!("Scaling session shut down");
    }
}

impl Drop for RequestCoordinator {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, CoordinatorState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn publish(&self, state: &CoordinatorState) {
        self.updates.send_replace(state.snapshot());
    }

    /// Debounce elapsed for `generation`: issue the remote call if still wanted
    async fn issue(&self, generation: u64) {
        let (request, cancel, target) = {
            let mut state = self.lock();
            if self.session.is_cancelled() || state.generation != generation {
                return;
            }
            state.pending = None;
            let target = state.desired();

            // a superseded call for this target may have landed meanwhile
            if let Some(cached) = state.cache.get(target) {
                state.adopt(cached);
                self.publish(&state);
                return;
            }

            let input = &state.input;
            let Some(request) = ScaleRequest::for_ingredients(
                &input.ingredients,
                input.servings.original(),
                target,
                input.recipe_title.as_deref(),
            ) else {
                state.show_original();
                self.publish(&state);
                return;
            };

            state.cancel_in_flight();
            let cancel = self.session.child_token();
            state.in_flight = Some(InFlightRequest {
                target,
                generation,
                cancel: cancel.clone(),
            });
            state.phase = ScalingPhase::Calling;
            self.publish(&state);
            (request, cancel, target)
        };

        info!(
            target_servings = target,
            items = request.ingredients.len(),
            "Issuing scale call"
        );
        let outcome = self.call(request, cancel.clone()).await;
        self.complete(target, generation, &cancel, outcome);
    }

    async fn call(
        &self,
        request: ScaleRequest,
        cancel: CancellationToken,
    ) -> Result<ScaleResult, ScaleError> {
        if self.breaker.is_open() {
            return Err(ScaleError::CircuitOpen(format!(
                "{} consecutive scaling failures",
                self.breaker.failure_count()
            )));
        }

        let remote = self.service.scale(request.clone(), cancel.clone());
        let outcome = tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(ScaleError::Cancelled),
            response = tokio::time::timeout(self.operation_timeout, remote) => match response {
                Ok(response) => response.and_then(|r| ScaleResult::from_response(&request, r)),
                Err(_) => Err(ScaleError::Timeout(format!(
                    "no response after {:?}",
                    self.operation_timeout
                ))),
            },
        };

        match &outcome {
            Ok(_) => self.breaker.record_success(),
            Err(err) if !err.is_cancellation() => self.breaker.record_failure(),
            Err(_) => {}
        }
        outcome
    }

    fn complete(
        &self,
        target: u32,
        generation: u64,
        cancel: &CancellationToken,
        outcome: Result<ScaleResult, ScaleError>,
    ) {
        let mut state = self.lock();
        if self.session.is_cancelled() {
            return;
        }
        if state
            .in_flight
            .as_ref()
            .is_some_and(|call| call.generation == generation)
        {
            state.in_flight = None;
        }

        let current = !cancel.is_cancelled() && state.desired() == target;
        match outcome {
            Ok(result) => {
                let result = Arc::new(result);
                state.cache.put(target, Arc::clone(&result));
                if current {
                    info!(target_servings = target, "Publishing scaled quantities");
                    state.adopt(result);
                    self.publish(&state);
                } else {
                    debug!(
                        target_servings = target,
                        desired = state.desired(),
                        "Cached result for superseded target"
                    );
                }
            }
            Err(err) if err.is_cancellation() || cancel.is_cancelled() => {
                debug!(target_servings = target, "Scale call cancelled");
            }
            Err(err) => {
                warn!(target_servings = target, error = %err, "Scale call failed");
                if current {
                    state.active = None;
                    state.error = Some(err.user_message());
                    state.phase = ScalingPhase::Reverted;
                    self.publish(&state);
                }
            }
        }
    }
}
