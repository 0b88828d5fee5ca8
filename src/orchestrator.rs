//! # Scaling Orchestrator
//!
//! The session object a UI creates when it shows a recipe with serving
//! controls. It combines the serving count model, the request coordinator and
//! the quantity resolver behind a small surface that never returns errors:
//! failures show up in [`ScalingOrchestrator::error`] and the original
//! quantities are displayed instead.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use serving_scaler::ingredient_model::{IngredientSpec, Recipe};
//! use serving_scaler::orchestrator::ScalingOrchestrator;
//! use serving_scaler::scaling_config::ScalingConfig;
//! use serving_scaler::scaling_service::HttpScalingService;
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let recipe = Recipe {
//!     title: Some("Pancakes".to_string()),
//!     portions: Some("Serves 4".to_string()),
//!     ingredients: vec![IngredientSpec::new("ing-1", "Flour", "200 g")],
//! };
//! let service = Arc::new(HttpScalingService::new("http://localhost:8080", Duration::from_secs(15))?);
//! let session = ScalingOrchestrator::new(recipe, service, ScalingConfig::default())?;
//!
//! session.set_servings(8);
//! // ... after the debounce and the remote call
//! let flour = session.resolve_quantity("ing-1", "Flour", "200 g");
//! # Ok(())
//! # }
//! ```

use anyhow::Result;
use std::sync::Arc;
use tokio::sync::watch;

use crate::coordinator::{RequestCoordinator, ScalingInput, ScalingSnapshot};
use crate::ingredient_model::{IngredientSpec, Recipe};
use crate::quantity_resolver;
use crate::scaling_config::ScalingConfig;
use crate::scaling_service::ScalingService;
use crate::servings::ServingCountModel;

/// One recipe-scaling session
///
/// Dropping the session cancels its pending debounce timer and in-flight call.
/// The current serving count lives only in the coordinator's state.
pub struct ScalingOrchestrator {
    original_servings: u32,
    max_servings: u32,
    coordinator: RequestCoordinator,
}

impl ScalingOrchestrator {
    /// Start a session for `recipe`
    ///
    /// The original serving count comes from the recipe's portion text.
    ///
    /// # Errors
    ///
    /// Fails when the configuration is invalid or when called outside a tokio runtime.
    pub fn new(
        recipe: Recipe,
        service: Arc<dyn ScalingService>,
        config: ScalingConfig,
    ) -> Result<Self> {
        config.validate()?;
        let model = ServingCountModel::from_portions(recipe.portions.as_deref(), &config);

        let original_servings = model.original();
        let max_servings = model.max_servings();

        let input = ScalingInput {
            servings: model,
            recipe_title: recipe.title,
            ingredients: recipe.ingredients,
        };
        let coordinator = RequestCoordinator::new(input, service, &config)?;

        Ok(Self {
            original_servings,
            max_servings,
            coordinator,
        })
    }

    pub fn servings(&self) -> u32 {
        self.coordinator.snapshot().servings
    }

    pub fn original_servings(&self) -> u32 {
        self.original_servings
    }

    pub fn max_servings(&self) -> u32 {
        self.max_servings
    }

    pub fn is_scaling(&self) -> bool {
        self.coordinator.snapshot().is_scaling()
    }

    pub fn cooking_notes(&self) -> Option<String> {
        self.coordinator
            .snapshot()
            .cooking_notes()
            .map(str::to_string)
    }

    pub fn error(&self) -> Option<String> {
        self.coordinator.snapshot().error
    }

    pub fn snapshot(&self) -> ScalingSnapshot {
        self.coordinator.snapshot()
    }

    /// Receive a new snapshot on every state change
    pub fn subscribe(&self) -> watch::Receiver<ScalingSnapshot> {
        self.coordinator.subscribe()
    }

    /// Set the desired serving count, clamped into `[1, max_servings]`
    ///
    /// Returns the clamped value that is now current.
    pub fn set_servings(&self, count: i64) -> u32 {
        self.coordinator.request_scale(count)
    }

    pub fn increment(&self) -> u32 {
        let current = self.servings();
        self.set_servings(i64::from(current) + 1)
    }

    pub fn decrement(&self) -> u32 {
        let current = self.servings();
        self.set_servings(i64::from(current) - 1)
    }

    /// Go back to the recipe's original serving count
    pub fn reset(&self) -> u32 {
        self.set_servings(i64::from(self.original_servings))
    }

    /// Quantity to display for one ingredient under the active result
    pub fn resolve_quantity(
        &self,
        ingredient_id: &str,
        ingredient_name: &str,
        original_quantity: &str,
    ) -> String {
        let snapshot = self.coordinator.snapshot();
        quantity_resolver::resolve(
            snapshot.active.as_deref(),
            ingredient_id,
            ingredient_name,
            original_quantity,
        )
    }

    /// Replace the ingredient set; the cache is cleared and servings return to the original
    pub fn replace_ingredients(&self, ingredients: Vec<IngredientSpec>) {
        self.coordinator.replace_ingredients(ingredients);
    }

    pub fn cached_targets(&self) -> usize {
        self.coordinator.cached_targets()
    }

    /// End the session; safe to call more than once
    pub fn shutdown(&self) {
        self.coordinator.shutdown();
    }
}
