//! Shared fixtures for scaling session tests.

#![allow(dead_code)]

use async_trait::async_trait;
use serving_scaler::ingredient_model::{
    IngredientSpec, Recipe, ScaleRequest, ScaleResponse, ScaledIngredient,
};
use serving_scaler::scaling_errors::ScaleError;
use serving_scaler::scaling_service::ScalingService;
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// In-memory scaling service
///
/// Scaled quantities are `"<original>@<desired>"` so tests can tell which
/// target produced the visible result.
pub struct MockScalingService {
    requests: Mutex<Vec<ScaleRequest>>,
    delay: Duration,
    delays: Mutex<HashMap<u32, Duration>>,
    failing: Mutex<HashSet<u32>>,
    notes: Option<String>,
}

impl MockScalingService {
    pub fn new(delay: Duration) -> Self {
        Self {
            requests: Mutex::new(Vec::new()),
            delay,
            delays: Mutex::new(HashMap::new()),
            failing: Mutex::new(HashSet::new()),
            notes: None,
        }
    }

    pub fn with_notes(mut self, notes: &str) -> Self {
        self.notes = Some(notes.to_string());
        self
    }

    pub fn delay_for(&self, servings: u32, delay: Duration) {
        self.delays.lock().unwrap().insert(servings, delay);
    }

    pub fn fail_for(&self, servings: u32) {
        self.failing.lock().unwrap().insert(servings);
    }

    pub fn recover(&self, servings: u32) {
        self.failing.lock().unwrap().remove(&servings);
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn requested_targets(&self) -> Vec<u32> {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .map(|r| r.desired_servings)
            .collect()
    }

    pub fn last_request(&self) -> Option<ScaleRequest> {
        self.requests.lock().unwrap().last().cloned()
    }
}

#[async_trait]
impl ScalingService for MockScalingService {
    async fn scale(
        &self,
        request: ScaleRequest,
        cancel: CancellationToken,
    ) -> Result<ScaleResponse, ScaleError> {
        self.requests.lock().unwrap().push(request.clone());
        let target = request.desired_servings;
        let delay = self
            .delays
            .lock()
            .unwrap()
            .get(&target)
            .copied()
            .unwrap_or(self.delay);

        tokio::select! {
            _ = cancel.cancelled() => return Err(ScaleError::Cancelled),
            _ = tokio::time::sleep(delay) => {}
        }

        if self.failing.lock().unwrap().contains(&target) {
            return Err(ScaleError::Remote("service unavailable".to_string()));
        }

        Ok(ScaleResponse {
            ingredients: request
                .ingredients
                .iter()
                .map(|item| ScaledIngredient {
                    ingredient_name: item.ingredient_name.clone(),
                    original_quantity: item.original_quantity.clone(),
                    scaled_quantity: format!("{}@{}", item.original_quantity, target),
                    ingredient_id: item.ingredient_id.clone(),
                    preparation: item.preparation.clone(),
                })
                .collect(),
            cooking_notes: self.notes.clone(),
        })
    }
}

pub fn pancake_recipe() -> Recipe {
    Recipe {
        title: Some("Pancakes".to_string()),
        portions: Some("Serves 4".to_string()),
        ingredients: vec![
            IngredientSpec::new("ing-1", "Flour", "200 g").with_preparation("sifted"),
            IngredientSpec::new("ing-2", "Milk", "300 ml"),
            IngredientSpec::new("ing-3", "Eggs", "2"),
            IngredientSpec::new("ing-4", "Salt", ""),
        ],
    }
}

pub async fn wait_ms(ms: u64) {
    tokio::time::sleep(Duration::from_millis(ms)).await;
}
