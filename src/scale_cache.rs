//! # Scale Result Cache
//!
//! Per-session map from target serving count to a completed [`ScaleResult`].
//! Serving counts are bounded, so entries never expire within a session; the
//! whole cache is cleared when the ingredient set changes.

use log::debug;
use std::collections::HashMap;
use std::sync::Arc;

use crate::ingredient_model::ScaleResult;

#[derive(Debug, Default)]
pub struct ScaleResultCache {
    entries: HashMap<u32, Arc<ScaleResult>>,
}

impl ScaleResultCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, servings: u32) -> Option<Arc<ScaleResult>> {
        self.entries.get(&servings).cloned()
    }

    /// Store a result for a target serving count; last write wins
    pub fn put(&mut self, servings: u32, result: Arc<ScaleResult>) {
        if self.entries.insert(servings, result).is_some() {
            debug!("Replaced cached scale result for {servings} servings");
        }
    }

    pub fn clear(&mut self) {
        let count = self.entries.len();
        self.entries.clear();
        if count > 0 {
            debug!("Cleared {count} cached scale results");
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
