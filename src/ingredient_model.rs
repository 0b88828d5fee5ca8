//! # Ingredient and Scaling Data Model
//!
//! This module defines the ingredient input owned by the caller, the wire
//! types exchanged with the remote scaling service, and the immutable
//! [`ScaleResult`] built from a successful response.
//!
//! ## Resolution keys
//!
//! A `ScaleResult` keeps a single map from resolution key to scaled quantity.
//! Two kinds of key live in it:
//!
//! - the ingredient id, verbatim (e.g. `"ing-1"`)
//! - `"name:"` followed by the lower-cased ingredient name (e.g. `"name:flour"`)
//!
//! The `name:` namespace keeps names from colliding with id-shaped keys.
//!
//! ## Usage
//!
//! ```rust
//! use serving_scaler::ingredient_model::{IngredientSpec, ScaleResult};
//!
//! let flour = IngredientSpec::new("ing-1", "Flour", "200 g").with_preparation("sifted");
//! assert!(flour.has_quantity());
//!
//! let result = ScaleResult::from_entries([("name:flour", "300 g")], None);
//! assert_eq!(result.get(&ScaleResult::name_key("Flour")), Some("300 g"));
//! ```

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

use crate::scaling_errors::ScaleError;

/// Namespace prefix for name-based resolution keys
pub const NAME_KEY_PREFIX: &str = "name:";

/// An ingredient as displayed by the caller
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngredientSpec {
    /// Opaque identifier (e.g. a database id)
    pub id: String,
    /// Display name (e.g. "all-purpose flour")
    pub name: String,
    /// Original quantity text (e.g. "2 cups"); may be empty
    #[serde(default)]
    pub quantity: String,
    /// Optional preparation note (e.g. "diced")
    #[serde(default)]
    pub preparation: Option<String>,
}

impl IngredientSpec {
    pub fn new(id: &str, name: &str, quantity: &str) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            quantity: quantity.to_string(),
            preparation: None,
        }
    }

    pub fn with_preparation(mut self, preparation: &str) -> Self {
        self.preparation = Some(preparation.to_string());
        self
    }

    /// Whether this ingredient has a quantity worth scaling
    pub fn has_quantity(&self) -> bool {
        !self.quantity.trim().is_empty()
    }
}

impl fmt::Display for IngredientSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.has_quantity() {
            write!(f, "{} {}", self.quantity, self.name)?;
        } else {
            write!(f, "{}", self.name)?;
        }
        if let Some(preparation) = &self.preparation {
            write!(f, " ({preparation})")?;
        }
        Ok(())
    }
}

/// A recipe as loaded by the caller: title, portion text, and ingredients
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Recipe {
    #[serde(default)]
    pub title: Option<String>,
    /// Declared portion text, e.g. "Serves 4"
    #[serde(default)]
    pub portions: Option<String>,
    #[serde(default)]
    pub ingredients: Vec<IngredientSpec>,
}

/// One ingredient entry sent to the scaling service
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScaleRequestItem {
    pub ingredient_name: String,
    pub original_quantity: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preparation: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ingredient_id: Option<String>,
}

impl From<&IngredientSpec> for ScaleRequestItem {
    fn from(spec: &IngredientSpec) -> Self {
        Self {
            ingredient_name: spec.name.clone(),
            original_quantity: spec.quantity.clone(),
            preparation: spec.preparation.clone(),
            ingredient_id: (!spec.id.is_empty()).then(|| spec.id.clone()),
        }
    }
}

/// Input of one remote scaling call
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScaleRequest {
    pub original_servings: u32,
    pub desired_servings: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recipe_title: Option<String>,
    pub ingredients: Vec<ScaleRequestItem>,
}

impl ScaleRequest {
    /// Build a request from the ingredients that carry a quantity
    ///
    /// Returns `None` when no ingredient has a non-empty quantity, in which case
    /// there is nothing to scale.
    pub fn for_ingredients(
        ingredients: &[IngredientSpec],
        original_servings: u32,
        desired_servings: u32,
        recipe_title: Option<&str>,
    ) -> Option<Self> {
        let items: Vec<ScaleRequestItem> = ingredients
            .iter()
            .filter(|spec| spec.has_quantity())
            .map(ScaleRequestItem::from)
            .collect();

        if items.is_empty() {
            return None;
        }

        Some(Self {
            original_servings,
            desired_servings,
            recipe_title: recipe_title.map(str::to_string),
            ingredients: items,
        })
    }
}

/// One scaled ingredient returned by the scaling service
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScaledIngredient {
    #[serde(default)]
    pub ingredient_name: String,
    #[serde(default)]
    pub original_quantity: String,
    pub scaled_quantity: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ingredient_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preparation: Option<String>,
}

/// Output of one remote scaling call
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScaleResponse {
    pub ingredients: Vec<ScaledIngredient>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cooking_notes: Option<String>,
}

/// Scaled quantities for one target serving count
///
/// Immutable once built; shared between the cache and the active slot.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ScaleResult {
    quantities: HashMap<String, String>,
    cooking_notes: Option<String>,
}

impl ScaleResult {
    /// Resolution key for an ingredient name
    pub fn name_key(name: &str) -> String {
        format!("{NAME_KEY_PREFIX}{}", name.trim().to_lowercase())
    }

    /// Build a result directly from resolution keys
    pub fn from_entries<K, V, I>(entries: I, cooking_notes: Option<String>) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            quantities: entries
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
            cooking_notes,
        }
    }

    /// Build a result from a service response
    ///
    /// All-or-nothing: an empty response to a non-empty request, or an entry
    /// that carries neither an id nor a name, rejects the whole response.
    /// Each entry is indexed under its id (when present) and its name key.
    pub fn from_response(
        request: &ScaleRequest,
        response: ScaleResponse,
    ) -> Result<Self, ScaleError> {
        if response.ingredients.is_empty() && !request.ingredients.is_empty() {
            return Err(ScaleError::MalformedResponse(format!(
                "no scaled ingredients returned for {} requested",
                request.ingredients.len()
            )));
        }

        let mut quantities = HashMap::with_capacity(response.ingredients.len() * 2);
        for item in response.ingredients {
            let id = item.ingredient_id.filter(|id| !id.trim().is_empty());
            let has_name = !item.ingredient_name.trim().is_empty();
            if id.is_none() && !has_name {
                return Err(ScaleError::MalformedResponse(
                    "scaled ingredient without id or name".to_string(),
                ));
            }

            if has_name {
                quantities.insert(
                    Self::name_key(&item.ingredient_name),
                    item.scaled_quantity.clone(),
                );
            }
            if let Some(id) = id {
                quantities.insert(id, item.scaled_quantity);
            }
        }

        let cooking_notes = response
            .cooking_notes
            .filter(|notes| !notes.trim().is_empty());

        Ok(Self {
            quantities,
            cooking_notes,
        })
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.quantities.get(key).map(String::as_str)
    }

    pub fn cooking_notes(&self) -> Option<&str> {
        self.cooking_notes.as_deref()
    }
}
