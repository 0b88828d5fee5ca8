//! # Quantity Resolver
//!
//! Picks the quantity to display for one ingredient. Called once per
//! ingredient per render, so it only does map lookups.

use crate::ingredient_model::ScaleResult;

/// Resolve the display quantity for an ingredient
///
/// Lookup order against the active result:
/// 1. exact match on `ingredient_id`
/// 2. `name:` key built from the lower-cased `ingredient_name`
/// 3. `original_quantity` unchanged
///
/// With no active result the original quantity is returned.
///
/// ```rust
/// use serving_scaler::ingredient_model::ScaleResult;
/// use serving_scaler::quantity_resolver::resolve;
///
/// let active = ScaleResult::from_entries([("ing-1", "200g"), ("name:flour", "150g")], None);
/// assert_eq!(resolve(Some(&active), "ing-1", "Sugar", "100g"), "200g");
/// assert_eq!(resolve(Some(&active), "ing-2", "Flour", "100g"), "150g");
/// assert_eq!(resolve(Some(&active), "ing-3", "Salt", "1 tsp"), "1 tsp");
/// assert_eq!(resolve(None, "ing-1", "Sugar", "100g"), "100g");
/// ```
pub fn resolve(
    active: Option<&ScaleResult>,
    ingredient_id: &str,
    ingredient_name: &str,
    original_quantity: &str,
) -> String {
    let Some(result) = active else {
        return original_quantity.to_string();
    };

    if !ingredient_id.is_empty() {
        if let Some(scaled) = result.get(ingredient_id) {
            return scaled.to_string();
        }
    }

    result
        .get(&ScaleResult::name_key(ingredient_name))
        .unwrap_or(original_quantity)
        .to_string()
}

/// Whether a resolved quantity differs from the original (presentation only)
pub fn is_scaled_value(resolved: &str, original: &str) -> bool {
    resolved != original
}
