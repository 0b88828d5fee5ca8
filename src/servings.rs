//! # Serving Count Model
//!
//! Holds the original and current serving counts of a recipe session and keeps
//! every user-provided value inside the configured range.

use lazy_static::lazy_static;
use log::debug;
use regex::Regex;

use crate::scaling_config::ScalingConfig;

// First run of digits in a portion text such as "Serves 4" or "6-8 portions"
lazy_static! {
    static ref PORTION_DIGITS_REGEX: Regex =
        Regex::new(r"\d+").expect("Portion digits pattern should be valid");
}

/// Serving counts for one recipe-scaling session
///
/// `original` is fixed for the session; `current` is user-controlled and always
/// within `[1, max_servings]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServingCountModel {
    original: u32,
    current: u32,
    max_servings: u32,
}

impl ServingCountModel {
    /// Create a model from the recipe's portion text
    ///
    /// # Examples
    ///
    /// ```rust
    /// use serving_scaler::scaling_config::ScalingConfig;
    /// use serving_scaler::servings::ServingCountModel;
    ///
    /// let model = ServingCountModel::from_portions(Some("Serves 6"), &ScalingConfig::default());
    /// assert_eq!(model.original(), 6);
    /// assert_eq!(model.current(), 6);
    /// ```
    pub fn from_portions(portions_text: Option<&str>, config: &ScalingConfig) -> Self {
        let original = parse_original(portions_text, config);
        Self {
            original,
            current: original,
            max_servings: config.max_servings.max(1),
        }
    }

    pub fn original(&self) -> u32 {
        self.original
    }

    pub fn current(&self) -> u32 {
        self.current
    }

    pub fn max_servings(&self) -> u32 {
        self.max_servings
    }

    /// Clamp a requested serving count into `[1, max_servings]`
    ///
    /// Pure: the current count is not modified.
    pub fn set_desired(&self, count: i64) -> u32 {
        count.clamp(1, i64::from(self.max_servings)) as u32
    }

    /// Clamp and store a new current serving count, returning the stored value
    pub fn update(&mut self, count: i64) -> u32 {
        self.current = self.set_desired(count);
        self.current
    }

    pub fn is_original(&self, count: u32) -> bool {
        count == self.original
    }
}

/// Extract the original serving count from a recipe's portion text
///
/// Takes the first run of digits. Missing text, no digits, zero, or a value too
/// large to represent yields `config.default_servings`. Values above the range
/// are clamped to `config.max_servings`.
pub fn parse_original(portions_text: Option<&str>, config: &ScalingConfig) -> u32 {
    let max = config.max_servings.max(1);
    let fallback = config.default_servings.clamp(1, max);

    let parsed = portions_text
        .and_then(|text| PORTION_DIGITS_REGEX.find(text))
        .and_then(|m| m.as_str().parse::<u32>().ok())
        .filter(|n| *n > 0);

    match parsed {
        Some(n) => n.min(max),
        None => {
            debug!(
                "No usable serving count in portion text {:?}, using default {}",
                portions_text, fallback
            );
            fallback
        }
    }
}
