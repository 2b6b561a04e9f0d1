//! Registry of tunable dimensions for sensitivity and benchmark sweeps.

use serde::{Deserialize, Serialize};

use crate::error::{IsorayError, Result};

/// One continuous tunable dimension.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterRange {
    pub name: String,
    pub min: f32,
    pub max: f32,
    /// Default increment between sweep samples.
    pub delta: f32,
}

impl ParameterRange {
    /// Creates a range named `name` over `[min, max]` with step `delta`.
    pub fn new(name: impl Into<String>, min: f32, max: f32, delta: f32) -> Self {
        Self {
            name: name.into(),
            min,
            max,
            delta,
        }
    }

    /// Sweep samples `min, min + delta, ...` up to and including `max`.
    ///
    /// A non-positive delta yields only `min`.
    pub fn values(&self) -> impl Iterator<Item = f32> + '_ {
        let count = self.sample_count();
        (0..count).map(move |i| {
            #[allow(clippy::cast_precision_loss)]
            let v = self.min + i as f32 * self.delta;
            v.min(self.max)
        })
    }

    /// Number of samples produced by [`Self::values`].
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn sample_count(&self) -> usize {
        if self.delta.is_nan() || self.delta <= 0.0 || self.max < self.min {
            return 1;
        }
        // Tolerance keeps 0.05 + 14 * 0.1 from falling just short of the end.
        let steps = ((self.max - self.min) / self.delta + 1e-4).floor();
        steps as usize + 1
    }
}

/// Ordered set of tunable dimensions a renderer exposes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ParameterSpace {
    dimensions: Vec<ParameterRange>,
}

impl ParameterSpace {
    /// Creates an empty parameter space.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Removes every dimension.
    pub fn clear(&mut self) {
        self.dimensions.clear();
    }

    /// Adds a dimension, replacing any existing one of the same name.
    pub fn add(&mut self, range: ParameterRange) {
        if let Some(existing) = self.dimensions.iter_mut().find(|d| d.name == range.name) {
            *existing = range;
        } else {
            self.dimensions.push(range);
        }
    }

    /// All registered dimensions in insertion order.
    #[must_use]
    pub fn dimensions(&self) -> &[ParameterRange] {
        &self.dimensions
    }

    /// Looks up a dimension by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&ParameterRange> {
        self.dimensions.iter().find(|d| d.name == name)
    }

    /// Looks up a dimension by name, failing for unknown names.
    pub fn require(&self, name: &str) -> Result<&ParameterRange> {
        self.get(name)
            .ok_or_else(|| IsorayError::UnknownParameter(name.to_string()))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.dimensions.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.dimensions.is_empty()
    }

    /// JSON description of the registered dimensions.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
