//! Ratio normalization
//!
//! Model-provided ratios are advisory. Once a batch is complete its weights are
//! rescaled so the batch sums to 1; partial batches are shown un-normalized.

use crate::error::{NormalizeError, NormalizeResult};
use crate::record::StreamRecord;

/// Default tolerance for "already sums to 1"
pub const DEFAULT_TOLERANCE: f64 = 0.01;

/// Result of normalizing one batch
#[derive(Debug, Clone, PartialEq)]
pub struct Normalized {
    /// Records with rescaled ratios, in input order
    pub records: Vec<StreamRecord>,
    /// Sum of the input ratios
    pub original_sum: f64,
    /// Input sum was outside tolerance of 1
    pub adjusted: bool,
}

impl Normalized {
    /// Rescaled weights, in input order
    #[must_use]
    pub fn weights(&self) -> Vec<f64> {
        self.records.iter().map(|r| r.ratio).collect()
    }
}

/// Batch weight normalizer
#[derive(Debug, Clone, Copy)]
pub struct RatioNormalizer {
    tolerance: f64,
}

impl RatioNormalizer {
    /// Create normalizer with tolerance
    #[inline]
    #[must_use]
    pub fn new(tolerance: f64) -> Self {
        Self {
            tolerance: tolerance.abs(),
        }
    }

    /// Configured tolerance
    #[inline]
    #[must_use]
    pub fn tolerance(&self) -> f64 {
        self.tolerance
    }

    /// Rescale ratios so the batch sums to 1
    ///
    /// Every ratio is divided by the batch sum, which keeps relative
    /// proportions and also tightens sums that were already within tolerance.
    ///
    /// # Errors
    /// - `NormalizeError::Empty` for an empty batch
    /// - `NormalizeError::NonPositiveSum` if the sum is not a positive finite number
    pub fn normalize(&self, records: &[StreamRecord]) -> NormalizeResult<Normalized> {
        if records.is_empty() {
            return Err(NormalizeError::Empty);
        }

        let sum: f64 = records.iter().map(|r| r.ratio).sum();
        if !(sum.is_finite() && sum > 0.0) {
            return Err(NormalizeError::NonPositiveSum(sum));
        }

        let adjusted = (sum - 1.0).abs() > self.tolerance;
        if adjusted {
            tracing::debug!(sum, count = records.len(), "rescaling batch ratios");
        }

        let records = records
            .iter()
            .map(|r| StreamRecord {
                text: r.text.clone(),
                ratio: r.ratio / sum,
            })
            .collect();

        Ok(Normalized {
            records,
            original_sum: sum,
            adjusted,
        })
    }
}

impl Default for RatioNormalizer {
    fn default() -> Self {
        Self::new(DEFAULT_TOLERANCE)
    }
}

/// Normalize with the default tolerance
///
/// # Errors
/// See [`RatioNormalizer::normalize`].
pub fn normalize(records: &[StreamRecord]) -> NormalizeResult<Normalized> {
    RatioNormalizer::default().normalize(records)
}
