//! Gold rates per Mek.
//!
//! Without a configured curve a Mek earns a linear rate from 100 gold/hour
//! (Mek #1) down to 10 gold/hour (Mek #4000). A [`GoldRateCurve`] replaces
//! the default with one of four shapes over the Mek's rank.

use serde::{Deserialize, Serialize};

use crate::accrual::UNITS_PER_WHOLE;
use crate::ids::{MekNumber, TOTAL_MEKS};

/// Rate of the best Mek, in whole gold per hour.
pub const DEFAULT_MAX_GOLD_PER_HOUR: f64 = 100.0;

/// Rate of the worst Mek, in whole gold per hour.
pub const DEFAULT_MIN_GOLD_PER_HOUR: f64 = 10.0;

/// Default rate for a Mek, in hundredths per hour.
#[must_use]
pub fn default_rate(mek: MekNumber) -> u64 {
    GoldRateCurve::default().rate_for_rank(u32::from(mek.get()))
}

/// Shape of a rate curve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CurveType {
    /// Straight line from max to min.
    #[default]
    Linear,
    /// `max · e^(−steepness · x)`.
    Exponential,
    /// Diminishing drop towards rarer ranks.
    Logarithmic,
    /// S-curve around `mid_point`.
    Sigmoid,
}

/// Rounding applied to a computed rate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Rounding {
    /// Whole gold.
    Whole,
    /// One decimal place.
    OneDecimal,
    /// Two decimal places.
    #[default]
    TwoDecimals,
}

/// A configured mapping from rank to gold per hour.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GoldRateCurve {
    /// Curve shape.
    pub curve_type: CurveType,
    /// Lowest rate, whole gold per hour.
    pub min_gold: f64,
    /// Highest rate, whole gold per hour.
    pub max_gold: f64,
    /// Curve steepness for exponential, logarithmic and sigmoid shapes.
    pub steepness: f64,
    /// Sigmoid centre rank.
    pub mid_point: f64,
    /// Number of ranked Meks.
    pub total_meks: u32,
    /// Rounding mode.
    pub rounding: Rounding,
}

impl Default for GoldRateCurve {
    fn default() -> Self {
        Self {
            curve_type: CurveType::Linear,
            min_gold: DEFAULT_MIN_GOLD_PER_HOUR,
            max_gold: DEFAULT_MAX_GOLD_PER_HOUR,
            steepness: 1.0,
            mid_point: f64::from(TOTAL_MEKS) / 2.0,
            total_meks: u32::from(TOTAL_MEKS),
            rounding: Rounding::TwoDecimals,
        }
    }
}

impl GoldRateCurve {
    /// Check that the curve parameters are usable.
    ///
    /// # Errors
    ///
    /// Returns a message describing the first bad parameter.
    pub fn validate(&self) -> Result<(), String> {
        if !(self.min_gold.is_finite() && self.max_gold.is_finite()) || self.min_gold < 0.0 {
            return Err("min_gold and max_gold must be finite and non-negative".to_string());
        }
        if self.min_gold > self.max_gold {
            return Err("min_gold must not exceed max_gold".to_string());
        }
        if self.total_meks < 2 {
            return Err("total_meks must be at least 2".to_string());
        }
        if !self.steepness.is_finite() || self.steepness <= 0.0 {
            return Err("steepness must be positive".to_string());
        }
        Ok(())
    }

    /// Rate for a 1-based rank, in hundredths per hour.
    #[must_use]
    pub fn rate_for_rank(&self, rank: u32) -> u64 {
        let rank = f64::from(rank.clamp(1, self.total_meks.max(2)));
        let total = f64::from(self.total_meks.max(2));
        let x = (rank - 1.0) / (total - 1.0);
        let (min, max) = (self.min_gold, self.max_gold);

        let raw = match self.curve_type {
            CurveType::Linear => max - (max - min) * x,
            CurveType::Exponential => max * (-self.steepness * x).exp(),
            CurveType::Logarithmic => {
                max - (max - min) * (self.steepness * x).ln_1p() / self.steepness.ln_1p()
            }
            CurveType::Sigmoid => {
                let scaled = (rank - self.mid_point) / (total / 10.0);
                min + (max - min) / (1.0 + (self.steepness * scaled).exp())
            }
        };

        let rounded = match self.rounding {
            Rounding::Whole => raw.round(),
            Rounding::OneDecimal => (raw * 10.0).round() / 10.0,
            Rounding::TwoDecimals => (raw * 100.0).round() / 100.0,
        };
        to_units(rounded.clamp(min, max))
    }
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, clippy::cast_precision_loss)]
fn to_units(gold: f64) -> u64 {
    if gold.is_finite() && gold > 0.0 {
        (gold * UNITS_PER_WHOLE as f64).round() as u64
    } else {
        0
    }
}
