//! Trend evaluation for commodity interest timelines.
//!
//! Timelines are interest-over-time series normalized to 0-100. The evaluator
//! compares the two most recent points and classifies the movement; the
//! thresholds below decide when a movement is worth a notification.

use serde::{Deserialize, Serialize};

/// Minimum percent change for a single keyword to be notification-worthy.
pub const PRICE_SIGNIFICANT_PERCENT: f64 = 10.0;

/// Minimum mean percent change for a product category to be notification-worthy.
pub const CATEGORY_SIGNIFICANT_PERCENT: f64 = 15.0;

/// One point of an interest-over-time series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendPoint {
    pub time: String,
    pub value: f64,
}

/// Direction of movement between the two most recent points.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrendDirection {
    Naik,
    Turun,
    Stabil,
}

impl TrendDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            TrendDirection::Naik => "naik",
            TrendDirection::Turun => "turun",
            TrendDirection::Stabil => "stabil",
        }
    }
}

/// Result of evaluating a timeline.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrendEvaluation {
    pub direction: TrendDirection,
    /// Absolute percent change between the two most recent points.
    pub percent_change: f64,
}

impl TrendEvaluation {
    /// True when the change clears the per-keyword threshold.
    pub fn is_significant(&self) -> bool {
        self.percent_change >= PRICE_SIGNIFICANT_PERCENT
    }

    /// Percent change with the direction's sign applied (turun is negative).
    pub fn signed_percent(&self) -> f64 {
        match self.direction {
            TrendDirection::Turun => -self.percent_change,
            _ => self.percent_change,
        }
    }
}

/// Evaluate the movement between the two most recent points of a timeline.
///
/// A timeline with fewer than two points has nothing to compare, and a zero
/// previous value has no meaningful ratio; both cases evaluate to 0% stabil
/// instead of producing NaN or Infinity.
pub fn evaluate(timeline: &[TrendPoint]) -> TrendEvaluation {
    let (previous, current) = match timeline {
        [] => (0.0, 0.0),
        [only] => (only.value, only.value),
        [.., prev, last] => (prev.value, last.value),
    };

    if previous == 0.0 {
        return TrendEvaluation {
            direction: TrendDirection::Stabil,
            percent_change: 0.0,
        };
    }

    let percent_change = ((current - previous).abs() / previous) * 100.0;
    let direction = if current > previous {
        TrendDirection::Naik
    } else if current < previous {
        TrendDirection::Turun
    } else {
        TrendDirection::Stabil
    };

    TrendEvaluation {
        direction,
        percent_change,
    }
}

/// Aggregate movement for a group of keyword evaluations (one category).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CategoryTrend {
    pub direction: TrendDirection,
    /// Mean of the signed per-keyword percent changes.
    pub mean_percent: f64,
}

impl CategoryTrend {
    /// True when the aggregate clears the category threshold in either direction.
    pub fn is_significant(&self) -> bool {
        self.mean_percent.abs() >= CATEGORY_SIGNIFICANT_PERCENT
    }
}

/// Mean signed movement across a category's keyword evaluations.
///
/// Falling keywords contribute negatively, so a category where half the
/// keywords rise and half fall reads as flat rather than volatile.
pub fn aggregate(evaluations: &[TrendEvaluation]) -> Option<CategoryTrend> {
    if evaluations.is_empty() {
        return None;
    }

    let sum: f64 = evaluations.iter().map(TrendEvaluation::signed_percent).sum();
    let mean = sum / evaluations.len() as f64;
    let direction = if mean > 0.0 {
        TrendDirection::Naik
    } else if mean < 0.0 {
        TrendDirection::Turun
    } else {
        TrendDirection::Stabil
    };

    Some(CategoryTrend {
        direction,
        mean_percent: mean,
    })
}
