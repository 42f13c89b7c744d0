//! Adaptive TDEE estimation from logged intake and observed weight change.
//!
//! Derives a personalized burn rate from the empirical relationship between
//! calorie intake and weight change, superior to the formula baseline once
//! enough stable data exists. Daily weights are smoothed with an exponential
//! moving average before differencing, and each day's implied expenditure
//! nudges a recency-weighted running estimate rather than triggering a full
//! batch refit. The running estimate is recorded per day so callers can
//! visualize convergence.
//!
//! Insufficient or degenerate data yields `None`; the engine then falls back
//! to the formula estimator. Nothing here returns an error.

use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use statrs::statistics::Statistics;
use std::collections::BTreeMap;
use tracing::{debug, warn};

use crate::error::{EngineError, Result};
use crate::formula::FormulaEstimate;
use crate::models::{NutritionLogEntry, WeightLogEntry, KCAL_PER_KG};
use crate::quality::DataQualityCheck;

/// Confidence tier of a TDEE estimate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConfidenceTier {
    /// Too little data or too much variance to trust the estimate
    Unstable,
    /// Converging but not yet settled
    Stabilizing,
    /// Enough data and low variance
    Stable,
}

/// How the active estimate was produced
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EstimateSource {
    /// Derived from the observed intake/weight relationship
    Regression,
    /// Profile-based formula fallback
    Formula,
}

/// One point of the convergence series
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BurnRatePoint {
    /// Intake day the observation was formed from
    pub date: NaiveDate,

    /// Running TDEE estimate after absorbing this day (kcal/day)
    pub burn_rate_kcal: f64,
}

/// Personalized TDEE estimate. Immutable result value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TdeeEstimate {
    /// Estimated daily energy expenditure (kcal/day)
    pub estimated_tdee: f64,

    /// Expenditure per kilogram of bodyweight (kcal/kg/day)
    pub burn_rate_per_kg: f64,

    /// Confidence tier
    pub confidence: ConfidenceTier,

    /// Confidence score, 0-100
    pub confidence_score: u8,

    /// Valid intake/weight-change observations used
    pub data_points_used: u32,

    /// Running estimate per observation day, for convergence display
    pub estimate_history: Vec<BurnRatePoint>,

    /// Regression or formula fallback
    pub source: EstimateSource,
}

/// Confidence score attached to a formula fallback: baseline trust with no
/// convergence evidence behind it.
const FORMULA_CONFIDENCE_SCORE: u8 = 10;

impl TdeeEstimate {
    /// Wrap a formula estimate as the active estimate when regression has
    /// nothing to offer.
    pub fn from_formula(
        formula: &FormulaEstimate,
        weight_kg: f64,
        data_points_used: u32,
    ) -> TdeeEstimate {
        TdeeEstimate {
            estimated_tdee: formula.tdee_kcal,
            burn_rate_per_kg: if weight_kg > 0.0 {
                formula.tdee_kcal / weight_kg
            } else {
                0.0
            },
            confidence: ConfidenceTier::Unstable,
            confidence_score: FORMULA_CONFIDENCE_SCORE,
            data_points_used,
            estimate_history: Vec::new(),
            source: EstimateSource::Formula,
        }
    }
}

/// Adaptive estimator tuning
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TdeeConfig {
    /// Smoothing factor for the daily weight EMA (fraction of each new
    /// reading absorbed)
    pub weight_ema_alpha: f64,

    /// Recency weight for the running TDEE estimate: each new observation
    /// contributes this fraction, older observations decay exponentially
    pub estimate_alpha: f64,

    /// Observations below which no regression estimate is produced
    pub min_data_points: u32,

    /// Observations required (together with low variance) for `Stable`
    pub stable_data_points: u32,

    /// Coefficient of variation above which the estimate is `Unstable`
    pub high_cv_bound: f64,

    /// Coefficient of variation at or below which the estimate can be
    /// `Stable`
    pub low_cv_bound: f64,

    /// Trailing history points used for the rolling variance
    pub cv_window: usize,

    /// Implied expenditure observations outside this band (kcal/day) are
    /// discarded as physiologically implausible
    pub plausible_kcal_range: (f64, f64),
}

impl Default for TdeeConfig {
    fn default() -> Self {
        TdeeConfig {
            weight_ema_alpha: 0.3,
            estimate_alpha: 0.1,
            min_data_points: 14,
            stable_data_points: 28,
            high_cv_bound: 0.15,
            low_cv_bound: 0.075,
            cv_window: 14,
            plausible_kcal_range: (500.0, 8000.0),
        }
    }
}

impl TdeeConfig {
    fn validate(&self) -> Result<()> {
        if !(self.weight_ema_alpha > 0.0 && self.weight_ema_alpha <= 1.0) {
            return Err(EngineError::config(
                "weight_ema_alpha",
                self.weight_ema_alpha,
                "must be in (0, 1]",
            ));
        }
        if !(self.estimate_alpha > 0.0 && self.estimate_alpha <= 1.0) {
            return Err(EngineError::config(
                "estimate_alpha",
                self.estimate_alpha,
                "must be in (0, 1]",
            ));
        }
        if self.min_data_points > self.stable_data_points {
            return Err(EngineError::config(
                "min_data_points",
                self.min_data_points,
                "must not exceed stable_data_points",
            ));
        }
        if self.low_cv_bound > self.high_cv_bound {
            return Err(EngineError::config(
                "low_cv_bound",
                self.low_cv_bound,
                "must not exceed high_cv_bound",
            ));
        }
        Ok(())
    }
}

/// Incremental regression engine over merged daily logs
#[derive(Debug, Clone, Default)]
pub struct AdaptiveTdeeEstimator {
    config: TdeeConfig,
}

impl AdaptiveTdeeEstimator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: TdeeConfig) -> Result<Self> {
        config.validate()?;
        Ok(AdaptiveTdeeEstimator { config })
    }

    /// Derive a personalized TDEE estimate, or `None` when the logs cannot
    /// support one. Days flagged as outliers by the validator are excluded.
    pub fn estimate(
        &self,
        weight_logs: &[WeightLogEntry],
        nutrition_logs: &[NutritionLogEntry],
        quality: &DataQualityCheck,
    ) -> Option<TdeeEstimate> {
        let weights: BTreeMap<NaiveDate, f64> = weight_logs
            .iter()
            .filter(|w| !quality.outlier_dates.contains(&w.date))
            .map(|w| (w.date, w.weight_kg()))
            .collect();
        let calories: BTreeMap<NaiveDate, f64> = nutrition_logs
            .iter()
            .map(|n| (n.date, n.calories_consumed))
            .collect();

        let excluded = weight_logs.len() - weights.len();
        if excluded > 0 {
            debug!(excluded, "excluded outlier weight days from regression");
        }

        if weights.len() < 2 {
            debug!("fewer than two usable weight entries, no regression");
            return None;
        }

        let smoothed = smooth_weights(&weights, self.config.weight_ema_alpha);
        let history = self.accumulate(&weights, &calories, &smoothed)?;

        let data_points_used = history.len() as u32;
        if data_points_used < self.config.min_data_points {
            debug!(
                data_points_used,
                min = self.config.min_data_points,
                "insufficient observations for regression estimate"
            );
            return None;
        }

        let estimated_tdee = history.last()?.burn_rate_kcal;
        let cv = self.rolling_cv(&history)?;
        let confidence_score = self.score(data_points_used, cv);
        let confidence = self.tier(data_points_used, cv);

        let mean_weight = weights.values().mean();
        if !(mean_weight > 0.0) {
            warn!("non-positive mean bodyweight, degenerate input");
            return None;
        }

        debug!(
            estimated_tdee,
            data_points_used, cv, confidence_score, "adaptive estimate produced"
        );

        Some(TdeeEstimate {
            estimated_tdee,
            burn_rate_per_kg: estimated_tdee / mean_weight,
            confidence,
            confidence_score,
            data_points_used,
            estimate_history: history,
            source: EstimateSource::Regression,
        })
    }

    /// Fold each valid day into the running estimate.
    ///
    /// A day `d` contributes when it has a calorie log and the following day
    /// has a real weight measurement: the implied expenditure is
    /// `intake(d) − Δ smoothed weight × kcal_per_kg`.
    fn accumulate(
        &self,
        weights: &BTreeMap<NaiveDate, f64>,
        calories: &BTreeMap<NaiveDate, f64>,
        smoothed: &BTreeMap<NaiveDate, f64>,
    ) -> Option<Vec<BurnRatePoint>> {
        let mut history: Vec<BurnRatePoint> = Vec::new();
        let mut running: Option<f64> = None;
        let (lo, hi) = self.config.plausible_kcal_range;

        for (&day, &intake) in calories {
            let next = day + Duration::days(1);
            // Anchor each observation to a real measurement on the
            // following morning, not a carried-forward EMA value.
            if !weights.contains_key(&next) {
                continue;
            }
            let (Some(&w0), Some(&w1)) = (smoothed.get(&day), smoothed.get(&next)) else {
                continue;
            };

            let observed = intake - (w1 - w0) * KCAL_PER_KG;
            if !observed.is_finite() {
                warn!(%day, "non-finite expenditure observation, skipping");
                continue;
            }
            if observed < lo || observed > hi {
                debug!(%day, observed, "implausible expenditure observation, skipping");
                continue;
            }

            let updated = match running {
                None => observed,
                Some(prev) => {
                    self.config.estimate_alpha * observed
                        + (1.0 - self.config.estimate_alpha) * prev
                }
            };
            running = Some(updated);
            history.push(BurnRatePoint {
                date: day,
                burn_rate_kcal: updated,
            });
        }

        if history.is_empty() {
            None
        } else {
            Some(history)
        }
    }

    /// Coefficient of variation of the trailing estimate history.
    ///
    /// A non-positive or non-finite mean marks degenerate input and routes
    /// the caller to the formula fallback instead of propagating NaN.
    fn rolling_cv(&self, history: &[BurnRatePoint]) -> Option<f64> {
        let window = history.len().min(self.config.cv_window);
        let tail: Vec<f64> = history[history.len() - window..]
            .iter()
            .map(|p| p.burn_rate_kcal)
            .collect();

        let mean = (&tail).mean();
        if !(mean > 0.0) {
            warn!(mean, "degenerate estimate history, falling back to formula");
            return None;
        }
        let sd = if tail.len() > 1 { (&tail).std_dev() } else { 0.0 };
        let cv = sd / mean;
        if !cv.is_finite() {
            warn!("non-finite variance in estimate history");
            return None;
        }
        Some(cv)
    }

    /// Confidence score in [0, 100]: monotone in observation count, inverse
    /// in the rolling coefficient of variation.
    fn score(&self, data_points: u32, cv: f64) -> u8 {
        let data_factor = (data_points as f64 / self.config.stable_data_points as f64).min(1.0);
        let variance_factor = 1.0 / (1.0 + 8.0 * cv.max(0.0));
        (100.0 * data_factor * variance_factor).round().clamp(0.0, 100.0) as u8
    }

    fn tier(&self, data_points: u32, cv: f64) -> ConfidenceTier {
        if data_points < self.config.min_data_points || cv > self.config.high_cv_bound {
            ConfidenceTier::Unstable
        } else if data_points >= self.config.stable_data_points && cv <= self.config.low_cv_bound {
            ConfidenceTier::Stable
        } else {
            ConfidenceTier::Stabilizing
        }
    }
}

/// Exponentially smooth daily weights across the observed span, carrying the
/// running value forward through gaps.
fn smooth_weights(weights: &BTreeMap<NaiveDate, f64>, alpha: f64) -> BTreeMap<NaiveDate, f64> {
    let mut smoothed = BTreeMap::new();
    let (Some((&first, &first_kg)), Some((&last, _))) =
        (weights.iter().next(), weights.iter().next_back())
    else {
        return smoothed;
    };

    let mut ema = first_kg;
    let mut day = first;
    while day <= last {
        if let Some(&kg) = weights.get(&day) {
            ema = alpha * kg + (1.0 - alpha) * ema;
        }
        smoothed.insert(day, ema);
        day += Duration::days(1);
    }
    smoothed
}
