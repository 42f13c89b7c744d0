//! Data quality validation for daily weight and nutrition logs.
//!
//! Runs ahead of everything else: the adaptive estimator uses the report to
//! gate its confidence and exclude outlier days, and callers surface the
//! issue/suggestion pairs as user-facing hints. Implausible entries are
//! flagged and excluded, never treated as fatal errors.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

use crate::models::{NutritionLogEntry, WeightLogEntry};

/// Quality validation thresholds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualityConfig {
    /// Most recent days of logs considered (older entries are ignored)
    pub lookback_days: u32,

    /// Consecutive missing weight days tolerated before a gap is reported
    pub max_gap_days: u32,

    /// Single-day weight change, as a percentage of bodyweight, beyond
    /// which the day is flagged as an outlier
    pub outlier_delta_pct: f64,

    /// Minimum paired weight+calorie days for the logs to be considered
    /// sufficient for adaptive estimation
    pub min_paired_days: u32,
}

impl Default for QualityConfig {
    fn default() -> Self {
        QualityConfig {
            lookback_days: 90,
            max_gap_days: 2,
            outlier_delta_pct: 2.0,
            min_paired_days: 14,
        }
    }
}

/// Quality report for one computation over one user's logs.
///
/// Constructed fresh per computation and never mutated afterwards.
/// `issues` and `suggestions` are index-aligned.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataQualityCheck {
    /// Distinct days with at least one log entry (weight or nutrition)
    pub days_with_data: u32,

    /// Days with both a weight and a calorie entry; the effective sample
    /// size available to the adaptive estimator
    pub paired_days: u32,

    /// Human-readable descriptions of detected problems
    pub issues: Vec<String>,

    /// One actionable suggestion per issue, index-aligned
    pub suggestions: Vec<String>,

    /// Dates whose weight entries were flagged as implausible; the
    /// adaptive estimator excludes these from regression input
    pub outlier_dates: Vec<NaiveDate>,
}

impl DataQualityCheck {
    /// Whether enough paired days exist for adaptive estimation.
    pub fn is_sufficient(&self, min_paired_days: u32) -> bool {
        self.paired_days >= min_paired_days
    }
}

/// Validator over raw daily logs
#[derive(Debug, Clone, Default)]
pub struct QualityValidator {
    config: QualityConfig,
}

impl QualityValidator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: QualityConfig) -> Self {
        QualityValidator { config }
    }

    /// Inspect the logs and produce a quality report.
    ///
    /// Pure function of its inputs: detects logging gaps, implausible
    /// single-day weight swings, unpaired days, and insufficient data.
    pub fn validate(
        &self,
        weight_logs: &[WeightLogEntry],
        nutrition_logs: &[NutritionLogEntry],
    ) -> DataQualityCheck {
        let weights = weight_map(weight_logs, self.config.lookback_days);
        let calories: BTreeMap<NaiveDate, f64> = {
            let cutoff = cutoff_date(
                nutrition_logs.iter().map(|n| n.date),
                self.config.lookback_days,
            );
            nutrition_logs
                .iter()
                .filter(|n| cutoff.map_or(true, |c| n.date >= c))
                .map(|n| (n.date, n.calories_consumed))
                .collect()
        };

        let mut issues = Vec::new();
        let mut suggestions = Vec::new();

        let outlier_dates = detect_outliers(&weights, self.config.outlier_delta_pct);
        if !outlier_dates.is_empty() {
            debug!(count = outlier_dates.len(), "flagged outlier weight days");
            issues.push(format!(
                "{} weight entr{} changed by more than {:.1}% of bodyweight in a single day",
                outlier_dates.len(),
                if outlier_dates.len() == 1 { "y" } else { "ies" },
                self.config.outlier_delta_pct
            ));
            suggestions.push(
                "Weigh in under consistent conditions (same time of day, same scale); \
                 implausible readings are excluded from the estimate"
                    .to_string(),
            );
        }

        if let Some((gap_days, gap_start)) = longest_gap(&weights) {
            if gap_days > self.config.max_gap_days {
                issues.push(format!(
                    "No weight entries for {} consecutive days starting {}",
                    gap_days, gap_start
                ));
                suggestions.push(
                    "Log your weight daily; gaps longer than a couple of days slow down \
                     estimate convergence"
                        .to_string(),
                );
            }
        }

        let weight_only = weights.keys().filter(|d| !calories.contains_key(d)).count();
        let calorie_only = calories.keys().filter(|d| !weights.contains_key(d)).count();
        if weight_only > 0 || calorie_only > 0 {
            issues.push(format!(
                "{} day(s) have a weight but no calorie log, {} day(s) the reverse",
                weight_only, calorie_only
            ));
            suggestions.push(
                "Log both weight and calories on the same days; only paired days \
                 feed the adaptive estimate"
                    .to_string(),
            );
        }

        let paired_days = weights.keys().filter(|d| calories.contains_key(d)).count() as u32;
        if paired_days < self.config.min_paired_days {
            issues.push(format!(
                "Only {} paired day(s) logged; at least {} are needed for a \
                 personalized estimate",
                paired_days, self.config.min_paired_days
            ));
            suggestions.push(
                "Keep logging consistently; a formula-based estimate is used until \
                 enough paired days accumulate"
                    .to_string(),
            );
        }

        let days_with_data = weights
            .keys()
            .chain(calories.keys())
            .collect::<std::collections::BTreeSet<_>>()
            .len() as u32;

        DataQualityCheck {
            days_with_data,
            paired_days,
            issues,
            suggestions,
            outlier_dates,
        }
    }
}

/// Build a date -> kg map restricted to the lookback window, keeping the
/// last entry when a date repeats.
fn weight_map(weight_logs: &[WeightLogEntry], lookback_days: u32) -> BTreeMap<NaiveDate, f64> {
    let cutoff = cutoff_date(weight_logs.iter().map(|w| w.date), lookback_days);
    weight_logs
        .iter()
        .filter(|w| cutoff.map_or(true, |c| w.date >= c))
        .map(|w| (w.date, w.weight_kg()))
        .collect()
}

/// Window start relative to the most recent entry, or None for empty logs.
fn cutoff_date(dates: impl Iterator<Item = NaiveDate>, lookback_days: u32) -> Option<NaiveDate> {
    dates
        .max()
        .map(|latest| latest - chrono::Duration::days(lookback_days as i64))
}

/// Flag dates whose weight moved implausibly fast relative to the previous
/// entry. The change is normalized per elapsed day so a plausible drift
/// across a gap is not penalized.
fn detect_outliers(weights: &BTreeMap<NaiveDate, f64>, delta_pct: f64) -> Vec<NaiveDate> {
    let mut outliers = Vec::new();
    let mut prev: Option<(NaiveDate, f64)> = None;

    for (&date, &kg) in weights {
        if let Some((prev_date, prev_kg)) = prev {
            let elapsed = (date - prev_date).num_days().max(1) as f64;
            let per_day_pct = ((kg - prev_kg) / prev_kg).abs() * 100.0 / elapsed;
            if per_day_pct > delta_pct {
                outliers.push(date);
                // Keep the previous anchor so one bad reading does not
                // cascade into flagging its neighbors.
                continue;
            }
        }
        prev = Some((date, kg));
    }

    outliers
}

/// Longest run of consecutive missing days between weight entries,
/// with the first missing date.
fn longest_gap(weights: &BTreeMap<NaiveDate, f64>) -> Option<(u32, NaiveDate)> {
    let mut longest: Option<(u32, NaiveDate)> = None;
    let mut prev: Option<NaiveDate> = None;

    for &date in weights.keys() {
        if let Some(prev_date) = prev {
            let missing = ((date - prev_date).num_days() - 1).max(0) as u32;
            if missing > 0 && longest.map_or(true, |(best, _)| missing > best) {
                longest = Some((missing, prev_date + chrono::Duration::days(1)));
            }
        }
        prev = Some(date);
    }

    longest
}
