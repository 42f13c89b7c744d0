//! Engine orchestration: wires the validator, estimators, predictor,
//! partition model, and projector into a single computation.
//!
//! The engine is a pure computation layer: given dated observations and a
//! profile it returns structured numeric results, holds nothing between
//! calls, and performs no I/O. Identical inputs produce identical outputs,
//! so callers are free to memoize by content hash.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::composition::{BodyCompProjection, CompositionConfig, CompositionProjector};
use crate::error::Result;
use crate::formula::FormulaEstimator;
use crate::models::{DexaSample, NutritionLogEntry, UserProfile, WeightLogEntry};
use crate::pratio::{PRatioConfig, PRatioInputs, PRatioModel};
use crate::prediction::{PredictionConfig, WeightPredictor, WeightPrediction};
use crate::quality::{DataQualityCheck, QualityConfig, QualityValidator};
use crate::tdee::{AdaptiveTdeeEstimator, TdeeConfig, TdeeEstimate};

/// Combined configuration for one engine instance
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct EngineConfig {
    pub quality: QualityConfig,
    pub tdee: TdeeConfig,
    pub prediction: PredictionConfig,
    pub pratio: PRatioConfig,
    pub composition: CompositionConfig,
}

/// Everything the engine needs for one computation, fetched by the caller
/// from the persistence layer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineInput {
    /// Dated weight log, read-only
    pub weight_logs: Vec<WeightLogEntry>,

    /// Dated nutrition log, read-only
    pub nutrition_logs: Vec<NutritionLogEntry>,

    /// Optional body-composition scans for personal calibration
    pub dexa_samples: Vec<DexaSample>,

    /// User profile
    pub profile: UserProfile,

    /// Assumed future daily calorie target
    pub target_daily_calories: f64,

    /// Horizons to project, in days from the most recent weight entry
    pub horizons_days: Vec<u32>,
}

/// Plain serializable results for the presentation layer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineOutput {
    /// Quality report over the input logs
    pub quality: DataQualityCheck,

    /// Active TDEE estimate (regression when possible, formula fallback
    /// otherwise), or `None` when neither can be formed
    pub tdee: Option<TdeeEstimate>,

    /// One prediction per requested horizon; empty without an estimate
    pub predictions: Vec<WeightPrediction>,

    /// One projection slot per requested horizon; `None` where height or
    /// body-fat data is missing
    pub projections: Vec<Option<BodyCompProjection>>,
}

/// The adaptive metabolic estimation and body-composition projection engine
#[derive(Debug, Clone, Default)]
pub struct MetabolicEngine {
    validator: QualityValidator,
    estimator: AdaptiveTdeeEstimator,
    formula: FormulaEstimator,
    predictor: WeightPredictor,
    pratio: PRatioModel,
    projector: CompositionProjector,
}

impl MetabolicEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build an engine from a combined configuration, rejecting invalid
    /// threshold combinations.
    pub fn with_config(config: EngineConfig) -> Result<Self> {
        Ok(MetabolicEngine {
            validator: QualityValidator::with_config(config.quality),
            estimator: AdaptiveTdeeEstimator::with_config(config.tdee)?,
            formula: FormulaEstimator::new(),
            predictor: WeightPredictor::with_config(config.prediction),
            pratio: PRatioModel::with_config(config.pratio),
            projector: CompositionProjector::with_config(config.composition),
        })
    }

    /// Run the full computation over one user's fetched logs.
    ///
    /// Partial results are preferred over all-or-nothing failure: a missing
    /// profile field nulls only the outputs that need it.
    pub fn run(&self, input: &EngineInput) -> EngineOutput {
        let quality = self
            .validator
            .validate(&input.weight_logs, &input.nutrition_logs);

        let current = input
            .weight_logs
            .iter()
            .max_by_key(|w| w.date)
            .map(|w| (w.date, w.weight_kg()));

        let Some((as_of, current_weight_kg)) = current else {
            debug!("no weight entries, returning quality report only");
            return EngineOutput {
                quality,
                tdee: None,
                predictions: Vec::new(),
                projections: input.horizons_days.iter().map(|_| None).collect(),
            };
        };

        let regression =
            self.estimator
                .estimate(&input.weight_logs, &input.nutrition_logs, &quality);
        let data_points_used = regression
            .as_ref()
            .map(|e| e.data_points_used)
            .unwrap_or(quality.paired_days);

        let tdee = regression.or_else(|| {
            debug!("regression unavailable, trying formula fallback");
            self.formula
                .estimate(&input.profile, current_weight_kg)
                .map(|f| TdeeEstimate::from_formula(&f, current_weight_kg, data_points_used))
        });

        let Some(tdee) = tdee else {
            debug!("no estimate available from regression or formula");
            return EngineOutput {
                quality,
                tdee: None,
                predictions: Vec::new(),
                projections: input.horizons_days.iter().map(|_| None).collect(),
            };
        };

        let predictions: Vec<WeightPrediction> = input
            .horizons_days
            .iter()
            .map(|&days| {
                self.predictor.predict(
                    current_weight_kg,
                    &tdee,
                    input.target_daily_calories,
                    days,
                    as_of,
                )
            })
            .collect();

        let p_ratio = PRatioInputs::from_logs(
            &input.nutrition_logs,
            &input.dexa_samples,
            &input.profile,
            &tdee,
            current_weight_kg,
            input.target_daily_calories,
        )
        .map(|inputs| self.pratio.estimate(&inputs));

        let current_body_fat_pct = input
            .dexa_samples
            .iter()
            .max_by_key(|s| s.date)
            .map(|s| s.body_fat_pct)
            .or(input.profile.body_fat_pct);

        let projections: Vec<Option<BodyCompProjection>> = predictions
            .iter()
            .map(|prediction| {
                let ratio = p_ratio.as_ref()?;
                self.projector.project(
                    prediction,
                    ratio,
                    current_weight_kg,
                    current_body_fat_pct?,
                    input.profile.height_cm,
                )
            })
            .collect();

        EngineOutput {
            quality,
            tdee: Some(tdee),
            predictions,
            projections,
        }
    }
}
