//! Adaptive metabolic estimation and body-composition projection engine.
//!
//! Converts noisy daily weight and calorie logs into a personalized,
//! confidence-scored TDEE estimate, projects future weight under an assumed
//! calorie target with growing uncertainty, and partitions predicted change
//! into fat versus lean components through a bounded multi-factor P-ratio
//! model, producing pessimistic/expected/optimistic trajectories.
//!
//! The engine is pure: no I/O, no ambient state, identical inputs give
//! identical outputs. Insufficient data is a representable outcome (gated
//! confidence tiers, formula fallback, `None` fields), never an error.

pub mod composition;
pub mod engine;
pub mod error;
pub mod formula;
pub mod models;
pub mod pratio;
pub mod prediction;
pub mod quality;
pub mod tdee;

// Re-export commonly used types for convenience
pub use composition::{
    BodyCompProjection, BranchValues, CompositionConfig, CompositionProjector,
    ProjectionConfidence,
};
pub use engine::{EngineConfig, EngineInput, EngineOutput, MetabolicEngine};
pub use error::{EngineError, Result};
pub use formula::{FormulaEstimate, FormulaEstimator};
pub use models::{
    ActivityLevel, BiologicalSex, DexaSample, NutritionLogEntry, TrainingAge, UserProfile,
    WeightLogEntry, WeightUnit, KCAL_PER_KG,
};
pub use pratio::{
    personal_history_from_dexa, MassChangeDirection, PRatioConfig, PRatioInputs, PRatioModel,
    PRatioResult,
};
pub use prediction::{PredictionConfig, WeightPrediction, WeightPredictor};
pub use quality::{DataQualityCheck, QualityConfig, QualityValidator};
pub use tdee::{
    AdaptiveTdeeEstimator, BurnRatePoint, ConfidenceTier, EstimateSource, TdeeConfig, TdeeEstimate,
};
