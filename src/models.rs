use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Energy density of a kilogram of body mass change, in kcal.
///
/// Body mass change is mostly adipose tissue plus some water and lean mass;
/// 7700 kcal/kg is the conventional value for fat-dominant change
/// (equivalent to roughly 3500 kcal/lb).
pub const KCAL_PER_KG: f64 = 7700.0;

/// Pounds per kilogram.
const LB_PER_KG: f64 = 2.2046226218;

/// Weight units accepted at the input boundary.
///
/// The engine normalizes to kilograms on ingestion and computes in kilograms
/// throughout; callers convert back for presentation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WeightUnit {
    Kilograms,
    Pounds,
}

impl WeightUnit {
    /// Convert a value in this unit to kilograms.
    pub fn to_kg(&self, value: f64) -> f64 {
        match self {
            WeightUnit::Kilograms => value,
            WeightUnit::Pounds => value / LB_PER_KG,
        }
    }

    /// Convert a value in kilograms to this unit.
    pub fn from_kg(&self, kg: f64) -> f64 {
        match self {
            WeightUnit::Kilograms => kg,
            WeightUnit::Pounds => kg * LB_PER_KG,
        }
    }
}

/// A single dated bodyweight measurement from the logging subsystem.
///
/// Dates are unique per user and ascending when sorted; the engine treats
/// the log as read-only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeightLogEntry {
    /// Date of the measurement
    pub date: NaiveDate,

    /// Measured weight in `unit`
    pub weight: f64,

    /// Unit the weight was recorded in
    pub unit: WeightUnit,
}

impl WeightLogEntry {
    /// Weight normalized to kilograms.
    pub fn weight_kg(&self) -> f64 {
        self.unit.to_kg(self.weight)
    }
}

/// A single dated daily nutrition summary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NutritionLogEntry {
    /// Date the intake was logged for
    pub date: NaiveDate,

    /// Total calories consumed (kcal)
    pub calories_consumed: f64,

    /// Protein consumed (g)
    pub protein_g: f64,

    /// Carbohydrates consumed (g)
    pub carbs_g: f64,

    /// Fat consumed (g)
    pub fat_g: f64,
}

/// A body-composition scan used as ground truth for personal calibration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DexaSample {
    /// Date of the scan
    pub date: NaiveDate,

    /// Measured body fat percentage
    pub body_fat_pct: f64,

    /// Measured lean (fat-free) mass in kg
    pub lean_mass_kg: f64,

    /// Measured fat mass in kg
    pub fat_mass_kg: f64,
}

/// Biological sex, used by the metabolic-rate formula and the partition model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BiologicalSex {
    Male,
    Female,
}

/// Resistance-training experience categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TrainingAge {
    Beginner,
    Intermediate,
    Advanced,
}

/// Habitual activity level outside of logged exercise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ActivityLevel {
    Sedentary,
    LightlyActive,
    ModeratelyActive,
    VeryActive,
    ExtremelyActive,
}

impl ActivityLevel {
    /// Multiplier applied to basal metabolic rate to approximate TDEE.
    pub fn multiplier(&self) -> f64 {
        match self {
            ActivityLevel::Sedentary => 1.2,
            ActivityLevel::LightlyActive => 1.375,
            ActivityLevel::ModeratelyActive => 1.55,
            ActivityLevel::VeryActive => 1.725,
            ActivityLevel::ExtremelyActive => 1.9,
        }
    }
}

/// User profile supplied by the persistence layer.
///
/// Fields needed only for specific outputs are optional; a missing field
/// nulls that output rather than failing the whole computation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    /// Height in cm, required for the formula estimator and FFMI
    pub height_cm: Option<f64>,

    /// Age in years, required for the formula estimator
    pub age_years: Option<f64>,

    /// Biological sex, required for the formula estimator
    pub sex: Option<BiologicalSex>,

    /// Habitual activity level
    pub activity_level: ActivityLevel,

    /// Resistance-training experience
    pub training_age: TrainingAge,

    /// Whether the user is using anabolic compounds
    pub is_enhanced: bool,

    /// Average hard resistance-training sets per week
    pub avg_weekly_training_sets: f64,

    /// Self-reported or estimated body fat percentage, used when no
    /// DEXA sample is available
    pub body_fat_pct: Option<f64>,

    /// Goal bodyweight in kg, informational for callers
    pub target_weight_kg: Option<f64>,
}
