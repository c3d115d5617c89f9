use serde::{Deserialize, Serialize};

/// One identified food component on the plate.
///
/// `household_measure` is a human-scale description ("1 colher de sopa") and
/// is not cross-validated against `weight_grams`; both come from the same
/// inference call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Ingredient {
    pub name: String,
    pub weight_grams: f64,
    pub household_measure: String,
}

/// Macronutrients in grams.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MacroBreakdown {
    pub protein: f64,
    pub carbs: f64,
    pub fats: f64,
}

/// The unit of both display and persistence. Immutable once produced.
///
/// Field names follow the inference service's wire format (camelCase); the
/// same shape is sent to the service as a structured-output schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NutritionAnalysis {
    pub plate_name: String,
    pub total_calories: f64,
    pub macros: MacroBreakdown,
    pub ingredients: Vec<Ingredient>,
    pub positive_points: Vec<String>,
    pub attention_points: Vec<String>,
    pub improvement_suggestion: String,
}

impl NutritionAnalysis {
    /// Semantic validation beyond what serde enforces structurally.
    ///
    /// An analysis that fails here must not be surfaced to the user or saved.
    pub fn validate(&self) -> anyhow::Result<()> {
        anyhow::ensure!(!self.plate_name.trim().is_empty(), "plateName is empty");
        anyhow::ensure!(
            self.total_calories >= 0.0 && self.total_calories.is_finite(),
            "totalCalories must be a non-negative number"
        );
        for (label, value) in [
            ("protein", self.macros.protein),
            ("carbs", self.macros.carbs),
            ("fats", self.macros.fats),
        ] {
            anyhow::ensure!(
                value >= 0.0 && value.is_finite(),
                "macros.{label} must be a non-negative number"
            );
        }
        for ing in &self.ingredients {
            anyhow::ensure!(!ing.name.trim().is_empty(), "ingredient name is empty");
            anyhow::ensure!(
                ing.weight_grams > 0.0 && ing.weight_grams.is_finite(),
                "ingredient '{}' has non-positive weightGrams",
                ing.name
            );
        }
        Ok(())
    }
}
