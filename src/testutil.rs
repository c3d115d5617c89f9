//! Shared fixtures for the inline test modules.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::analysis::{Ingredient, MacroBreakdown, NutritionAnalysis};
use crate::codec::EncodedImage;
use crate::inference::{AttemptError, InferenceClient};

pub(crate) fn sample_analysis() -> NutritionAnalysis {
    NutritionAnalysis {
        plate_name: "Bowl de frango com legumes".into(),
        total_calories: 540.0,
        macros: MacroBreakdown {
            protein: 42.0,
            carbs: 55.0,
            fats: 14.0,
        },
        ingredients: vec![
            Ingredient {
                name: "Peito de frango grelhado".into(),
                weight_grams: 150.0,
                household_measure: "1 filé médio".into(),
            },
            Ingredient {
                name: "Arroz integral".into(),
                weight_grams: 100.0,
                household_measure: "4 colheres de sopa".into(),
            },
        ],
        positive_points: vec![
            "Boa fonte de proteína magra".into(),
            "Carboidrato complexo presente".into(),
        ],
        attention_points: vec!["Atenção ao sódio do tempero pronto".into()],
        improvement_suggestion: "Adicione uma porção de folhas verdes".into(),
    }
}

/// The sample analysis as the raw wire text a conforming service would return.
pub(crate) fn valid_raw() -> String {
    serde_json::to_string(&sample_analysis()).unwrap()
}

/// Inference client that replays a fixed script of attempt outcomes and
/// records which credential each call used.
pub(crate) struct ScriptedClient {
    script: Mutex<VecDeque<Result<String, AttemptError>>>,
    used: Mutex<Vec<String>>,
}

impl ScriptedClient {
    pub(crate) fn new(script: Vec<Result<String, AttemptError>>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            used: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn calls(&self) -> usize {
        self.used.lock().unwrap().len()
    }

    pub(crate) fn credentials_used(&self) -> Vec<String> {
        self.used.lock().unwrap().clone()
    }
}

#[async_trait]
impl InferenceClient for ScriptedClient {
    async fn generate(
        &self,
        credential: &str,
        _image: &EncodedImage,
    ) -> Result<String, AttemptError> {
        self.used.lock().unwrap().push(credential.to_string());
        self.script
            .lock()
            .unwrap()
            .pop_front()
            .expect("scripted client ran out of responses")
    }
}
