use serde_json::{json, Value};

use crate::analysis::NutritionAnalysis;
use crate::inference::AttemptError;

/// Fixed instruction sent with every attempt. The service is told to answer
/// in Brazilian Portuguese and to emit nothing but the JSON object described
/// by [`response_schema`].
pub const INSTRUCTION: &str = "\
Analise esta imagem de comida e forneça um relatório nutricional detalhado em PORTUGUÊS (Brasil).
O retorno deve ser APENAS um JSON válido.

A análise deve ser realista com base nas porções visíveis.
Campos necessários:
- plateName: Nome criativo do prato.
- totalCalories: Estimativa total de calorias (número).
- macros: Objeto com protein (proteína), carbs (carboidratos) e fats (gorduras) em gramas.
- ingredients: Lista de componentes com name, weightGrams (número) e householdMeasure (medida caseira como \"1 colher de sopa\", \"1 concha média\", etc).
- positivePoints: Pontos fortes nutricionais (mínimo 2).
- attentionPoints: Pontos de atenção como excesso de sódio, baixo teor de fibras, etc.
- improvementSuggestion: Uma sugestão prática e específica para tornar esta refeição melhor.";

/// Structured-output schema constraining the service to the
/// [`NutritionAnalysis`] shape. First line of defense only; the reply is
/// still decoded and validated independently.
pub fn response_schema() -> Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "plateName": { "type": "STRING" },
            "totalCalories": { "type": "NUMBER" },
            "macros": {
                "type": "OBJECT",
                "properties": {
                    "protein": { "type": "NUMBER" },
                    "carbs": { "type": "NUMBER" },
                    "fats": { "type": "NUMBER" }
                },
                "required": ["protein", "carbs", "fats"]
            },
            "ingredients": {
                "type": "ARRAY",
                "items": {
                    "type": "OBJECT",
                    "properties": {
                        "name": { "type": "STRING" },
                        "weightGrams": { "type": "NUMBER" },
                        "householdMeasure": { "type": "STRING" }
                    },
                    "required": ["name", "weightGrams", "householdMeasure"]
                }
            },
            "positivePoints": { "type": "ARRAY", "items": { "type": "STRING" } },
            "attentionPoints": { "type": "ARRAY", "items": { "type": "STRING" } },
            "improvementSuggestion": { "type": "STRING" }
        },
        "required": [
            "plateName", "totalCalories", "macros", "ingredients",
            "positivePoints", "attentionPoints", "improvementSuggestion"
        ]
    })
}

/// Decode a raw service reply into a validated analysis.
///
/// Empty or non-JSON replies are transient (the service glitched); a JSON
/// reply that fails the shape or the semantic checks is a schema violation.
/// Both retry the same way.
pub fn decode_analysis(raw: &str) -> Result<NutritionAnalysis, AttemptError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(AttemptError::Transient("empty response from service".into()));
    }
    let value: Value = serde_json::from_str(trimmed)
        .map_err(|e| AttemptError::Transient(format!("malformed response: {e}")))?;
    let analysis: NutritionAnalysis = serde_json::from_value(value)
        .map_err(|e| AttemptError::Schema(format!("response shape mismatch: {e}")))?;
    analysis
        .validate()
        .map_err(|e| AttemptError::Schema(format!("semantically invalid analysis: {e}")))?;
    Ok(analysis)
}

#[cfg(test)]
mod schema_tests {
    use super::*;

    fn valid_raw() -> String {
        serde_json::to_string(&crate::testutil::sample_analysis()).unwrap()
    }

    #[test]
    fn decodes_a_conforming_reply() {
        let analysis = decode_analysis(&valid_raw()).unwrap();
        assert_eq!(analysis, crate::testutil::sample_analysis());
    }

    #[test]
    fn empty_reply_is_transient() {
        assert!(matches!(
            decode_analysis("   "),
            Err(AttemptError::Transient(_))
        ));
    }

    #[test]
    fn non_json_reply_is_transient() {
        assert!(matches!(
            decode_analysis("sorry, I cannot help"),
            Err(AttemptError::Transient(_))
        ));
    }

    #[test]
    fn missing_field_is_schema_violation() {
        let mut value: serde_json::Value = serde_json::from_str(&valid_raw()).unwrap();
        value.as_object_mut().unwrap().remove("macros");
        let raw = value.to_string();
        assert!(matches!(
            decode_analysis(&raw),
            Err(AttemptError::Schema(_))
        ));
    }

    #[test]
    fn wrong_type_is_schema_violation() {
        let mut value: serde_json::Value = serde_json::from_str(&valid_raw()).unwrap();
        value["totalCalories"] = serde_json::json!("quinhentas");
        let raw = value.to_string();
        assert!(matches!(
            decode_analysis(&raw),
            Err(AttemptError::Schema(_))
        ));
    }

    #[test]
    fn semantic_violation_is_schema_violation() {
        let mut value: serde_json::Value = serde_json::from_str(&valid_raw()).unwrap();
        value["totalCalories"] = serde_json::json!(-5);
        let raw = value.to_string();
        assert!(matches!(
            decode_analysis(&raw),
            Err(AttemptError::Schema(_))
        ));
    }

    #[test]
    fn schema_requires_every_analysis_field() {
        let schema = response_schema();
        let required: Vec<&str> = schema["required"]
            .as_array()
            .unwrap()
            .iter()
            .map(|v| v.as_str().unwrap())
            .collect();
        for field in [
            "plateName",
            "totalCalories",
            "macros",
            "ingredients",
            "positivePoints",
            "attentionPoints",
            "improvementSuggestion",
        ] {
            assert!(required.contains(&field), "{field} must be required");
        }
    }
}
