use anyhow::Context;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use tracing::debug;
use uuid::Uuid;

use crate::analysis::{Ingredient, MacroBreakdown, NutritionAnalysis};
use crate::history::{HistoryRecord, HistoryStore};

const TABLE: &str = "nutrition_history";

/// History store backed by a Supabase PostgREST endpoint.
#[derive(Clone)]
pub struct SupabaseHistory {
    http: reqwest::Client,
    base_url: String,
    anon_key: String,
}

impl SupabaseHistory {
    pub fn new(base_url: &str, anon_key: &str) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            anon_key: anon_key.to_string(),
        }
    }

    fn table_url(&self) -> String {
        format!("{}/rest/v1/{}", self.base_url, TABLE)
    }
}

/// Quote a PostgREST filter operand when it contains characters the filter
/// grammar reserves. `eq.Ana, a` would otherwise be parsed as a list; inside
/// double quotes only `"` and `\` need escaping.
fn quote_filter_value(value: &str) -> String {
    let reserved = |c: char| matches!(c, ',' | '.' | ':' | '(' | ')' | '"' | '\\' | ' ');
    if value.is_empty() || value.chars().any(reserved) {
        let escaped = value.replace('\\', "\\\\").replace('"', "\\\"");
        format!("\"{escaped}\"")
    } else {
        value.to_string()
    }
}

/// Wire row for the `nutrition_history` table. Columns are snake_case; the
/// JSON columns (`macros`, `ingredients`) keep the analysis wire format.
#[derive(Debug, Serialize, Deserialize)]
struct HistoryRow {
    #[serde(default, skip_serializing)]
    id: Option<Uuid>,
    user_name: String,
    plate_name: String,
    total_calories: f64,
    macros: MacroBreakdown,
    ingredients: Vec<Ingredient>,
    positive_points: Vec<String>,
    attention_points: Vec<String>,
    improvement_suggestion: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    image_url: Option<String>,
    #[serde(
        default,
        skip_serializing,
        with = "time::serde::rfc3339::option"
    )]
    created_at: Option<OffsetDateTime>,
}

impl HistoryRow {
    fn from_analysis(
        user_name: &str,
        analysis: &NutritionAnalysis,
        image_url: Option<&str>,
    ) -> Self {
        Self {
            id: None,
            user_name: user_name.to_string(),
            plate_name: analysis.plate_name.clone(),
            total_calories: analysis.total_calories,
            macros: analysis.macros.clone(),
            ingredients: analysis.ingredients.clone(),
            positive_points: analysis.positive_points.clone(),
            attention_points: analysis.attention_points.clone(),
            improvement_suggestion: analysis.improvement_suggestion.clone(),
            image_url: image_url.map(str::to_string),
            created_at: None,
        }
    }

    fn into_record(self) -> HistoryRecord {
        HistoryRecord {
            id: self.id.unwrap_or_else(Uuid::new_v4),
            user_name: self.user_name,
            created_at: self.created_at.unwrap_or(OffsetDateTime::UNIX_EPOCH),
            image_url: self.image_url,
            analysis: NutritionAnalysis {
                plate_name: self.plate_name,
                total_calories: self.total_calories,
                macros: self.macros,
                ingredients: self.ingredients,
                positive_points: self.positive_points,
                attention_points: self.attention_points,
                improvement_suggestion: self.improvement_suggestion,
            },
        }
    }
}

#[async_trait]
impl HistoryStore for SupabaseHistory {
    async fn insert(
        &self,
        user_name: &str,
        analysis: &NutritionAnalysis,
        image_url: Option<&str>,
    ) -> anyhow::Result<()> {
        let row = HistoryRow::from_analysis(user_name, analysis, image_url);
        let response = self
            .http
            .post(self.table_url())
            .header("apikey", &self.anon_key)
            .bearer_auth(&self.anon_key)
            .header("Prefer", "return=minimal")
            .json(&row)
            .send()
            .await
            .context("history insert request")?;

        let status = response.status();
        anyhow::ensure!(
            status.is_success(),
            "history insert rejected: HTTP {status}"
        );
        debug!(user = %user_name, plate = %analysis.plate_name, "history record saved");
        Ok(())
    }

    async fn query_by_user(&self, user_name: &str) -> anyhow::Result<Vec<HistoryRecord>> {
        let response = self
            .http
            .get(self.table_url())
            .header("apikey", &self.anon_key)
            .bearer_auth(&self.anon_key)
            .query(&[
                ("user_name", format!("eq.{}", quote_filter_value(user_name))),
                ("select", "*".to_string()),
                ("order", "created_at.desc".to_string()),
            ])
            .send()
            .await
            .context("history query request")?;

        let status = response.status();
        anyhow::ensure!(status.is_success(), "history query rejected: HTTP {status}");

        let rows: Vec<HistoryRow> = response
            .json()
            .await
            .context("decode history rows")?;
        debug!(user = %user_name, count = rows.len(), "history fetched");
        Ok(rows.into_iter().map(HistoryRow::into_record).collect())
    }
}
