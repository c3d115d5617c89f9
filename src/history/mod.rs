mod supabase;

pub use supabase::SupabaseHistory;

use async_trait::async_trait;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::analysis::NutritionAnalysis;

/// A past analysis as the remote store returns it. Read-only from the
/// core's perspective.
#[derive(Debug, Clone, PartialEq)]
pub struct HistoryRecord {
    pub id: Uuid,
    pub user_name: String,
    pub created_at: OffsetDateTime,
    /// Reference to the originally-saved image, when the store kept one.
    pub image_url: Option<String>,
    pub analysis: NutritionAnalysis,
}

/// Append-only remote store of past analyses keyed by user name.
///
/// Every error coming out of here is a persistence failure: callers log it
/// and move on, it never blocks or alters what is on screen.
#[async_trait]
pub trait HistoryStore: Send + Sync {
    async fn insert(
        &self,
        user_name: &str,
        analysis: &NutritionAnalysis,
        image_url: Option<&str>,
    ) -> anyhow::Result<()>;

    /// Full history for a user, newest first.
    async fn query_by_user(&self, user_name: &str) -> anyhow::Result<Vec<HistoryRecord>>;
}
