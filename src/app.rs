use std::sync::Arc;
use std::time::Duration;

use crate::config::AppConfig;
use crate::history::SupabaseHistory;
use crate::inference::{CredentialPool, GeminiClient, Orchestrator, RetryPolicy};
use crate::session::{AnalysisTicket, FileIdentityStore, SessionController};

/// Wired application: the controller plus the orchestrator the driver feeds
/// analysis tickets to.
pub struct App {
    pub controller: SessionController,
    pub orchestrator: Orchestrator,
}

pub fn build(config: &AppConfig) -> App {
    let pool = CredentialPool::from_slots(&config.inference.api_keys);
    if pool.is_empty() {
        tracing::warn!("no inference credentials configured; analyses will fail fast");
    } else {
        tracing::info!(credentials = pool.len(), "credential pool ready");
    }

    let client = Arc::new(GeminiClient::new(&config.inference.model));
    let policy = RetryPolicy {
        max_attempts_per_credential: config.inference.max_attempts_per_credential,
        base_delay: Duration::from_secs(config.inference.base_delay_secs),
    };
    let orchestrator = Orchestrator::new(client, pool, policy);

    let identity = Arc::new(FileIdentityStore::new(&config.identity_file));
    let history = Arc::new(SupabaseHistory::new(
        &config.history.supabase_url,
        &config.history.supabase_anon_key,
    ));
    let controller = SessionController::new(identity, history);

    App {
        controller,
        orchestrator,
    }
}

/// Drive one started analysis to its terminal outcome, feeding scheduled
/// progress ticks to the controller while the orchestrator works. The ticket
/// hands its image back to the orchestrator; the ticket itself stays whole so
/// the outcome can be applied against its generation afterwards.
pub async fn drive_analysis(
    controller: &mut SessionController,
    orchestrator: &Orchestrator,
    ticket: AnalysisTicket,
    tick_every: Duration,
) {
    let image = ticket.image.clone();
    let analyze = orchestrator.analyze(&image);
    tokio::pin!(analyze);

    let mut ticker = tokio::time::interval(tick_every);
    ticker.tick().await; // first tick completes immediately
    let outcome = loop {
        tokio::select! {
            outcome = &mut analyze => break outcome,
            _ = ticker.tick() => {
                controller.tick();
                if let Some(phrase) = controller.progress_phrase() {
                    tracing::info!(%phrase, "analyzing");
                }
            }
        }
    };
    controller.complete_analysis(ticket, outcome);
}

#[cfg(test)]
mod app_tests {
    use std::sync::Mutex;

    use async_trait::async_trait;

    use super::*;
    use crate::analysis::NutritionAnalysis;
    use crate::codec::EncodedImage;
    use crate::history::{HistoryRecord, HistoryStore};
    use crate::inference::AttemptError;
    use crate::session::{IdentityStore, SessionState};
    use crate::testutil::{sample_analysis, valid_raw, ScriptedClient};

    struct NoIdentity;

    #[async_trait]
    impl IdentityStore for NoIdentity {
        async fn load(&self) -> anyhow::Result<Option<String>> {
            Ok(None)
        }
        async fn store(&self, _name: &str) -> anyhow::Result<()> {
            Ok(())
        }
        async fn clear(&self) -> anyhow::Result<()> {
            Ok(())
        }
    }

    struct MemoryHistory {
        saved: Mutex<Vec<NutritionAnalysis>>,
    }

    #[async_trait]
    impl HistoryStore for MemoryHistory {
        async fn insert(
            &self,
            _user_name: &str,
            analysis: &NutritionAnalysis,
            _image_url: Option<&str>,
        ) -> anyhow::Result<()> {
            self.saved.lock().unwrap().push(analysis.clone());
            Ok(())
        }
        async fn query_by_user(&self, _user_name: &str) -> anyhow::Result<Vec<HistoryRecord>> {
            Ok(Vec::new())
        }
    }

    async fn staged_controller() -> SessionController {
        let mut controller = SessionController::new(
            Arc::new(NoIdentity),
            Arc::new(MemoryHistory {
                saved: Mutex::new(Vec::new()),
            }),
        );
        controller.login("Ana").await.unwrap();
        let ticket = controller.select_image().unwrap();
        controller.complete_image(ticket, Ok(EncodedImage::from_bytes("image/jpeg", b"plate")));
        controller
    }

    #[tokio::test(start_paused = true)]
    async fn drive_analysis_reaches_result_while_ticking_through_retries() {
        let client = Arc::new(ScriptedClient::new(vec![
            Err(AttemptError::Transient("t1".into())),
            Ok(valid_raw()),
        ]));
        let orchestrator = Orchestrator::new(
            client,
            CredentialPool::from_slots(["key-a"]),
            RetryPolicy::default(),
        );
        let mut controller = staged_controller().await;

        let ticket = controller.start_analysis().unwrap();
        drive_analysis(
            &mut controller,
            &orchestrator,
            ticket,
            Duration::from_secs(1),
        )
        .await;

        match controller.state() {
            SessionState::Result { analysis, .. } => assert_eq!(analysis, &sample_analysis()),
            other => panic!("unexpected state: {other:?}"),
        }
        if let Some(save) = controller.take_pending_save() {
            save.await.unwrap();
        }
    }

    #[tokio::test(start_paused = true)]
    async fn drive_analysis_applies_terminal_failures() {
        let client = Arc::new(ScriptedClient::new(vec![Err(AttemptError::Quota(
            "429".into(),
        ))]));
        let orchestrator = Orchestrator::new(
            client,
            CredentialPool::from_slots(["key-a"]),
            RetryPolicy::default(),
        );
        let mut controller = staged_controller().await;

        let ticket = controller.start_analysis().unwrap();
        drive_analysis(
            &mut controller,
            &orchestrator,
            ticket,
            Duration::from_secs(1),
        )
        .await;

        assert_eq!(*controller.state(), SessionState::Idle);
        assert!(controller.failure_message().is_some());
    }
}
