mod identity;
mod progress;

pub use identity::{FileIdentityStore, IdentityStore};
pub use progress::AnalysisProgress;

use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, warn};

use crate::analysis::NutritionAnalysis;
use crate::codec::{EncodeError, EncodedImage};
use crate::history::{HistoryRecord, HistoryStore};
use crate::inference::AnalyzeError;

/// Fallback shown when a history record carries no saved image reference.
pub const PLACEHOLDER_IMAGE_URL: &str =
    "https://cdn-icons-png.flaticon.com/512/11641/11641857.png";

/// One generic user-facing failure message; fatal sub-kinds are never
/// distinguished to the user.
pub const ANALYSIS_FAILURE_MESSAGE: &str = "Falha na análise. Tente novamente.";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SessionError {
    #[error("a non-empty display name is required")]
    EmptyName,
    #[error("not logged in")]
    NotLoggedIn,
    #[error("operation not allowed in the current state")]
    InvalidTransition,
}

/// Where the image shown next to a result comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageSource {
    /// The image staged for this analysis, as a data URI.
    Staged(EncodedImage),
    /// A remote reference saved with a history record.
    Stored(String),
    /// No reference available; display never blocks on image availability.
    Placeholder,
}

impl ImageSource {
    pub fn display_uri(&self) -> String {
        match self {
            ImageSource::Staged(image) => image.data_uri(),
            ImageSource::Stored(url) => url.clone(),
            ImageSource::Placeholder => PLACEHOLDER_IMAGE_URL.to_string(),
        }
    }
}

/// What is on screen.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionState {
    LoggedOut,
    Idle,
    ImageStaged {
        image: EncodedImage,
    },
    Analyzing {
        image: EncodedImage,
        progress: AnalysisProgress,
    },
    Result {
        analysis: NutritionAnalysis,
        image: ImageSource,
    },
    HistoryBrowsing {
        records: Vec<HistoryRecord>,
        /// Staged image to restore when toggling back.
        staged: Option<EncodedImage>,
    },
}

/// Handle for one pending image encode. Only the newest ticket may stage
/// its result (last selection wins).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EncodeTicket(u64);

/// Handle for one started analysis. A ticket whose generation no longer
/// matches is stale and its outcome is dropped.
#[derive(Debug, Clone)]
pub struct AnalysisTicket {
    generation: u64,
    pub image: EncodedImage,
}

/// UI-facing controller: owns the session state and calls the collaborators
/// at the right transitions. All cancellation is cooperative: a resumed
/// callback carrying an outdated ticket is ignored, never applied.
pub struct SessionController {
    state: SessionState,
    user: Option<String>,
    identity: Arc<dyn IdentityStore>,
    history: Arc<dyn HistoryStore>,
    encode_seq: u64,
    analysis_generation: u64,
    failure_message: Option<&'static str>,
    pending_save: Option<tokio::task::JoinHandle<()>>,
}

impl SessionController {
    pub fn new(identity: Arc<dyn IdentityStore>, history: Arc<dyn HistoryStore>) -> Self {
        Self {
            state: SessionState::LoggedOut,
            user: None,
            identity,
            history,
            encode_seq: 0,
            analysis_generation: 0,
            failure_message: None,
            pending_save: None,
        }
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn user_name(&self) -> Option<&str> {
        self.user.as_deref()
    }

    /// The pending generic failure message, if the last analysis failed.
    pub fn failure_message(&self) -> Option<&'static str> {
        self.failure_message
    }

    /// Consulted once at startup: restore a remembered session, if any.
    pub async fn restore(&mut self) {
        match self.identity.load().await {
            Ok(Some(name)) => {
                debug!(user = %name, "restored remembered session");
                self.user = Some(name);
                self.state = SessionState::Idle;
            }
            Ok(None) => {}
            Err(e) => warn!(error = %e, "failed to load remembered identity"),
        }
    }

    pub async fn login(&mut self, name: &str) -> Result<(), SessionError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(SessionError::EmptyName);
        }
        self.user = Some(name.to_string());
        self.state = SessionState::Idle;
        self.failure_message = None;
        if let Err(e) = self.identity.store(name).await {
            warn!(error = %e, "failed to persist identity");
        }
        Ok(())
    }

    /// Any state → `LoggedOut`. An in-flight analysis is not aborted at the
    /// network layer; its eventual outcome is simply discarded.
    pub async fn logout(&mut self) {
        self.user = None;
        self.state = SessionState::LoggedOut;
        self.failure_message = None;
        self.invalidate_pending();
        if let Err(e) = self.identity.clear().await {
            warn!(error = %e, "failed to clear remembered identity");
        }
    }

    /// Begin selecting a new image. The encode completes asynchronously via
    /// [`complete_image`]; issuing a new ticket supersedes any pending one.
    pub fn select_image(&mut self) -> Result<EncodeTicket, SessionError> {
        match self.state {
            SessionState::LoggedOut => Err(SessionError::NotLoggedIn),
            SessionState::Analyzing { .. } => Err(SessionError::InvalidTransition),
            _ => {
                self.encode_seq += 1;
                self.failure_message = None;
                Ok(EncodeTicket(self.encode_seq))
            }
        }
    }

    /// Apply a finished encode. Stale tickets lose: an earlier selection
    /// resolving out of order must not overwrite a later one.
    pub fn complete_image(
        &mut self,
        ticket: EncodeTicket,
        result: Result<EncodedImage, EncodeError>,
    ) {
        if ticket.0 != self.encode_seq {
            debug!("stale encode completion discarded");
            return;
        }
        if matches!(
            self.state,
            SessionState::LoggedOut | SessionState::Analyzing { .. }
        ) {
            debug!("encode completion ignored in current state");
            return;
        }
        match result {
            Ok(image) => {
                // exits history browsing and discards any previous analysis
                self.state = SessionState::ImageStaged { image };
            }
            Err(e) => {
                warn!(error = %e, "image encoding failed");
                self.failure_message = Some(ANALYSIS_FAILURE_MESSAGE);
            }
        }
    }

    /// `ImageStaged` → `Analyzing`. The returned ticket carries the staged
    /// image for the driver to feed to the orchestrator.
    pub fn start_analysis(&mut self) -> Result<AnalysisTicket, SessionError> {
        let SessionState::ImageStaged { image } = &self.state else {
            return Err(SessionError::InvalidTransition);
        };
        let image = image.clone();
        self.analysis_generation += 1;
        self.failure_message = None;
        self.state = SessionState::Analyzing {
            image: image.clone(),
            progress: AnalysisProgress::new(),
        };
        Ok(AnalysisTicket {
            generation: self.analysis_generation,
            image,
        })
    }

    /// Scheduled tick, consumed only while `Analyzing`.
    pub fn tick(&mut self) {
        if let SessionState::Analyzing { progress, .. } = &mut self.state {
            progress.tick();
        }
    }

    /// Current progress phrase, while `Analyzing`.
    pub fn progress_phrase(&self) -> Option<&'static str> {
        match &self.state {
            SessionState::Analyzing { progress, .. } => Some(progress.phrase()),
            _ => None,
        }
    }

    /// Apply a terminal orchestrator outcome. Outcomes for a superseded
    /// generation (after `reset`/`logout`) are dropped.
    pub fn complete_analysis(
        &mut self,
        ticket: AnalysisTicket,
        outcome: Result<NutritionAnalysis, AnalyzeError>,
    ) {
        if ticket.generation != self.analysis_generation
            || !matches!(self.state, SessionState::Analyzing { .. })
        {
            debug!("stale analysis outcome discarded");
            return;
        }
        match outcome {
            Ok(analysis) => {
                self.state = SessionState::Result {
                    analysis: analysis.clone(),
                    image: ImageSource::Staged(ticket.image),
                };
                self.save_detached(analysis);
            }
            Err(e) => {
                warn!(error = %e, "analysis failed terminally");
                // fail closed: the staged image is dropped rather than left
                // for a silent retry
                self.state = SessionState::Idle;
                self.failure_message = Some(ANALYSIS_FAILURE_MESSAGE);
            }
        }
    }

    /// Best-effort history save; the controller never awaits it, failures are
    /// logged and never surfaced. The handle is kept so a driver that is about
    /// to exit can flush it via [`take_pending_save`](Self::take_pending_save).
    fn save_detached(&mut self, analysis: NutritionAnalysis) {
        let Some(name) = self.user.clone() else {
            return;
        };
        let history = Arc::clone(&self.history);
        self.pending_save = Some(tokio::spawn(async move {
            if let Err(e) = history.insert(&name, &analysis, None).await {
                warn!(error = %e, user = %name, "failed to save analysis to history");
            }
        }));
    }

    /// Hand over the handle of the most recent detached save, if one was
    /// started. Long-lived drivers can ignore this; a short-lived one awaits
    /// it before exiting so the save is not cut off mid-flight.
    pub fn take_pending_save(&mut self) -> Option<tokio::task::JoinHandle<()>> {
        self.pending_save.take()
    }

    /// `Result`/`ImageStaged`/`Analyzing` → `Idle`, discarding the staged
    /// image and any analysis. A late success from a call started before the
    /// reset will find its generation superseded.
    pub fn reset(&mut self) {
        match self.state {
            SessionState::LoggedOut => {}
            _ => {
                self.invalidate_pending();
                self.state = SessionState::Idle;
                self.failure_message = None;
            }
        }
    }

    /// `Idle`/`ImageStaged`/`Result` ⇄ `HistoryBrowsing`. Never reachable
    /// while `Analyzing`. Entering fetches the full history for the current
    /// user; a fetch failure logs and shows an empty list.
    pub async fn toggle_history(&mut self) -> Result<(), SessionError> {
        let user = self.user.clone().ok_or(SessionError::NotLoggedIn)?;
        match &self.state {
            SessionState::Analyzing { .. } | SessionState::LoggedOut => {
                Err(SessionError::InvalidTransition)
            }
            SessionState::HistoryBrowsing { staged, .. } => {
                self.state = match staged.clone() {
                    Some(image) => SessionState::ImageStaged { image },
                    None => SessionState::Idle,
                };
                Ok(())
            }
            SessionState::Idle | SessionState::Result { .. } | SessionState::ImageStaged { .. } => {
                let staged = match &self.state {
                    SessionState::ImageStaged { image } => Some(image.clone()),
                    _ => None,
                };
                let records = match self.history.query_by_user(&user).await {
                    Ok(records) => records,
                    Err(e) => {
                        warn!(error = %e, user = %user, "history fetch failed");
                        Vec::new()
                    }
                };
                self.state = SessionState::HistoryBrowsing { records, staged };
                Ok(())
            }
        }
    }

    /// Open one record from the history list, showing its stored analysis
    /// with its saved image reference or a placeholder.
    pub fn open_history_record(&mut self, index: usize) -> Result<(), SessionError> {
        let SessionState::HistoryBrowsing { records, .. } = &self.state else {
            return Err(SessionError::InvalidTransition);
        };
        let record = records.get(index).ok_or(SessionError::InvalidTransition)?;
        let image = match &record.image_url {
            Some(url) => ImageSource::Stored(url.clone()),
            None => ImageSource::Placeholder,
        };
        self.state = SessionState::Result {
            analysis: record.analysis.clone(),
            image,
        };
        Ok(())
    }

    fn invalidate_pending(&mut self) {
        self.encode_seq += 1;
        self.analysis_generation += 1;
    }
}
