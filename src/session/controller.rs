//! Owns running sessions: spawning the sampling worker, teardown, and the
//! downstream dispatch once a summary is finalized.

use anyhow::{Context, Result};
use chrono::Utc;
use log::{error, info};
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::Duration;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::audio::ChimeHandle;
use crate::capture::{CaptureGuard, CaptureSource};
use crate::db::{Database, SessionKind, SessionRecord, SessionStatus};
use crate::detector::Detector;
use crate::overlay::OverlaySink;
use crate::speech::SpeechChannel;
use crate::suggest::{SuggestionClient, SuggestionSet};

use super::loop_worker::sampling_loop;
use super::state::{EndReason, FinalizeFlag, SessionBudget};
use super::strategy::{MoodStrategy, MoodSummary, PoseStrategy, PoseSummary, SessionStrategy};

/// Summary variants as dispatched downstream.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum SessionSummary {
    Mood(MoodSummary),
    Pose(PoseSummary),
}

/// Everything a finished session produced.
#[derive(Debug)]
pub struct SessionReport {
    pub session_id: String,
    pub reason: EndReason,
    pub summary: SessionSummary,
    /// Mood sessions only; `None` when the request failed or was skipped.
    pub suggestions: Option<SuggestionSet>,
}

struct ActiveSession {
    session_id: String,
    cancel: CancellationToken,
    finalized: FinalizeFlag,
    handle: JoinHandle<Option<SessionReport>>,
}

pub struct SessionController {
    db: Database,
    suggestions: SuggestionClient,
    chime: Option<ChimeHandle>,
    active: Mutex<Option<ActiveSession>>,
}

impl SessionController {
    pub fn new(db: Database, suggestions: SuggestionClient, chime: Option<ChimeHandle>) -> Self {
        Self {
            db,
            suggestions,
            chime,
            active: Mutex::new(None),
        }
    }

    /// Start a mood-sampling session. Returns the session id; the worker
    /// runs until a budget fires or the session is stopped.
    pub async fn start_mood_session<C, D>(
        &self,
        capture: C,
        detector: D,
        overlay: Box<dyn OverlaySink>,
        budget: SessionBudget,
        tick_interval: Duration,
    ) -> Result<String>
    where
        C: CaptureSource,
        D: Detector<Obs = crate::detector::FaceObservation>,
    {
        let strategy = MoodStrategy::new(budget.max_samples);
        self.start_session(
            SessionKind::Mood,
            capture,
            detector,
            strategy,
            overlay,
            budget,
            tick_interval,
            SessionSummary::Mood,
        )
        .await
    }

    /// Start a posture session. Duration-bounded; feedback goes to the
    /// speech channel as it changes.
    pub async fn start_pose_session<C, D>(
        &self,
        capture: C,
        detector: D,
        overlay: Box<dyn OverlaySink>,
        speech: Arc<dyn SpeechChannel>,
        budget: SessionBudget,
        tick_interval: Duration,
    ) -> Result<String>
    where
        C: CaptureSource,
        D: Detector<Obs = crate::detector::PoseObservation>,
    {
        let strategy = PoseStrategy::new(speech);
        self.start_session(
            SessionKind::Pose,
            capture,
            detector,
            strategy,
            overlay,
            budget,
            tick_interval,
            SessionSummary::Pose,
        )
        .await
    }

    #[allow(clippy::too_many_arguments)]
    async fn start_session<C, D, S>(
        &self,
        kind: SessionKind,
        capture: C,
        detector: D,
        strategy: S,
        overlay: Box<dyn OverlaySink>,
        budget: SessionBudget,
        tick_interval: Duration,
        wrap: fn(S::Summary) -> SessionSummary,
    ) -> Result<String>
    where
        C: CaptureSource,
        D: Detector<Obs = S::Obs>,
        S: SessionStrategy,
    {
        let mut active = self.active.lock().await;
        if let Some(session) = active.as_ref() {
            if !session.handle.is_finished() {
                anyhow::bail!("a session is already active");
            }
        }

        // Capture-unavailable means the session never starts: no record,
        // no worker, nothing to release.
        let guard = match CaptureGuard::open(capture) {
            Ok(guard) => guard,
            Err(err) => {
                error!("capture unavailable: {err:#}");
                return Err(err.context("capture unavailable"));
            }
        };

        let session_id = Uuid::new_v4().to_string();
        let started_at = Utc::now();

        let record = SessionRecord {
            id: session_id.clone(),
            kind,
            status: SessionStatus::Running,
            started_at,
            stopped_at: None,
            target_ms: budget.max_duration.as_millis() as u64,
            // Unbounded counts clamp to the SQLite INTEGER range.
            max_samples: budget.max_samples.min(i64::MAX as usize) as u64,
            sample_count: 0,
            end_reason: None,
            summary_label: None,
            summary_age: None,
            summary_angle: None,
            used_fallback: false,
            created_at: started_at,
            updated_at: started_at,
        };
        self.db.insert_session(&record).await?;

        let cancel = CancellationToken::new();
        let finalized = FinalizeFlag::new();

        let db = self.db.clone();
        let suggestions_client = self.suggestions.clone();
        let chime = self.chime.clone();
        let token = cancel.clone();
        let flag = finalized.clone();
        let worker_id = session_id.clone();

        let handle = tokio::spawn(async move {
            let outcome = sampling_loop(
                &worker_id,
                guard,
                detector,
                strategy,
                overlay,
                budget,
                tick_interval,
                flag,
                token,
            )
            .await?;

            let reason = outcome.reason;
            let summary = wrap(outcome.summary);
            let stopped_at = Utc::now();

            let status = match reason {
                EndReason::Cancelled => SessionStatus::Cancelled,
                _ => SessionStatus::Completed,
            };

            // Cancelled sessions keep no summary; nothing was dispatched.
            let (sample_count, label, age, angle, used_fallback) = match (&summary, reason) {
                (_, EndReason::Cancelled) => (observed_count(&summary), None, None, None, false),
                (SessionSummary::Mood(mood), _) => (
                    mood.sample_count as u64,
                    Some(mood.label.as_str().to_string()),
                    Some(mood.age as f64),
                    None,
                    mood.used_fallback,
                ),
                (SessionSummary::Pose(pose), _) => (
                    pose.ticks_observed as u64,
                    None,
                    None,
                    pose.last_angle.map(|angle| angle as f64),
                    false,
                ),
            };

            if let Err(err) = db
                .finalize_session(
                    &worker_id,
                    status,
                    reason.as_str(),
                    sample_count,
                    label,
                    age,
                    angle,
                    used_fallback,
                    stopped_at,
                    stopped_at,
                )
                .await
            {
                error!("failed to persist outcome for session {worker_id}: {err:#}");
            }

            let mut suggestions = None;
            if reason != EndReason::Cancelled {
                if let SessionSummary::Mood(mood) = &summary {
                    info!(
                        "Session {worker_id} finalized: mood {} (age {:.0}), {} samples",
                        mood.label.as_str(),
                        mood.age,
                        mood.sample_count
                    );
                    // One request, no retry; a failure only logs and the
                    // consumer sees no data.
                    match suggestions_client
                        .fetch_suggestions(mood.label.as_str(), mood.age)
                        .await
                    {
                        Ok(set) => {
                            info!("Received {} suggestion categories", set.len());
                            suggestions = Some(set);
                        }
                        Err(err) => error!("suggestion request failed: {err:#}"),
                    }
                }

                if let Some(chime) = &chime {
                    chime.play_completion_chime();
                }
            }

            Some(SessionReport {
                session_id: worker_id,
                reason,
                summary,
                suggestions,
            })
        });

        *active = Some(ActiveSession {
            session_id: session_id.clone(),
            cancel,
            finalized,
            handle,
        });

        Ok(session_id)
    }

    pub async fn active_session_id(&self) -> Option<String> {
        self.active
            .lock()
            .await
            .as_ref()
            .filter(|session| !session.handle.is_finished())
            .map(|session| session.session_id.clone())
    }

    /// Whether the current session has finalized (either budget path).
    pub async fn is_finalized(&self) -> bool {
        self.active
            .lock()
            .await
            .as_ref()
            .map(|session| session.finalized.is_finalized())
            .unwrap_or(true)
    }

    /// Tear the running session down before either budget fires. The
    /// capture device is still released; no summary is dispatched.
    pub async fn stop(&self) -> Result<Option<SessionReport>> {
        let Some(session) = self.active.lock().await.take() else {
            return Ok(None);
        };
        session.cancel.cancel();
        session
            .handle
            .await
            .context("session worker task failed to join")
    }

    /// Wait for the running session to end on its own budgets.
    pub async fn join(&self) -> Result<Option<SessionReport>> {
        let Some(session) = self.active.lock().await.take() else {
            return Ok(None);
        };
        session
            .handle
            .await
            .context("session worker task failed to join")
    }
}

fn observed_count(summary: &SessionSummary) -> u64 {
    match summary {
        SessionSummary::Mood(mood) => mood.sample_count as u64,
        SessionSummary::Pose(pose) => pose.ticks_observed as u64,
    }
}
