//! The sampling loop: one tick interval and one deadline racing over a
//! shared session, first event wins.

use tokio::time::{Duration, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::capture::{CaptureGuard, CaptureSource};
use crate::detector::Detector;
use crate::overlay::OverlaySink;

use super::state::{EndReason, FinalizeFlag, SessionBudget};
use super::strategy::SessionStrategy;

// Set to true to enable verbose logging in this module
const ENABLE_LOGS: bool = true;

use crate::log_warn;

/// Upper bound on a single detector call so a stalled model cannot freeze
/// the budget race.
const DETECT_TIMEOUT: Duration = Duration::from_secs(5);

/// What a finished session hands back to its controller.
#[derive(Debug)]
pub struct SessionOutcome<S> {
    pub reason: EndReason,
    pub summary: S,
}

/// Drive one sampling session to completion.
///
/// Every `tick_interval` a frame is read and offered to the detector; a
/// tick with at least one observation feeds the strategy, an empty tick
/// only lets the clock run. The session ends on the first of: the
/// strategy reporting its sample budget full, the duration deadline, or
/// cancellation. The winner releases the capture device, clears the
/// overlay, and reduces the strategy — exactly once, arbitrated by
/// `finalized`. Returns `None` when another party finalized first (the
/// stale-timer no-op path); the capture guard still releases on drop.
#[allow(clippy::too_many_arguments)]
pub async fn sampling_loop<C, D, S>(
    session_id: &str,
    mut capture: CaptureGuard<C>,
    mut detector: D,
    mut strategy: S,
    mut overlay: Box<dyn OverlaySink>,
    budget: SessionBudget,
    tick_interval: Duration,
    finalized: FinalizeFlag,
    cancel: CancellationToken,
) -> Option<SessionOutcome<S::Summary>>
where
    C: CaptureSource,
    D: Detector<Obs = S::Obs>,
    S: SessionStrategy,
{
    let mut ticker = tokio::time::interval(tick_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let deadline = tokio::time::sleep(budget.max_duration);
    tokio::pin!(deadline);

    let reason = loop {
        tokio::select! {
            _ = ticker.tick() => {
                let frame = match capture.read_frame() {
                    Ok(frame) => frame,
                    Err(err) => {
                        log_warn!("frame read failed for session {session_id}: {err:#}");
                        continue;
                    }
                };

                match tokio::time::timeout(DETECT_TIMEOUT, detector.detect_once(&frame)).await {
                    Ok(Ok(observations)) if !observations.is_empty() => {
                        if strategy.absorb(observations) {
                            break EndReason::SampleBudget;
                        }
                        overlay.render(&strategy.status());
                    }
                    // Nothing recognized this tick; the duration budget
                    // keeps running against it.
                    Ok(Ok(_)) => {
                        overlay.render(&strategy.status());
                    }
                    Ok(Err(err)) => {
                        log_warn!("detection failed for session {session_id}: {err:#}");
                    }
                    Err(_) => {
                        log_warn!(
                            "detection timeout (> {}s) session {session_id}",
                            DETECT_TIMEOUT.as_secs()
                        );
                    }
                }
            }
            _ = &mut deadline => {
                break EndReason::DurationBudget;
            }
            _ = cancel.cancelled() => {
                break EndReason::Cancelled;
            }
        }
    };

    // Whichever event broke the loop must be the only finalizer; a timer
    // that lost the race lands here after the flag is already set and
    // must not touch the session again.
    if !finalized.try_finalize() {
        return None;
    }

    capture.release();
    overlay.clear();

    Some(SessionOutcome {
        reason,
        summary: strategy.finish(reason),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::Ordering;

    use crate::capture::test_support::CountingCamera;
    use crate::detector::simulated::{arm_with_elbow_angle, ScriptedDetector};
    use crate::detector::FaceObservation;
    use crate::mood::{ExpressionScores, MoodLabel, FALLBACK_AGE, FALLBACK_MOOD};
    use crate::overlay::test_support::CountingOverlay;
    use crate::session::strategy::{MoodStrategy, PoseStrategy};
    use crate::speech::test_support::RecordingSpeech;

    fn face(happy: f32, sad: f32, age: f32) -> FaceObservation {
        FaceObservation {
            expressions: ExpressionScores {
                happy,
                sad,
                ..Default::default()
            },
            age,
        }
    }

    fn budget(duration_ms: u64, max_samples: usize) -> SessionBudget {
        SessionBudget {
            max_duration: Duration::from_millis(duration_ms),
            max_samples,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn count_path_finalizes_on_exactly_the_full_buffer() {
        let (camera, _, releases) = CountingCamera::new();
        let guard = CaptureGuard::open(camera).unwrap();
        // More observations scripted than the budget allows; the deadline
        // is far away, so the count path must win.
        let detector = ScriptedDetector::repeating(face(0.8, 0.1, 33.0), 100);
        let strategy = MoodStrategy::new(5);
        let (overlay, _, clears) = CountingOverlay::new();
        let finalized = FinalizeFlag::new();

        let outcome = sampling_loop(
            "test-count",
            guard,
            detector,
            strategy,
            Box::new(overlay),
            budget(60_000, 5),
            Duration::from_millis(100),
            finalized.clone(),
            CancellationToken::new(),
        )
        .await
        .expect("first finalizer wins");

        assert_eq!(outcome.reason, EndReason::SampleBudget);
        assert_eq!(outcome.summary.sample_count, 5);
        assert_eq!(outcome.summary.label, MoodLabel::Happy);
        assert_eq!(outcome.summary.age, 33.0);
        assert!(!outcome.summary.used_fallback);
        assert!(finalized.is_finalized());
        assert_eq!(releases.load(Ordering::SeqCst), 1);
        assert_eq!(clears.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn duration_path_with_no_observations_dispatches_fallback() {
        let (camera, _, releases) = CountingCamera::new();
        let guard = CaptureGuard::open(camera).unwrap();
        // Detector never finds anything.
        let detector: ScriptedDetector<FaceObservation> = ScriptedDetector::new(Vec::new());
        let strategy = MoodStrategy::new(50);
        let (overlay, _, clears) = CountingOverlay::new();

        let outcome = sampling_loop(
            "test-fallback",
            guard,
            detector,
            strategy,
            Box::new(overlay),
            budget(10_000, 50),
            Duration::from_millis(100),
            FinalizeFlag::new(),
            CancellationToken::new(),
        )
        .await
        .unwrap();

        assert_eq!(outcome.reason, EndReason::DurationBudget);
        assert_eq!(outcome.summary.label, FALLBACK_MOOD);
        assert_eq!(outcome.summary.age, FALLBACK_AGE);
        assert_eq!(outcome.summary.sample_count, 0);
        assert!(outcome.summary.used_fallback);
        assert_eq!(releases.load(Ordering::SeqCst), 1);
        assert_eq!(clears.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn duration_path_ignores_partial_buffer() {
        let (camera, _, releases) = CountingCamera::new();
        let guard = CaptureGuard::open(camera).unwrap();
        // Three observations, then silence; budget wants fifty.
        let detector = ScriptedDetector::new(vec![
            vec![face(0.1, 0.8, 52.0)],
            vec![face(0.2, 0.7, 52.0)],
            vec![face(0.1, 0.9, 52.0)],
        ]);
        let strategy = MoodStrategy::new(50);

        let outcome = sampling_loop(
            "test-partial",
            guard,
            detector,
            strategy,
            Box::new(crate::overlay::NullOverlay),
            budget(10_000, 50),
            Duration::from_millis(100),
            FinalizeFlag::new(),
            CancellationToken::new(),
        )
        .await
        .unwrap();

        assert_eq!(outcome.reason, EndReason::DurationBudget);
        // The partial buffer is never reduced; the policy default applies.
        assert_eq!(outcome.summary.label, FALLBACK_MOOD);
        assert_eq!(outcome.summary.sample_count, 3);
        assert!(outcome.summary.used_fallback);
        assert_eq!(releases.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn cancellation_releases_capture_without_dispatch() {
        let (camera, _, releases) = CountingCamera::new();
        let guard = CaptureGuard::open(camera).unwrap();
        let detector = ScriptedDetector::repeating(face(0.9, 0.0, 20.0), 1000);
        let strategy = MoodStrategy::new(1000);
        let cancel = CancellationToken::new();
        let (overlay, _, clears) = CountingOverlay::new();

        let token = cancel.clone();
        let worker = tokio::spawn(sampling_loop(
            "test-cancel",
            guard,
            detector,
            strategy,
            Box::new(overlay),
            budget(3_600_000, 1000),
            Duration::from_millis(100),
            FinalizeFlag::new(),
            cancel,
        ));

        tokio::time::sleep(Duration::from_millis(550)).await;
        token.cancel();

        let outcome = worker.await.unwrap().unwrap();
        assert_eq!(outcome.reason, EndReason::Cancelled);
        assert_eq!(releases.load(Ordering::SeqCst), 1);
        assert_eq!(clears.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn stale_finalize_flag_turns_loop_into_noop() {
        let (camera, _, releases) = CountingCamera::new();
        let guard = CaptureGuard::open(camera).unwrap();
        let detector = ScriptedDetector::repeating(face(0.9, 0.0, 20.0), 10);
        let strategy = MoodStrategy::new(2);
        let (overlay, _, clears) = CountingOverlay::new();

        let finalized = FinalizeFlag::new();
        assert!(finalized.try_finalize());

        let outcome = sampling_loop(
            "test-stale",
            guard,
            detector,
            strategy,
            Box::new(overlay),
            budget(1_000, 2),
            Duration::from_millis(100),
            finalized,
            CancellationToken::new(),
        )
        .await;

        assert!(outcome.is_none());
        // The guard's drop path still returned the device.
        assert_eq!(releases.load(Ordering::SeqCst), 1);
        // A loser must not clear the surface it no longer owns.
        assert_eq!(clears.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn pose_session_runs_duration_bounded_and_speaks_changes() {
        let (camera, _, releases) = CountingCamera::new();
        let guard = CaptureGuard::open(camera).unwrap();
        let detector = ScriptedDetector::new(vec![
            vec![arm_with_elbow_angle(120.0)],
            vec![arm_with_elbow_angle(118.0)],
            vec![arm_with_elbow_angle(170.0)],
        ]);
        let (speech, lines) = RecordingSpeech::new();
        let strategy = PoseStrategy::new(speech);

        let outcome = sampling_loop(
            "test-pose",
            guard,
            detector,
            strategy,
            Box::new(crate::overlay::NullOverlay),
            budget(2_000, usize::MAX),
            Duration::from_millis(100),
            FinalizeFlag::new(),
            CancellationToken::new(),
        )
        .await
        .unwrap();

        assert_eq!(outcome.reason, EndReason::DurationBudget);
        assert_eq!(outcome.summary.ticks_observed, 3);
        assert_eq!(outcome.summary.corrections, 2);
        assert_eq!(
            lines.lock().unwrap().clone(),
            vec!["Keep your elbow straight.", "Good posture!"]
        );
        assert_eq!(releases.load(Ordering::SeqCst), 1);
    }
}
