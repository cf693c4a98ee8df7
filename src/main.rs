use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::Utc;
use clap::{Args, Parser, Subcommand};
use log::{info, warn};
use tokio::time::Duration;

use fitcare::audio::ChimeHandle;
use fitcare::capture::{ReplayCamera, SyntheticCamera};
use fitcare::db::Database;
use fitcare::detector::{
    RemoteFaceDetector, RemotePoseDetector, SimulatedFaceDetector, SimulatedPoseDetector,
};
use fitcare::genai::{diet_plan_prompt, recipe_prompt, DietQuery, GenAiClient, DEFAULT_GENERATE_URL};
use fitcare::mood::MoodLabel;
use fitcare::overlay::ConsoleOverlay;
use fitcare::session::{SessionBudget, SessionController, SessionReport, SessionSummary};
use fitcare::settings::SettingsStore;
use fitcare::speech::{NullSpeech, SpeechChannel, SystemSpeech};
use fitcare::suggest::{SuggestionClient, DEFAULT_SUGGEST_URL};

#[derive(Parser)]
#[command(name = "fitcare", about = "Wellness sessions from the terminal", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Sample facial expressions and fetch mood-based suggestions
    Mood(MoodArgs),
    /// Track the left elbow and speak posture feedback
    Pose(PoseArgs),
    /// Generate a full-day diet plan
    Diet(DietArgs),
    /// Suggest recipes from available ingredients
    Recipes(RecipeArgs),
    /// List recent sessions
    Sessions(SessionsArgs),
}

#[derive(Args)]
struct CaptureArgs {
    /// Frame source: "synthetic" or a directory of images to replay
    #[arg(long, default_value = "synthetic")]
    source: String,
    /// Inference service base URL; simulated detectors when unset
    #[arg(long)]
    inference_url: Option<String>,
}

#[derive(Args)]
struct MoodArgs {
    #[command(flatten)]
    capture: CaptureArgs,
    /// Session duration budget in milliseconds
    #[arg(long, default_value_t = 10_000)]
    duration_ms: u64,
    /// Session sample-count budget
    #[arg(long, default_value_t = 50)]
    samples: usize,
    /// Sampling tick in milliseconds
    #[arg(long, default_value_t = 100)]
    tick_ms: u64,
    /// Suggestion endpoint base URL
    #[arg(long, default_value = DEFAULT_SUGGEST_URL)]
    suggest_url: String,
}

#[derive(Args)]
struct PoseArgs {
    #[command(flatten)]
    capture: CaptureArgs,
    /// Session duration budget in milliseconds
    #[arg(long, default_value_t = 60_000)]
    duration_ms: u64,
    /// Sampling tick in milliseconds
    #[arg(long, default_value_t = 100)]
    tick_ms: u64,
}

#[derive(Args)]
struct DietArgs {
    #[arg(long, default_value = "breakfast")]
    meal_type: String,
    #[arg(long, default_value = "solid")]
    meal_kind: String,
    #[arg(long)]
    condition: String,
    #[arg(long, default_value_t = 30)]
    protein: u32,
    #[arg(long, default_value = "A, B, C")]
    vitamins: String,
    #[arg(long, default_value_t = 120)]
    carbs: u32,
}

#[derive(Args)]
struct RecipeArgs {
    /// Comma-separated ingredient list
    #[arg(long)]
    ingredients: String,
    #[arg(long, default_value = "no particular condition")]
    condition: String,
}

#[derive(Args)]
struct SessionsArgs {
    #[arg(long, default_value_t = 20)]
    limit: u32,
}

fn data_dir() -> Result<PathBuf> {
    let base = dirs::data_dir().context("no platform data directory")?;
    Ok(base.join("fitcare"))
}

async fn open_database() -> Result<Database> {
    let dir = data_dir()?;
    std::fs::create_dir_all(&dir)?;
    let db = Database::new(dir.join("fitcare.sqlite3"))?;

    // Finalize sessions that were running when the process last died.
    if let Some(session) = db.get_incomplete_session().await? {
        warn!(
            "Recovered incomplete session {}; marking as Interrupted",
            session.id
        );
        db.mark_session_interrupted(&session.id, Utc::now()).await?;
    }

    Ok(db)
}

fn load_settings() -> Result<SettingsStore> {
    SettingsStore::new(data_dir()?.join("settings.json"))
}

fn print_report(report: &SessionReport) {
    match &report.summary {
        SessionSummary::Mood(mood) => {
            println!(
                "Session {} ended ({:?}): mood {} (age {:.0}), {} samples{}",
                report.session_id,
                report.reason,
                mood.label.as_str(),
                mood.age,
                mood.sample_count,
                if mood.used_fallback {
                    " [fallback]"
                } else {
                    ""
                }
            );
            match &report.suggestions {
                Some(suggestions) => {
                    for (category, items) in suggestions {
                        println!("  {category}:");
                        for item in items.iter().take(5) {
                            let name = item.name().unwrap_or("(unnamed)");
                            match &item.description {
                                Some(description) => println!("    - {name}: {description}"),
                                None => println!("    - {name}"),
                            }
                        }
                    }
                }
                None => println!("  (no suggestions available)"),
            }
        }
        SessionSummary::Pose(pose) => {
            println!(
                "Session {} ended ({:?}): {} ticks, {} corrections, last angle {}",
                report.session_id,
                report.reason,
                pose.ticks_observed,
                pose.corrections,
                pose.last_angle
                    .map(|angle| format!("{angle:.1} deg"))
                    .unwrap_or_else(|| "n/a".to_string()),
            );
            if let Some(feedback) = pose.last_feedback {
                println!("  last feedback: {feedback}");
            }
        }
    }
}

async fn run_mood(args: MoodArgs) -> Result<()> {
    let db = open_database().await?;
    let settings = load_settings()?;
    let suggestions = SuggestionClient::new(args.suggest_url)?;
    let chime = settings.chime().enabled.then(ChimeHandle::new);
    let controller = SessionController::new(db, suggestions, chime);

    let budget = SessionBudget {
        max_duration: Duration::from_millis(args.duration_ms),
        max_samples: args.samples,
    };
    let tick = Duration::from_millis(args.tick_ms);
    let overlay = Box::new(ConsoleOverlay);

    let session_id = match (&args.capture.inference_url, args.capture.source.as_str()) {
        (Some(url), "synthetic") => {
            controller
                .start_mood_session(
                    SyntheticCamera::new(),
                    RemoteFaceDetector::new(url.clone())?,
                    overlay,
                    budget,
                    tick,
                )
                .await?
        }
        (Some(url), dir) => {
            controller
                .start_mood_session(
                    ReplayCamera::new(dir),
                    RemoteFaceDetector::new(url.clone())?,
                    overlay,
                    budget,
                    tick,
                )
                .await?
        }
        (None, _) => {
            controller
                .start_mood_session(
                    SyntheticCamera::new(),
                    SimulatedFaceDetector::new(MoodLabel::Happy, 27.0),
                    overlay,
                    budget,
                    tick,
                )
                .await?
        }
    };
    info!("Mood session {session_id} started");

    if let Some(report) = controller.join().await? {
        print_report(&report);
    }
    Ok(())
}

async fn run_pose(args: PoseArgs) -> Result<()> {
    let db = open_database().await?;
    let settings = load_settings()?;
    let suggestions = SuggestionClient::new(DEFAULT_SUGGEST_URL)?;
    let chime = settings.chime().enabled.then(ChimeHandle::new);
    let controller = SessionController::new(db, suggestions, chime);

    let speech_settings = settings.speech();
    let speech: Arc<dyn SpeechChannel> = if speech_settings.enabled {
        Arc::new(SystemSpeech::new(speech_settings)?)
    } else {
        Arc::new(NullSpeech)
    };

    let budget = SessionBudget {
        max_duration: Duration::from_millis(args.duration_ms),
        // Posture sessions are duration-bounded; the count budget never
        // fills.
        max_samples: usize::MAX,
    };
    let tick = Duration::from_millis(args.tick_ms);
    let overlay = Box::new(ConsoleOverlay);

    let session_id = match (&args.capture.inference_url, args.capture.source.as_str()) {
        (Some(url), "synthetic") => {
            controller
                .start_pose_session(
                    SyntheticCamera::new(),
                    RemotePoseDetector::new(url.clone())?,
                    overlay,
                    speech,
                    budget,
                    tick,
                )
                .await?
        }
        (Some(url), dir) => {
            controller
                .start_pose_session(
                    ReplayCamera::new(dir),
                    RemotePoseDetector::new(url.clone())?,
                    overlay,
                    speech,
                    budget,
                    tick,
                )
                .await?
        }
        (None, _) => {
            controller
                .start_pose_session(
                    SyntheticCamera::new(),
                    SimulatedPoseDetector::new(),
                    overlay,
                    speech,
                    budget,
                    tick,
                )
                .await?
        }
    };
    info!("Pose session {session_id} started");

    if let Some(report) = controller.join().await? {
        print_report(&report);
    }
    Ok(())
}

fn genai_client() -> Result<GenAiClient> {
    let api_key = std::env::var("GEMINI_API_KEY")
        .context("GEMINI_API_KEY is not set")?;
    let endpoint =
        std::env::var("GENERATE_URL").unwrap_or_else(|_| DEFAULT_GENERATE_URL.to_string());
    GenAiClient::new(endpoint, api_key)
}

async fn run_diet(args: DietArgs) -> Result<()> {
    let client = genai_client()?;
    let prompt = diet_plan_prompt(&DietQuery {
        meal_type: args.meal_type,
        meal_kind: args.meal_kind,
        health_condition: args.condition,
        protein_g: args.protein,
        vitamins: args.vitamins,
        carbs_g: args.carbs,
    });

    match client.generate_text(&prompt).await {
        Ok(plan) => println!("{plan}"),
        Err(err) => {
            log::error!("diet plan request failed: {err:#}");
            println!("Failed to generate recommendations. Try again.");
        }
    }
    Ok(())
}

async fn run_recipes(args: RecipeArgs) -> Result<()> {
    let client = genai_client()?;
    let prompt = recipe_prompt(&args.ingredients, &args.condition);

    match client.generate_text(&prompt).await {
        Ok(recipes) => println!("{recipes}"),
        Err(err) => {
            log::error!("recipe request failed: {err:#}");
            println!("Failed to generate recipes. Try again.");
        }
    }
    Ok(())
}

async fn run_sessions(args: SessionsArgs) -> Result<()> {
    let db = open_database().await?;
    let sessions = db.list_recent_sessions(args.limit).await?;

    if sessions.is_empty() {
        println!("No sessions recorded yet.");
        return Ok(());
    }

    for session in sessions {
        let summary = match (&session.summary_label, session.summary_angle) {
            (Some(label), _) => format!(
                "{label}{}",
                session
                    .summary_age
                    .map(|age| format!(" (age {age:.0})"))
                    .unwrap_or_default()
            ),
            (None, Some(angle)) => format!("last angle {angle:.1} deg"),
            (None, None) => "-".to_string(),
        };
        println!(
            "{}  {:<4} {:<11} {:>4} samples  {}  {}",
            session.started_at.format("%Y-%m-%d %H:%M:%S"),
            session.kind.as_str(),
            session.status.as_str(),
            session.sample_count,
            session.end_reason.as_deref().unwrap_or("-"),
            summary,
        );
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging (reads RUST_LOG env var)
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .init();

    let cli = Cli::parse();
    match cli.command {
        Command::Mood(args) => run_mood(args).await,
        Command::Pose(args) => run_pose(args).await,
        Command::Diet(args) => run_diet(args).await,
        Command::Recipes(args) => run_recipes(args).await,
        Command::Sessions(args) => run_sessions(args).await,
    }
}
