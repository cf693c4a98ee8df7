//! Fire-and-forget text-to-speech channel.

use std::sync::mpsc::{self, Sender};
use std::sync::Mutex;
use std::thread::{self, JoinHandle};

use log::{error, warn};

use crate::settings::SpeechSettings;

/// Downstream consumer for spoken feedback. `speak` must not block the
/// caller; delivery failures are the implementation's problem.
pub trait SpeechChannel: Send + Sync {
    fn speak(&self, text: &str);
}

/// Discards all feedback. Used when speech is disabled in settings.
pub struct NullSpeech;

impl SpeechChannel for NullSpeech {
    fn speak(&self, _text: &str) {}
}

enum SpeechCommand {
    Speak(String),
    Shutdown,
}

/// Speaks through the platform synthesizer (`say` on macOS, `espeak`
/// elsewhere) on a dedicated thread, fed over an mpsc channel so callers
/// never wait on the synthesizer process.
pub struct SystemSpeech {
    tx: Sender<SpeechCommand>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl SystemSpeech {
    pub fn new(settings: SpeechSettings) -> anyhow::Result<Self> {
        let (tx, rx) = mpsc::channel::<SpeechCommand>();

        let worker = thread::Builder::new()
            .name("speech-engine".to_string())
            .spawn(move || {
                while let Ok(command) = rx.recv() {
                    match command {
                        SpeechCommand::Speak(text) => run_synthesizer(&settings, &text),
                        SpeechCommand::Shutdown => break,
                    }
                }
            })
            .map_err(|err| anyhow::anyhow!("failed to spawn speech thread: {err}"))?;

        Ok(Self {
            tx,
            worker: Mutex::new(Some(worker)),
        })
    }
}

fn run_synthesizer(settings: &SpeechSettings, text: &str) {
    let mut command = if cfg!(target_os = "macos") {
        let mut cmd = std::process::Command::new("say");
        if let Some(voice) = &settings.voice {
            cmd.arg("-v").arg(voice);
        }
        if let Some(rate) = settings.rate_wpm {
            cmd.arg("-r").arg(rate.to_string());
        }
        cmd.arg(text);
        cmd
    } else {
        let mut cmd = std::process::Command::new("espeak");
        if let Some(voice) = &settings.voice {
            cmd.arg("-v").arg(voice);
        }
        if let Some(rate) = settings.rate_wpm {
            cmd.arg("-s").arg(rate.to_string());
        }
        cmd.arg(text);
        cmd
    };

    match command.status() {
        Ok(status) if status.success() => {}
        Ok(status) => warn!("speech synthesizer exited with {status}"),
        Err(err) => warn!("failed to run speech synthesizer: {err}"),
    }
}

impl SpeechChannel for SystemSpeech {
    fn speak(&self, text: &str) {
        if self.tx.send(SpeechCommand::Speak(text.to_string())).is_err() {
            warn!("speech thread gone, dropping feedback: {text}");
        }
    }
}

impl Drop for SystemSpeech {
    fn drop(&mut self) {
        let mut guard = match self.worker.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };

        if let Some(handle) = guard.take() {
            let _ = self.tx.send(SpeechCommand::Shutdown);
            if handle.join().is_err() {
                error!("failed to join speech thread");
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::SpeechChannel;
    use std::sync::{Arc, Mutex};

    /// Records everything spoken, for asserting on feedback sequences.
    #[derive(Default)]
    pub struct RecordingSpeech {
        pub lines: Arc<Mutex<Vec<String>>>,
    }

    impl RecordingSpeech {
        pub fn new() -> (Arc<Self>, Arc<Mutex<Vec<String>>>) {
            let lines = Arc::new(Mutex::new(Vec::new()));
            (
                Arc::new(Self {
                    lines: lines.clone(),
                }),
                lines,
            )
        }
    }

    impl SpeechChannel for RecordingSpeech {
        fn speak(&self, text: &str) {
            self.lines.lock().unwrap().push(text.to_string());
        }
    }
}
