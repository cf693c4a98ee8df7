pub mod chime;

use chime::CompletionChime;

use rodio::{OutputStream, Sink};
use std::sync::{
    mpsc::{self, Sender},
    Arc, Mutex,
};
use std::thread;

use log::warn;

enum AudioCommand {
    PlayChime,
}

/// Plays the short session-complete cue.
///
/// The rodio output stream and sink are not `Send`, so a dedicated thread
/// owns them and is fed over an mpsc channel. The thread (and the audio
/// device) is only brought up on the first chime.
#[derive(Clone)]
pub struct ChimeHandle {
    tx: Arc<Mutex<Option<Sender<AudioCommand>>>>,
}

impl ChimeHandle {
    pub fn new() -> Self {
        Self {
            tx: Arc::new(Mutex::new(None)),
        }
    }

    fn ensure_thread(&self) -> Result<Sender<AudioCommand>, String> {
        if let Some(tx) = self.tx.lock().map_err(|e| e.to_string())?.as_ref() {
            return Ok(tx.clone());
        }

        let (tx, rx) = mpsc::channel::<AudioCommand>();

        thread::Builder::new()
            .name("chime-engine".to_string())
            .spawn(move || {
                let mut _stream: Option<OutputStream> = None;
                let mut sink: Option<Sink> = None;

                fn ensure_sink(
                    stream: &mut Option<OutputStream>,
                    sink: &mut Option<Sink>,
                ) -> Result<(), String> {
                    if sink.is_none() {
                        let (s, handle) = OutputStream::try_default()
                            .map_err(|e| format!("Failed to create audio output stream: {}", e))?;
                        let new_sink = Sink::try_new(&handle)
                            .map_err(|e| format!("Failed to create audio sink: {}", e))?;
                        *stream = Some(s);
                        *sink = Some(new_sink);
                    }
                    Ok(())
                }

                while let Ok(cmd) = rx.recv() {
                    match cmd {
                        AudioCommand::PlayChime => {
                            if let Err(err) = ensure_sink(&mut _stream, &mut sink) {
                                warn!("chime unavailable: {err}");
                                continue;
                            }
                            if let Some(ref s) = sink {
                                s.append(CompletionChime::new());
                            }
                        }
                    }
                }
            })
            .map_err(|e| e.to_string())?;

        let tx_clone = tx.clone();
        *self.tx.lock().map_err(|e| e.to_string())? = Some(tx);
        Ok(tx_clone)
    }

    /// Fire-and-forget; a missing audio device only logs.
    pub fn play_completion_chime(&self) {
        match self.ensure_thread() {
            Ok(tx) => {
                if tx.send(AudioCommand::PlayChime).is_err() {
                    warn!("chime thread gone");
                }
            }
            Err(err) => warn!("failed to start chime thread: {err}"),
        }
    }
}

impl Default for ChimeHandle {
    fn default() -> Self {
        Self::new()
    }
}
