use rodio::Source;
use std::f32::consts::PI;
use std::time::Duration;

const SAMPLE_RATE: u32 = 44100;
const FREQ_HZ: f32 = 880.0;
const DURATION_SECS: f32 = 0.6;

/// Session-complete cue: a single tone with a linear fade-out.
pub struct CompletionChime {
    sample_rate: u32,
    num_sample: usize,
    total_samples: usize,
}

impl CompletionChime {
    pub fn new() -> Self {
        Self {
            sample_rate: SAMPLE_RATE,
            num_sample: 0,
            total_samples: (SAMPLE_RATE as f32 * DURATION_SECS) as usize,
        }
    }
}

impl Default for CompletionChime {
    fn default() -> Self {
        Self::new()
    }
}

impl Iterator for CompletionChime {
    type Item = f32;

    fn next(&mut self) -> Option<Self::Item> {
        if self.num_sample >= self.total_samples {
            return None;
        }
        self.num_sample += 1;

        let t = self.num_sample as f32 / self.sample_rate as f32;
        let envelope = 1.0 - self.num_sample as f32 / self.total_samples as f32;
        let sample = (2.0 * PI * FREQ_HZ * t).sin();

        Some(sample * envelope * 0.15) // Lower amplitude to prevent clipping
    }
}

impl Source for CompletionChime {
    fn current_frame_len(&self) -> Option<usize> {
        Some(self.total_samples - self.num_sample)
    }

    fn channels(&self) -> u16 {
        1 // Mono
    }

    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn total_duration(&self) -> Option<Duration> {
        Some(Duration::from_secs_f32(DURATION_SECS))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chime_is_finite_and_fades_to_silence() {
        let samples: Vec<f32> = CompletionChime::new().collect();
        assert_eq!(samples.len(), (SAMPLE_RATE as f32 * DURATION_SECS) as usize);
        // Every sample stays inside the clipping margin.
        assert!(samples.iter().all(|s| s.abs() <= 0.15));
        // The tail is quieter than the head.
        let head: f32 = samples[..1000].iter().map(|s| s.abs()).sum();
        let tail: f32 = samples[samples.len() - 1000..].iter().map(|s| s.abs()).sum();
        assert!(tail < head);
    }
}
