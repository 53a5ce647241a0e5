//! Deterministic test-signal clip builders for self-tests and the demo
//! console.

use std::f32::consts::TAU;

use crate::SILENCE_LEVEL;
use crate::clip::Clip;

const SINE_AMPLITUDE: f32 = 100.0;

/// Synthesize a sine clip oscillating around the silence midpoint.
pub fn sine_clip(sample_rate: u16, frequency_hz: f32, frames: usize) -> Clip {
    let step = frequency_hz / f32::from(sample_rate.max(1));
    let mut phase = 0.0f32;
    let mut samples = Vec::with_capacity(frames);
    for _ in 0..frames {
        let value = f32::from(SILENCE_LEVEL) + (phase * TAU).sin() * SINE_AMPLITUDE;
        samples.push(value.clamp(0.0, 255.0) as u8);
        phase = (phase + step).fract();
    }
    Clip::from_pcm(sample_rate, samples)
}

/// Synthesize a clip that holds one level for its whole length.
pub fn level_clip(sample_rate: u16, level: u8, frames: usize) -> Clip {
    Clip::from_pcm(sample_rate, vec![level; frames])
}
