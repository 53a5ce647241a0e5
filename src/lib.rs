#![deny(missing_docs)]

//! Real-time multi-voice mixer for monophonic unsigned 8-bit PCM.
//!
//! An [`Engine`] runs one dedicated mixing thread that continuously sums the
//! contributions of every active [`Voice`] in a shared [`Registry`] into
//! fixed-size interleaved `u16` blocks and hands them to a [`Transport`].
//! The transport's blocking block-write is the only pacing source: the loop
//! waits on sink backpressure, never on a timer. Callers start, stop, and
//! replace playback from any thread; every mutation and every single-sample
//! mixing step serializes on the registry's one lock, so no caller waits
//! longer than one sample slot's worth of mixer work.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::thread::{self, JoinHandle};

use tracing::{debug, warn};

/// Sample container parsing and shared clip handles.
pub mod clip;
/// Developer-facing control and console support.
pub mod control;
/// Deterministic test-signal clip builders.
pub mod probe;
/// Transport boundary between the mixer loop and the output sink.
pub mod transport;
/// Voice handles and the shared registry.
pub mod voice;


pub use crate::clip::{Clip, ClipError};
pub use crate::transport::{Transport, TransportError};
pub use crate::voice::{Registry, Voice};

/// Midpoint value that unsigned 8-bit PCM uses for zero signal.
pub const SILENCE_LEVEL: u8 = 127;

/// Silence baseline expressed at output precision.
pub const OUTPUT_SILENCE: u16 = SILENCE_LEVEL as u16 * 256;

const LEVEL_SCALE: i64 = 256;

/// Error enumeration surfaced by [`Engine::start`].
#[derive(thiserror::Error, Debug)]
pub enum EngineError {
    /// A configuration field failed validation.
    #[error("invalid engine configuration: {0}")]
    InvalidConfig(&'static str),
    /// The transport rejected the requested output layout.
    #[error("transport configuration failed")]
    Transport(#[from] TransportError),
    /// The mixer thread could not be spawned.
    #[error("failed to spawn mixer thread")]
    Spawn(#[source] std::io::Error),
}

/// Configuration for one [`Engine`].
#[derive(Clone, Debug)]
pub struct EngineConfig {
    /// Sample rate shared by every clip fed to this engine, in Hertz.
    pub sample_rate: u32,
    /// Frames per block handed to the transport.
    pub block_frames: usize,
    /// Divisor applied to `sample_rate` when configuring the transport.
    pub rate_divisor: u32,
    /// Interleaved output lanes the mono mix is duplicated into.
    pub output_lanes: usize,
}

impl Default for EngineConfig {
    fn default() -> EngineConfig {
        EngineConfig {
            sample_rate: 44_100,
            block_frames: 40,
            rate_divisor: 4,
            output_lanes: 2,
        }
    }
}

impl EngineConfig {
    /// Default configuration at the given source sample rate.
    pub fn with_sample_rate(sample_rate: u32) -> EngineConfig {
        EngineConfig {
            sample_rate,
            ..EngineConfig::default()
        }
    }

    /// Rate the transport is configured for.
    pub fn output_rate(&self) -> u32 {
        self.sample_rate / self.rate_divisor.max(1)
    }

    fn validate(&self) -> Result<(), EngineError> {
        if self.sample_rate == 0 {
            return Err(EngineError::InvalidConfig("sample_rate must be non-zero"));
        }
        if self.block_frames == 0 {
            return Err(EngineError::InvalidConfig("block_frames must be non-zero"));
        }
        if self.rate_divisor == 0 {
            return Err(EngineError::InvalidConfig("rate_divisor must be non-zero"));
        }
        if self.sample_rate / self.rate_divisor == 0 {
            return Err(EngineError::InvalidConfig("rate_divisor exceeds sample_rate"));
        }
        if self.output_lanes == 0 {
            return Err(EngineError::InvalidConfig("output_lanes must be non-zero"));
        }
        Ok(())
    }
}

/// Cooperative shutdown flag observed by the mixer loop once per block.
#[derive(Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    /// Create an uncancelled token.
    pub fn new() -> CancelToken {
        CancelToken::default()
    }

    /// Request shutdown; the loop exits at the next block boundary.
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    /// Whether shutdown has been requested.
    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

/// Block renderer summing all active voices one sample slot at a time.
pub struct Mixer {
    registry: Arc<Registry>,
    lanes: usize,
}

impl Mixer {
    /// Create a mixer reading from the given registry.
    pub fn new(registry: Arc<Registry>, lanes: usize) -> Mixer {
        Mixer {
            registry,
            lanes: lanes.max(1),
        }
    }

    /// Fill `block` with `block.len() / lanes` mixed output frames.
    ///
    /// Each slot runs one registry critical section: every active voice
    /// contributes its current byte scaled to output precision and advances
    /// by one sample. One silence bias is removed per contributor, the sum
    /// is clamped to the output range, and the result lands in every lane of
    /// the slot.
    pub fn process(&mut self, block: &mut [u16]) {
        let frames = block.len() / self.lanes;
        for frame in 0..frames {
            let mut sum = i64::from(OUTPUT_SILENCE);
            let mut count: i64 = 0;
            self.registry.for_each_active(|sample| {
                sum += i64::from(sample) * LEVEL_SCALE;
                count += 1;
            });
            if count != 0 {
                sum -= i64::from(OUTPUT_SILENCE) * count;
            }
            let value = sum.clamp(0, i64::from(u16::MAX)) as u16;
            let base = frame * self.lanes;
            block[base..base + self.lanes].fill(value);
        }
    }
}

/// Snapshot of one voice for status displays.
#[derive(Clone, Debug)]
pub struct VoiceStatus {
    /// Identifier from [`Voice::id`].
    pub id: u64,
    /// Whether the voice still has samples left to play.
    pub active: bool,
    /// Samples remaining until the cursor reaches its end.
    pub remaining: usize,
}

/// Aggregated engine snapshot used by control surfaces.
#[derive(Clone, Debug)]
pub struct EngineStatus {
    /// Source sample rate in Hertz.
    pub sample_rate: u32,
    /// Rate the transport was configured for.
    pub output_rate: u32,
    /// Frames per transport block.
    pub block_frames: usize,
    /// Interleaved output lanes.
    pub output_lanes: usize,
    /// Duration of one block in milliseconds.
    pub block_ms: f32,
    /// Blocks handed to the transport so far.
    pub blocks_written: u64,
    /// Per-voice rows.
    pub voices: Vec<VoiceStatus>,
}

/// Owner of one mixing loop: configuration, thread, token, and transport.
pub struct Engine {
    registry: Arc<Registry>,
    config: EngineConfig,
    shutdown: CancelToken,
    blocks_written: Arc<AtomicU64>,
    handle: Option<JoinHandle<()>>,
}

impl Engine {
    /// Configure the transport for the target output layout and start the
    /// mixer thread.
    ///
    /// The registry is injected rather than owned so several engines can
    /// coexist in one process, each over its own voice set.
    pub fn start(
        config: EngineConfig,
        registry: Arc<Registry>,
        mut transport: Box<dyn Transport>,
    ) -> Result<Engine, EngineError> {
        config.validate()?;
        transport.configure(config.output_rate(), config.output_lanes)?;

        let shutdown = CancelToken::new();
        let blocks_written = Arc::new(AtomicU64::new(0));
        let mixer = Mixer::new(Arc::clone(&registry), config.output_lanes);
        let block_samples = config.block_frames * config.output_lanes;
        let loop_token = shutdown.clone();
        let loop_blocks = Arc::clone(&blocks_written);
        let handle = thread::Builder::new()
            .name("mixer".into())
            .spawn(move || mix_loop(mixer, transport, block_samples, loop_token, loop_blocks))
            .map_err(EngineError::Spawn)?;

        Ok(Engine {
            registry,
            config,
            shutdown,
            blocks_written,
            handle: Some(handle),
        })
    }

    /// The registry this engine mixes from.
    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    /// A clone of the loop's cancellation token.
    pub fn cancel_token(&self) -> CancelToken {
        self.shutdown.clone()
    }

    /// Current snapshot for status displays.
    pub fn status(&self) -> EngineStatus {
        let output_rate = self.config.output_rate();
        EngineStatus {
            sample_rate: self.config.sample_rate,
            output_rate,
            block_frames: self.config.block_frames,
            output_lanes: self.config.output_lanes,
            block_ms: self.config.block_frames as f32 / output_rate as f32 * 1_000.0,
            blocks_written: self.blocks_written.load(Ordering::Relaxed),
            voices: self.registry.statuses(),
        }
    }

    /// Request shutdown and wait for the loop to finish its current block.
    pub fn shutdown(mut self) {
        self.stop();
    }

    fn stop(&mut self) {
        self.shutdown.cancel();
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for Engine {
    fn drop(&mut self) {
        self.stop();
    }
}

fn mix_loop(
    mut mixer: Mixer,
    mut transport: Box<dyn Transport>,
    block_samples: usize,
    shutdown: CancelToken,
    blocks_written: Arc<AtomicU64>,
) {
    // Allocated once; the loop itself never allocates.
    let mut block = vec![0u16; block_samples];
    debug!(block_samples, "mixer loop running");
    while !shutdown.is_cancelled() {
        mixer.process(&mut block);
        match transport.write_block(&block) {
            Ok(written) => {
                if written != block.len() {
                    debug!(written, expected = block.len(), "short transport write");
                }
                blocks_written.fetch_add(1, Ordering::Relaxed);
            }
            Err(err) => {
                warn!(error = %err, "transport write failed, stopping mixer");
                break;
            }
        }
    }
    debug!("mixer loop stopped");
}
