//! Fixed-offset sample container parsing and shared clip handles.
//!
//! A [`Clip`] pairs reference-counted ownership of a raw byte buffer with
//! the sample-rate and data-range fields read from the container header.
//! Voices retain a clone of the underlying [`Arc`], so sample data stays
//! alive for as long as any clip or in-flight playback still points at it.

use std::ops::Range;
use std::sync::Arc;

const SAMPLE_RATE_LO: usize = 24;
const SAMPLE_RATE_HI: usize = 25;
const DATA_SIZE_LO: usize = 40;
const DATA_SIZE_MID: usize = 41;
const DATA_SIZE_HI: usize = 42;
const DATA_START: usize = 44;

/// Error enumeration for container parsing.
#[derive(thiserror::Error, Debug)]
pub enum ClipError {
    /// Buffer ends before the fixed 44-byte header.
    #[error("container truncated: {0} bytes, header needs {DATA_START}")]
    Truncated(usize),
    /// Declared PCM size runs past the end of the buffer.
    #[error("declared data size {declared} exceeds {available} available bytes")]
    DataOutOfBounds {
        /// Size announced by the header.
        declared: usize,
        /// Bytes actually present after the header.
        available: usize,
    },
}

/// Parsed, shared-ownership handle to unsigned 8-bit PCM sample data.
#[derive(Clone, Debug)]
pub struct Clip {
    bytes: Arc<[u8]>,
    data: Range<usize>,
    sample_rate: u16,
}

impl Clip {
    /// Parse a container from a shared byte buffer.
    ///
    /// The layout is fixed-offset: the sample rate sits at bytes 24/25, a
    /// 24-bit PCM data size at bytes 40..43, and raw samples start at byte
    /// 44. The declared size must fit inside the buffer.
    pub fn parse(bytes: Arc<[u8]>) -> Result<Clip, ClipError> {
        if bytes.len() < DATA_START {
            return Err(ClipError::Truncated(bytes.len()));
        }
        let sample_rate = (u16::from(bytes[SAMPLE_RATE_HI]) << 8) | u16::from(bytes[SAMPLE_RATE_LO]);
        let data_len = (usize::from(bytes[DATA_SIZE_HI]) << 16)
            | (usize::from(bytes[DATA_SIZE_MID]) << 8)
            | usize::from(bytes[DATA_SIZE_LO]);
        let available = bytes.len() - DATA_START;
        if data_len > available {
            return Err(ClipError::DataOutOfBounds {
                declared: data_len,
                available,
            });
        }
        Ok(Clip {
            bytes,
            data: DATA_START..DATA_START + data_len,
            sample_rate,
        })
    }

    /// Wrap raw unsigned 8-bit samples that carry no container header.
    pub fn from_pcm(sample_rate: u16, samples: impl Into<Arc<[u8]>>) -> Clip {
        let bytes = samples.into();
        let data = 0..bytes.len();
        Clip {
            bytes,
            data,
            sample_rate,
        }
    }

    /// Sample rate declared by the container, in Hertz.
    pub fn sample_rate(&self) -> u16 {
        self.sample_rate
    }

    /// Clip length in seconds.
    pub fn duration(&self) -> f32 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.len() as f32 / f32::from(self.sample_rate)
    }

    /// The raw sample bytes.
    pub fn samples(&self) -> &[u8] {
        &self.bytes[self.data.clone()]
    }

    /// Number of samples.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Whether the clip holds no samples.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub(crate) fn raw_parts(&self) -> (Arc<[u8]>, Range<usize>) {
        (Arc::clone(&self.bytes), self.data.clone())
    }
}
