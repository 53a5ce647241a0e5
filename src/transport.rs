//! Transport boundary between the mixer loop and the output sink.
//!
//! A [`Transport`] is the hardware side of the system reduced to two typed
//! calls: a configuration primitive and a blocking block-write. The write's
//! unbounded wait for sink space is the engine's only flow control and its
//! only timing source.

use std::thread;
use std::time::Duration;

use crossbeam_channel::{Receiver, Sender, bounded};

/// Queue depth of the loopback transport, matching a two-buffer DMA chain.
pub const DEFAULT_QUEUE_BLOCKS: usize = 2;

/// Error enumeration surfaced by transport implementations.
#[derive(thiserror::Error, Debug)]
pub enum TransportError {
    /// The receiving side of the transport is gone.
    #[error("transport closed")]
    Closed,
    /// The sink cannot be configured for the requested layout.
    #[error("unsupported output layout: {0} lanes")]
    UnsupportedLanes(usize),
}

/// Output sink for mixed blocks.
pub trait Transport: Send {
    /// Prepare the sink for the given output rate and interleaved lane
    /// count.
    fn configure(&mut self, sample_rate: u32, lanes: usize) -> Result<(), TransportError>;

    /// Write one interleaved block, blocking without timeout until the sink
    /// accepts it. Returns the number of samples taken; a short count is
    /// reported to the caller but never retried.
    fn write_block(&mut self, block: &[u16]) -> Result<usize, TransportError>;
}

/// Create a loopback transport over a bounded in-process queue.
///
/// A full queue blocks the mixer until the receiver drains a block — the
/// same backpressure a hardware buffer chain provides.
pub fn block_channel(capacity_blocks: usize) -> (ChannelTransport, BlockReceiver) {
    let (tx, rx) = bounded(capacity_blocks);
    (ChannelTransport { tx }, BlockReceiver { rx })
}

/// Sending half of the loopback transport, driven by the mixer.
pub struct ChannelTransport {
    tx: Sender<Box<[u16]>>,
}

impl Transport for ChannelTransport {
    fn configure(&mut self, _sample_rate: u32, lanes: usize) -> Result<(), TransportError> {
        if lanes == 0 {
            return Err(TransportError::UnsupportedLanes(lanes));
        }
        Ok(())
    }

    fn write_block(&mut self, block: &[u16]) -> Result<usize, TransportError> {
        self.tx
            .send(Box::from(block))
            .map_err(|_| TransportError::Closed)?;
        Ok(block.len())
    }
}

/// Receiving half of the loopback transport.
pub struct BlockReceiver {
    rx: Receiver<Box<[u16]>>,
}

impl BlockReceiver {
    /// Block until the next mixed block arrives; `None` once the mixer side
    /// is gone.
    pub fn recv(&self) -> Option<Box<[u16]>> {
        self.rx.recv().ok()
    }

    /// Fetch a block without waiting.
    pub fn try_recv(&self) -> Option<Box<[u16]>> {
        self.rx.try_recv().ok()
    }
}

/// Discarding sink that sleeps one block period per write, standing in for
/// the hardware output clock.
pub struct NullSink {
    sample_rate: u32,
    lanes: usize,
}

impl NullSink {
    /// Create an unconfigured sink; the engine configures it on start.
    pub fn new() -> NullSink {
        NullSink {
            sample_rate: 0,
            lanes: 1,
        }
    }
}

impl Default for NullSink {
    fn default() -> NullSink {
        NullSink::new()
    }
}

impl Transport for NullSink {
    fn configure(&mut self, sample_rate: u32, lanes: usize) -> Result<(), TransportError> {
        if lanes == 0 {
            return Err(TransportError::UnsupportedLanes(lanes));
        }
        self.sample_rate = sample_rate;
        self.lanes = lanes;
        Ok(())
    }

    fn write_block(&mut self, block: &[u16]) -> Result<usize, TransportError> {
        if self.sample_rate > 0 {
            let frames = block.len() / self.lanes;
            thread::sleep(Duration::from_secs_f64(
                frames as f64 / f64::from(self.sample_rate),
            ));
        }
        Ok(block.len())
    }
}
