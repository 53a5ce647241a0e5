//! Voice handles and the shared registry consumed by the mixer loop.
//!
//! All mutable playback state lives behind one [`parking_lot::Mutex`]:
//! registration, deregistration, play-requests, activity checks, and each
//! single-sample mixing step serialize on it. A critical section covers at
//! most one sample slot, which bounds how long any caller can be held up by
//! the mixer.

use std::ops::Range;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::VoiceStatus;
use crate::clip::Clip;

struct Cursor {
    bytes: Arc<[u8]>,
    pos: usize,
    end: usize,
}

impl Cursor {
    fn idle() -> Cursor {
        let bytes: Arc<[u8]> = Arc::new([]);
        Cursor { bytes, pos: 0, end: 0 }
    }

    fn is_active(&self) -> bool {
        self.pos < self.end
    }
}

struct Slot {
    id: u64,
    cursor: Cursor,
}

struct Inner {
    next_id: u64,
    slots: Vec<Slot>,
}

/// Shared set of live voices, polled by the mixer once per sample frame.
///
/// The registry is an explicitly owned object: wrap it in an [`Arc`], hand
/// one clone to [`crate::Engine::start`], and create [`Voice`]s against the
/// others. Membership always equals the set of voices constructed and not
/// yet dropped.
pub struct Registry {
    inner: Mutex<Inner>,
}

impl Registry {
    /// Create an empty registry.
    pub fn new() -> Registry {
        Registry {
            inner: Mutex::new(Inner {
                next_id: 1,
                slots: Vec::new(),
            }),
        }
    }

    /// Number of registered voices.
    pub fn len(&self) -> usize {
        self.inner.lock().slots.len()
    }

    /// Whether no voices are registered.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of voices that still have samples left to play.
    pub fn active_count(&self) -> usize {
        self.inner
            .lock()
            .slots
            .iter()
            .filter(|slot| slot.cursor.is_active())
            .count()
    }

    /// Visit every active voice for one sample slot.
    ///
    /// Runs under a single critical section: each active voice yields its
    /// current byte and advances by exactly one sample. A voice registered
    /// or removed concurrently is either fully visited or fully skipped for
    /// this slot, never partially observed.
    pub fn for_each_active(&self, mut visit: impl FnMut(u8)) {
        let mut inner = self.inner.lock();
        for slot in inner.slots.iter_mut() {
            if slot.cursor.is_active() {
                visit(slot.cursor.bytes[slot.cursor.pos]);
                slot.cursor.pos += 1;
            }
        }
    }

    pub(crate) fn statuses(&self) -> Vec<VoiceStatus> {
        let inner = self.inner.lock();
        inner
            .slots
            .iter()
            .map(|slot| VoiceStatus {
                id: slot.id,
                active: slot.cursor.is_active(),
                remaining: slot.cursor.end - slot.cursor.pos,
            })
            .collect()
    }

    fn register(&self) -> u64 {
        let mut inner = self.inner.lock();
        let id = inner.next_id;
        inner.next_id += 1;
        inner.slots.push(Slot {
            id,
            cursor: Cursor::idle(),
        });
        id
    }

    fn deregister(&self, id: u64) {
        self.inner.lock().slots.retain(|slot| slot.id != id);
    }

    fn replace_cursor(&self, id: u64, bytes: Arc<[u8]>, data: Range<usize>) {
        let mut inner = self.inner.lock();
        if let Some(slot) = inner.slots.iter_mut().find(|slot| slot.id == id) {
            slot.cursor = Cursor {
                bytes,
                pos: data.start,
                end: data.end,
            };
        }
    }

    fn halt(&self, id: u64) {
        let mut inner = self.inner.lock();
        if let Some(slot) = inner.slots.iter_mut().find(|slot| slot.id == id) {
            slot.cursor.pos = slot.cursor.end;
        }
    }

    fn is_active(&self, id: u64) -> bool {
        self.inner
            .lock()
            .slots
            .iter()
            .find(|slot| slot.id == id)
            .is_some_and(|slot| slot.cursor.is_active())
    }
}

impl Default for Registry {
    fn default() -> Registry {
        Registry::new()
    }
}

/// An independent playback cursor over a clip's sample data.
///
/// Constructing a voice registers it; dropping it deregisters it. Several
/// voices may play the same clip at once, each with its own cursor over the
/// shared bytes.
pub struct Voice {
    registry: Arc<Registry>,
    id: u64,
}

impl Voice {
    /// Register a new, initially idle voice.
    pub fn new(registry: &Arc<Registry>) -> Voice {
        let id = registry.register();
        Voice {
            registry: Arc::clone(registry),
            id,
        }
    }

    /// Identifier for correlating status rows.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Start playing `clip` from its first sample.
    ///
    /// Replaces any in-flight playback immediately; no sample of the
    /// abandoned region is mixed after this call returns. An empty clip
    /// leaves the voice inactive. The mixer picks up the new cursor on its
    /// next sample frame.
    pub fn play(&self, clip: &Clip) {
        let (bytes, data) = clip.raw_parts();
        self.registry.replace_cursor(self.id, bytes, data);
    }

    /// Discard any remaining playback.
    pub fn stop(&self) {
        self.registry.halt(self.id);
    }

    /// Whether samples remain to be played, read under the same lock the
    /// mixer uses so the cursor comparison is never torn.
    pub fn active(&self) -> bool {
        self.registry.is_active(self.id)
    }
}

impl Drop for Voice {
    fn drop(&mut self) {
        self.registry.deregister(self.id);
    }
}
