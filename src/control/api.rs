use crate::{Engine, EngineStatus};

/// Fetch the current status snapshot from a running engine.
pub fn status(engine: &Engine) -> EngineStatus {
    engine.status()
}
