use std::sync::Arc;

use callejero_core::{Place, SessionState};
use parking_lot::RwLock;

/// Holds the session's current location and place set. Implementations must
/// replace the whole state atomically; the place list is never merged.
pub trait SessionStore: Send + Sync {
    fn snapshot(&self) -> SessionState;
    fn replace(&self, location: (f64, f64), places: Vec<Place>);
}

/// Process-lifetime in-memory store. State does not survive restarts.
#[derive(Clone, Default)]
pub struct MemoryStore {
    state: Arc<RwLock<SessionState>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SessionStore for MemoryStore {
    fn snapshot(&self) -> SessionState {
        self.state.read().clone()
    }

    fn replace(&self, location: (f64, f64), places: Vec<Place>) {
        let mut state = self.state.write();
        state.current_location = Some(location);
        state.current_places = places;
    }
}
