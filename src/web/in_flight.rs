use std::collections::HashSet;
use std::sync::{Arc, Mutex};

/// Identities with an analysis currently running.
///
/// A subscriber gets one analysis at a time; a second trigger while the
/// first is still running is refused rather than queued.
#[derive(Debug, Default)]
pub struct InFlight {
    ids: Mutex<HashSet<String>>,
}

impl InFlight {
    /// Claim `id`. Returns `None` if it is already claimed.
    pub fn try_begin(self: &Arc<Self>, id: &str) -> Option<InFlightGuard> {
        let mut ids = self.ids.lock().unwrap();
        if !ids.insert(id.to_string()) {
            return None;
        }
        Some(InFlightGuard {
            owner: Arc::clone(self),
            id: id.to_string(),
        })
    }

    pub fn is_running(&self, id: &str) -> bool {
        self.ids.lock().unwrap().contains(id)
    }
}

/// Releases the claim when dropped, including when the request future is
/// dropped mid-flight.
#[derive(Debug)]
pub struct InFlightGuard {
    owner: Arc<InFlight>,
    id: String,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.owner.ids.lock().unwrap().remove(&self.id);
    }
}
