//! Hooks for collaborators that react to pipeline results.
//!
//! Observers run after the item's fate is settled and cannot change the
//! outcome. Slow work runs on background threads; `finish` waits for it
//! before the process exits.

mod command;
mod library;

pub use command::CommandNotifier;
pub use library::LibraryRefresher;

use crate::classifier::Category;
use crate::item::MediaItem;
use crate::pipeline::ProcessingOutcome;
use std::path::Path;

pub trait OutcomeObserver: Send + Sync {
    /// A main media file landed in the library
    fn on_transfer_success(&self, _category: Category, _destination: &Path) {}

    /// Every terminal outcome, including successes
    fn on_outcome(&self, _item: &MediaItem, _outcome: &ProcessingOutcome) {}

    /// Block until background work started by the callbacks is done
    fn finish(&self) {}
}

/// Records every callback, for assertions in tests
#[cfg(test)]
pub struct RecordingObserver {
    pub events: std::sync::Arc<std::sync::Mutex<Vec<String>>>,
}

#[cfg(test)]
impl RecordingObserver {
    pub fn new() -> (Self, std::sync::Arc<std::sync::Mutex<Vec<String>>>) {
        let events = std::sync::Arc::new(std::sync::Mutex::new(Vec::new()));
        (
            Self {
                events: std::sync::Arc::clone(&events),
            },
            events,
        )
    }
}

#[cfg(test)]
impl OutcomeObserver for RecordingObserver {
    fn on_transfer_success(&self, category: Category, destination: &Path) {
        self.events
            .lock()
            .unwrap()
            .push(format!("transfer {category} {}", destination.display()));
    }

    fn on_outcome(&self, item: &MediaItem, outcome: &ProcessingOutcome) {
        self.events
            .lock()
            .unwrap()
            .push(format!("outcome {} {}", outcome.label(), item.name()));
    }

    fn finish(&self) {
        self.events.lock().unwrap().push("finish".to_string());
    }
}
