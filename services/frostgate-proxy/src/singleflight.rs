//! Single-flight registry for reload attempts.
//!
//! At most one completion signal exists per collection name at any time. The
//! caller that stores a fresh signal becomes the sole initiator of the
//! underlying reload; everyone else observes the existing signal. The entry
//! is removed unconditionally once the reload finishes, success or failure,
//! so a failed attempt never blocks future ones.

use std::collections::HashMap;

use parking_lot::Mutex;
use tokio::sync::watch;

pub struct ReloadGate {
    inflight: Mutex<HashMap<String, watch::Receiver<bool>>>,
}

impl Default for ReloadGate {
    fn default() -> Self {
        Self::new()
    }
}

impl ReloadGate {
    pub fn new() -> Self {
        Self {
            inflight: Mutex::new(HashMap::new()),
        }
    }

    /// Joins the in-flight reload for `name`, creating it if absent.
    ///
    /// Returns the completion signal plus, for the one caller that created
    /// the entry, the sender it must hand to [`ReloadGate::finish`].
    pub fn join(&self, name: &str) -> (watch::Receiver<bool>, Option<watch::Sender<bool>>) {
        let mut inflight = self.inflight.lock();
        if let Some(rx) = inflight.get(name) {
            return (rx.clone(), None);
        }
        let (tx, rx) = watch::channel(false);
        inflight.insert(name.to_string(), rx.clone());
        (rx, Some(tx))
    }

    /// Removes the entry and fires the completion signal.
    pub fn finish(&self, name: &str, tx: watch::Sender<bool>) {
        self.inflight.lock().remove(name);
        let _ = tx.send(true);
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.inflight.lock().len()
    }
}
