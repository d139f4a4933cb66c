//! Device connectivity collaborator.

use std::sync::atomic::{AtomicBool, Ordering};

/// Reports whether the host currently has network access.
pub trait Connectivity: Send + Sync {
    fn is_online(&self) -> bool;
}

/// Connectivity backed by a flag the host application flips.
#[derive(Debug)]
pub struct ConnectivityFlag {
    online: AtomicBool,
}

impl ConnectivityFlag {
    pub fn new(online: bool) -> Self {
        Self {
            online: AtomicBool::new(online),
        }
    }

    pub fn set_online(&self, online: bool) {
        self.online.store(online, Ordering::Relaxed);
    }
}

impl Default for ConnectivityFlag {
    fn default() -> Self {
        Self::new(true)
    }
}

impl Connectivity for ConnectivityFlag {
    fn is_online(&self) -> bool {
        self.online.load(Ordering::Relaxed)
    }
}
