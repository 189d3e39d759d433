use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
    time::{Duration, Instant},
};

use {
    rand::RngCore,
    tracing::{debug, info},
};

/// Shared store of unconsumed download passes.
///
/// Cloning hands out another handle to the same store. All check-and-mutate
/// sequences run inside one lock acquisition, so two concurrent consumers
/// of the same pass cannot both succeed.
#[derive(Clone)]
pub struct PassStore {
    issued: Arc<Mutex<HashMap<String, Instant>>>,
    ttl: Duration,
}

impl PassStore {
    pub fn new(ttl: Duration) -> Self {
        Self {
            issued: Arc::new(Mutex::new(HashMap::new())),
            ttl,
        }
    }

    /// Issue a fresh pass and return its identifier.
    ///
    /// Callers must only invoke this after the presented token passed
    /// device validation; the store itself holds no token state.
    pub fn issue(&self) -> String {
        let id = new_pass_id();
        self.lock().insert(id.clone(), Instant::now());
        info!(pass = %abbrev(&id), "download pass issued");
        id
    }

    /// Whether `id` names a pass that is present and unexpired.
    ///
    /// An expired entry found here is removed on the spot.
    pub fn is_valid(&self, id: &str) -> bool {
        let mut issued = self.lock();
        let expired = match issued.get(id) {
            Some(at) => at.elapsed() > self.ttl,
            None => return false,
        };
        if expired {
            issued.remove(id);
            debug!(pass = %abbrev(id), "pass expired");
            return false;
        }
        true
    }

    /// Consume `id`: remove it and report whether it was still live.
    ///
    /// Removal and the expiry check happen under one lock, so at most one
    /// of any number of concurrent consumers gets `true`.
    pub fn consume(&self, id: &str) -> bool {
        let removed = self.lock().remove(id);
        match removed {
            Some(at) if at.elapsed() <= self.ttl => {
                info!(pass = %abbrev(id), "download pass consumed");
                true
            },
            Some(_) => {
                debug!(pass = %abbrev(id), "pass expired before consumption");
                false
            },
            None => false,
        }
    }

    /// Time-to-live applied to every issued pass.
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Number of currently stored (possibly expired) passes.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, Instant>> {
        // A poisoned lock only means another holder panicked mid-access;
        // the map itself stays usable.
        self.issued.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// 256 bits of OS randomness, hex-encoded.
fn new_pass_id() -> String {
    let mut bytes = [0u8; 32];
    rand::rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

/// Short prefix for log lines; full identifiers never hit the logs.
fn abbrev(id: &str) -> &str {
    &id[..id.len().min(8)]
}
