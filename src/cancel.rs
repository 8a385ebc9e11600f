//! Cooperative cancellation: a caller-owned token checked at fixed
//! checkpoints between analysis stages, plus a registry that maps live
//! runs to caller identities so an out-of-band signal can cancel them.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tracing::debug;

/// Cloneable cancellation flag shared between a run and its caller.
///
/// There is no mid-stage preemption: a run notices cancellation only at
/// its next checkpoint.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    flag: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation. Idempotent.
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

/// Who started a run; used to target cancellation requests.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CallerIdentity {
    /// Account name, if the caller is authenticated.
    pub username: Option<String>,
    /// Network address fallback for anonymous callers.
    pub address: Option<String>,
}

impl CallerIdentity {
    pub fn user(username: impl Into<String>) -> Self {
        Self {
            username: Some(username.into()),
            address: None,
        }
    }

    pub fn address(address: impl Into<String>) -> Self {
        Self {
            username: None,
            address: Some(address.into()),
        }
    }

    /// A cancellation request matches a run when either identity
    /// component coincides.
    fn matches(&self, other: &CallerIdentity) -> bool {
        (self.username.is_some() && self.username == other.username)
            || (self.address.is_some() && self.address == other.address)
    }
}

struct RunEntry {
    caller: CallerIdentity,
    token: CancellationToken,
}

/// Registry of in-flight analysis runs.
///
/// Owned by the surrounding service and injected into the engine; runs
/// register on start and are guaranteed to deregister on every exit path
/// via the RAII guard. The inner map is the only shared mutable state in
/// the engine.
#[derive(Default)]
pub struct RunRegistry {
    runs: Mutex<HashMap<u64, RunEntry>>,
    counter: std::sync::atomic::AtomicU64,
    global_cancel: AtomicBool,
}

impl RunRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a run and get a fresh token plus a deregistration guard.
    pub fn register(self: &Arc<Self>, caller: CallerIdentity) -> (CancellationToken, RunGuard) {
        let token = CancellationToken::new();
        let guard = self.register_with(caller, token.clone());
        (token, guard)
    }

    /// Register a run under a caller-owned token.
    pub fn register_with(
        self: &Arc<Self>,
        caller: CallerIdentity,
        token: CancellationToken,
    ) -> RunGuard {
        let id = self.counter.fetch_add(1, Ordering::SeqCst);
        self.runs
            .lock()
            .expect("registry lock poisoned")
            .insert(id, RunEntry { caller, token });
        debug!(run_id = id, "registered analysis run");
        RunGuard {
            registry: Arc::clone(self),
            id,
        }
    }

    /// Cancel every run started by a matching caller and set the
    /// process-wide flag. Returns the number of runs signalled.
    pub fn cancel_caller(&self, caller: &CallerIdentity) -> usize {
        self.global_cancel.store(true, Ordering::SeqCst);
        let runs = self.runs.lock().expect("registry lock poisoned");
        let mut cancelled = 0;
        for entry in runs.values() {
            if entry.caller.matches(caller) {
                entry.token.cancel();
                cancelled += 1;
            }
        }
        debug!(cancelled, "cancellation request processed");
        cancelled
    }

    /// Clear the process-wide flag; called when a new run starts.
    pub fn reset_global(&self) {
        self.global_cancel.store(false, Ordering::SeqCst);
    }

    pub fn globally_cancelled(&self) -> bool {
        self.global_cancel.load(Ordering::SeqCst)
    }

    /// Number of currently registered runs.
    pub fn active_runs(&self) -> usize {
        self.runs.lock().expect("registry lock poisoned").len()
    }

    fn deregister(&self, id: u64) {
        self.runs.lock().expect("registry lock poisoned").remove(&id);
        debug!(run_id = id, "deregistered analysis run");
    }
}

/// RAII guard that removes the registry entry when dropped, on success,
/// error and cancellation alike.
pub struct RunGuard {
    registry: Arc<RunRegistry>,
    id: u64,
}

impl Drop for RunGuard {
    fn drop(&mut self) {
        self.registry.deregister(self.id);
    }
}
