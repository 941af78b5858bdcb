//! Biased-call pool.
//!
//! Calls registered here are sampled directly by the generator, on top of
//! their natural choice-table weight. The pool is used to raise coverage of
//! architecture-specific syscalls that the trained model rarely picks.
//!
//! A process-wide instance is available through [`global`]; it starts empty
//! on first use and grows for the life of the process. Tests and embedders
//! that want isolation construct their own [`BiasRegistry`] and hand it to
//! [`Generator::with_registry`](crate::generation::Generator::with_registry).

use alloc::sync::Arc;
use alloc::vec::Vec;

use spin::RwLock;

use crate::target::{Syscall, Target};

/// Grow-only set of calls eligible for biased sampling.
///
/// Never holds a disabled or no-generate call, never holds the same
/// descriptor twice.
pub struct BiasRegistry {
    calls: RwLock<Vec<Arc<Syscall>>>,
}

impl BiasRegistry {
    pub const fn new() -> Self {
        Self {
            calls: RwLock::new(Vec::new()),
        }
    }

    /// Add `call` to the pool.
    ///
    /// Missing, disabled, no-generate and already registered calls are
    /// ignored. Returns whether the pool grew.
    pub fn register(&self, call: Option<&Arc<Syscall>>) -> bool {
        let Some(call) = call else {
            return false;
        };
        if !call.is_generatable() {
            log::trace!("[KPIO Gen] not biasing ineligible call {}", call.name);
            return false;
        }

        let mut calls = self.calls.write();
        if calls.iter().any(|c| Arc::ptr_eq(c, call)) {
            return false;
        }
        calls.push(call.clone());
        log::debug!(
            "[KPIO Gen] biased call registered: {} ({} in pool)",
            call.name,
            calls.len()
        );
        true
    }

    /// Register every call of `target` specific to `arch`.
    ///
    /// Returns the number of calls newly added.
    pub fn register_arch_calls(&self, target: &Target, arch: &str) -> usize {
        target
            .syscalls()
            .iter()
            .filter(|call| call.arch.as_deref() == Some(arch))
            .filter(|call| self.register(Some(*call)))
            .count()
    }

    /// Copy of the current pool.
    pub fn snapshot(&self) -> Vec<Arc<Syscall>> {
        self.calls.read().clone()
    }

    pub fn len(&self) -> usize {
        self.calls.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.calls.read().is_empty()
    }
}

impl Default for BiasRegistry {
    fn default() -> Self {
        Self::new()
    }
}

static BIASED_CALLS: BiasRegistry = BiasRegistry::new();

/// The process-wide pool.
pub fn global() -> &'static BiasRegistry {
    &BIASED_CALLS
}

/// Register `call` in the process-wide pool.
pub fn register_biased_call(call: Option<&Arc<Syscall>>) -> bool {
    BIASED_CALLS.register(call)
}

/// Snapshot of the process-wide pool.
pub fn biased_calls() -> Vec<Arc<Syscall>> {
    BIASED_CALLS.snapshot()
}
