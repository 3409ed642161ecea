//! PPT Invariant System: runtime invariant enforcement with contract tracking.

#[cfg(feature = "ppt")]
use lazy_static::lazy_static;
#[cfg(feature = "ppt")]
use std::collections::HashSet;
#[cfg(feature = "ppt")]
use std::sync::Mutex;

// Invariant ids for contract tracking.
// Ids checked on discovery paths are recorded; ids checked on injection paths
// only go through `invariant_violated` so the hot loop never takes the log lock.
pub const LAYOUT_DISCOVERED: u32 = 1;
pub const SCRATCH_CLEAR: u32 = 2;
pub const PLAN_DISCOVERED: u32 = 3;
pub const REPLAY_ORDER: u32 = 4;
pub const REPLAY_COMPLETE: u32 = 5;
pub const LIVE_SET_SEALED: u32 = 6;
pub const SCHEMA_MATCH: u32 = 7;
pub const INTROSPECTABLE: u32 = 8;

#[cfg(feature = "ppt")]
lazy_static! {
    static ref INVARIANT_LOG: Mutex<HashSet<u32>> = Mutex::new(HashSet::new());
}

#[cfg(feature = "ppt")]
fn record(id: u32) {
    // A poisoned log only means an earlier invariant panicked; keep recording.
    let mut log = INVARIANT_LOG.lock().unwrap_or_else(|e| e.into_inner());
    log.insert(id);
}

#[cfg(feature = "ppt")]
/// Assert an invariant: logs it and panics on failure.
pub(crate) fn assert_invariant(id: u32, condition: bool, message: &str, context: Option<&str>) {
    if !condition {
        let full_message = if let Some(ctx) = context {
            format!("Invariant {} failed: {} (context: {})", id, message, ctx)
        } else {
            format!("Invariant {} failed: {}", id, message)
        };
        tracing::error!(invariant = id, "{}", full_message);
        panic!("{}", full_message);
    }
    record(id);
}

#[cfg(not(feature = "ppt"))]
/// Assert an invariant: checks condition and panics on failure.
pub(crate) fn assert_invariant(id: u32, condition: bool, message: &str, _context: Option<&str>) {
    if !condition {
        tracing::error!(invariant = id, "{}", message);
        panic!("Invariant failed: {}", message);
    }
}

/// Report a violated invariant without recording anything: logs and panics.
pub(crate) fn invariant_violated(id: u32, message: &str, context: Option<&str>) -> ! {
    assert_invariant(id, false, message, context);
    unreachable!("assert_invariant returned on a false condition")
}

#[cfg(feature = "ppt")]
/// Contract test: checks that specified invariants were asserted.
pub fn contract_test(test_name: &str, required_invariants: &[u32]) {
    let log = INVARIANT_LOG.lock().unwrap_or_else(|e| e.into_inner());
    let missing: Vec<u32> = required_invariants
        .iter()
        .copied()
        .filter(|inv| !log.contains(inv))
        .collect();
    drop(log); // Drop the lock before panicking
    if !missing.is_empty() {
        panic!(
            "Contract test '{}' failed: invariants not enforced: {:?}",
            test_name, missing
        );
    }
}

#[cfg(not(feature = "ppt"))]
/// Contract test: no-op when PPT feature is disabled.
pub fn contract_test(_test_name: &str, _required_invariants: &[u32]) {}

#[cfg(feature = "ppt")]
/// Clear invariant log (for between test runs).
pub fn clear_invariant_log() {
    INVARIANT_LOG
        .lock()
        .unwrap_or_else(|e| e.into_inner())
        .clear();
}

#[cfg(not(feature = "ppt"))]
/// Clear invariant log: no-op when PPT feature is disabled.
pub fn clear_invariant_log() {}
