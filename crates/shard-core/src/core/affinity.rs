//! Best-effort CPU pinning for pipeline threads.
//!
//! Pinning is an optimization, never a requirement: on single-core hosts,
//! for out-of-range indices, or when the platform refuses the request the
//! pipeline proceeds unpinned.

/// Core used by the sequential role (chunk producer or reassembler).
pub const SEQUENTIAL_CORE: usize = 0;

/// Core assigned to pool worker `index`.
///
/// Workers start at core 1; the pool size is bounded by the core count minus
/// one, so no wrapping is needed.
pub fn worker_core(index: usize) -> usize {
    index + 1
}

/// Pins the calling thread to the logical core at `index`, best-effort.
///
/// Returns true only if the pin was actually applied. A no-op on single-core
/// hosts.
pub fn pin_current_thread(index: usize) -> bool {
    let Some(cores) = core_affinity::get_core_ids() else {
        return false;
    };
    if cores.len() <= 1 {
        return false;
    }
    let Some(core) = cores.get(index).copied() else {
        tracing::warn!(
            core = index,
            available = cores.len(),
            "skipping thread pinning, core index out of range"
        );
        return false;
    };

    let pinned = core_affinity::set_for_current(core);
    if !pinned {
        tracing::warn!(core = index, "failed to pin thread to core");
    }
    pinned
}
