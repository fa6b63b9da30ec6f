pub mod clone;
pub mod lifecycle;
pub mod memory_store;
pub mod role_order;
pub mod store;

pub use clone::{deep_clone, CloneOptions};
pub use memory_store::MemoryStore;
pub use store::SnapshotStore;

use std::time::Instant;

use crate::errors::ExResult;
use crate::{log_op_end, log_op_error, log_op_start};

/// Run `f` between a start event and an end / end_error event for `op`
pub(crate) fn instrumented<T>(
    op: &'static str,
    snapshot_id: &str,
    f: impl FnOnce() -> ExResult<T>,
) -> ExResult<T> {
    let started = Instant::now();
    log_op_start!(op, snapshot_id = snapshot_id);

    let result = f().map_err(|e| if e.op().is_none() { e.with_op(op) } else { e });

    let duration_ms = started.elapsed().as_millis() as u64;
    match &result {
        Ok(_) => {
            log_op_end!(op, duration_ms = duration_ms, snapshot_id = snapshot_id);
        }
        Err(err) => {
            log_op_error!(
                op,
                err.clone(),
                duration_ms = duration_ms,
                snapshot_id = snapshot_id
            );
        }
    }
    result
}
