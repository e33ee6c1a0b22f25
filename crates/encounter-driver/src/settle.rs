//! Best-effort waiting.
//!
//! The admin UI renders widgets asynchronously and inconsistently. Waiting for
//! an element is therefore bounded and never fails: when the deadline passes
//! the caller proceeds as if the page were already in the wanted state.

use tracing::debug;

use crate::Driver;

/// Poll interval for [`settle`].
pub const POLL_MS: u64 = 100;

/// Default bound for [`settle`].
pub const DEFAULT_TIMEOUT_MS: u64 = 2000;

/// What [`settle`] waits for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Presence {
    Present,
    Absent,
}

/// Wait up to `timeout_ms` for `selector` to reach `want`.
///
/// Returns whether the state was observed. Lookup errors count as "not yet".
pub async fn settle<D: Driver>(
    driver: &mut D,
    selector: &str,
    want: Presence,
    timeout_ms: u64,
) -> bool {
    let mut waited = 0;
    loop {
        let present = driver.exists(selector).await.unwrap_or(false);
        let reached = match want {
            Presence::Present => present,
            Presence::Absent => !present,
        };
        if reached {
            return true;
        }
        if waited >= timeout_ms {
            debug!(
                "settle: '{}' not {:?} after {}ms, proceeding",
                selector, want, timeout_ms
            );
            return false;
        }
        driver.wait(POLL_MS).await;
        waited += POLL_MS;
    }
}
