//! Helpers for tests that run on a `tokio::task::LocalSet`.

/// Number of scheduler turns `settle` yields for.
pub const SETTLE_TURNS: usize = 16;

/// Yield to the local scheduler so that spawned `!Send` tasks can finish.
///
/// Must be awaited inside `LocalSet::run_until`.
///
/// # Example
///
/// ```ignore
/// let local = tokio::task::LocalSet::new();
/// local.run_until(async {
///     image.load();
///     test_utils::settle().await;
///     assert_eq!(image.state(), LoadState::Loaded);
/// }).await;
/// ```
pub async fn settle() {
    for _ in 0..SETTLE_TURNS {
        tokio::task::yield_now().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::rc::Rc;

    #[tokio::test]
    async fn test_settle_runs_local_tasks() {
        let local = tokio::task::LocalSet::new();
        local
            .run_until(async {
                let done = Rc::new(Cell::new(false));
                let flag = done.clone();
                tokio::task::spawn_local(async move {
                    tokio::task::yield_now().await;
                    flag.set(true);
                });
                assert!(!done.get());
                settle().await;
                assert!(done.get());
            })
            .await;
    }
}
