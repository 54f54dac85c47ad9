//! Cancellable scheduled tasks
//!
//! A [`TaskSlot`] holds at most one pending task. Arming the slot aborts the
//! previous task and bumps its generation, so a completion that already got
//! past its last await point can still tell it is stale by checking its
//! [`TaskToken`] under the owner's lock.

use tokio::task::AbortHandle;

/// Generation token handed to the task armed in a slot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TaskToken(u64);

#[derive(Debug, Default)]
pub struct TaskSlot {
    generation: u64,
    handle: Option<AbortHandle>,
}

impl TaskSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Supersede whatever is pending and hand out a token for the next task
    pub fn arm(&mut self) -> TaskToken {
        self.cancel();
        TaskToken(self.generation)
    }

    /// Attach the spawned task so a later `arm`/`cancel` can abort it
    pub fn attach(&mut self, token: TaskToken, handle: AbortHandle) {
        if self.is_current(token) {
            self.handle = Some(handle);
        } else {
            handle.abort();
        }
    }

    /// Invalidate and abort the pending task, if any
    pub fn cancel(&mut self) {
        self.generation = self.generation.wrapping_add(1);
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }

    pub fn is_current(&self, token: TaskToken) -> bool {
        self.generation == token.0
    }

    /// Called by the task itself once it has applied its result.
    /// Returns false if the token is stale and the result must be dropped.
    pub fn complete(&mut self, token: TaskToken) -> bool {
        if !self.is_current(token) {
            return false;
        }
        self.handle = None;
        true
    }

    pub fn is_pending(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_rearm_invalidates_previous_token() {
        let mut slot = TaskSlot::new();
        let first = slot.arm();
        let second = slot.arm();

        assert!(!slot.is_current(first));
        assert!(slot.is_current(second));
        assert!(!slot.complete(first));
        assert!(slot.complete(second));
    }

    #[test]
    fn test_cancel_invalidates_token() {
        let mut slot = TaskSlot::new();
        let token = slot.arm();
        slot.cancel();
        assert!(!slot.complete(token));
    }

    #[tokio::test(start_paused = true)]
    async fn test_arm_aborts_pending_task() {
        let mut slot = TaskSlot::new();
        let token = slot.arm();
        let handle = tokio::spawn(async {
            tokio::time::sleep(Duration::from_secs(10)).await;
        });
        slot.attach(token, handle.abort_handle());
        assert!(slot.is_pending());

        slot.arm();
        let err = handle.await.unwrap_err();
        assert!(err.is_cancelled());
        assert!(!slot.is_pending());
    }

    #[tokio::test]
    async fn test_attach_with_stale_token_aborts() {
        let mut slot = TaskSlot::new();
        let stale = slot.arm();
        slot.arm();

        let handle = tokio::spawn(std::future::pending::<()>());
        slot.attach(stale, handle.abort_handle());
        assert!(handle.await.unwrap_err().is_cancelled());
    }
}
