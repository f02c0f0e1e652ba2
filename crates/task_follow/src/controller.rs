use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard};

use tracing::debug;

use crate::error::FollowError;
use crate::follower::{FollowSession, FollowUpdate, ReconnectingFollower};
use crate::outcome::FollowOutcome;

#[derive(Debug)]
struct ActiveFollow {
    generation: u64,
    task_id: u64,
    cancel: tokio_util::sync::CancellationToken,
}

/// Keeps at most one follow session active.
#[derive(Debug, Default)]
pub struct FollowController {
    active: Mutex<Option<ActiveFollow>>,
    generations: AtomicU64,
}

impl FollowController {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Cancel any active session and register a new one for `task_id`.
    pub fn start(&self, task_id: u64, expected_session_id: Option<u64>) -> FollowSession {
        let generation = self.generations.fetch_add(1, Ordering::AcqRel) + 1;
        let mut session = FollowSession::new(task_id, expected_session_id);
        session.generation = generation;

        let mut active = lock_unpoisoned(&self.active);
        if let Some(previous) = active.take() {
            debug!(task_id = previous.task_id, "replacing active follow");
            previous.cancel.cancel();
        }
        *active = Some(ActiveFollow {
            generation,
            task_id,
            cancel: session.cancel.clone(),
        });
        session
    }

    /// Release the slot if `session` still holds it.
    pub fn finish(&self, session: &FollowSession) {
        let mut active = lock_unpoisoned(&self.active);
        if active
            .as_ref()
            .is_some_and(|current| current.generation == session.generation)
        {
            *active = None;
        }
    }

    /// Cancel the active session. `false` when nothing was being followed.
    pub fn stop_active(&self) -> bool {
        match lock_unpoisoned(&self.active).as_ref() {
            Some(active) => {
                active.cancel.cancel();
                true
            }
            None => false,
        }
    }

    #[must_use]
    pub fn is_active(&self) -> bool {
        lock_unpoisoned(&self.active).is_some()
    }

    /// Task id of the active session.
    #[must_use]
    pub fn active_task(&self) -> Option<u64> {
        lock_unpoisoned(&self.active)
            .as_ref()
            .map(|active| active.task_id)
    }

    /// Start a session, follow it to completion, then release the slot.
    pub async fn run(
        &self,
        follower: &ReconnectingFollower,
        task_id: u64,
        expected_session_id: Option<u64>,
        on_update: impl FnMut(FollowUpdate),
    ) -> Result<FollowOutcome, FollowError> {
        let session = self.start(task_id, expected_session_id);
        let result = follower.follow(&session, on_update).await;
        self.finish(&session);
        result
    }
}

fn lock_unpoisoned<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn start_cancels_previous_session_first() {
        let controller = FollowController::new();
        let first = controller.start(1, None);
        let second = controller.start(2, Some(5));

        assert!(first.cancel.is_cancelled());
        assert!(!second.cancel.is_cancelled());
        assert_eq!(controller.active_task(), Some(2));
    }

    #[test]
    fn finishing_a_replaced_session_keeps_the_new_one() {
        let controller = FollowController::new();
        let first = controller.start(1, None);
        let second = controller.start(2, None);

        controller.finish(&first);
        assert_eq!(controller.active_task(), Some(2));

        controller.finish(&second);
        assert!(!controller.is_active());
    }

    #[test]
    fn stop_active_reports_whether_anything_was_cancelled() {
        let controller = FollowController::new();
        assert!(!controller.stop_active());

        let session = controller.start(3, None);
        assert!(controller.stop_active());
        assert!(session.cancel.is_cancelled());
    }
}
