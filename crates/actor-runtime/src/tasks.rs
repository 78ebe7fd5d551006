//! # Owned Tasks
//!
//! [`OwnedTasks`] is the set of background tasks an actor owns. It lives in a
//! field of the actor, so the tasks live exactly as long as the actor does:
//! when the Context ends and the actor is dropped, every task still running is
//! aborted.
//!
//! A task never holds the actor's state. It gets a clone of the actor's
//! [`Address`](crate::Address) (typically in [`Actor::started`](crate::Actor::started))
//! and talks back through messages like any other sender.
//!
//! Each task is identified by a [`TaskKey`]. Keys are generation-tagged slots:
//! once a task is reaped its slot may be reused, and the old key then no longer
//! matches anything, so aborting through a stale key is a harmless no-op.

use crate::error::ActorError;
use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use tokio::task::{AbortHandle, Id, JoinError, JoinSet};
use tracing::{debug, warn};

/// Handle to one task in an [`OwnedTasks`] set.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct TaskKey {
    index: u32,
    generation: u32,
}

impl fmt::Display for TaskKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}v{}", self.index, self.generation)
    }
}

/// How a reaped task ended.
#[derive(Debug, PartialEq, Eq)]
pub enum TaskOutcome<T> {
    Success(T),
    /// The task panicked; carries the panic message when there is one.
    Failed(String),
    /// The task was aborted before it completed.
    Cancelled,
}

impl<T> TaskOutcome<T> {
    pub fn into_result(self) -> Result<T, ActorError> {
        match self {
            TaskOutcome::Success(value) => Ok(value),
            TaskOutcome::Failed(cause) => Err(ActorError::TaskFailed(cause)),
            TaskOutcome::Cancelled => Err(ActorError::Cancelled),
        }
    }

    fn from_join_error(error: JoinError) -> Self {
        if error.is_cancelled() {
            return TaskOutcome::Cancelled;
        }
        match error.try_into_panic() {
            Ok(payload) => TaskOutcome::Failed(panic_message(payload)),
            Err(error) => TaskOutcome::Failed(error.to_string()),
        }
    }
}

pub(crate) fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "panic".to_string()
    }
}

struct Slot {
    generation: u32,
    handle: Option<AbortHandle>,
}

/// Background tasks whose lifetime is bound to their owner.
pub struct OwnedTasks<T = ()> {
    set: JoinSet<T>,
    slots: Vec<Slot>,
    free: Vec<u32>,
    by_id: HashMap<Id, u32>,
}

impl<T: Send + 'static> Default for OwnedTasks<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for OwnedTasks<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OwnedTasks")
            .field("len", &self.set.len())
            .finish()
    }
}

impl<T: Send + 'static> OwnedTasks<T> {
    pub fn new() -> Self {
        Self {
            set: JoinSet::new(),
            slots: Vec::new(),
            free: Vec::new(),
            by_id: HashMap::new(),
        }
    }

    /// Spawns `task` on the current Tokio runtime and takes ownership of it.
    ///
    /// Finished tasks nobody drained are reaped first, so a long-lived owner
    /// that never calls [`drain_next`](Self::drain_next) does not accumulate
    /// slots.
    pub fn spawn<F>(&mut self, task: F) -> TaskKey
    where
        F: Future<Output = T> + Send + 'static,
    {
        self.reap_finished();

        let handle = self.set.spawn(task);
        let id = handle.id();
        let key = match self.free.pop() {
            Some(index) => {
                let slot = &mut self.slots[index as usize];
                slot.generation = slot.generation.wrapping_add(1);
                slot.handle = Some(handle);
                TaskKey {
                    index,
                    generation: slot.generation,
                }
            }
            None => {
                let index = self.slots.len() as u32;
                self.slots.push(Slot {
                    generation: 0,
                    handle: Some(handle),
                });
                TaskKey {
                    index,
                    generation: 0,
                }
            }
        };
        self.by_id.insert(id, key.index);
        debug!(task = %key, "Task spawned");
        key
    }

    fn slot(&self, key: TaskKey) -> Option<&AbortHandle> {
        self.slots
            .get(key.index as usize)
            .filter(|slot| slot.generation == key.generation)
            .and_then(|slot| slot.handle.as_ref())
    }

    /// Aborts one task. Returns false if the key is stale or unknown.
    pub fn abort(&mut self, key: TaskKey) -> bool {
        match self.slot(key) {
            Some(handle) => {
                handle.abort();
                debug!(task = %key, "Task aborted");
                true
            }
            None => false,
        }
    }

    /// True while the task behind `key` is still running.
    pub fn contains(&self, key: TaskKey) -> bool {
        self.slot(key).is_some_and(|handle| !handle.is_finished())
    }

    /// Number of tasks not yet reaped (running, or finished but not drained).
    pub fn len(&self) -> usize {
        self.set.len()
    }

    pub fn is_empty(&self) -> bool {
        self.set.is_empty()
    }

    pub fn abort_all(&mut self) {
        self.set.abort_all();
    }

    /// Aborts every task and waits until all of them have ended.
    pub async fn shutdown(&mut self) {
        self.set.shutdown().await;
        self.by_id.clear();
        self.free.clear();
        for (index, slot) in self.slots.iter_mut().enumerate() {
            slot.handle = None;
            self.free.push(index as u32);
        }
    }

    /// Waits for the next task to end. `None` once the set is empty.
    pub async fn drain_next(&mut self) -> Option<(TaskKey, TaskOutcome<T>)> {
        let joined = self.set.join_next_with_id().await?;
        Some(self.release(joined))
    }

    /// Like [`drain_next`](Self::drain_next) but never waits.
    pub fn try_drain_next(&mut self) -> Option<(TaskKey, TaskOutcome<T>)> {
        let joined = self.set.try_join_next_with_id()?;
        Some(self.release(joined))
    }

    fn reap_finished(&mut self) {
        while let Some((key, outcome)) = self.try_drain_next() {
            if let TaskOutcome::Failed(cause) = outcome {
                warn!(task = %key, %cause, "Owned task failed");
            }
        }
    }

    fn release(&mut self, joined: Result<(Id, T), JoinError>) -> (TaskKey, TaskOutcome<T>) {
        let (id, outcome) = match joined {
            Ok((id, value)) => (id, TaskOutcome::Success(value)),
            Err(error) => (error.id(), TaskOutcome::from_join_error(error)),
        };
        let index = self.by_id.remove(&id).unwrap_or_default();
        let slot = &mut self.slots[index as usize];
        slot.handle = None;
        self.free.push(index);
        let key = TaskKey {
            index,
            generation: slot.generation,
        };
        (key, outcome)
    }
}
