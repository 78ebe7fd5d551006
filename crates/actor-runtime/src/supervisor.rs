//! # Supervision
//!
//! A parent actor owns a [`Supervisor`] and one [`ChildSlot`] per child role.
//! The parent is the only owner of its children; each child is reachable
//! through the slot's Address and never holds a strong reference back.
//!
//! ## How a failure travels
//!
//! ```text
//! child run loop ends ──► monitor task (parent's OwnedTasks)
//!                              │  ChildExited { role, generation, exit }
//!                              ▼
//!                      parent's mailbox ──► Supervisor::handle_exit
//!                                              │ policy says restart
//!                                              ▼
//!                          new Context + actor + Address in the slot
//!                                              │
//!                                              ▼
//!                          DependencyUpdate { role, address } to dependents
//! ```
//!
//! The monitor only holds a [`WeakAddress`](crate::WeakAddress) of the parent,
//! so monitoring never keeps the parent alive.
//!
//! ## Restart policies
//!
//! | Policy | Failed | Stopped / mailbox closed | Cancelled |
//! |--------|--------|--------------------------|-----------|
//! | `NoRestart` | supervision failure | retired | retired |
//! | `RestartOnFailureOnly` | restart | retired | retired |
//! | `RestartAlways` | restart | restart | retired |
//!
//! A cancelled child is never restarted: cancellation only comes from the
//! supervisor's own teardown.
//!
//! ## Address replacement
//!
//! The slot is only touched inside the parent's turn, so the switch from the
//! old Address to the new one is atomic for everything the parent routes. The
//! old Address is permanently closed; messages still in flight to it fail with
//! [`ActorError::Closed`] and their senders re-resolve through the parent or
//! through the `DependencyUpdate` they received. Nothing is redelivered.

use crate::actor::{Actor, Notifiable};
use crate::address::{Address, Recipient, WeakAddress};
use crate::config::MailboxConfig;
use crate::context::Context;
use crate::error::{ActorError, ExitReason};
use crate::logging::short_type_name;
use crate::reactive::Subscribers;
use crate::tasks::{panic_message, OwnedTasks};
use std::fmt;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// What a supervisor does when a child's run loop ends.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum RestartPolicy {
    /// The child runs once. A failure is a supervision failure.
    NoRestart,
    /// The child is replaced whenever it ends, unless it was cancelled.
    RestartAlways,
    /// The child is replaced only when it failed (default).
    #[default]
    RestartOnFailureOnly,
}

impl RestartPolicy {
    pub fn should_restart(&self, exit: &ExitReason) -> bool {
        match self {
            RestartPolicy::NoRestart => false,
            RestartPolicy::RestartAlways => !matches!(exit, ExitReason::Cancelled),
            RestartPolicy::RestartOnFailureOnly => exit.is_failure(),
        }
    }
}

/// Sent by a monitor task to the parent when a child's run loop ended.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChildExited {
    pub role: &'static str,
    pub generation: u64,
    pub exit: ExitReason,
}

/// Sent to every dependent of a role once its child was replaced.
pub struct DependencyUpdate<C: Actor> {
    pub role: &'static str,
    pub address: Address<C>,
}

impl<C: Actor> Clone for DependencyUpdate<C> {
    fn clone(&self) -> Self {
        Self {
            role: self.role,
            address: self.address.clone(),
        }
    }
}

impl<C: Actor> fmt::Debug for DependencyUpdate<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DependencyUpdate")
            .field("role", &self.role)
            .field("address", &self.address)
            .finish()
    }
}

/// What [`Supervisor::handle_exit`] did with a child's exit.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Supervised {
    /// A fresh child runs under the given generation.
    Restarted { generation: u64 },
    /// The child ended for good without a failure.
    Retired,
    /// The report was about an older generation or another role.
    Stale,
}

/// The parent's routing entry for one child role.
pub struct ChildSlot<C: Actor> {
    role: &'static str,
    policy: RestartPolicy,
    generation: u64,
    address: Address<C>,
    dependents: Subscribers<DependencyUpdate<C>>,
}

impl<C: Actor> fmt::Debug for ChildSlot<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChildSlot")
            .field("role", &self.role)
            .field("policy", &self.policy)
            .field("generation", &self.generation)
            .field("address", &self.address)
            .finish()
    }
}

impl<C: Actor> ChildSlot<C> {
    pub fn role(&self) -> &'static str {
        self.role
    }

    pub fn policy(&self) -> RestartPolicy {
        self.policy
    }

    /// Generation of the current child, starting at 1.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Address of the current child.
    pub fn address(&self) -> Address<C> {
        self.address.clone()
    }

    /// Registers an actor that holds this role's Address and must learn about
    /// replacements.
    pub fn add_dependent(&mut self, dependent: Recipient<DependencyUpdate<C>>) -> bool {
        self.dependents.subscribe(dependent)
    }

    /// Number of dependents that will be told about the next replacement.
    pub fn dependents(&self) -> usize {
        self.dependents.len()
    }
}

/// Starts, monitors and restarts the children of the parent actor `P`.
///
/// Dropping the supervisor (with its parent) cancels every child.
pub struct Supervisor<P: Actor> {
    parent: WeakAddress<P>,
    monitors: OwnedTasks<()>,
    cancel: CancellationToken,
    mailbox: MailboxConfig,
}

impl<P: Actor> fmt::Debug for Supervisor<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Supervisor")
            .field("parent", &self.parent)
            .field("monitors", &self.monitors)
            .finish()
    }
}

impl<P: Actor> Drop for Supervisor<P> {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

impl<P> Supervisor<P>
where
    P: Notifiable<ChildExited>,
{
    /// Creates the supervisor of the actor running in `ctx`.
    ///
    /// Children get child tokens of the parent's cancellation token, so
    /// tearing down the parent's Context tears down the whole subtree.
    pub fn new(ctx: &Context<P>) -> Self {
        Self::with_mailbox(ctx, MailboxConfig::default())
    }

    pub fn with_mailbox(ctx: &Context<P>, mailbox: MailboxConfig) -> Self {
        Self {
            parent: ctx.address().downgrade(),
            monitors: OwnedTasks::new(),
            cancel: ctx.cancellation_token().child_token(),
            mailbox,
        }
    }

    /// Starts the first child of `role`. `build` receives the child's own
    /// Address and returns the actor.
    pub fn spawn<C, F>(&mut self, role: &'static str, policy: RestartPolicy, build: F) -> ChildSlot<C>
    where
        C: Actor,
        F: FnOnce(Address<C>) -> C,
    {
        let mut slot = ChildSlot {
            role,
            policy,
            generation: 0,
            address: Address::default(),
            dependents: Subscribers::new(),
        };
        self.launch(&mut slot, build);
        slot
    }

    fn launch<C, F>(&mut self, slot: &mut ChildSlot<C>, build: F)
    where
        C: Actor,
        F: FnOnce(Address<C>) -> C,
    {
        slot.generation += 1;
        let (role, generation) = (slot.role, slot.generation);

        let context = Context::with_cancellation(self.mailbox, self.cancel.child_token());
        let address = context.address();
        let handle = context.start(build(address.clone()));

        let parent = self.parent.clone();
        self.monitors.spawn(async move {
            let exit = match handle.await {
                Ok(Ok(reason)) => reason,
                Ok(Err(e)) => ExitReason::Failed(e.to_string()),
                Err(e) if e.is_panic() => ExitReason::Failed(panic_message(e.into_panic())),
                Err(_) => ExitReason::Cancelled,
            };
            let report = ChildExited {
                role,
                generation,
                exit,
            };
            let delivered = match parent.upgrade() {
                Some(parent) => parent.notify(report).await.is_ok(),
                None => false,
            };
            if !delivered {
                debug!(role, generation, "Parent gone, exit not reported");
            }
        });

        info!(
            role,
            generation,
            actor = short_type_name::<C>(),
            actor_id = ?address.id(),
            "Child started"
        );
        slot.address = address;
    }

    /// Applies the slot's restart policy to a reported exit.
    ///
    /// On restart the slot switches to the new Address before any dependent is
    /// told, and every dependent gets a [`DependencyUpdate`]. A dependent that
    /// cannot be reached is logged and skipped.
    ///
    /// # Errors
    ///
    /// [`ActorError::SupervisionFailure`] if the child failed and its policy
    /// does not allow a restart.
    pub async fn handle_exit<C, F>(
        &mut self,
        slot: &mut ChildSlot<C>,
        exited: ChildExited,
        build: F,
    ) -> Result<Supervised, ActorError>
    where
        C: Actor,
        F: FnOnce(Address<C>) -> C,
    {
        if exited.role != slot.role || exited.generation != slot.generation {
            debug!(
                role = exited.role,
                generation = exited.generation,
                current = slot.generation,
                "Ignoring stale exit"
            );
            return Ok(Supervised::Stale);
        }

        if !slot.policy.should_restart(&exited.exit) {
            return match exited.exit {
                ExitReason::Failed(cause) => {
                    error!(
                        role = slot.role,
                        generation = slot.generation,
                        %cause,
                        "Child failed and will not be restarted"
                    );
                    Err(ActorError::SupervisionFailure {
                        role: slot.role.to_string(),
                        cause,
                    })
                }
                exit => {
                    info!(role = slot.role, generation = slot.generation, %exit, "Child retired");
                    Ok(Supervised::Retired)
                }
            };
        }

        warn!(
            role = slot.role,
            generation = slot.generation,
            exit = %exited.exit,
            "Restarting child"
        );
        self.launch(slot, build);

        let update = DependencyUpdate {
            role: slot.role,
            address: slot.address.clone(),
        };
        let report = slot.dependents.broadcast(update).await;
        if report.pruned > 0 {
            warn!(
                role = slot.role,
                unreachable = report.pruned,
                "Some dependents could not be updated"
            );
        }

        Ok(Supervised::Restarted {
            generation: slot.generation,
        })
    }

    /// Number of children still being monitored.
    ///
    /// A monitor ends once it has reported its child's exit.
    pub fn monitored(&mut self) -> usize {
        while self.monitors.try_drain_next().is_some() {}
        self.monitors.len()
    }

    /// Cancels every child and stops monitoring them.
    pub fn shutdown(&mut self) {
        info!(parent = short_type_name::<P>(), "Supervisor shutting down");
        self.cancel.cancel();
        self.monitors.abort_all();
    }
}
