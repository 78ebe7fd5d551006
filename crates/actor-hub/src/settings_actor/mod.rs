//! # Settings Actor
//!
//! One actor per user, handed out by the hub's settings registry. It owns the
//! user's [`Preferences`] through a [`Persistent`] wrapper:
//!
//! - the stored copy is read in [`Actor::started`], so no request ever sees
//!   the placeholder state the factory built,
//! - every accepted update is written back under `prefs/{user}`,
//! - a failed write keeps the update in memory and answers
//!   [`SettingsError::NotSaved`]; the actor keeps serving.

mod error;

pub use error::SettingsError;

use crate::model::{HubEvent, Preferences, PreferencesUpdate};
use actor_runtime::{Actor, Context, EventBridge, Handler, Persistent, Storage};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Storage key of a user's preferences.
pub fn storage_key(user: &str) -> String {
    format!("prefs/{user}")
}

#[derive(Debug)]
pub struct GetPreferences;

#[derive(Debug)]
pub struct UpdatePreferences(pub PreferencesUpdate);

/// Restores the defaults and deletes the stored copy.
#[derive(Debug)]
pub struct ResetPreferences;

/// Number of writes that failed since the actor started.
#[derive(Debug)]
pub struct FailedSaves;

pub struct SettingsActor {
    user: String,
    prefs: Persistent<Preferences>,
    events: EventBridge<HubEvent>,
}

impl SettingsActor {
    pub fn new(user: impl Into<String>, storage: Arc<dyn Storage>, events: EventBridge<HubEvent>) -> Self {
        let user = user.into();
        Self {
            prefs: Persistent::unloaded(storage_key(&user), storage, Preferences::default()),
            user,
            events,
        }
    }

    fn validate(update: &PreferencesUpdate) -> Result<(), SettingsError> {
        if update.is_empty() {
            return Err(SettingsError::EmptyUpdate);
        }
        if let Some(language) = &update.language {
            let valid = language.len() == 2 && language.bytes().all(|b| b.is_ascii_lowercase());
            if !valid {
                return Err(SettingsError::InvalidLanguage(language.clone()));
            }
        }
        Ok(())
    }

    fn changed(&self) {
        self.events.publish(HubEvent::PreferencesChanged {
            user: self.user.clone(),
        });
    }
}

#[async_trait]
impl Actor for SettingsActor {
    async fn started(&mut self, _ctx: &Context<Self>) {
        self.prefs.reload(Preferences::default).await;
        info!(user = %self.user, key = %self.prefs.key(), "Settings loaded");
    }
}

#[async_trait]
impl Handler<GetPreferences> for SettingsActor {
    type Response = Preferences;

    async fn handle(&mut self, _: GetPreferences, _: &Context<Self>) -> Preferences {
        self.prefs.get().clone()
    }
}

#[async_trait]
impl Handler<UpdatePreferences> for SettingsActor {
    type Response = Result<Preferences, SettingsError>;

    async fn handle(&mut self, msg: UpdatePreferences, _: &Context<Self>) -> Self::Response {
        Self::validate(&msg.0)?;

        let saved = self.prefs.mutate(|prefs| msg.0.apply_to(prefs)).await;
        // Applied either way; listeners see the in-memory state.
        self.changed();
        match saved {
            Ok(()) => {
                debug!(user = %self.user, "Preferences updated");
                Ok(self.prefs.get().clone())
            }
            Err(e) => {
                warn!(user = %self.user, error = %e, "Preferences kept in memory only");
                Err(SettingsError::NotSaved(e))
            }
        }
    }
}

#[async_trait]
impl Handler<ResetPreferences> for SettingsActor {
    type Response = Result<Preferences, SettingsError>;

    async fn handle(&mut self, _: ResetPreferences, _: &Context<Self>) -> Self::Response {
        let forgotten = self.prefs.forget(Preferences::default()).await;
        self.changed();
        forgotten.map_err(SettingsError::NotSaved)?;
        info!(user = %self.user, "Preferences reset");
        Ok(self.prefs.get().clone())
    }
}

#[async_trait]
impl Handler<FailedSaves> for SettingsActor {
    type Response = u64;

    async fn handle(&mut self, _: FailedSaves, _: &Context<Self>) -> u64 {
        self.prefs.failed_saves()
    }
}
