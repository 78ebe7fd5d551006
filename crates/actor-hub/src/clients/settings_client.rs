//! # Settings Client
//!
//! Wraps an `Address<SettingsActor>` and folds transport errors into
//! [`SettingsError`].
use crate::model::{Preferences, PreferencesUpdate};
use crate::settings_actor::{GetPreferences, ResetPreferences, SettingsActor, SettingsError, UpdatePreferences};
use actor_runtime::Address;
use tracing::{debug, instrument};

#[derive(Clone, Debug)]
pub struct SettingsClient {
    address: Address<SettingsActor>,
}

impl SettingsClient {
    pub fn new(address: Address<SettingsActor>) -> Self {
        Self { address }
    }

    #[instrument(skip(self))]
    pub async fn get(&self) -> Result<Preferences, SettingsError> {
        debug!("Sending request");
        Ok(self.address.send(GetPreferences).await?)
    }

    #[instrument(skip(self))]
    pub async fn update(&self, update: PreferencesUpdate) -> Result<Preferences, SettingsError> {
        debug!("Sending request");
        self.address.send(UpdatePreferences(update)).await?
    }

    #[instrument(skip(self))]
    pub async fn reset(&self) -> Result<Preferences, SettingsError> {
        debug!("Sending request");
        self.address.send(ResetPreferences).await?
    }
}
