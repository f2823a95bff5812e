// Copyright 2026 Daniel Pelikan
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Unlock credential storage in the system keyring.
//!
//! Uses the Secret Service (GNOME Keyring, KWallet) through `keyring`.

use keyring::Entry;
use std::fmt;
use thiserror::Error;
use tracing::{info, warn};

use crate::prompt::UserPrompt;

/// Keyring service name.
pub const SERVICE_NAME: &str = "AirUnlock";
/// Keyring account name.
pub const ACCOUNT_NAME: &str = "AirUnlock";

/// The secret typed into the unlock prompt.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    pub fn new(secret: impl Into<String>) -> Self {
        Self(secret.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credential(<redacted>)")
    }
}

#[derive(Debug, Error)]
pub enum SecretError {
    #[error("no credential stored")]
    NotFound,
    #[error("access to the secret store was denied")]
    PermissionDenied,
    #[error("secret store failure: {0}")]
    Backend(String),
}

impl From<keyring::Error> for SecretError {
    fn from(e: keyring::Error) -> Self {
        match e {
            keyring::Error::NoEntry => SecretError::NotFound,
            keyring::Error::NoStorageAccess(_) => SecretError::PermissionDenied,
            other => SecretError::Backend(other.to_string()),
        }
    }
}

/// A store holding exactly one credential.
pub trait SecretStore: Send + Sync {
    fn load(&self) -> Result<Credential, SecretError>;

    fn store(&self, credential: &Credential) -> Result<(), SecretError>;
}

/// [`SecretStore`] backed by the platform keyring.
pub struct KeyringSecretStore {
    service: String,
    account: String,
}

impl KeyringSecretStore {
    pub fn new() -> Self {
        Self {
            service: SERVICE_NAME.to_string(),
            account: ACCOUNT_NAME.to_string(),
        }
    }

    fn entry(&self) -> Result<Entry, SecretError> {
        Ok(Entry::new(&self.service, &self.account)?)
    }
}

impl Default for KeyringSecretStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SecretStore for KeyringSecretStore {
    fn load(&self) -> Result<Credential, SecretError> {
        Ok(Credential::new(self.entry()?.get_password()?))
    }

    fn store(&self, credential: &Credential) -> Result<(), SecretError> {
        self.entry()?.set_password(credential.expose())?;
        Ok(())
    }
}

/// Result of the startup check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialStatus {
    Available,
    Missing,
    /// Access was refused and the user has been asked for consent.
    ConsentRequested,
    Unavailable,
}

/// Check the store once at startup.
///
/// A refusal raises the consent prompt exactly once; nothing is retried.
pub fn probe(store: &dyn SecretStore, prompt: &dyn UserPrompt) -> CredentialStatus {
    match store.load() {
        Ok(_) => {
            info!("Unlock credential found in secret store");
            CredentialStatus::Available
        }
        Err(SecretError::NotFound) => {
            warn!("No unlock credential stored yet; unlock requests will be ignored");
            CredentialStatus::Missing
        }
        Err(SecretError::PermissionDenied) => {
            prompt.secret_store_consent();
            CredentialStatus::ConsentRequested
        }
        Err(e) => {
            warn!("{}", e);
            CredentialStatus::Unavailable
        }
    }
}

/// In-memory store for tests.
#[cfg(test)]
pub(crate) struct MemorySecretStore {
    pub secret: parking_lot::Mutex<Option<Credential>>,
    pub denied: bool,
}

#[cfg(test)]
impl MemorySecretStore {
    pub fn with(secret: Option<&str>) -> Self {
        Self {
            secret: parking_lot::Mutex::new(secret.map(Credential::new)),
            denied: false,
        }
    }

    pub fn denied() -> Self {
        Self {
            secret: parking_lot::Mutex::new(None),
            denied: true,
        }
    }
}

#[cfg(test)]
impl SecretStore for MemorySecretStore {
    fn load(&self) -> Result<Credential, SecretError> {
        if self.denied {
            return Err(SecretError::PermissionDenied);
        }
        self.secret.lock().clone().ok_or(SecretError::NotFound)
    }

    fn store(&self, credential: &Credential) -> Result<(), SecretError> {
        if self.denied {
            return Err(SecretError::PermissionDenied);
        }
        *self.secret.lock() = Some(credential.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prompt::tests::CountingPrompt;

    #[test]
    fn test_credential_debug_is_redacted() {
        let credential = Credential::new("hunter2");
        assert!(!format!("{:?}", credential).contains("hunter2"));
    }

    #[test]
    fn test_keyring_error_mapping() {
        assert!(matches!(
            SecretError::from(keyring::Error::NoEntry),
            SecretError::NotFound
        ));
        assert!(matches!(
            SecretError::from(keyring::Error::NoStorageAccess("locked".into())),
            SecretError::PermissionDenied
        ));
    }

    #[test]
    fn test_probe_permission_denied_prompts_once() {
        let prompt = CountingPrompt::default();
        let status = probe(&MemorySecretStore::denied(), &prompt);
        assert_eq!(status, CredentialStatus::ConsentRequested);
        assert_eq!(prompt.consent_count(), 1);
    }

    #[test]
    fn test_probe_missing_does_not_prompt() {
        let prompt = CountingPrompt::default();
        let status = probe(&MemorySecretStore::with(None), &prompt);
        assert_eq!(status, CredentialStatus::Missing);
        assert_eq!(prompt.consent_count(), 0);
    }

    #[test]
    fn test_probe_available() {
        let prompt = CountingPrompt::default();
        let store = MemorySecretStore::with(Some("pw"));
        assert_eq!(probe(&store, &prompt), CredentialStatus::Available);
    }
}
