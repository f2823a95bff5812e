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

//! Command keywords and payload interpretation.

mod dispatcher;

pub use dispatcher::{CommandDispatcher, DispatchOutcome, IgnoreReason};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Separator used by the provisioning payload (`MAC,unlock,lock`).
pub const PAYLOAD_SEPARATOR: char = ',';

/// The two words a central may write.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandKeywords {
    #[serde(rename = "LOCK", default = "default_lock_word")]
    pub lock_word: String,
    #[serde(rename = "UNLOCK", default = "default_unlock_word")]
    pub unlock_word: String,
}

fn default_lock_word() -> String {
    "lock".to_string()
}

fn default_unlock_word() -> String {
    "unlock".to_string()
}

impl Default for CommandKeywords {
    fn default() -> Self {
        Self {
            lock_word: default_lock_word(),
            unlock_word: default_unlock_word(),
        }
    }
}

/// Reasons a keyword pair cannot be provisioned.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum KeywordError {
    #[error("keywords must not be empty")]
    Empty,
    #[error("lock and unlock keywords must differ")]
    Identical,
    #[error("keywords must not contain ','")]
    ContainsSeparator,
}

impl CommandKeywords {
    pub fn new(lock_word: impl Into<String>, unlock_word: impl Into<String>) -> Self {
        Self {
            lock_word: lock_word.into(),
            unlock_word: unlock_word.into(),
        }
    }

    /// Check that the pair can be provisioned to a companion device.
    pub fn validate(&self) -> Result<(), KeywordError> {
        if self.lock_word.is_empty() || self.unlock_word.is_empty() {
            return Err(KeywordError::Empty);
        }
        if self.lock_word == self.unlock_word {
            return Err(KeywordError::Identical);
        }
        if self.lock_word.contains(PAYLOAD_SEPARATOR)
            || self.unlock_word.contains(PAYLOAD_SEPARATOR)
        {
            return Err(KeywordError::ContainsSeparator);
        }
        Ok(())
    }
}

/// Where the dispatcher gets the current keywords from.
pub trait KeywordSource: Send + Sync {
    fn keywords(&self) -> CommandKeywords;
}

impl KeywordSource for CommandKeywords {
    fn keywords(&self) -> CommandKeywords {
        self.clone()
    }
}

/// A decoded write payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Lock,
    Unlock,
    /// Both keywords are the same word; the lock state picks the action.
    Toggle,
    Unrecognized,
}

impl Command {
    /// Match a payload against the keywords, verbatim.
    ///
    /// Payloads that are not UTF-8 are unrecognized.
    pub fn parse(payload: &[u8], keywords: &CommandKeywords) -> Self {
        let Ok(text) = std::str::from_utf8(payload) else {
            return Command::Unrecognized;
        };
        match (text == keywords.lock_word, text == keywords.unlock_word) {
            (true, true) => Command::Toggle,
            (true, false) => Command::Lock,
            (false, true) => Command::Unlock,
            (false, false) => Command::Unrecognized,
        }
    }
}

/// Provisioning string encoded in the companion's QR code.
pub fn provisioning_payload(address: &str, keywords: &CommandKeywords) -> String {
    format!(
        "{address}{sep}{unlock}{sep}{lock}",
        sep = PAYLOAD_SEPARATOR,
        unlock = keywords.unlock_word,
        lock = keywords.lock_word
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_exact_match() {
        let keywords = CommandKeywords::default();
        assert_eq!(Command::parse(b"lock", &keywords), Command::Lock);
        assert_eq!(Command::parse(b"unlock", &keywords), Command::Unlock);
    }

    #[test]
    fn test_parse_is_verbatim() {
        let keywords = CommandKeywords::default();
        assert_eq!(Command::parse(b"Lock", &keywords), Command::Unrecognized);
        assert_eq!(Command::parse(b"lock\n", &keywords), Command::Unrecognized);
        assert_eq!(Command::parse(b" unlock", &keywords), Command::Unrecognized);
        assert_eq!(Command::parse(b"", &keywords), Command::Unrecognized);
    }

    #[test]
    fn test_parse_invalid_utf8() {
        let keywords = CommandKeywords::default();
        assert_eq!(
            Command::parse(&[0xff, 0xfe, 0x6c], &keywords),
            Command::Unrecognized
        );
    }

    #[test]
    fn test_parse_custom_words() {
        let keywords = CommandKeywords::new("lock!", "unlock!");
        assert_eq!(Command::parse(b"lock!", &keywords), Command::Lock);
        assert_eq!(Command::parse(b"lock", &keywords), Command::Unrecognized);
    }

    #[test]
    fn test_parse_identical_words() {
        let keywords = CommandKeywords::new("go", "go");
        assert_eq!(Command::parse(b"go", &keywords), Command::Toggle);
    }

    #[test]
    fn test_validate() {
        assert!(CommandKeywords::default().validate().is_ok());
        assert_eq!(
            CommandKeywords::new("same", "same").validate(),
            Err(KeywordError::Identical)
        );
        assert_eq!(
            CommandKeywords::new("", "unlock").validate(),
            Err(KeywordError::Empty)
        );
        assert_eq!(
            CommandKeywords::new("a,b", "unlock").validate(),
            Err(KeywordError::ContainsSeparator)
        );
    }

    #[test]
    fn test_provisioning_payload_order() {
        let keywords = CommandKeywords::new("lock!", "unlock!");
        assert_eq!(
            provisioning_payload("AA-AA-AA-AA-AA-AA", &keywords),
            "AA-AA-AA-AA-AA-AA,unlock!,lock!"
        );
    }
}
