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

//! Keys sent after typing the credential.

/// Confirmation keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Enter,
}

impl Key {
    /// Get the enigo key.
    #[cfg(feature = "x11")]
    pub fn to_enigo(self) -> enigo::Key {
        match self {
            Key::Enter => enigo::Key::Return,
        }
    }

    /// Linux input event code, as `ydotool key` expects it.
    pub fn to_ydotool_code(self) -> u16 {
        match self {
            Key::Enter => 28,
        }
    }

    /// `ydotool key` arguments for a full press and release.
    pub fn ydotool_click(self) -> [String; 2] {
        let code = self.to_ydotool_code();
        [format!("{}:1", code), format!("{}:0", code)]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ydotool_click() {
        assert_eq!(Key::Enter.ydotool_click(), ["28:1", "28:0"]);
    }
}
