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

//! AirUnlock: lock and unlock the desktop session from a BLE companion.
//!
//! The machine advertises a GATT service with a single writable
//! characteristic. Writing the lock keyword locks the session; writing the
//! unlock keyword while locked wakes the display and types the stored
//! credential into the unlock prompt.
//!
//! The keyword protocol is plaintext and unauthenticated. Anyone in radio
//! range who learns a keyword can replay it.

pub mod bluetooth;
pub mod commands;
pub mod config;
pub mod events;
pub mod input;
pub mod prompt;
pub mod session;
pub mod state;
pub mod storage;
pub mod ui;

/// Install the tracing subscriber. `RUST_LOG` overrides the default filter.
pub fn init_logging() {
    use tracing_subscriber::EnvFilter;

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("airunlock=info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}
