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

//! Types a test string plus Enter into the focused window, to check that the
//! keystroke backend works before relying on it at the lock screen.

use anyhow::Result;
use std::time::Duration;

use airunlock::input::{create_injector, InputBackend, Key};

fn main() -> Result<()> {
    airunlock::init_logging();

    let text = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "airunlock test".to_string());
    let backend = match std::env::args().nth(2).as_deref() {
        Some("enigo") => InputBackend::Enigo,
        Some("ydotool") => InputBackend::Ydotool,
        _ => InputBackend::Auto,
    };

    let injector = create_injector(backend)?;
    for remaining in (1..=3).rev() {
        println!("Typing in {}... focus a text field", remaining);
        std::thread::sleep(Duration::from_secs(1));
    }

    injector.type_text(&text)?;
    injector.press_key(Key::Enter)?;
    println!("Done");
    Ok(())
}
