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

//! GATT identifiers shared with the companion app.

use uuid::Uuid;

/// Primary AirUnlock service.
pub const SERVICE_UUID: Uuid = Uuid::from_u128(0xA5B288C3_FC55_491F_AF38_27D2F7D7BF25);

/// Command characteristic (write only, no read, no notify).
pub const COMMAND_UUID: Uuid = Uuid::from_u128(0xA6282AC7_7FCA_4852_A2E6_1D69121FD44A);

/// Local name carried in the advertisement.
pub const LOCAL_NAME: &str = "Air Unlock";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uuids_match_companion_contract() {
        assert_eq!(
            SERVICE_UUID.to_string().to_uppercase(),
            "A5B288C3-FC55-491F-AF38-27D2F7D7BF25"
        );
        assert_eq!(
            COMMAND_UUID.to_string().to_uppercase(),
            "A6282AC7-7FCA-4852-A2E6-1D69121FD44A"
        );
    }
}
