// Copyright (C) 2025 Category Labs, Inc.
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License
// along with this program.  If not, see <http://www.gnu.org/licenses/>.

use std::{
    collections::BTreeMap,
    ops::{Index, IndexMut},
};

pub const GAUGE_SESSION_TABLE_ACTIVE_SESSIONS: &str = "sessiontable.state.active_sessions";
pub const GAUGE_SESSION_TABLE_SESSION_CREATED: &str = "sessiontable.state.session_created";
pub const GAUGE_SESSION_TABLE_SESSION_RELEASED: &str = "sessiontable.state.session_released";

pub const GAUGE_SESSION_TABLE_EVICTION_PASSES: &str = "sessiontable.eviction.passes";
pub const GAUGE_SESSION_TABLE_SESSION_EVICTED: &str = "sessiontable.eviction.session_evicted";
pub const GAUGE_SESSION_TABLE_EVICTION_RETRIES: &str = "sessiontable.eviction.retries";

pub const GAUGE_SESSION_TABLE_ERROR_ID_EXHAUSTED: &str =
    "sessiontable.error.session_id_exhausted";

static ZERO: u64 = 0;

/// Flat gauge map keyed by the `GAUGE_*` constants above, in the shape
/// the framework's executor metrics pipeline consumes.
#[derive(Debug, Default)]
pub struct Metrics(BTreeMap<&'static str, u64>);

impl Index<&'static str> for Metrics {
    type Output = u64;

    fn index(&self, name: &'static str) -> &u64 {
        self.0.get(name).unwrap_or(&ZERO)
    }
}

impl IndexMut<&'static str> for Metrics {
    fn index_mut(&mut self, name: &'static str) -> &mut u64 {
        self.0.entry(name).or_insert(0)
    }
}
