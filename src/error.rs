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

use thiserror::Error as ThisError;

use crate::types::SessionId;

#[derive(ThisError, Debug)]
pub enum Error {
    #[error("session id space exhausted")]
    SessionIdExhausted,

    #[error("session table full")]
    TableFull,

    #[error("session id already in use: {id}")]
    DuplicateSessionId { id: SessionId },

    #[error("session type and peer identity are inconsistent")]
    InvalidSessionIdentity,
}

pub type Result<T> = std::result::Result<T, Error>;
