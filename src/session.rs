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

use std::time::Duration;

use tracing::debug;

use crate::types::{FabricIndex, NodeId, PeerId, SessionId};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionType {
    Pase,
    Case,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Handshake still in flight; the peer identity may be incomplete.
    Establishing,
    Active,
    /// Transport known broken but the entry has not been torn down yet.
    Defunct,
    /// Marked for eviction; the slot is reclaimed once no strong
    /// references remain.
    PendingEviction,
}

pub struct SecureSession {
    local_session_id: SessionId,
    session_type: SessionType,
    peer: PeerId,
    local_node: NodeId,
    last_activity: Duration,
    state: SessionState,
}

impl SecureSession {
    pub(crate) fn new(local_session_id: SessionId, session_type: SessionType) -> Self {
        Self {
            local_session_id,
            session_type,
            peer: PeerId::UNDEFINED,
            local_node: NodeId::UNDEFINED,
            last_activity: Duration::ZERO,
            state: SessionState::Establishing,
        }
    }

    /// Fixture constructor: identity is already known and the session
    /// starts out active, skipping establishment.
    pub(crate) fn with_identity(
        local_session_id: SessionId,
        session_type: SessionType,
        local_node: NodeId,
        peer: PeerId,
    ) -> Self {
        Self {
            local_session_id,
            session_type,
            peer,
            local_node,
            last_activity: Duration::ZERO,
            state: SessionState::Active,
        }
    }

    pub fn local_session_id(&self) -> SessionId {
        self.local_session_id
    }

    pub fn session_type(&self) -> SessionType {
        self.session_type
    }

    pub fn peer(&self) -> PeerId {
        self.peer
    }

    pub fn fabric_index(&self) -> FabricIndex {
        self.peer.fabric
    }

    pub fn peer_node_id(&self) -> NodeId {
        self.peer.node
    }

    pub fn local_node_id(&self) -> NodeId {
        self.local_node
    }

    pub fn last_activity_time(&self) -> Duration {
        self.last_activity
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn is_establishing(&self) -> bool {
        self.state == SessionState::Establishing
    }

    pub fn is_active_session(&self) -> bool {
        self.state == SessionState::Active
    }

    pub fn is_defunct(&self) -> bool {
        self.state == SessionState::Defunct
    }

    pub fn is_pending_eviction(&self) -> bool {
        self.state == SessionState::PendingEviction
    }

    pub fn set_peer(&mut self, peer: PeerId) {
        self.peer = peer;
    }

    pub fn set_local_node(&mut self, local_node: NodeId) {
        self.local_node = local_node;
    }

    /// Called by the transport layer on traffic.
    pub fn touch(&mut self, now: Duration) {
        self.last_activity = now;
    }

    pub fn mark_active(&mut self) {
        if self.state == SessionState::PendingEviction {
            return;
        }
        self.state = SessionState::Active;
    }

    pub fn mark_defunct(&mut self) {
        match self.state {
            SessionState::Establishing | SessionState::Active => {
                self.state = SessionState::Defunct;
            }
            SessionState::Defunct | SessionState::PendingEviction => {}
        }
    }

    /// One-way transition; actual slot release is deferred to the
    /// pool's reference accounting.
    pub fn mark_for_eviction(&mut self) {
        debug!(
            session_id = %self.local_session_id,
            peer = ?self.peer,
            state = ?self.state,
            "marking session for eviction"
        );
        self.state = SessionState::PendingEviction;
    }

    /// Eviction preference by liveness: reclaim defunct sessions first,
    /// then active ones, and spare sessions still being established.
    pub(crate) fn liveness_score(&self) -> u8 {
        match self.state {
            SessionState::Defunct => 2,
            SessionState::Active => 1,
            SessionState::Establishing | SessionState::PendingEviction => 0,
        }
    }
}
