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

use std::cell::Cell;

use tracing::{debug, warn};

use crate::{
    error::{Error, Result},
    eviction::{collect_candidates, sort_candidates, EvictionPassGuard},
    metrics::{
        Metrics, GAUGE_SESSION_TABLE_ACTIVE_SESSIONS, GAUGE_SESSION_TABLE_ERROR_ID_EXHAUSTED,
        GAUGE_SESSION_TABLE_EVICTION_PASSES, GAUGE_SESSION_TABLE_EVICTION_RETRIES,
        GAUGE_SESSION_TABLE_SESSION_CREATED, GAUGE_SESSION_TABLE_SESSION_EVICTED,
        GAUGE_SESSION_TABLE_SESSION_RELEASED,
    },
    pool::{SessionHandle, SessionHolder, SessionPool},
    session::{SecureSession, SessionType},
    types::{NodeId, PeerId, SessionEvictionHint, SessionId},
};

const ID_SCAN_WINDOW: u16 = 64;

/// Fixed-capacity table of secure sessions keyed by local session id.
/// Owned and driven by a single cooperative execution context; the only
/// internal guard is the non-reentrancy check on the eviction pass.
pub struct SecureSessionTable {
    pool: SessionPool,
    next_session_id: SessionId,
    eviction_in_progress: Cell<bool>,
    metrics: Metrics,
}

impl SecureSessionTable {
    pub fn new(max_session_table_size: usize) -> Self {
        Self {
            pool: SessionPool::new(max_session_table_size),
            next_session_id: SessionId::new(1),
            eviction_in_progress: Cell::new(false),
            metrics: Metrics::default(),
        }
    }

    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    pub fn capacity(&self) -> usize {
        self.pool.capacity()
    }

    pub fn allocated_session_count(&self) -> usize {
        self.pool.allocated()
    }

    /// Allocates a new secure session, evicting an existing one if the
    /// table is at capacity. The entry starts out establishing with an
    /// undefined peer; the establishment layer fills in the identity
    /// through [`Self::get_session_mut`].
    pub fn create_new_secure_session(
        &mut self,
        session_type: SessionType,
        hint: SessionEvictionHint,
    ) -> Result<SessionHandle> {
        self.pool.sweep();

        let Some(session_id) = self.find_unused_session_id() else {
            warn!("session id space exhausted");
            self.metrics[GAUGE_SESSION_TABLE_ERROR_ID_EXHAUSTED] += 1;
            return Err(Error::SessionIdExhausted);
        };

        let handle = if self.pool.allocated() < self.pool.capacity() {
            self.pool
                .create(SecureSession::new(session_id, session_type))
                .expect("pool reported spare capacity")
        } else {
            self.evict_and_allocate(session_id, session_type, &hint)
        };

        self.next_session_id = session_id;
        self.next_session_id.increment();

        self.metrics[GAUGE_SESSION_TABLE_SESSION_CREATED] += 1;
        self.metrics[GAUGE_SESSION_TABLE_ACTIVE_SESSIONS] = self.pool.allocated() as u64;
        debug!(session_id = %session_id, ?session_type, "created secure session");
        Ok(handle)
    }

    pub fn find_secure_session_by_local_key(&self, session_id: SessionId) -> Option<SessionHandle> {
        self.pool
            .iter()
            .find_map(|(handle, session)| (session.local_session_id() == session_id).then_some(handle))
    }

    /// Fixture constructor: bypasses the allocator and eviction but
    /// still refuses inconsistent type/identity combinations.
    pub fn create_new_secure_session_for_test(
        &mut self,
        session_id: SessionId,
        session_type: SessionType,
        local_node: NodeId,
        peer: PeerId,
    ) -> Result<SessionHandle> {
        match session_type {
            SessionType::Case => {
                if !peer.is_fully_defined() || !local_node.is_defined() {
                    return Err(Error::InvalidSessionIdentity);
                }
            }
            SessionType::Pase => {
                if peer.fabric.is_defined() {
                    return Err(Error::InvalidSessionIdentity);
                }
            }
        }
        if session_id == SessionId::UNSECURED {
            return Err(Error::InvalidSessionIdentity);
        }
        if self.find_secure_session_by_local_key(session_id).is_some() {
            return Err(Error::DuplicateSessionId { id: session_id });
        }

        self.pool
            .create(SecureSession::with_identity(
                session_id,
                session_type,
                local_node,
                peer,
            ))
            .ok_or(Error::TableFull)
    }

    pub fn get_session(&self, handle: SessionHandle) -> Option<&SecureSession> {
        self.pool.get(handle)
    }

    pub fn get_session_mut(&mut self, handle: SessionHandle) -> Option<&mut SecureSession> {
        self.pool.get_mut(handle)
    }

    pub fn hold_session(&self, handle: SessionHandle) -> Option<SessionHolder> {
        self.pool.hold(handle)
    }

    /// Explicit release. The slot is reclaimed immediately unless strong
    /// references are still outstanding.
    pub fn release_session(&mut self, handle: SessionHandle) {
        if let Some(session) = self.pool.get_mut(handle) {
            session.mark_for_eviction();
            self.metrics[GAUGE_SESSION_TABLE_SESSION_RELEASED] += 1;
        }
        self.pool.sweep();
        self.metrics[GAUGE_SESSION_TABLE_ACTIVE_SESSIONS] = self.pool.allocated() as u64;
    }

    /// Scans the id space in 64-id bitmap windows anchored at the
    /// rotating cursor. Returns `None` only when every window wrapping
    /// around the whole space is saturated, which is unreachable while
    /// the table capacity is far below the id space.
    fn find_unused_session_id(&self) -> Option<SessionId> {
        let windows = (SessionId::MAX.as_u16() as u32 + 1) / ID_SCAN_WINDOW as u32;
        let mut base = self.next_session_id.as_u16();

        for _ in 0..windows {
            let mut bitmap: u64 = 0;

            let reserved_offset = SessionId::UNSECURED.as_u16().wrapping_sub(base);
            if reserved_offset < ID_SCAN_WINDOW {
                bitmap |= 1 << reserved_offset;
            }

            for (_, session) in self.pool.iter() {
                let offset = session.local_session_id().as_u16().wrapping_sub(base);
                if offset < ID_SCAN_WINDOW {
                    bitmap |= 1 << offset;
                    if bitmap == u64::MAX {
                        break;
                    }
                }
            }

            if bitmap != u64::MAX {
                let offset = bitmap.trailing_ones() as u16;
                return Some(SessionId::new(base.wrapping_add(offset)));
            }

            base = base.wrapping_add(ID_SCAN_WINDOW);
        }

        None
    }

    /// Walks the sorted candidate list, marking one session at a time
    /// and polling the pool population to learn whether the mark
    /// actually freed a slot; a candidate kept alive by outstanding
    /// strong references is skipped in favor of the next one.
    fn evict_and_allocate(
        &mut self,
        new_session_id: SessionId,
        session_type: SessionType,
        hint: &SessionEvictionHint,
    ) -> SessionHandle {
        let _guard = EvictionPassGuard::enter(&self.eviction_in_progress);
        self.metrics[GAUGE_SESSION_TABLE_EVICTION_PASSES] += 1;

        let mut candidates = collect_candidates(&self.pool);
        sort_candidates(&mut candidates, hint);

        for candidate in &candidates {
            // A previous iteration of this pass, or an earlier explicit
            // release, may already have flagged this entry.
            let already_pending = match self.pool.get(candidate.handle) {
                Some(session) => session.is_pending_eviction(),
                None => true,
            };
            if already_pending {
                continue;
            }

            let allocated_before = self.pool.allocated();
            if let Some(session) = self.pool.get_mut(candidate.handle) {
                session.mark_for_eviction();
            }
            self.pool.sweep();

            if self.pool.allocated() < allocated_before {
                self.metrics[GAUGE_SESSION_TABLE_SESSION_EVICTED] += 1;
                return self
                    .pool
                    .create(SecureSession::new(new_session_id, session_type))
                    .expect("eviction freed a slot");
            }

            debug!(
                peer = ?candidate.peer,
                "evicted session still strongly referenced, trying next candidate"
            );
            self.metrics[GAUGE_SESSION_TABLE_EVICTION_RETRIES] += 1;
        }

        panic!("session table full but no session could be evicted");
    }
}
