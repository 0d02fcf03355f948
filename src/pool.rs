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

use std::{cell::Cell, rc::Rc};

use tracing::debug;

use crate::session::SecureSession;

/// Non-owning reference into the pool. The generation is re-validated on
/// every dereference, so a handle to a recycled slot simply stops
/// resolving.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SessionHandle {
    slot: u32,
    generation: u32,
}

#[cfg(test)]
impl SessionHandle {
    pub(crate) fn test(slot: u32) -> Self {
        Self {
            slot,
            generation: 0,
        }
    }
}

/// Strong reference: while any holder is alive, a pending-eviction slot
/// is not physically reclaimed.
pub struct SessionHolder {
    handle: SessionHandle,
    holders: Rc<Cell<usize>>,
}

impl SessionHolder {
    pub fn handle(&self) -> SessionHandle {
        self.handle
    }
}

impl Drop for SessionHolder {
    fn drop(&mut self) {
        self.holders.set(self.holders.get().saturating_sub(1));
    }
}

struct Slot {
    generation: u32,
    holders: Rc<Cell<usize>>,
    session: SecureSession,
}

/// Fixed-capacity arena of secure sessions. Slots are addressed through
/// generation-checked handles rather than pointers kept alive
/// implicitly.
pub struct SessionPool {
    slots: Vec<Option<Slot>>,
    generations: Vec<u32>,
    allocated: usize,
}

impl SessionPool {
    pub fn new(capacity: usize) -> Self {
        Self {
            slots: (0..capacity).map(|_| None).collect(),
            generations: vec![0; capacity],
            allocated: 0,
        }
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    pub fn allocated(&self) -> usize {
        self.allocated
    }

    pub fn create(&mut self, session: SecureSession) -> Option<SessionHandle> {
        let index = self.slots.iter().position(|slot| slot.is_none())?;
        let generation = self.generations[index];
        self.slots[index] = Some(Slot {
            generation,
            holders: Rc::new(Cell::new(0)),
            session,
        });
        self.allocated += 1;
        Some(SessionHandle {
            slot: index as u32,
            generation,
        })
    }

    fn slot(&self, handle: SessionHandle) -> Option<&Slot> {
        self.slots
            .get(handle.slot as usize)?
            .as_ref()
            .filter(|slot| slot.generation == handle.generation)
    }

    pub fn get(&self, handle: SessionHandle) -> Option<&SecureSession> {
        self.slot(handle).map(|slot| &slot.session)
    }

    pub fn get_mut(&mut self, handle: SessionHandle) -> Option<&mut SecureSession> {
        self.slots
            .get_mut(handle.slot as usize)?
            .as_mut()
            .filter(|slot| slot.generation == handle.generation)
            .map(|slot| &mut slot.session)
    }

    pub fn hold(&self, handle: SessionHandle) -> Option<SessionHolder> {
        let slot = self.slot(handle)?;
        slot.holders.set(slot.holders.get() + 1);
        Some(SessionHolder {
            handle,
            holders: Rc::clone(&slot.holders),
        })
    }

    pub fn iter(&self) -> impl Iterator<Item = (SessionHandle, &SecureSession)> {
        self.slots.iter().enumerate().filter_map(|(index, slot)| {
            slot.as_ref().map(|slot| {
                (
                    SessionHandle {
                        slot: index as u32,
                        generation: slot.generation,
                    },
                    &slot.session,
                )
            })
        })
    }

    /// Reclaims every pending-eviction slot with no outstanding strong
    /// references. Returns the number of slots released.
    pub fn sweep(&mut self) -> usize {
        let mut released = 0;
        for index in 0..self.slots.len() {
            let reclaim = match &self.slots[index] {
                Some(slot) => {
                    slot.session.is_pending_eviction() && slot.holders.get() == 0
                }
                None => false,
            };
            if reclaim {
                if let Some(slot) = &self.slots[index] {
                    debug!(
                        session_id = %slot.session.local_session_id(),
                        slot = index,
                        "releasing evicted session"
                    );
                }
                self.slots[index] = None;
                self.generations[index] = self.generations[index].wrapping_add(1);
                self.allocated -= 1;
                released += 1;
            }
        }
        released
    }
}
