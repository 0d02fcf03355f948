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

/// Local identifier of a secure session. Id 0 is reserved for unsecured
/// traffic and is never granted by the allocator.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SessionId(u16);

impl SessionId {
    pub const UNSECURED: SessionId = SessionId(0);
    pub const MAX: SessionId = SessionId(u16::MAX);

    pub fn new(value: u16) -> Self {
        SessionId(value)
    }

    pub fn as_u16(&self) -> u16 {
        self.0
    }

    /// Wrapping advance that never lands on the reserved unsecured id.
    pub fn increment(&mut self) {
        self.0 = self.0.wrapping_add(1);
        if self.0 == Self::UNSECURED.0 {
            self.0 = self.0.wrapping_add(1);
        }
    }
}

impl From<u16> for SessionId {
    fn from(value: u16) -> Self {
        SessionId(value)
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::fmt::Debug for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Administrative grouping of nodes sharing trust relationships.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FabricIndex(u8);

impl FabricIndex {
    pub const UNDEFINED: FabricIndex = FabricIndex(0);

    pub fn new(value: u8) -> Self {
        FabricIndex(value)
    }

    pub fn as_u8(&self) -> u8 {
        self.0
    }

    pub fn is_defined(&self) -> bool {
        *self != Self::UNDEFINED
    }
}

impl std::fmt::Display for FabricIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::fmt::Debug for FabricIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u64);

impl NodeId {
    pub const UNDEFINED: NodeId = NodeId(0);

    pub fn new(value: u64) -> Self {
        NodeId(value)
    }

    pub fn as_u64(&self) -> u64 {
        self.0
    }

    pub fn is_defined(&self) -> bool {
        *self != Self::UNDEFINED
    }
}

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}

impl std::fmt::Debug for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}

/// Remote party of a session: the node identity scoped to its fabric.
/// May stay undefined for session kinds established before a fabric is
/// known.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PeerId {
    pub fabric: FabricIndex,
    pub node: NodeId,
}

impl PeerId {
    pub const UNDEFINED: PeerId = PeerId {
        fabric: FabricIndex::UNDEFINED,
        node: NodeId::UNDEFINED,
    };

    pub fn new(fabric: FabricIndex, node: NodeId) -> Self {
        PeerId { fabric, node }
    }

    pub fn is_fully_defined(&self) -> bool {
        self.fabric.is_defined() && self.node.is_defined()
    }
}

/// Caller-supplied peer identity used as a soft tie-breaking signal
/// during eviction, never as a hard filter.
pub type SessionEvictionHint = PeerId;
