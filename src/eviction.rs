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

use std::{cell::Cell, cmp::Ordering, time::Duration};

use crate::{
    pool::{SessionHandle, SessionPool},
    types::{PeerId, SessionEvictionHint},
};

/// Per-session snapshot taken at the start of an eviction pass. Never
/// persisted beyond the pass.
pub(crate) struct SortableCandidate {
    pub handle: SessionHandle,
    pub peer: PeerId,
    pub liveness_score: u8,
    pub last_activity: Duration,
    /// Other sessions sharing this candidate's fabric.
    pub matching_on_fabric: u32,
    /// Other sessions sharing both fabric and peer node id.
    pub matching_on_peer: u32,
}

/// One candidate per occupied slot, with pairwise fabric/peer crowding
/// statistics. O(n²) over the table size, which is bounded and small.
pub(crate) fn collect_candidates(pool: &SessionPool) -> Vec<SortableCandidate> {
    let mut candidates: Vec<SortableCandidate> = pool
        .iter()
        .map(|(handle, session)| SortableCandidate {
            handle,
            peer: session.peer(),
            liveness_score: session.liveness_score(),
            last_activity: session.last_activity_time(),
            matching_on_fabric: 0,
            matching_on_peer: 0,
        })
        .collect();

    for a in 0..candidates.len() {
        for b in 0..candidates.len() {
            if a == b {
                continue;
            }
            if candidates[a].peer.fabric != candidates[b].peer.fabric {
                continue;
            }
            candidates[a].matching_on_fabric += 1;
            if candidates[a].peer.node == candidates[b].peer.node {
                candidates[a].matching_on_peer += 1;
            }
        }
    }

    candidates
}

/// Best-to-evict-first total order. `Less` means `a` is evicted before
/// `b`; each key is consulted only when all previous keys tie.
pub(crate) fn compare_for_eviction(
    a: &SortableCandidate,
    b: &SortableCandidate,
    hint: &SessionEvictionHint,
) -> Ordering {
    // Relieve fabric-level crowding first.
    b.matching_on_fabric
        .cmp(&a.matching_on_fabric)
        // Prefer evicting within the fabric about to gain a session,
        // protecting other fabrics' allocations.
        .then_with(|| (b.peer.fabric == hint.fabric).cmp(&(a.peer.fabric == hint.fabric)))
        // Then peer-level crowding.
        .then_with(|| b.matching_on_peer.cmp(&a.matching_on_peer))
        // Exact hint match goes first among otherwise-equal candidates.
        .then_with(|| (b.peer == *hint).cmp(&(a.peer == *hint)))
        // Defunct before active; sessions mid-establishment last.
        .then_with(|| b.liveness_score.cmp(&a.liveness_score))
        // Least recently active first.
        .then_with(|| a.last_activity.cmp(&b.last_activity))
}

pub(crate) fn sort_candidates(candidates: &mut [SortableCandidate], hint: &SessionEvictionHint) {
    candidates.sort_by(|a, b| compare_for_eviction(a, b, hint));
}

/// Scoped non-reentrancy guard for an eviction pass. A nested pass is a
/// logic error and dies; the flag is cleared on every exit path.
pub(crate) struct EvictionPassGuard<'a> {
    in_progress: &'a Cell<bool>,
}

impl<'a> EvictionPassGuard<'a> {
    pub(crate) fn enter(in_progress: &'a Cell<bool>) -> Self {
        assert!(
            !in_progress.replace(true),
            "eviction pass already in progress"
        );
        Self { in_progress }
    }
}

impl Drop for EvictionPassGuard<'_> {
    fn drop(&mut self) {
        self.in_progress.set(false);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{FabricIndex, NodeId};

    fn peer(fabric: u8, node: u64) -> PeerId {
        PeerId::new(FabricIndex::new(fabric), NodeId::new(node))
    }

    fn candidate(slot: u32, peer: PeerId) -> SortableCandidate {
        SortableCandidate {
            handle: SessionHandle::test(slot),
            peer,
            liveness_score: 1,
            last_activity: Duration::from_secs(100),
            matching_on_fabric: 0,
            matching_on_peer: 0,
        }
    }

    #[test]
    fn test_key1_fabric_crowding() {
        let mut a = candidate(0, peer(1, 1));
        let mut b = candidate(1, peer(2, 2));
        a.matching_on_fabric = 3;
        b.matching_on_fabric = 1;
        let hint = PeerId::UNDEFINED;
        assert_eq!(compare_for_eviction(&a, &b, &hint), Ordering::Less);
        assert_eq!(compare_for_eviction(&b, &a, &hint), Ordering::Greater);
    }

    #[test]
    fn test_key2_hint_fabric_match() {
        let a = candidate(0, peer(1, 1));
        let b = candidate(1, peer(2, 2));
        let hint = peer(1, 99);
        assert_eq!(compare_for_eviction(&a, &b, &hint), Ordering::Less);
    }

    #[test]
    fn test_key3_peer_crowding() {
        let mut a = candidate(0, peer(1, 1));
        let mut b = candidate(1, peer(1, 2));
        a.matching_on_fabric = 2;
        b.matching_on_fabric = 2;
        a.matching_on_peer = 2;
        b.matching_on_peer = 0;
        let hint = peer(1, 99);
        assert_eq!(compare_for_eviction(&a, &b, &hint), Ordering::Less);
    }

    #[test]
    fn test_key4_exact_hint_match() {
        let a = candidate(0, peer(1, 2));
        let b = candidate(1, peer(1, 3));
        let hint = peer(1, 2);
        assert_eq!(compare_for_eviction(&a, &b, &hint), Ordering::Less);
        assert_eq!(compare_for_eviction(&b, &a, &hint), Ordering::Greater);
    }

    #[test]
    fn test_key5_liveness_score() {
        let mut a = candidate(0, peer(1, 1));
        let mut b = candidate(1, peer(1, 2));
        a.liveness_score = 2;
        b.liveness_score = 1;
        let hint = peer(2, 99);
        assert_eq!(compare_for_eviction(&a, &b, &hint), Ordering::Less);

        // Mid-establishment sessions are spared last.
        b.liveness_score = 0;
        a.liveness_score = 1;
        assert_eq!(compare_for_eviction(&a, &b, &hint), Ordering::Less);
    }

    #[test]
    fn test_key6_recency() {
        let mut a = candidate(0, peer(1, 1));
        let mut b = candidate(1, peer(1, 2));
        a.last_activity = Duration::from_secs(10);
        b.last_activity = Duration::from_secs(20);
        let hint = peer(2, 99);
        assert_eq!(compare_for_eviction(&a, &b, &hint), Ordering::Less);
    }

    #[test]
    fn test_key1_dominates_later_keys() {
        // Higher fabric crowding wins even against a defunct candidate
        // that exactly matches the hint.
        let mut a = candidate(0, peer(1, 1));
        let mut b = candidate(1, peer(2, 2));
        a.matching_on_fabric = 3;
        a.liveness_score = 0;
        b.matching_on_fabric = 1;
        b.liveness_score = 2;
        let hint = peer(2, 2);
        assert_eq!(compare_for_eviction(&a, &b, &hint), Ordering::Less);
    }

    #[test]
    fn test_key5_consulted_only_on_tie() {
        // Key3 decides before liveness is looked at.
        let mut a = candidate(0, peer(1, 1));
        let mut b = candidate(1, peer(1, 2));
        a.matching_on_peer = 1;
        a.liveness_score = 1;
        b.matching_on_peer = 0;
        b.liveness_score = 2;
        let hint = peer(1, 99);
        assert_eq!(compare_for_eviction(&a, &b, &hint), Ordering::Less);
    }

    #[test]
    fn test_sort_is_deterministic() {
        let hint = peer(1, 2);
        let build = || {
            vec![
                candidate(0, peer(1, 1)),
                candidate(1, peer(1, 2)),
                candidate(2, peer(2, 3)),
                candidate(3, peer(1, 2)),
                candidate(4, peer(3, 4)),
            ]
        };

        let mut first = build();
        let mut second = build();
        sort_candidates(&mut first, &hint);
        sort_candidates(&mut second, &hint);

        let order = |candidates: &[SortableCandidate]| {
            candidates.iter().map(|c| c.handle).collect::<Vec<_>>()
        };
        assert_eq!(order(&first), order(&second));
    }

    #[test]
    fn test_guard_clears_on_drop() {
        let flag = Cell::new(false);
        {
            let _guard = EvictionPassGuard::enter(&flag);
            assert!(flag.get());
        }
        assert!(!flag.get());
        let _guard = EvictionPassGuard::enter(&flag);
    }

    #[test]
    #[should_panic(expected = "eviction pass already in progress")]
    fn test_guard_rejects_nested_entry() {
        let flag = Cell::new(false);
        let _outer = EvictionPassGuard::enter(&flag);
        let _inner = EvictionPassGuard::enter(&flag);
    }
}
