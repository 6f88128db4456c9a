//! Gear set module - membership and rotation of meshed gear trains
//!
//! Orthogonally adjacent gears mesh, and meshed gears must rotate in
//! opposite directions. Sets of meshed gears merge as placements connect
//! them and never split except by explicit removal. Membership is kept
//! incrementally on every insertion — never recomputed by a global scan.
//!
//! Gears live in an arena indexed by [`GearId`]; the partition is a pair
//! of maps (gear -> set, set -> members). No back-pointers, no cycles.

use std::collections::BTreeMap;

use log::debug;

use crate::error::EngineError;
use crate::types::GearRotation;

/// Arena index of a gear
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize,
)]
pub struct GearId(usize);

impl GearId {
    pub fn index(&self) -> usize {
        self.0
    }
}

/// Identifier of a gear set
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize,
)]
pub struct SetId(u32);

impl SetId {
    pub fn value(&self) -> u32 {
        self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct GearState {
    rotation: GearRotation,
    set: Option<SetId>,
}

/// Tracks meshed gear groups and enforces the alternating-rotation
/// invariant across merges and atomic whole-set turns.
#[derive(Debug, Clone, Default)]
pub struct GearSetManager {
    /// Arena of gear states; slots are freed on removal
    gears: Vec<Option<GearState>>,
    /// Set membership, ordered for deterministic inspection
    sets: BTreeMap<SetId, Vec<GearId>>,
    next_set_id: u32,
}

impl GearSetManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate a gear with its requested initial rotation. The gear has
    /// no set until [`add_gear`](Self::add_gear) runs.
    pub fn create_gear(&mut self, rotation: GearRotation) -> GearId {
        // Reuse a freed slot if one exists
        for (i, slot) in self.gears.iter_mut().enumerate() {
            if slot.is_none() {
                *slot = Some(GearState {
                    rotation,
                    set: None,
                });
                return GearId(i);
            }
        }
        self.gears.push(Some(GearState {
            rotation,
            set: None,
        }));
        GearId(self.gears.len() - 1)
    }

    /// Current rotation of a gear, if it exists
    pub fn rotation(&self, gear: GearId) -> Option<GearRotation> {
        self.state(gear).map(|s| s.rotation)
    }

    /// Set the gear belongs to, if any
    pub fn set_of(&self, gear: GearId) -> Option<SetId> {
        self.state(gear).and_then(|s| s.set)
    }

    /// Number of live gears
    pub fn len(&self) -> usize {
        self.gears.iter().filter(|s| s.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Full set listing (id -> members), for display and testing
    pub fn sets(&self) -> impl Iterator<Item = (SetId, &[GearId])> {
        self.sets.iter().map(|(id, members)| (*id, members.as_slice()))
    }

    /// Assign a newly placed gear to a set, given the gears occupying its
    /// four orthogonal neighbour cells.
    ///
    /// - No neighbours: a fresh singleton set; the gear keeps its
    ///   requested rotation.
    /// - One neighbour: join its set; the new gear's rotation is forced
    ///   opposite, overriding whatever it was constructed with.
    /// - Several neighbours: merge every adjacent set into the most
    ///   populous one. The new gear's rotation is forced opposite a
    ///   representative of that target set; any other adjacent gear whose
    ///   rotation would collide gets its entire set turned before its set
    ///   is merged in. A uniform flip of a valid alternating assignment
    ///   stays valid, so only the new edge needed fixing.
    ///
    /// Tie-break for "most populous": strictly greater size wins, equal
    /// sizes keep the earliest-seen set. Callers supply `adjacent` in a
    /// fixed scan order, so the outcome is deterministic.
    pub fn add_gear(&mut self, gear: GearId, adjacent: &[GearId]) -> Result<(), EngineError> {
        match adjacent {
            [] => {
                let set_id = self.allocate_set(gear);
                self.set_membership(gear, set_id);
                Ok(())
            }
            [neighbour] => {
                let neighbour = *neighbour;
                let set_id = self
                    .set_of(neighbour)
                    .ok_or(EngineError::UngroupedGear { gear: neighbour })?;
                let forced = self
                    .rotation(neighbour)
                    .ok_or(EngineError::UngroupedGear { gear: neighbour })?
                    .opposite();
                self.set_rotation(gear, forced);
                self.set_membership(gear, set_id);
                Ok(())
            }
            _ => self.merge_sets(gear, adjacent),
        }
    }

    /// Flip the rotation of every member of the given gear's set.
    pub fn turn_set(&mut self, gear: GearId) -> Result<(), EngineError> {
        let set_id = self
            .set_of(gear)
            .ok_or(EngineError::UngroupedGear { gear })?;
        let members = self
            .sets
            .get(&set_id)
            .cloned()
            .ok_or(EngineError::UngroupedGear { gear })?;
        for member in members {
            if let Some(state) = self.state_mut(member) {
                state.rotation = state.rotation.opposite();
            }
        }
        Ok(())
    }

    /// Forget a gear: drop it from its set (deleting the set if it
    /// empties) and free the arena slot.
    ///
    /// The alternating-rotation invariant is *not* re-propagated among
    /// the remaining members; removal never rebalances.
    pub fn remove_gear(&mut self, gear: GearId) {
        if let Some(set_id) = self.set_of(gear) {
            if let Some(members) = self.sets.get_mut(&set_id) {
                members.retain(|&m| m != gear);
                if members.is_empty() {
                    self.sets.remove(&set_id);
                }
            }
        }
        if let Some(slot) = self.gears.get_mut(gear.0) {
            *slot = None;
        }
    }

    fn merge_sets(&mut self, gear: GearId, adjacent: &[GearId]) -> Result<(), EngineError> {
        // Pick the most populous adjacent set; first strictly larger wins
        let mut seen: Vec<SetId> = Vec::with_capacity(adjacent.len());
        let mut target: Option<(SetId, GearId)> = None;
        let mut target_size = 0usize;
        for &neighbour in adjacent {
            let set_id = self
                .set_of(neighbour)
                .ok_or(EngineError::UngroupedGear { gear: neighbour })?;
            if seen.contains(&set_id) {
                continue;
            }
            seen.push(set_id);
            let size = self.sets.get(&set_id).map(Vec::len).unwrap_or(0);
            if size > target_size {
                target_size = size;
                target = Some((set_id, neighbour));
            }
        }
        let Some((target_id, reference)) = target else {
            return Err(EngineError::UngroupedGear { gear });
        };

        let forced = self
            .rotation(reference)
            .ok_or(EngineError::UngroupedGear { gear: reference })?
            .opposite();
        self.set_rotation(gear, forced);

        // Resolve conflicts against the other sets before merging them:
        // a whole-set turn fixes the new edge without breaking the set's
        // internal pairwise-opposite relationships.
        let mut sets_to_merge: Vec<SetId> = Vec::with_capacity(adjacent.len());
        for &neighbour in adjacent {
            let set_id = self
                .set_of(neighbour)
                .ok_or(EngineError::UngroupedGear { gear: neighbour })?;
            if set_id == target_id {
                continue;
            }
            let rotation = self
                .rotation(neighbour)
                .ok_or(EngineError::UngroupedGear { gear: neighbour })?;
            if rotation == forced {
                self.turn_set(neighbour)?;
            }
            sets_to_merge.push(set_id);
        }

        // Relabel everything into the target set and discard the rest
        debug!(
            "merging {} gear set(s) into set {}",
            sets_to_merge.len(),
            target_id.value()
        );
        for set_id in sets_to_merge {
            if set_id == target_id {
                continue;
            }
            // A set already absorbed this pass yields nothing the second time
            if let Some(members) = self.sets.remove(&set_id) {
                for member in &members {
                    if let Some(state) = self.state_mut(*member) {
                        state.set = Some(target_id);
                    }
                }
                if let Some(target_members) = self.sets.get_mut(&target_id) {
                    target_members.extend(members);
                }
            }
        }

        self.set_membership(gear, target_id);
        Ok(())
    }

    fn allocate_set(&mut self, _gear: GearId) -> SetId {
        let id = SetId(self.next_set_id);
        self.next_set_id += 1;
        self.sets.insert(id, Vec::new());
        id
    }

    fn set_membership(&mut self, gear: GearId, set_id: SetId) {
        if let Some(members) = self.sets.get_mut(&set_id) {
            members.push(gear);
        }
        if let Some(state) = self.state_mut(gear) {
            state.set = Some(set_id);
        }
    }

    fn set_rotation(&mut self, gear: GearId, rotation: GearRotation) {
        if let Some(state) = self.state_mut(gear) {
            state.rotation = rotation;
        }
    }

    fn state(&self, gear: GearId) -> Option<&GearState> {
        self.gears.get(gear.0).and_then(Option::as_ref)
    }

    fn state_mut(&mut self, gear: GearId) -> Option<&mut GearState> {
        self.gears.get_mut(gear.0).and_then(Option::as_mut)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::GearRotation::{Clockwise, Counterclockwise};

    #[test]
    fn test_singleton_keeps_initial_rotation() {
        let mut mgr = GearSetManager::new();
        let gear = mgr.create_gear(Counterclockwise);
        mgr.add_gear(gear, &[]).unwrap();
        assert_eq!(mgr.rotation(gear), Some(Counterclockwise));
        assert!(mgr.set_of(gear).is_some());
        assert_eq!(mgr.sets().count(), 1);
    }

    #[test]
    fn test_join_forces_opposite_rotation() {
        let mut mgr = GearSetManager::new();
        let first = mgr.create_gear(Clockwise);
        mgr.add_gear(first, &[]).unwrap();

        // Requested clockwise, but meshing with a clockwise neighbour
        // forces counterclockwise
        let second = mgr.create_gear(Clockwise);
        mgr.add_gear(second, &[first]).unwrap();
        assert_eq!(mgr.rotation(second), Some(Counterclockwise));
        assert_eq!(mgr.set_of(second), mgr.set_of(first));
        assert_eq!(mgr.sets().count(), 1);
    }

    #[test]
    fn test_turn_set_flips_every_member_once() {
        let mut mgr = GearSetManager::new();
        let a = mgr.create_gear(Clockwise);
        mgr.add_gear(a, &[]).unwrap();
        let b = mgr.create_gear(Clockwise);
        mgr.add_gear(b, &[a]).unwrap();

        let before = (mgr.rotation(a), mgr.rotation(b));
        mgr.turn_set(a).unwrap();
        assert_eq!(mgr.rotation(a), Some(Counterclockwise));
        assert_eq!(mgr.rotation(b), Some(Clockwise));

        // Turning twice restores every original rotation
        mgr.turn_set(b).unwrap();
        assert_eq!((mgr.rotation(a), mgr.rotation(b)), before);
    }

    #[test]
    fn test_turn_unknown_gear_fails() {
        let mut mgr = GearSetManager::new();
        let loner = mgr.create_gear(Clockwise);
        // Never added to a set
        assert_eq!(
            mgr.turn_set(loner),
            Err(EngineError::UngroupedGear { gear: loner })
        );
    }

    /// Build a chain of n meshed gears, alternating from `first`
    fn chain(mgr: &mut GearSetManager, n: usize, first: GearRotation) -> Vec<GearId> {
        let mut ids = Vec::new();
        for i in 0..n {
            let id = mgr.create_gear(first);
            if i == 0 {
                mgr.add_gear(id, &[]).unwrap();
            } else {
                mgr.add_gear(id, &[ids[i - 1]]).unwrap();
            }
            ids.push(id);
        }
        ids
    }

    #[test]
    fn test_merge_prefers_most_populous_set() {
        let mut mgr = GearSetManager::new();
        let small = chain(&mut mgr, 3, Clockwise);
        let large = chain(&mut mgr, 5, Clockwise);
        assert_eq!(mgr.sets().count(), 2);

        let large_rep_rotation = mgr.rotation(large[4]).unwrap();
        let bridge = mgr.create_gear(Clockwise);
        mgr.add_gear(bridge, &[small[2], large[4]]).unwrap();

        // One set of 3 + 5 + 1 members
        assert_eq!(mgr.sets().count(), 1);
        let (_, members) = mgr.sets().next().unwrap();
        assert_eq!(members.len(), 9);

        // New rotation opposes the large set's representative
        assert_eq!(mgr.rotation(bridge), Some(large_rep_rotation.opposite()));

        // The surviving set id is the large chain's
        assert_eq!(mgr.set_of(bridge), mgr.set_of(large[0]));
    }

    #[test]
    fn test_merge_turns_conflicting_smaller_set() {
        let mut mgr = GearSetManager::new();
        // small[2] ends up counterclockwise, large[4] clockwise: the new
        // gear is forced counterclockwise and collides with small[2]
        let small = chain(&mut mgr, 3, Counterclockwise);
        let large = chain(&mut mgr, 5, Clockwise);

        let small_before: Vec<_> = small.iter().map(|&g| mgr.rotation(g).unwrap()).collect();
        let forced = mgr.rotation(large[4]).unwrap().opposite();
        assert_eq!(mgr.rotation(small[2]), Some(forced));

        let bridge = mgr.create_gear(Clockwise);
        mgr.add_gear(bridge, &[small[2], large[4]]).unwrap();
        assert_eq!(mgr.rotation(bridge), Some(forced));

        // Every member of the conflicted set flipped exactly once
        for (&g, before) in small.iter().zip(&small_before) {
            assert_eq!(mgr.rotation(g), Some(before.opposite()));
        }
        // New edges satisfied
        assert_ne!(mgr.rotation(bridge), mgr.rotation(small[2]));
        assert_ne!(mgr.rotation(bridge), mgr.rotation(large[4]));
    }

    #[test]
    fn test_merge_leaves_nonconflicting_set_untouched() {
        let mut mgr = GearSetManager::new();
        let small = chain(&mut mgr, 3, Clockwise);
        let large = chain(&mut mgr, 5, Clockwise);

        let small_before: Vec<_> = small.iter().map(|&g| mgr.rotation(g).unwrap()).collect();
        let forced = mgr.rotation(large[4]).unwrap().opposite();
        assert_ne!(mgr.rotation(small[2]), Some(forced));

        let bridge = mgr.create_gear(Clockwise);
        mgr.add_gear(bridge, &[small[2], large[4]]).unwrap();

        for (&g, before) in small.iter().zip(&small_before) {
            assert_eq!(mgr.rotation(g), Some(*before));
        }
        assert_eq!(mgr.sets().count(), 1);
    }

    #[test]
    fn test_merge_equal_sizes_keeps_earliest_seen() {
        let mut mgr = GearSetManager::new();
        let first = chain(&mut mgr, 2, Clockwise);
        let second = chain(&mut mgr, 2, Clockwise);
        let first_set = mgr.set_of(first[0]).unwrap();

        let bridge = mgr.create_gear(Clockwise);
        mgr.add_gear(bridge, &[first[1], second[1]]).unwrap();

        assert_eq!(mgr.set_of(bridge), Some(first_set));
        assert_eq!(mgr.set_of(second[0]), Some(first_set));
    }

    #[test]
    fn test_remove_gear_drops_membership_and_empty_sets() {
        let mut mgr = GearSetManager::new();
        let a = mgr.create_gear(Clockwise);
        mgr.add_gear(a, &[]).unwrap();
        let b = mgr.create_gear(Clockwise);
        mgr.add_gear(b, &[a]).unwrap();

        mgr.remove_gear(a);
        assert_eq!(mgr.rotation(a), None);
        assert_eq!(mgr.len(), 1);
        assert_eq!(mgr.sets().count(), 1);

        mgr.remove_gear(b);
        assert_eq!(mgr.sets().count(), 0);
        assert!(mgr.is_empty());
    }

    #[test]
    fn test_arena_reuses_freed_slots() {
        let mut mgr = GearSetManager::new();
        let a = mgr.create_gear(Clockwise);
        mgr.add_gear(a, &[]).unwrap();
        mgr.remove_gear(a);
        let b = mgr.create_gear(Counterclockwise);
        assert_eq!(b.index(), a.index());
    }
}
