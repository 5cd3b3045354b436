#![forbid(unsafe_code)]

//! Registry of live overlays with front ordering and page-wide claims.
//!
//! The `StackRegistry` tracks every overlay created against a context, in
//! creation order. Front/back order is separate from that order: each
//! activation stamps the overlay with an *activate order* one above the
//! current front-most, and the z-index is `base + activate_order`.
//!
//! # Invariants
//!
//! - Ids are assigned from a counter that never goes backwards; removed ids
//!   are never handed out again.
//! - Among active entries, [`StackRegistry::front_most`] is the one with the
//!   strictly highest activate order. Entries with order 0 are never front.
//! - The transitioning set and both claim sets have set semantics: repeated
//!   adds or removes for one id are no-ops.
//! - Claim sets report an edge only when they go from empty to non-empty or
//!   back.
//!
//! # Failure Modes
//!
//! - Queries for unknown ids return `None` / `false` / 0.
//! - `unregister` of an unknown id returns `false`.
//! - Members whose overlay was dropped still occupy their slot until
//!   unregistered; [`StackRegistry::member`] returns `None` for them.
//!
//! # Example
//!
//! ```ignore
//! let mut registry = StackRegistry::new();
//! let a = registry.register(weak_a);
//! let b = registry.register(weak_b);
//! registry.set_active(a, true);
//! registry.bring_to_front(a);
//! registry.set_active(b, true);
//! registry.bring_to_front(b);
//! assert_eq!(registry.front_most(), Some(b));
//! ```

use std::rc::{Rc, Weak};

use ahash::AHashSet;
use tracing::debug;
use vstack_core::event::ElementId;

/// Unique identifier for an overlay in a registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StackId(u64);

impl StackId {
    /// Get the raw ID value.
    #[inline]
    pub const fn id(self) -> u64 {
        self.0
    }
}

/// Callbacks the context routes to individual overlays.
///
/// Implemented by the overlay state; the registry stores members weakly.
pub trait StackMember {
    /// Escape was pressed while this overlay was front-most.
    fn on_escape(&self);

    /// The application navigated.
    fn on_navigation(&self);

    /// Whether this overlay currently vetoes navigation.
    fn blocks_navigation(&self) -> bool {
        false
    }

    /// Focus moved to `target` while this overlay was front-most and trapping.
    fn trap_focus(&self, _target: ElementId) {}
}

/// Which way a claim set crossed empty/non-empty.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClaimEdge {
    /// The first claimant arrived.
    Engaged,
    /// The last claimant left.
    Released,
    Unchanged,
}

/// Edge-triggered claimant set.
#[derive(Debug, Default)]
pub struct ClaimSet {
    claimants: AHashSet<StackId>,
}

impl ClaimSet {
    pub fn claim(&mut self, id: StackId) -> ClaimEdge {
        let was_empty = self.claimants.is_empty();
        if self.claimants.insert(id) && was_empty {
            ClaimEdge::Engaged
        } else {
            ClaimEdge::Unchanged
        }
    }

    pub fn release(&mut self, id: StackId) -> ClaimEdge {
        if self.claimants.remove(&id) && self.claimants.is_empty() {
            ClaimEdge::Released
        } else {
            ClaimEdge::Unchanged
        }
    }

    #[inline]
    pub fn is_engaged(&self) -> bool {
        !self.claimants.is_empty()
    }

    #[inline]
    pub fn contains(&self, id: StackId) -> bool {
        self.claimants.contains(&id)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.claimants.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.claimants.is_empty()
    }
}

struct Entry {
    id: StackId,
    member: Weak<dyn StackMember>,
    active: bool,
    activate_order: u64,
}

/// Ordered collection of overlays for one context.
///
/// # Invariants
///
/// - `entries` is in registration order, independent of front order.
/// - `next_id` is strictly greater than every id ever assigned.
pub struct StackRegistry {
    entries: Vec<Entry>,
    next_id: u64,
    transitioning: AHashSet<StackId>,
    scroll_lock: ClaimSet,
    focus_trap: ClaimSet,
}

impl Default for StackRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for StackRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StackRegistry")
            .field("ids", &self.ids())
            .field("front_most", &self.front_most())
            .field("transitioning", &self.transitioning.len())
            .field("scroll_lock", &self.scroll_lock.len())
            .field("focus_trap", &self.focus_trap.len())
            .finish()
    }
}

impl StackRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            next_id: 1,
            transitioning: AHashSet::new(),
            scroll_lock: ClaimSet::default(),
            focus_trap: ClaimSet::default(),
        }
    }

    // --- Membership ---

    /// Register a member, returning its id.
    ///
    /// Registering the same member again returns the existing id.
    pub fn register(&mut self, member: Weak<dyn StackMember>) -> StackId {
        if let Some(entry) = self.entries.iter().find(|e| Weak::ptr_eq(&e.member, &member)) {
            return entry.id;
        }
        let id = StackId(self.next_id);
        self.next_id += 1;
        self.entries.push(Entry {
            id,
            member,
            active: false,
            activate_order: 0,
        });
        debug!(id = id.0, depth = self.entries.len(), "overlay registered");
        id
    }

    /// Remove a member and every claim it holds.
    ///
    /// Returns the claim edges produced so the caller can undo page-wide
    /// side effects: `(removed, scroll_lock_edge, focus_trap_edge)`.
    pub fn unregister(&mut self, id: StackId) -> (bool, ClaimEdge, ClaimEdge) {
        let Some(idx) = self.entries.iter().position(|e| e.id == id) else {
            return (false, ClaimEdge::Unchanged, ClaimEdge::Unchanged);
        };
        self.entries.remove(idx);
        self.transitioning.remove(&id);
        let scroll = self.scroll_lock.release(id);
        let focus = self.focus_trap.release(id);
        debug!(id = id.0, depth = self.entries.len(), "overlay unregistered");
        (true, scroll, focus)
    }

    /// Check if an overlay with the given ID is registered.
    pub fn contains(&self, id: StackId) -> bool {
        self.entries.iter().any(|e| e.id == id)
    }

    /// Number of registered overlays.
    #[inline]
    pub fn depth(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Registered ids in registration order.
    pub fn ids(&self) -> Vec<StackId> {
        self.entries.iter().map(|e| e.id).collect()
    }

    /// Upgrade a member handle.
    pub fn member(&self, id: StackId) -> Option<Rc<dyn StackMember>> {
        self.entry(id).and_then(|e| e.member.upgrade())
    }

    /// Live members in registration order.
    pub fn members(&self) -> Vec<Rc<dyn StackMember>> {
        self.entries
            .iter()
            .filter_map(|e| e.member.upgrade())
            .collect()
    }

    /// Live members that are currently active, in registration order.
    pub fn active_members(&self) -> Vec<Rc<dyn StackMember>> {
        self.entries
            .iter()
            .filter(|e| e.active)
            .filter_map(|e| e.member.upgrade())
            .collect()
    }

    // --- Activation & Ordering ---

    pub fn set_active(&mut self, id: StackId, active: bool) {
        if let Some(entry) = self.entry_mut(id) {
            entry.active = active;
        }
    }

    pub fn is_active(&self, id: StackId) -> bool {
        self.entry(id).is_some_and(|e| e.active)
    }

    /// Current activate order, 0 when not rendered or unknown.
    pub fn activate_order(&self, id: StackId) -> u64 {
        self.entry(id).map_or(0, |e| e.activate_order)
    }

    /// Drop the overlay out of front ordering.
    pub fn reset_order(&mut self, id: StackId) {
        if let Some(entry) = self.entry_mut(id) {
            entry.activate_order = 0;
        }
    }

    /// The active overlay with the highest activate order.
    pub fn front_most(&self) -> Option<StackId> {
        let mut front = None;
        let mut max_order = 0;
        for entry in self.entries.iter().filter(|e| e.active) {
            if entry.activate_order > max_order {
                max_order = entry.activate_order;
                front = Some(entry.id);
            }
        }
        front
    }

    /// The front-most overlay's member handle.
    pub fn front_member(&self) -> Option<Rc<dyn StackMember>> {
        self.front_most().and_then(|id| self.member(id))
    }

    pub fn is_front_most(&self, id: StackId) -> bool {
        self.front_most() == Some(id)
    }

    /// Stamp `id` one above the current front-most (or 1 when none is
    /// active). Returns the new order.
    pub fn bring_to_front(&mut self, id: StackId) -> u64 {
        let order = self
            .front_most()
            .map_or(0, |front| self.activate_order(front))
            + 1;
        if let Some(entry) = self.entry_mut(id) {
            entry.activate_order = order;
            order
        } else {
            0
        }
    }

    /// Z-index for `id` on top of `base`.
    pub fn z_index(&self, id: StackId, base: u32) -> Option<u32> {
        let order = self.entry(id)?.activate_order;
        Some(base.saturating_add(u32::try_from(order).unwrap_or(u32::MAX)))
    }

    // --- Transitions ---

    pub fn mark_transitioning(&mut self, id: StackId) {
        self.transitioning.insert(id);
    }

    pub fn clear_transitioning(&mut self, id: StackId) {
        self.transitioning.remove(&id);
    }

    pub fn is_transitioning(&self, id: StackId) -> bool {
        self.transitioning.contains(&id)
    }

    /// Whether any overlay is mid-animation.
    pub fn any_transitioning(&self) -> bool {
        !self.transitioning.is_empty()
    }

    // --- Claims ---

    pub fn claim_scroll_lock(&mut self, id: StackId) -> ClaimEdge {
        self.scroll_lock.claim(id)
    }

    pub fn release_scroll_lock(&mut self, id: StackId) -> ClaimEdge {
        self.scroll_lock.release(id)
    }

    pub fn is_scroll_locked(&self) -> bool {
        self.scroll_lock.is_engaged()
    }

    pub fn claim_focus_trap(&mut self, id: StackId) -> ClaimEdge {
        self.focus_trap.claim(id)
    }

    pub fn release_focus_trap(&mut self, id: StackId) -> ClaimEdge {
        self.focus_trap.release(id)
    }

    pub fn is_focus_trapped(&self) -> bool {
        self.focus_trap.is_engaged()
    }

    /// Whether `id` holds a focus-trap claim.
    pub fn traps_focus(&self, id: StackId) -> bool {
        self.focus_trap.contains(id)
    }

    fn entry(&self, id: StackId) -> Option<&Entry> {
        self.entries.iter().find(|e| e.id == id)
    }

    fn entry_mut(&mut self, id: StackId) -> Option<&mut Entry> {
        self.entries.iter_mut().find(|e| e.id == id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::cell::Cell;

    #[derive(Default)]
    struct Stub {
        escapes: Cell<u32>,
    }

    impl StackMember for Stub {
        fn on_escape(&self) {
            self.escapes.set(self.escapes.get() + 1);
        }

        fn on_navigation(&self) {}
    }

    fn stub() -> (Rc<Stub>, Weak<dyn StackMember>) {
        let rc = Rc::new(Stub::default());
        let as_dyn: Rc<dyn StackMember> = rc.clone();
        (rc, Rc::downgrade(&as_dyn))
    }

    fn activate(reg: &mut StackRegistry, id: StackId) {
        reg.set_active(id, true);
        reg.bring_to_front(id);
    }

    #[test]
    fn empty_registry() {
        let reg = StackRegistry::new();
        assert!(reg.is_empty());
        assert_eq!(reg.depth(), 0);
        assert!(reg.front_most().is_none());
        assert!(!reg.any_transitioning());
    }

    #[test]
    fn register_is_idempotent() {
        let mut reg = StackRegistry::new();
        let (_keep, weak) = stub();
        let a = reg.register(weak.clone());
        let b = reg.register(weak);
        assert_eq!(a, b);
        assert_eq!(reg.depth(), 1);
    }

    #[test]
    fn ids_are_never_reused() {
        let mut reg = StackRegistry::new();
        let (_p1, w1) = stub();
        let (_p2, w2) = stub();
        let a = reg.register(w1);
        assert!(reg.unregister(a).0);
        assert!(!reg.unregister(a).0);
        let b = reg.register(w2);
        assert!(b.id() > a.id());
        assert!(!reg.contains(a));
    }

    #[test]
    fn ids_keep_registration_order() {
        let mut reg = StackRegistry::new();
        let stubs: Vec<_> = (0..3).map(|_| stub()).collect();
        let ids: Vec<_> = stubs.iter().map(|(_, w)| reg.register(w.clone())).collect();
        activate(&mut reg, ids[2]);
        activate(&mut reg, ids[0]);
        assert_eq!(reg.ids(), ids);
    }

    #[test]
    fn bring_to_front_stacks_orders() {
        let mut reg = StackRegistry::new();
        let (_p1, w1) = stub();
        let (_p2, w2) = stub();
        let a = reg.register(w1);
        let b = reg.register(w2);

        activate(&mut reg, a);
        assert_eq!(reg.activate_order(a), 1);
        activate(&mut reg, b);
        assert_eq!(reg.activate_order(b), 2);
        assert_eq!(reg.front_most(), Some(b));

        reg.bring_to_front(a);
        assert_eq!(reg.activate_order(a), 3);
        assert!(reg.is_front_most(a));
        assert!(!reg.is_front_most(b));
    }

    #[test]
    fn inactive_entries_are_never_front() {
        let mut reg = StackRegistry::new();
        let (_p1, w1) = stub();
        let (_p2, w2) = stub();
        let a = reg.register(w1);
        let b = reg.register(w2);
        activate(&mut reg, a);
        activate(&mut reg, b);
        reg.set_active(b, false);
        assert_eq!(reg.front_most(), Some(a));
        reg.set_active(a, false);
        assert_eq!(reg.front_most(), None);

        // Nothing active: order restarts at 1.
        reg.set_active(a, true);
        assert_eq!(reg.bring_to_front(a), 1);
    }

    #[test]
    fn z_index_adds_order_to_base() {
        let mut reg = StackRegistry::new();
        let (_p, w) = stub();
        let a = reg.register(w);
        assert_eq!(reg.z_index(a, 32767), Some(32767));
        activate(&mut reg, a);
        assert_eq!(reg.z_index(a, 32767), Some(32768));
        reg.reset_order(a);
        assert_eq!(reg.z_index(a, 32767), Some(32767));
        assert_eq!(reg.z_index(StackId(99), 32767), None);
    }

    #[test]
    fn front_member_routes_to_front() {
        let mut reg = StackRegistry::new();
        let (p1, w1) = stub();
        let (p2, w2) = stub();
        let a = reg.register(w1);
        let b = reg.register(w2);
        activate(&mut reg, b);
        activate(&mut reg, a);
        if let Some(front) = reg.front_member() {
            front.on_escape();
        }
        assert_eq!(p1.escapes.get(), 1);
        assert_eq!(p2.escapes.get(), 0);
    }

    #[test]
    fn dropped_member_is_not_upgraded() {
        let mut reg = StackRegistry::new();
        let (p, w) = stub();
        let a = reg.register(w);
        drop(p);
        assert!(reg.contains(a));
        assert!(reg.member(a).is_none());
        assert!(reg.members().is_empty());
    }

    #[test]
    fn transitioning_has_set_semantics() {
        let mut reg = StackRegistry::new();
        let (_p, w) = stub();
        let a = reg.register(w);
        reg.mark_transitioning(a);
        reg.mark_transitioning(a);
        assert!(reg.any_transitioning());
        reg.clear_transitioning(a);
        assert!(!reg.any_transitioning());
        reg.clear_transitioning(a);
        assert!(!reg.is_transitioning(a));
    }

    #[test]
    fn scroll_lock_edges_with_two_claimants() {
        let mut reg = StackRegistry::new();
        let (_p1, w1) = stub();
        let (_p2, w2) = stub();
        let a = reg.register(w1);
        let b = reg.register(w2);

        assert_eq!(reg.claim_scroll_lock(a), ClaimEdge::Engaged);
        assert_eq!(reg.claim_scroll_lock(a), ClaimEdge::Unchanged);
        assert_eq!(reg.claim_scroll_lock(b), ClaimEdge::Unchanged);
        assert_eq!(reg.release_scroll_lock(a), ClaimEdge::Unchanged);
        assert!(reg.is_scroll_locked());
        assert_eq!(reg.release_scroll_lock(a), ClaimEdge::Unchanged);
        assert_eq!(reg.release_scroll_lock(b), ClaimEdge::Released);
        assert!(!reg.is_scroll_locked());
    }

    #[test]
    fn unregister_releases_claims() {
        let mut reg = StackRegistry::new();
        let (_p, w) = stub();
        let a = reg.register(w);
        reg.claim_scroll_lock(a);
        reg.claim_focus_trap(a);
        reg.mark_transitioning(a);
        let (removed, scroll, focus) = reg.unregister(a);
        assert!(removed);
        assert_eq!(scroll, ClaimEdge::Released);
        assert_eq!(focus, ClaimEdge::Released);
        assert!(!reg.any_transitioning());
    }

    proptest! {
        #[test]
        fn front_most_has_max_order(ops in prop::collection::vec((0usize..6, any::<bool>()), 1..60)) {
            let mut reg = StackRegistry::new();
            let stubs: Vec<_> = (0..6).map(|_| stub()).collect();
            let ids: Vec<_> = stubs.iter().map(|(_, w)| reg.register(w.clone())).collect();

            for (idx, activate_it) in ops {
                let id = ids[idx];
                if activate_it {
                    reg.set_active(id, true);
                    reg.bring_to_front(id);
                    prop_assert_eq!(reg.front_most(), Some(id));
                } else {
                    reg.set_active(id, false);
                }

                let max = ids
                    .iter()
                    .filter(|id| reg.is_active(**id))
                    .map(|id| reg.activate_order(*id))
                    .max();
                match reg.front_most() {
                    Some(front) => {
                        prop_assert_eq!(Some(reg.activate_order(front)), max);
                        let ties = ids
                            .iter()
                            .filter(|id| reg.is_active(**id) && reg.activate_order(**id) == reg.activate_order(front))
                            .count();
                        prop_assert_eq!(ties, 1);
                    }
                    None => prop_assert!(max.is_none()),
                }
            }
        }

        #[test]
        fn claim_release_nets_to_membership(ops in prop::collection::vec((0usize..4, any::<bool>()), 0..80)) {
            let mut reg = StackRegistry::new();
            let stubs: Vec<_> = (0..4).map(|_| stub()).collect();
            let ids: Vec<_> = stubs.iter().map(|(_, w)| reg.register(w.clone())).collect();
            let mut model = std::collections::HashSet::new();
            let mut engaged = false;

            for (idx, claim) in ops {
                let edge = if claim {
                    model.insert(idx);
                    reg.claim_scroll_lock(ids[idx])
                } else {
                    model.remove(&idx);
                    reg.release_scroll_lock(ids[idx])
                };
                match edge {
                    ClaimEdge::Engaged => { prop_assert!(!engaged); engaged = true; }
                    ClaimEdge::Released => { prop_assert!(engaged); engaged = false; }
                    ClaimEdge::Unchanged => {}
                }
                prop_assert_eq!(engaged, !model.is_empty());
                prop_assert_eq!(reg.is_scroll_locked(), !model.is_empty());
            }
        }
    }
}
