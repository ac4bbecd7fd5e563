//! Join-code allocation for the offline backend.
//!
//! Codes are 4-digit numeric strings unique among currently active groups.
//! The realtime backend delegates uniqueness to the authoritative store; this
//! registry covers the local, single-process case.

use buzz_types::{GroupId, JoinCode};
use rand::Rng;
use std::collections::HashMap;

/// Tracks active join codes and the groups they resolve to.
#[derive(Debug, Clone, Default)]
pub struct CodeRegistry {
    active: HashMap<JoinCode, GroupId>,
}

impl CodeRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate a unique code for a group, regenerating on collision.
    ///
    /// The code space holds 9000 values; allocation is draw-and-retry, which
    /// stays cheap well past the occupancy this system ever reaches.
    pub fn allocate<R: Rng + ?Sized>(&mut self, rng: &mut R, group: GroupId) -> JoinCode {
        loop {
            let code = JoinCode::random(rng);
            if !self.active.contains_key(&code) {
                self.active.insert(code.clone(), group);
                return code;
            }
        }
    }

    /// Resolve a code to the group it names, if active.
    pub fn resolve(&self, code: &JoinCode) -> Option<GroupId> {
        self.active.get(code).copied()
    }

    /// Release a code when its group is torn down.
    pub fn release(&mut self, code: &JoinCode) {
        self.active.remove(code);
    }

    /// Number of active codes.
    pub fn len(&self) -> usize {
        self.active.len()
    }

    /// Check if no codes are active.
    pub fn is_empty(&self) -> bool {
        self.active.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn allocated_code_resolves_to_group() {
        let mut registry = CodeRegistry::new();
        let mut rng = rand::thread_rng();
        let group = GroupId::new();

        let code = registry.allocate(&mut rng, group);

        assert_eq!(registry.resolve(&code), Some(group));
    }

    #[test]
    fn unknown_code_does_not_resolve() {
        let registry = CodeRegistry::new();
        let code = JoinCode::parse("1234").unwrap();
        assert_eq!(registry.resolve(&code), None);
    }

    #[test]
    fn thousand_groups_get_distinct_codes() {
        let mut registry = CodeRegistry::new();
        let mut rng = rand::thread_rng();
        let mut seen = HashSet::new();

        for _ in 0..1000 {
            let code = registry.allocate(&mut rng, GroupId::new());
            assert!(seen.insert(code), "duplicate code allocated");
        }

        assert_eq!(registry.len(), 1000);
    }

    #[test]
    fn released_code_stops_resolving() {
        let mut registry = CodeRegistry::new();
        let mut rng = rand::thread_rng();
        let code = registry.allocate(&mut rng, GroupId::new());

        registry.release(&code);

        assert_eq!(registry.resolve(&code), None);
        assert!(registry.is_empty());
    }

    #[test]
    fn released_code_can_be_reallocated() {
        let mut registry = CodeRegistry::new();
        let mut rng = rand::thread_rng();

        // Fill a large share of the code space, then free it all. A fresh
        // allocation must still terminate and succeed.
        let codes: Vec<JoinCode> = (0..5000)
            .map(|_| registry.allocate(&mut rng, GroupId::new()))
            .collect();
        for code in &codes {
            registry.release(code);
        }

        let code = registry.allocate(&mut rng, GroupId::new());
        assert!(registry.resolve(&code).is_some());
    }
}
