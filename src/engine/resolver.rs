//! Composite profile resolution.
//!
//! Flattens a profile's include graph into a deduplicated member list.
//! Cycles are reported as data and never expanded; the root profile is never
//! its own member.

use std::collections::HashSet;

use indexmap::IndexSet;

use crate::profile::{Profile, ProfileId};

/// Flattened include graph of one root profile.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolvedGraph {
    /// Included profiles in first-discovery order, root excluded.
    pub members: Vec<ProfileId>,
    /// Each cycle as the include path that closes it, e.g. `[a, b, a]`.
    pub cycles: Vec<Vec<ProfileId>>,
    /// Include references to profiles that do not exist.
    pub missing: Vec<ProfileId>,
}

impl ResolvedGraph {
    pub fn contains(&self, id: &ProfileId) -> bool {
        self.members.contains(id)
    }

    pub fn has_cycles(&self) -> bool {
        !self.cycles.is_empty()
    }
}

/// Depth-first resolver over the include relation.
pub struct CompositeResolver<F> {
    lookup: F,
}

impl<'a, F> CompositeResolver<F>
where
    F: Fn(&ProfileId) -> Option<&'a Profile>,
{
    pub fn new(lookup: F) -> Self {
        Self { lookup }
    }

    /// Resolve everything reachable from `root`'s include list.
    ///
    /// Children are visited in include-list order, so the result is
    /// deterministic for a given set of profiles.
    pub fn resolve(&self, root: &Profile) -> ResolvedGraph {
        let mut walk = Walk {
            stack: vec![root.id.clone()],
            visiting: HashSet::from([root.id.clone()]),
            resolved: IndexSet::new(),
            cycles: Vec::new(),
            missing: IndexSet::new(),
        };

        self.descend(root, &mut walk);

        if !walk.cycles.is_empty() {
            crate::debug_event!(
                "resolver",
                "cycles",
                "{} in include graph of {}",
                walk.cycles.len(),
                root.id
            );
        }

        ResolvedGraph {
            members: walk.resolved.into_iter().collect(),
            cycles: walk.cycles,
            missing: walk.missing.into_iter().collect(),
        }
    }

    fn descend(&self, profile: &Profile, walk: &mut Walk) {
        for child_id in &profile.includes {
            if walk.visiting.contains(child_id) {
                walk.record_cycle(child_id);
                continue;
            }
            if walk.resolved.contains(child_id) {
                continue;
            }
            let Some(child) = (self.lookup)(child_id) else {
                walk.missing.insert(child_id.clone());
                continue;
            };

            walk.resolved.insert(child_id.clone());
            walk.visiting.insert(child_id.clone());
            walk.stack.push(child_id.clone());

            self.descend(child, walk);

            walk.stack.pop();
            walk.visiting.remove(child_id);
        }
    }
}

/// Traversal state for one `resolve` call.
struct Walk {
    stack: Vec<ProfileId>,
    visiting: HashSet<ProfileId>,
    resolved: IndexSet<ProfileId>,
    cycles: Vec<Vec<ProfileId>>,
    missing: IndexSet<ProfileId>,
}

impl Walk {
    /// Record the stack slice from `back_to` to the top, closed by `back_to`.
    fn record_cycle(&mut self, back_to: &ProfileId) {
        if let Some(start) = self.stack.iter().position(|id| id == back_to) {
            let mut cycle = self.stack[start..].to_vec();
            cycle.push(back_to.clone());
            self.cycles.push(cycle);
        }
    }
}

/// Resolve `root` against a slice-backed lookup.
pub fn resolve_in<'a, I>(profiles: I, root: &Profile) -> ResolvedGraph
where
    I: IntoIterator<Item = &'a Profile>,
{
    let by_id: std::collections::HashMap<&ProfileId, &Profile> =
        profiles.into_iter().map(|p| (&p.id, p)).collect();
    CompositeResolver::new(|id: &ProfileId| by_id.get(id).copied()).resolve(root)
}
