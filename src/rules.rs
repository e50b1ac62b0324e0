//! Mutation rules.
//!
//! Rules run on every mutation and may adjust the target mixin set before the
//! domain resolves it. The domain applies all rules in registration order and
//! repeats until a full pass leaves the target unchanged.

use std::collections::BTreeSet;
use std::fmt;

use crate::types::FeatureId;

/// The mixin set a mutation is heading for, as seen by a [`MutationRule`].
pub struct PendingMutation<'a> {
    current: &'a BTreeSet<FeatureId>,
    target: BTreeSet<FeatureId>,
}

impl<'a> PendingMutation<'a> {
    pub(crate) fn new(current: &'a BTreeSet<FeatureId>, target: BTreeSet<FeatureId>) -> Self {
        Self { current, target }
    }

    /// Mixins of the object before the mutation.
    pub fn current(&self) -> &BTreeSet<FeatureId> {
        self.current
    }

    pub fn target(&self) -> &BTreeSet<FeatureId> {
        &self.target
    }

    pub fn contains(&self, mixin: FeatureId) -> bool {
        self.target.contains(&mixin)
    }

    /// True if `mixin` will be present afterwards but is not present now.
    pub fn is_adding(&self, mixin: FeatureId) -> bool {
        self.target.contains(&mixin) && !self.current.contains(&mixin)
    }

    /// True if `mixin` is present now but will not be afterwards.
    pub fn is_removing(&self, mixin: FeatureId) -> bool {
        self.current.contains(&mixin) && !self.target.contains(&mixin)
    }

    pub fn add(&mut self, mixin: FeatureId) {
        self.target.insert(mixin);
    }

    pub fn remove(&mut self, mixin: FeatureId) {
        self.target.remove(&mixin);
    }

    pub(crate) fn into_target(self) -> BTreeSet<FeatureId> {
        self.target
    }
}

pub trait MutationRule: Send + Sync {
    fn apply(&self, mutation: &mut PendingMutation<'_>);

    /// `(required, dependent)` pairs this rule enforces. Used for dependency
    /// analysis only.
    fn requirements(&self) -> Vec<(FeatureId, FeatureId)> {
        Vec::new()
    }

    fn describe(&self) -> String;
}

impl fmt::Debug for dyn MutationRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.describe())
    }
}

/// The mixin is present after every mutation.
#[derive(Debug, Clone, Copy)]
pub struct Mandatory(pub FeatureId);

impl MutationRule for Mandatory {
    fn apply(&self, mutation: &mut PendingMutation<'_>) {
        mutation.add(self.0);
    }

    fn describe(&self) -> String {
        format!("mandatory {}", self.0)
    }
}

/// The mixin is removed by every mutation.
#[derive(Debug, Clone, Copy)]
pub struct Deprecated(pub FeatureId);

impl MutationRule for Deprecated {
    fn apply(&self, mutation: &mut PendingMutation<'_>) {
        mutation.remove(self.0);
    }

    fn describe(&self) -> String {
        format!("deprecated {}", self.0)
    }
}

/// At most one member of the group is present.
///
/// A member being added displaces the others. If several members are added by
/// the same mutation, the one listed first in the group stays.
#[derive(Debug, Clone)]
pub struct MutuallyExclusive {
    members: Vec<FeatureId>,
}

impl MutuallyExclusive {
    pub fn new(members: impl IntoIterator<Item = FeatureId>) -> Self {
        Self {
            members: members.into_iter().collect(),
        }
    }

    pub fn members(&self) -> &[FeatureId] {
        &self.members
    }
}

impl MutationRule for MutuallyExclusive {
    fn apply(&self, mutation: &mut PendingMutation<'_>) {
        let keep = self
            .members
            .iter()
            .copied()
            .find(|&member| mutation.is_adding(member))
            .or_else(|| {
                self.members
                    .iter()
                    .copied()
                    .find(|&member| mutation.contains(member))
            });
        if let Some(keep) = keep {
            for &member in &self.members {
                if member != keep {
                    mutation.remove(member);
                }
            }
        }
    }

    fn describe(&self) -> String {
        let members: Vec<String> = self.members.iter().map(ToString::to_string).collect();
        format!("mutually exclusive [{}]", members.join(", "))
    }
}

/// Whenever `mixin` is present, every mixin in `requires` is present too.
#[derive(Debug, Clone)]
pub struct Dependent {
    mixin: FeatureId,
    requires: Vec<FeatureId>,
}

impl Dependent {
    pub fn new(mixin: FeatureId, requires: impl IntoIterator<Item = FeatureId>) -> Self {
        Self {
            mixin,
            requires: requires.into_iter().collect(),
        }
    }

    pub fn mixin(&self) -> FeatureId {
        self.mixin
    }

    pub fn requires(&self) -> &[FeatureId] {
        &self.requires
    }
}

impl MutationRule for Dependent {
    fn apply(&self, mutation: &mut PendingMutation<'_>) {
        if mutation.contains(self.mixin) {
            for &required in &self.requires {
                mutation.add(required);
            }
        }
    }

    fn requirements(&self) -> Vec<(FeatureId, FeatureId)> {
        self.requires
            .iter()
            .map(|&required| (required, self.mixin))
            .collect()
    }

    fn describe(&self) -> String {
        let requires: Vec<String> = self.requires.iter().map(ToString::to_string).collect();
        format!("{} requires [{}]", self.mixin, requires.join(", "))
    }
}
