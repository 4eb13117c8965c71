//! Constraints: a named restriction on the values one attribute may take.
//!
//! Values are held in a sorted set, so two constraints built from the same
//! values in a different order compare and hash identically.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use crate::error::{PipelineError, Result};

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Constraint {
    key: String,
    values: BTreeSet<String>,
}

impl Constraint {
    pub fn new<K, I, V>(key: K, values: I) -> Self
    where
        K: Into<String>,
        I: IntoIterator<Item = V>,
        V: Into<String>,
    {
        Self {
            key: key.into(),
            values: values.into_iter().map(Into::into).collect(),
        }
    }

    /// A constraint with no values yet, as produced by a bare template placeholder
    pub fn empty(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            values: BTreeSet::new(),
        }
    }

    pub fn single(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self::new(key, [value.into()])
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn values(&self) -> &BTreeSet<String> {
        &self.values
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn contains(&self, value: &str) -> bool {
        self.values.contains(value)
    }

    /// Union of the values of two constraints, keeping this constraint's key
    pub fn union(&self, other: &Constraint) -> Constraint {
        Constraint {
            key: self.key.clone(),
            values: self.values.union(&other.values).cloned().collect(),
        }
    }

    /// Intersection of the values of two constraints, keeping this constraint's key
    pub fn intersection(&self, other: &Constraint) -> Constraint {
        Constraint {
            key: self.key.clone(),
            values: self.values.intersection(&other.values).cloned().collect(),
        }
    }

    /// The same values published under another key
    pub fn renamed(&self, key: impl Into<String>) -> Constraint {
        Constraint {
            key: key.into(),
            values: self.values.clone(),
        }
    }

    pub fn insert(&mut self, value: impl Into<String>) -> bool {
        self.values.insert(value.into())
    }
}

impl fmt::Display for Constraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let values: Vec<&str> = self.values.iter().map(String::as_str).collect();
        write!(f, "Constraint({}: [{}])", self.key, values.join(", "))
    }
}

/// A set of constraints holding at most one constraint per key.
///
/// Adding a constraint whose key is already present unions the values. Replacing
/// them requires an explicit [`ConstraintSet::overwrite`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConstraintSet {
    entries: BTreeMap<String, Constraint>,
}

impl ConstraintSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&Constraint> {
        self.entries.get(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn key_set(&self) -> BTreeSet<String> {
        self.entries.keys().cloned().collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Constraint> {
        self.entries.values()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Union-merge a constraint into the set
    pub fn merge(&mut self, constraint: Constraint) {
        match self.entries.get_mut(constraint.key()) {
            Some(existing) => existing.values.extend(constraint.values),
            None => {
                self.entries.insert(constraint.key.clone(), constraint);
            }
        }
    }

    /// Replace whatever constraint is held under this key
    pub fn overwrite(&mut self, constraint: Constraint) {
        self.entries.insert(constraint.key.clone(), constraint);
    }

    /// Add a single value to the constraint for `key`, creating it if needed
    pub fn insert_value(&mut self, key: &str, value: impl Into<String>) -> bool {
        self.entries
            .entry(key.to_string())
            .or_insert_with(|| Constraint::empty(key))
            .insert(value)
    }

    /// Return a copy of this set without the named constraints.
    ///
    /// Fails if any requested name is not present; `self` is never modified.
    pub fn remove<S: AsRef<str>>(&self, names: &[S]) -> Result<ConstraintSet> {
        if let Some(missing) = names
            .iter()
            .map(AsRef::as_ref)
            .find(|name| !self.entries.contains_key(*name))
        {
            return Err(PipelineError::constraint_not_found(
                missing,
                format!("cannot remove from constraints {}", self),
            ));
        }

        let entries = self
            .entries
            .iter()
            .filter(|(key, _)| !names.iter().any(|name| name.as_ref() == key.as_str()))
            .map(|(key, constraint)| (key.clone(), constraint.clone()))
            .collect();
        Ok(ConstraintSet { entries })
    }

    /// Constraints that still have no values
    pub fn empty_keys(&self) -> Vec<String> {
        self.entries
            .values()
            .filter(|constraint| constraint.is_empty())
            .map(|constraint| constraint.key.clone())
            .collect()
    }
}

impl fmt::Display for ConstraintSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.entries.values().map(ToString::to_string).collect();
        write!(f, "{{{}}}", parts.join(", "))
    }
}

impl FromIterator<Constraint> for ConstraintSet {
    fn from_iter<T: IntoIterator<Item = Constraint>>(iter: T) -> Self {
        let mut set = ConstraintSet::new();
        set.extend(iter);
        set
    }
}

impl Extend<Constraint> for ConstraintSet {
    fn extend<T: IntoIterator<Item = Constraint>>(&mut self, iter: T) {
        for constraint in iter {
            self.merge(constraint);
        }
    }
}

impl IntoIterator for ConstraintSet {
    type Item = Constraint;
    type IntoIter = std::collections::btree_map::IntoValues<String, Constraint>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_values()
    }
}

/// Parse a constraint string of the form `key1 = a, b ; key2 = c`.
///
/// Whitespace around keys and values is ignored, as are empty segments.
pub fn parse_constraint_string(input: &str) -> Result<Vec<Constraint>> {
    let mut constraints = Vec::new();

    for segment in input.split(';').map(str::trim).filter(|s| !s.is_empty()) {
        let (key, raw_values) =
            segment
                .split_once('=')
                .ok_or_else(|| PipelineError::InvalidConstraintString {
                    input: input.to_string(),
                    reason: format!("segment '{segment}' has no '='"),
                })?;

        let key = key.trim();
        if key.is_empty() {
            return Err(PipelineError::InvalidConstraintString {
                input: input.to_string(),
                reason: format!("segment '{segment}' has no key"),
            });
        }

        let values = raw_values
            .split(',')
            .map(str::trim)
            .filter(|value| !value.is_empty());
        constraints.push(Constraint::new(key, values));
    }

    Ok(constraints)
}
