//! Datasets: collections of files addressable by attribute.
//!
//! A [`PatternDataSet`] describes files that already exist on disk and is fixed
//! once scanned. A [`FileCreator`] describes files a step will produce; its set
//! of realized attribute combinations only ever grows.

use std::cell::RefCell;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use crate::core::{Attributes, Constraint, ConstraintSet, MetaFile};
use crate::error::Result;

pub mod file_creator;
pub mod pattern_dataset;

pub use file_creator::FileCreator;
pub use pattern_dataset::PatternDataSet;

/// The capability shared by every dataset.
///
/// Methods take `&self` because datasets are shared between the step that
/// produces them and every step that consumes them.
pub trait DataSet: fmt::Debug {
    /// The constraints as seen by matchers, with aliased keys renamed
    fn constraints(&self) -> ConstraintSet;

    /// Look up a constraint by its current or original name
    fn get_constraint(&self, name: &str) -> Result<Constraint>;

    /// Files matching the given attributes.
    ///
    /// Keys not present in `attributes` broadcast over their whole domain.
    /// With `check`, only combinations already realized are returned. With
    /// `update`, every returned combination is registered as realized.
    fn get_files(&self, attributes: &Attributes, check: bool, update: bool) -> Result<Vec<MetaFile>>;

    /// Publish an existing attribute under another name
    fn alias(&self, existing: &str, alias: &str) -> Result<()>;

    /// Every realized file, sorted
    fn files(&self) -> Vec<MetaFile>;

    fn keys(&self) -> BTreeSet<String> {
        self.constraints().key_set()
    }
}

/// Alias bookkeeping shared by both dataset kinds.
#[derive(Debug, Default)]
pub(crate) struct AliasMap {
    // alias -> original
    aliases: RefCell<BTreeMap<String, String>>,
}

impl AliasMap {
    pub(crate) fn insert(&self, existing: &str, alias: &str) {
        let original = self.resolve(existing);
        if original != alias {
            self.aliases.borrow_mut().insert(alias.to_string(), original);
        }
    }

    /// Map a possibly aliased name back to the name the dataset stores
    pub(crate) fn resolve(&self, name: &str) -> String {
        self.aliases
            .borrow()
            .get(name)
            .cloned()
            .unwrap_or_else(|| name.to_string())
    }

    /// Rewrite request keys to their stored names
    pub(crate) fn translate(&self, attributes: &Attributes) -> Attributes {
        attributes
            .iter()
            .map(|(key, value)| (self.resolve(key), value.clone()))
            .collect()
    }

    /// Add every alias attribute whose original is present
    pub(crate) fn decorate(&self, mut attributes: Attributes) -> Attributes {
        for (alias, original) in self.aliases.borrow().iter() {
            if let Some(value) = attributes.get(original).cloned() {
                attributes.insert(alias.clone(), value);
            }
        }
        attributes
    }

    /// Rename aliased constraints, hiding their original keys
    pub(crate) fn expose(&self, constraints: &ConstraintSet) -> ConstraintSet {
        let aliases = self.aliases.borrow();
        let hidden: BTreeSet<&str> = aliases.values().map(String::as_str).collect();

        let mut exposed: ConstraintSet = constraints
            .iter()
            .filter(|constraint| !hidden.contains(constraint.key()))
            .cloned()
            .collect();

        for (alias, original) in aliases.iter() {
            if let Some(constraint) = constraints.get(original) {
                exposed.overwrite(constraint.renamed(alias.clone()));
            }
        }
        exposed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_alias_hides_original_key() {
        let aliases = AliasMap::default();
        aliases.insert("model", "obs_model");

        let constraints: ConstraintSet = [
            Constraint::new("model", ["AWAP"]),
            Constraint::new("variable", ["pr"]),
        ]
        .into_iter()
        .collect();

        let exposed = aliases.expose(&constraints);
        assert!(exposed.contains_key("obs_model"));
        assert!(!exposed.contains_key("model"));
        assert_eq!(exposed.get("obs_model").unwrap().values(), constraints.get("model").unwrap().values());
    }

    #[test]
    fn test_alias_of_alias_resolves_to_original() {
        let aliases = AliasMap::default();
        aliases.insert("model", "first");
        aliases.insert("first", "second");
        assert_eq!(aliases.resolve("second"), "model");
    }

    #[test]
    fn test_decorate_adds_alias_values() {
        let aliases = AliasMap::default();
        aliases.insert("model", "obs_model");

        let attrs: Attributes = [("model".to_string(), "AWAP".to_string())].into_iter().collect();
        let decorated = aliases.decorate(attrs);
        assert_eq!(decorated.get("obs_model").map(String::as_str), Some("AWAP"));
        assert_eq!(decorated.get("model").map(String::as_str), Some("AWAP"));
    }
}
