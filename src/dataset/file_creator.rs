use std::cell::RefCell;
use std::collections::HashSet;
use std::env;
use std::path::PathBuf;
use tracing::debug;

use super::{AliasMap, DataSet};
use crate::core::{AttributeProduct, Attributes, Constraint, ConstraintSet, MetaFile, PathTemplate};
use crate::error::{PipelineError, Result};

/// A dataset of files a step will produce.
///
/// Every placeholder of the output template must end up with at least one
/// value. The realized set records which attribute combinations were actually
/// produced, so the creator can later serve as an input and only hand out
/// files that will exist.
#[derive(Debug)]
pub struct FileCreator {
    template: PathTemplate,
    domains: RefCell<ConstraintSet>,
    realized: RefCell<HashSet<Attributes>>,
    aliases: AliasMap,
}

impl FileCreator {
    /// Create an output dataset whose fields are filled by `extras`.
    ///
    /// A field left empty gets a placeholder when one of its `_`-separated
    /// tokens is `extra` (`noextras`) or `info` (`orig` plus the first token).
    /// Only whole tokens count, so `%extrainfo%` gets no placeholder and is
    /// an [`EmptyConstraint`](PipelineError::EmptyConstraint) error.
    pub fn new<I>(pattern: &str, extras: I) -> Result<Self>
    where
        I: IntoIterator<Item = Constraint>,
    {
        let template = PathTemplate::new(pattern);
        let mut domains = template.empty_constraints();

        for extra in extras {
            if !domains.contains_key(extra.key()) {
                return Err(PipelineError::ExtraConstraint {
                    constraint: extra,
                    template: template.to_string(),
                });
            }
            domains.merge(extra);
        }

        for key in domains.empty_keys() {
            let tokens: Vec<&str> = key.split('_').collect();
            let placeholder = if tokens.contains(&"extra") {
                "noextras".to_string()
            } else if tokens.contains(&"info") {
                format!("orig{}", tokens[0])
            } else {
                return Err(PipelineError::EmptyConstraint {
                    constraint: Constraint::empty(key),
                    context: format!("output pattern '{template}' needs every field filled"),
                });
            };
            debug!("Filling optional field '{}' with '{}'", key, placeholder);
            domains.overwrite(Constraint::single(key, placeholder));
        }

        Ok(Self {
            template,
            domains: RefCell::new(domains),
            realized: RefCell::new(HashSet::new()),
            aliases: AliasMap::default(),
        })
    }

    /// Build a pattern of the form `%k1%_%k2%` over the sorted keys.
    ///
    /// With `temp` the pattern is rooted in the first of `TMPDIR`, `TEMP` or
    /// `TMP` that is set, falling back to `/tmp`.
    pub fn default_pattern(constraints: &ConstraintSet, temp: bool) -> String {
        let pattern = constraints
            .keys()
            .map(|key| format!("%{key}%"))
            .collect::<Vec<_>>()
            .join("_");

        if !temp {
            return pattern;
        }

        let root = ["TMPDIR", "TEMP", "TMP"]
            .iter()
            .find_map(|var| env::var(var).ok().filter(|value| !value.is_empty()))
            .unwrap_or_else(|| "/tmp".to_string());
        PathBuf::from(root).join(pattern).to_string_lossy().to_string()
    }

    pub fn template(&self) -> &PathTemplate {
        &self.template
    }

    /// Register one more value into the live domain of `key`
    pub fn extend_domain(&self, key: &str, value: &str) {
        let key = self.aliases.resolve(key);
        if self.domains.borrow_mut().insert_value(&key, value) {
            debug!("Extended domain of '{}' with '{}'", key, value);
        }
    }

    /// Number of attribute combinations registered so far
    pub fn realized_count(&self) -> usize {
        self.realized.borrow().len()
    }

    fn make_file(&self, attributes: &Attributes) -> Result<MetaFile> {
        let path = self.template.render(attributes)?;
        Ok(MetaFile::from_path(&path, self.aliases.decorate(attributes.clone())))
    }
}

impl DataSet for FileCreator {
    fn constraints(&self) -> ConstraintSet {
        self.aliases.expose(&self.domains.borrow())
    }

    fn get_constraint(&self, name: &str) -> Result<Constraint> {
        self.domains
            .borrow()
            .get(&self.aliases.resolve(name))
            .map(|constraint| constraint.renamed(name))
            .ok_or_else(|| {
                PipelineError::constraint_not_found(name, format!("output pattern '{}'", self.template))
            })
    }

    fn get_files(&self, attributes: &Attributes, check: bool, update: bool) -> Result<Vec<MetaFile>> {
        let requested = self.aliases.translate(attributes);

        let loops: Vec<(String, Vec<String>)> = self
            .domains
            .borrow()
            .iter()
            .map(|constraint| {
                let values = match requested.get(constraint.key()) {
                    Some(value) => vec![value.clone()],
                    None => constraint.values().iter().cloned().collect(),
                };
                (constraint.key().to_string(), values)
            })
            .collect();

        let mut files = Vec::new();
        for combination in AttributeProduct::new(loops) {
            if check && !self.realized.borrow().contains(&combination) {
                continue;
            }
            let file = self.make_file(&combination)?;
            if update {
                self.realized.borrow_mut().insert(combination);
            }
            files.push(file);
        }

        Ok(files)
    }

    fn alias(&self, existing: &str, alias: &str) -> Result<()> {
        self.get_constraint(existing)?;
        self.aliases.insert(existing, alias);
        Ok(())
    }

    fn files(&self) -> Vec<MetaFile> {
        let mut files: Vec<MetaFile> = self
            .realized
            .borrow()
            .iter()
            .filter_map(|combination| self.make_file(combination).ok())
            .collect();
        files.sort();
        files
    }
}
