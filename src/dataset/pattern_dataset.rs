use glob::{glob, MatchOptions, Pattern};
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, warn};

use super::{AliasMap, DataSet};
use crate::core::{AttributeProduct, Attributes, Constraint, ConstraintSet, MetaFile, PathTemplate};
use crate::error::{PipelineError, Result};

/// A dataset of files that already exist, found by scanning a path template.
#[derive(Debug)]
pub struct PatternDataSet {
    template: PathTemplate,
    constraints: ConstraintSet,
    files: Vec<MetaFile>,
    // attribute -> value -> positions in `files`
    index: BTreeMap<String, BTreeMap<String, BTreeSet<usize>>>,
    aliases: AliasMap,
}

impl PatternDataSet {
    /// Scan the filesystem for paths matching `pattern`
    pub fn new<I>(pattern: &str, restrictions: I) -> Result<Self>
    where
        I: IntoIterator<Item = Constraint>,
    {
        let template = PathTemplate::new(pattern);
        let restrictions = validate_restrictions(&template, restrictions)?;

        let mut found = BTreeSet::new();
        for mask in glob_masks(&template, &restrictions) {
            let entries = glob(&mask).map_err(|e| PipelineError::InvalidTemplate {
                template: template.to_string(),
                reason: e.to_string(),
            })?;
            for entry in entries {
                match entry {
                    Ok(path) => {
                        found.insert(path.to_string_lossy().to_string());
                    }
                    Err(e) => warn!("Skipping unreadable path while scanning '{}': {}", mask, e),
                }
            }
        }

        Self::build(template, restrictions, found)
    }

    /// Build from an injected list of candidate paths instead of scanning.
    ///
    /// Candidates are filtered through the same glob masks a scan would use.
    pub fn from_paths<I, P, S>(pattern: &str, restrictions: I, paths: P) -> Result<Self>
    where
        I: IntoIterator<Item = Constraint>,
        P: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let template = PathTemplate::new(pattern);
        let restrictions = validate_restrictions(&template, restrictions)?;

        let masks = glob_masks(&template, &restrictions)
            .iter()
            .map(|mask| Pattern::new(mask))
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| PipelineError::InvalidTemplate {
                template: template.to_string(),
                reason: e.to_string(),
            })?;
        let options = MatchOptions {
            require_literal_separator: true,
            ..MatchOptions::new()
        };

        let found: BTreeSet<String> = paths
            .into_iter()
            .map(Into::into)
            .filter(|path| masks.iter().any(|mask| mask.matches_with(path, options)))
            .collect();

        Self::build(template, restrictions, found)
    }

    fn build(template: PathTemplate, restrictions: ConstraintSet, found: BTreeSet<String>) -> Result<Self> {
        let matcher = template.matcher()?;

        if found.is_empty() {
            warn!("No files found for pattern '{}'", template);
        }

        let mut files = Vec::with_capacity(found.len());
        for path in found {
            let attributes = matcher.capture(&path).ok_or_else(|| PipelineError::PatternMismatch {
                path: path.clone(),
                template: template.to_string(),
            })?;
            files.push(MetaFile::from_path(&path, attributes));
        }
        files.sort();

        let mut constraints: ConstraintSet = files
            .iter()
            .flat_map(|file| {
                file.attributes()
                    .iter()
                    .map(|(key, value)| Constraint::single(key.clone(), value.clone()))
            })
            .collect();
        for restriction in restrictions {
            constraints.overwrite(restriction);
        }

        let mut index: BTreeMap<String, BTreeMap<String, BTreeSet<usize>>> = BTreeMap::new();
        for (position, file) in files.iter().enumerate() {
            for (key, value) in file.attributes() {
                index
                    .entry(key.clone())
                    .or_default()
                    .entry(value.clone())
                    .or_default()
                    .insert(position);
            }
        }

        debug!("Pattern '{}' matched {} files with constraints {}", template, files.len(), constraints);

        Ok(Self {
            template,
            constraints,
            files,
            index,
            aliases: AliasMap::default(),
        })
    }

    pub fn template(&self) -> &PathTemplate {
        &self.template
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    fn decorated(&self, file: &MetaFile) -> MetaFile {
        MetaFile::new(
            file.filename(),
            file.path_dir(),
            self.aliases.decorate(file.attributes().clone()),
        )
    }
}

impl DataSet for PatternDataSet {
    fn constraints(&self) -> ConstraintSet {
        self.aliases.expose(&self.constraints)
    }

    fn get_constraint(&self, name: &str) -> Result<Constraint> {
        self.constraints
            .get(&self.aliases.resolve(name))
            .map(|constraint| constraint.renamed(name))
            .ok_or_else(|| {
                PipelineError::constraint_not_found(name, format!("dataset '{}'", self.template))
            })
    }

    fn get_files(&self, attributes: &Attributes, _check: bool, _update: bool) -> Result<Vec<MetaFile>> {
        let requested = self.aliases.translate(attributes);

        let mut selected: Option<BTreeSet<usize>> = None;
        for (key, value) in &requested {
            let Some(by_value) = self.index.get(key) else {
                continue;
            };
            let matching = by_value.get(value).cloned().unwrap_or_default();
            selected = Some(match selected {
                Some(current) => current.intersection(&matching).copied().collect(),
                None => matching,
            });
        }

        let files = match selected {
            Some(positions) => positions
                .into_iter()
                .map(|position| self.decorated(&self.files[position]))
                .collect(),
            None => self.files(),
        };
        Ok(files)
    }

    fn alias(&self, existing: &str, alias: &str) -> Result<()> {
        self.get_constraint(existing)?;
        self.aliases.insert(existing, alias);
        Ok(())
    }

    fn files(&self) -> Vec<MetaFile> {
        self.files.iter().map(|file| self.decorated(file)).collect()
    }
}

fn validate_restrictions<I>(template: &PathTemplate, restrictions: I) -> Result<ConstraintSet>
where
    I: IntoIterator<Item = Constraint>,
{
    let restrictions: ConstraintSet = restrictions.into_iter().collect();
    for restriction in restrictions.iter() {
        if !template.has_field(restriction.key()) {
            return Err(PipelineError::constraint_not_found(
                restriction.key(),
                format!("restriction is not a field of pattern '{template}'"),
            ));
        }
        if restriction.is_empty() {
            return Err(PipelineError::EmptyConstraint {
                constraint: restriction.clone(),
                context: format!("restriction on pattern '{template}'"),
            });
        }
    }
    Ok(restrictions)
}

fn glob_masks(template: &PathTemplate, restrictions: &ConstraintSet) -> Vec<String> {
    AttributeProduct::new(
        restrictions
            .iter()
            .map(|constraint| (constraint.key().to_string(), constraint.values().clone())),
    )
    .map(|fixed| template.glob_mask(&fixed))
    .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    const ANIMALS: [&str; 6] = [
        "/fake/green_echidna.txt",
        "/fake/blue_echidna.txt",
        "/fake/red_echidna.txt",
        "/fake/green_kangaroo.txt",
        "/fake/blue_kangaroo.txt",
        "/fake/red_kangaroo.txt",
    ];

    fn attrs(pairs: &[(&str, &str)]) -> Attributes {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn animals() -> PatternDataSet {
        PatternDataSet::from_paths("/fake/%colour%_%animal%.txt", Vec::new(), ANIMALS).unwrap()
    }

    #[test]
    fn test_constraints_from_found_files() {
        let dataset = animals();
        let constraints = dataset.constraints();

        assert_eq!(
            constraints.get("colour"),
            Some(&Constraint::new("colour", ["green", "blue", "red"]))
        );
        assert_eq!(
            constraints.get("animal"),
            Some(&Constraint::new("animal", ["echidna", "kangaroo"]))
        );
        assert_eq!(dataset.len(), 6);
    }

    #[test]
    fn test_get_files_intersects_requested_keys() {
        let dataset = animals();

        let green = dataset.get_files(&attrs(&[("colour", "green")]), false, false).unwrap();
        assert_eq!(green.len(), 2);

        let one = dataset
            .get_files(&attrs(&[("colour", "green"), ("animal", "echidna")]), false, false)
            .unwrap();
        assert_eq!(one.len(), 1);
        assert_eq!(one[0].path_string(), "/fake/green_echidna.txt");
    }

    #[test]
    fn test_unknown_keys_are_ignored() {
        let dataset = animals();
        let all = dataset.get_files(&attrs(&[("size", "large")]), false, false).unwrap();
        assert_eq!(all.len(), 6);

        let green = dataset
            .get_files(&attrs(&[("colour", "green"), ("size", "large")]), false, false)
            .unwrap();
        assert_eq!(green.len(), 2);
    }

    #[test]
    fn test_four_colours_two_animals() {
        let dataset = PatternDataSet::from_paths(
            "/fake/%colour%_%animal%.txt",
            Vec::new(),
            [
                "/fake/green_echidna.txt",
                "/fake/blue_kangaroo.txt",
                "/fake/red_kangaroo.txt",
                "/fake/purple_kangaroo.txt",
            ],
        )
        .unwrap();

        assert_eq!(
            dataset.get_constraint("colour").unwrap(),
            Constraint::new("colour", ["green", "blue", "red", "purple"])
        );
        assert_eq!(
            dataset.get_constraint("animal").unwrap(),
            Constraint::new("animal", ["echidna", "kangaroo"])
        );

        let green_echidna = attrs(&[("colour", "green"), ("animal", "echidna")]);
        let files = dataset.get_files(&green_echidna, false, false).unwrap();
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].path_string(), "/fake/green_echidna.txt");

        let mut with_unknown = green_echidna;
        with_unknown.insert("habitat".to_string(), "desert".to_string());
        let files = dataset.get_files(&with_unknown, false, false).unwrap();
        assert_eq!(files.len(), 1);

        // green only comes as an echidna
        let none = dataset
            .get_files(&attrs(&[("colour", "green"), ("animal", "kangaroo")]), false, false)
            .unwrap();
        assert!(none.is_empty());
    }

    #[test]
    fn test_unknown_value_yields_nothing() {
        let dataset = animals();
        let none = dataset.get_files(&attrs(&[("colour", "purple")]), false, false).unwrap();
        assert!(none.is_empty());
    }

    #[test]
    fn test_restriction_filters_candidates() {
        let dataset = PatternDataSet::from_paths(
            "/fake/%colour%_%animal%.txt",
            vec![Constraint::single("colour", "green")],
            ANIMALS,
        )
        .unwrap();

        assert_eq!(dataset.len(), 2);
        assert_eq!(dataset.get_constraint("colour").unwrap(), Constraint::single("colour", "green"));
    }

    #[test]
    fn test_restriction_must_be_in_pattern() {
        let err = PatternDataSet::from_paths(
            "/fake/%colour%_%animal%.txt",
            vec![Constraint::single("size", "large")],
            ANIMALS,
        )
        .unwrap_err();
        assert!(matches!(err, PipelineError::ConstraintNotFound { ref key, .. } if key == "size"));
    }

    #[test]
    fn test_empty_restriction_is_rejected() {
        let err = PatternDataSet::from_paths(
            "/fake/%colour%_%animal%.txt",
            vec![Constraint::empty("colour")],
            ANIMALS,
        )
        .unwrap_err();
        assert!(matches!(err, PipelineError::EmptyConstraint { .. }));
    }

    #[test]
    fn test_glob_match_that_fails_regex_is_fatal() {
        // The glob `*_*.txt` accepts this path but the repeated field disagrees.
        let err = PatternDataSet::from_paths(
            "/data/%model%/%variable%_%model%.nc",
            Vec::new(),
            ["/data/m1/tas_m2.nc"],
        )
        .unwrap_err();
        assert!(matches!(err, PipelineError::PatternMismatch { .. }));
    }

    #[test]
    fn test_alias_renames_exposed_key() {
        let dataset = animals();
        dataset.alias("colour", "hue").unwrap();

        let keys: Vec<String> = dataset.keys().into_iter().collect();
        assert_eq!(keys, vec!["animal", "hue"]);

        let files = dataset.get_files(&attrs(&[("hue", "red")]), false, false).unwrap();
        assert_eq!(files.len(), 2);
        assert_eq!(files[0].attribute("hue"), Some("red"));
        assert_eq!(files[0].attribute("colour"), Some("red"));

        assert!(dataset.get_constraint("colour").is_ok());
    }

    #[test]
    fn test_alias_of_missing_key_fails() {
        let dataset = animals();
        assert!(dataset.alias("size", "bigness").is_err());
    }

    #[test]
    fn test_scan_real_directory() {
        let temp_dir = TempDir::new().unwrap();
        for name in ["tas_ACCESS1-0.nc", "pr_ACCESS1-0.nc", "tas_MIROC5.nc", "notes.txt"] {
            fs::write(temp_dir.path().join(name), "").unwrap();
        }
        let pattern = format!("{}/%variable%_%model%.nc", temp_dir.path().display());

        let dataset = PatternDataSet::new(&pattern, Vec::new()).unwrap();
        assert_eq!(dataset.len(), 3);
        assert_eq!(
            dataset.get_constraint("model").unwrap(),
            Constraint::new("model", ["ACCESS1-0", "MIROC5"])
        );

        let restricted =
            PatternDataSet::new(&pattern, vec![Constraint::single("variable", "tas")]).unwrap();
        assert_eq!(restricted.len(), 2);
    }

    #[test]
    fn test_empty_scan_has_no_constraints() {
        let temp_dir = TempDir::new().unwrap();
        let pattern = format!("{}/%variable%.nc", temp_dir.path().display());

        let dataset = PatternDataSet::new(&pattern, Vec::new()).unwrap();
        assert!(dataset.is_empty());
        assert!(dataset.constraints().is_empty());
    }
}
