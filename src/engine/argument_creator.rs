//! Pairing input files with the output files they produce.
//!
//! The matcher enumerates every combination of the attribute values that all
//! inputs and the output share, asks the output for the files each
//! combination describes, and keeps only the outputs for which every input
//! supplies at least one real file.

use serde::Serialize;
use std::collections::{BTreeSet, HashSet, VecDeque};
use std::rc::Rc;
use tracing::debug;

use crate::core::{AttributeProduct, Attributes, Constraint, MetaFile};
use crate::dataset::{DataSet, FileCreator};
use crate::error::{PipelineError, Result};

/// One command's worth of files: the inputs it reads, the outputs it writes,
/// and the attributes available for building its argument list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArgumentSet {
    pub inputs: Vec<MetaFile>,
    pub outputs: Vec<MetaFile>,
    pub attributes: Attributes,
}

impl ArgumentSet {
    pub fn input_paths(&self) -> Vec<String> {
        self.inputs.iter().map(MetaFile::path_string).collect()
    }

    pub fn output_paths(&self) -> Vec<String> {
        self.outputs.iter().map(MetaFile::path_string).collect()
    }
}

/// A finite, single-pass sequence of [`ArgumentSet`]s.
///
/// Output files are registered with the [`FileCreator`] as they are yielded,
/// so draining the iterator is what makes the outputs available to later
/// steps. The first error ends the sequence.
pub struct ArgumentCreator {
    inputs: Vec<Rc<dyn DataSet>>,
    output: Rc<FileCreator>,
    merge_output: Vec<String>,
    combinations: AttributeProduct,
    pending: VecDeque<MetaFile>,
    emitted: HashSet<MetaFile>,
    finished: bool,
}

impl ArgumentCreator {
    pub fn new(
        inputs: Vec<Rc<dyn DataSet>>,
        output: Rc<FileCreator>,
        merge_output: Vec<String>,
    ) -> Result<Self> {
        for input in &inputs {
            if let Some(empty) = input.constraints().iter().find(|c| c.is_empty()) {
                return Err(PipelineError::EmptyConstraint {
                    constraint: empty.clone(),
                    context: "input datasets must have values for every attribute".to_string(),
                });
            }
        }

        let shared = shared_constraints(&inputs, &output)?;
        debug!(
            "Shared constraints: {}",
            shared
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(", ")
        );

        let combinations = AttributeProduct::new(
            shared
                .into_iter()
                .map(|constraint| (constraint.key().to_string(), constraint.values().clone())),
        );

        Ok(Self {
            inputs,
            output,
            merge_output,
            combinations,
            pending: VecDeque::new(),
            emitted: HashSet::new(),
            finished: false,
        })
    }

    fn resolve(&mut self, candidate: MetaFile) -> Result<Option<ArgumentSet>> {
        let mut matched = Vec::new();
        let mut input_atts = Attributes::new();

        for input in &self.inputs {
            let exposed = input.constraints();
            let good_atts: Attributes = candidate
                .attributes()
                .iter()
                .filter(|(key, value)| {
                    exposed
                        .get(key)
                        .is_some_and(|constraint| constraint.contains(value))
                })
                .map(|(key, value)| (key.clone(), value.clone()))
                .collect();

            let files = input.get_files(&good_atts, true, false)?;
            if files.is_empty() {
                debug!("No input files for candidate {}", candidate);
                return Ok(None);
            }

            for file in &files {
                input_atts.extend(file.attributes().clone());
            }
            matched.extend(files);
        }

        if matched.is_empty() {
            return Ok(None);
        }

        input_atts.extend(candidate.attributes().clone());
        let final_atts = self.merge(input_atts, &matched)?;

        let outputs = self.output.get_files(&final_atts, false, true)?;
        let Some(first) = outputs.first() else {
            return Ok(None);
        };
        if !self.emitted.insert(first.clone()) {
            debug!("Skipping duplicate output {}", first);
            return Ok(None);
        }

        Ok(Some(ArgumentSet {
            inputs: matched,
            outputs,
            attributes: final_atts,
        }))
    }

    /// Join the values of each merge key across the matched inputs with `-`
    fn merge(&self, mut attributes: Attributes, matched: &[MetaFile]) -> Result<Attributes> {
        for key in &self.merge_output {
            let values = matched
                .iter()
                .map(|file| {
                    file.attribute(key).ok_or_else(|| {
                        PipelineError::constraint_not_found(
                            key,
                            format!("merge key missing from input {file}"),
                        )
                    })
                })
                .collect::<Result<Vec<_>>>()?;
            let merged = values.join("-");

            self.output.extend_domain(key, &merged);
            attributes.insert(key.clone(), merged);
        }
        Ok(attributes)
    }
}

impl Iterator for ArgumentCreator {
    type Item = Result<ArgumentSet>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }

        loop {
            if let Some(candidate) = self.pending.pop_front() {
                match self.resolve(candidate) {
                    Ok(Some(set)) => return Some(Ok(set)),
                    Ok(None) => continue,
                    Err(e) => {
                        self.finished = true;
                        return Some(Err(e));
                    }
                }
            }

            let Some(combination) = self.combinations.next() else {
                self.finished = true;
                return None;
            };

            match self.output.get_files(&combination, false, false) {
                Ok(candidates) => self.pending.extend(candidates),
                Err(e) => {
                    self.finished = true;
                    return Some(Err(e));
                }
            }
        }
    }
}

/// Keys present in every input and in the output, with the values all
/// inputs agree on.
///
/// A key whose output domain differs from the agreed input values is left
/// out: values pinned on the output side take precedence over the inputs.
fn shared_constraints(inputs: &[Rc<dyn DataSet>], output: &FileCreator) -> Result<Vec<Constraint>> {
    let Some((first, rest)) = inputs.split_first() else {
        return Ok(Vec::new());
    };

    let mut keys: BTreeSet<String> = first.keys();
    for input in rest {
        let other = input.keys();
        keys.retain(|key| other.contains(key));
    }
    let output_keys = output.keys();
    keys.retain(|key| output_keys.contains(key));

    let mut shared = Vec::with_capacity(keys.len());
    for key in keys {
        let mut domain = first.get_constraint(&key)?;
        for input in rest {
            domain = domain.intersection(&input.get_constraint(&key)?);
        }

        // A key is shared only when the output domain equals the values every
        // input has. An output domain filled from the union of inputs that
        // disagree fails this too, and is matched per input like a pinned key.
        let pinned = output.get_constraint(&key)?;
        if pinned.values() != domain.values() {
            debug!("Output pins {}; not sharing '{}'", pinned, key);
            continue;
        }
        shared.push(domain);
    }
    Ok(shared)
}
