use std::collections::BTreeSet;
use std::path::Path;

const SCRIPT_HEADER: &str = "#!/bin/sh\nset -e\n\n";

/// The contents of one batch script.
///
/// Pre-commands set up the environment and are never repeated. Output
/// directories are collected so a single `mkdir -p` can create them all
/// before the first command runs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Job {
    precmds: Vec<String>,
    cmds: Vec<Vec<String>>,
    outdirs: BTreeSet<String>,
}

impl Job {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a setup line unless an identical one is already present
    pub fn add_pre_cmd<I, S>(&mut self, args: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let line = args
            .into_iter()
            .map(|arg| arg.as_ref().to_string())
            .collect::<Vec<_>>()
            .join(" ");
        if !self.precmds.contains(&line) {
            self.precmds.push(line);
        }
    }

    pub fn queue_cmd(&mut self, args: Vec<String>) {
        self.cmds.push(args);
    }

    /// Record the directory of an output file. A bare file name lives in `.`.
    pub fn add_output(&mut self, out_file: &str) {
        let dir = Path::new(out_file)
            .parent()
            .map(|parent| parent.to_string_lossy().to_string())
            .filter(|parent| !parent.is_empty())
            .unwrap_or_else(|| ".".to_string());
        self.outdirs.insert(dir);
    }

    pub fn precmds(&self) -> &[String] {
        &self.precmds
    }

    pub fn cmds(&self) -> &[Vec<String>] {
        &self.cmds
    }

    pub fn outdirs(&self) -> &BTreeSet<String> {
        &self.outdirs
    }

    pub fn is_empty(&self) -> bool {
        self.cmds.is_empty()
    }

    pub fn render(&self) -> String {
        let mut script = String::from(SCRIPT_HEADER);

        for precmd in &self.precmds {
            script.push_str(precmd);
            script.push('\n');
        }

        if !self.outdirs.is_empty() {
            let dirs: Vec<&str> = self.outdirs.iter().map(String::as_str).collect();
            script.push_str("mkdir -p ");
            script.push_str(&dirs.join(" "));
            script.push('\n');
        }

        for cmd in &self.cmds {
            script.push_str(&cmd.join(" "));
            script.push('\n');
        }

        script
    }
}
