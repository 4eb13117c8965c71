//! Batch-script scheduling.
//!
//! A [`Scheduler`] accumulates every command of one step into a single
//! [`Job`] and then either logs the rendered script or runs it with `sh`.
//! Everything goes into one script so that `module load` and `export` lines
//! apply to every command that follows them.

pub mod annotation;
pub mod job;

pub use job::Job;

use serde::Serialize;
use std::io::Write;
use tracing::{info, warn};

use crate::error::{PipelineError, Result};
use crate::subprocess::{ProcessCommandBuilder, SubprocessManager};

/// What happened when a script was submitted
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExecutionOutcome {
    pub script: String,
    /// Combined stdout and stderr; empty when simulated
    pub output: String,
    pub simulated: bool,
}

#[derive(Debug)]
pub struct Scheduler {
    job: Job,
    subprocess: SubprocessManager,
}

impl Scheduler {
    /// Start a script that first clears any inherited modules
    pub fn new(subprocess: SubprocessManager) -> Self {
        let mut job = Job::new();
        job.add_pre_cmd(["module", "purge"]);
        Self { job, subprocess }
    }

    pub fn add_module_dep(&mut self, module: &str) {
        self.job.add_pre_cmd(["module", "load", module]);
    }

    pub fn add_module_deps<I, S>(&mut self, modules: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for module in modules {
            self.add_module_dep(module.as_ref());
        }
    }

    pub fn add_environment_variable(&mut self, name: &str, value: &str) {
        self.job
            .add_pre_cmd(["export", format!("{name}={value}").as_str()]);
    }

    /// Append a directory to a colon-separated search path variable
    pub fn add_search_path(&mut self, variable: &str, dir: &str) {
        self.job
            .add_pre_cmd(["export", format!("{variable}=${variable}:{dir}").as_str()]);
    }

    /// Queue a command and record its output directories.
    ///
    /// With an annotation, each NetCDF output is tagged right after the command.
    pub fn add_cmd(&mut self, cmd: Vec<String>, out_files: &[String], annotation: Option<&str>) {
        for out_file in out_files {
            self.job.add_output(out_file);
        }

        self.job.queue_cmd(cmd);

        if let Some(annotation) = annotation {
            self.add_annotation(annotation, out_files);
        }
    }

    fn add_annotation(&mut self, text: &str, out_files: &[String]) {
        self.add_module_dep(annotation::ANNOTATION_MODULE);
        for out_file in out_files {
            if annotation::is_netcdf(out_file) {
                self.job
                    .queue_cmd(annotation::annotate_command(text, out_file));
            } else {
                warn!("Not annotating file '{}': not NetCDF", out_file);
            }
        }
    }

    pub fn job(&self) -> &Job {
        &self.job
    }

    pub fn render(&self) -> String {
        self.job.render()
    }

    /// Run the script, or only log it when simulating.
    ///
    /// The temporary script file is removed whether or not the run succeeds.
    pub fn submit(&self, simulate: bool) -> Result<ExecutionOutcome> {
        let script = self.render();

        if simulate {
            warn!("Would run script:\n\n========>\n{}<========\n", script);
            return Ok(ExecutionOutcome {
                script,
                output: String::new(),
                simulated: true,
            });
        }

        let mut script_file = tempfile::Builder::new()
            .prefix("patternflow-")
            .suffix(".sh")
            .tempfile()?;
        script_file.write_all(script.as_bytes())?;
        script_file.flush()?;

        let script_path = script_file.path().to_string_lossy().to_string();
        info!(
            "Running batch script {} ({} commands)",
            script_path,
            self.job.cmds().len()
        );

        let command = ProcessCommandBuilder::new("sh").arg(script_path.as_str()).build();
        let result = self.subprocess.run(command)?;
        drop(script_file);

        let output = result.combined();
        if !result.status.success() {
            return Err(PipelineError::BadReturn {
                exit_code: result.status.code(),
                output,
            });
        }

        info!("Batch script finished in {:?}", result.duration);
        Ok(ExecutionOutcome {
            script,
            output,
            simulated: false,
        })
    }
}
