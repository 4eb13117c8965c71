use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use super::error::ProcessError;
use super::runner::{ExitStatus, ProcessCommand, ProcessOutput, ProcessRunner};

type ArgsMatcher = Box<dyn Fn(&[String]) -> bool + Send + Sync>;

/// A runner for tests that answers with canned output and records every
/// command it is handed.
///
/// Clones share their state, so a test keeps one handle while a
/// [`SubprocessManager`](super::SubprocessManager) owns the other.
#[derive(Clone, Default)]
pub struct MockProcessRunner {
    replies: Arc<Mutex<Vec<CannedReply>>>,
    calls: Arc<Mutex<Vec<ProcessCommand>>>,
}

struct CannedReply {
    program: String,
    matcher: Option<ArgsMatcher>,
    output: ProcessOutput,
    /// Calls left before the reply is used up; `None` never runs out
    remaining: Option<usize>,
}

impl CannedReply {
    fn answers(&self, command: &ProcessCommand) -> bool {
        self.program == command.program
            && match &self.matcher {
                Some(matcher) => matcher(&command.args),
                None => true,
            }
    }
}

/// One reply under construction; nothing is registered until [`finish`](Self::finish)
pub struct MockCommandConfig {
    replies: Arc<Mutex<Vec<CannedReply>>>,
    reply: CannedReply,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl MockProcessRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a reply for `program`. It exits successfully with no output
    /// unless configured otherwise.
    pub fn expect_command(&mut self, program: &str) -> MockCommandConfig {
        MockCommandConfig {
            replies: Arc::clone(&self.replies),
            reply: CannedReply {
                program: program.to_string(),
                matcher: None,
                output: ProcessOutput {
                    status: ExitStatus::Success,
                    stdout: String::new(),
                    stderr: String::new(),
                    duration: Duration::ZERO,
                },
                remaining: None,
            },
        }
    }

    /// Whether `program` was run exactly `times` times
    pub fn verify_called(&self, program: &str, times: usize) -> bool {
        lock(&self.calls)
            .iter()
            .filter(|command| command.program == program)
            .count()
            == times
    }

    pub fn get_call_history(&self) -> Vec<ProcessCommand> {
        lock(&self.calls).clone()
    }
}

impl ProcessRunner for MockProcessRunner {
    fn run(&self, command: ProcessCommand) -> Result<ProcessOutput, ProcessError> {
        lock(&self.calls).push(command.clone());

        let mut replies = lock(&self.replies);
        let reply = replies
            .iter_mut()
            .find(|reply| reply.answers(&command))
            .ok_or_else(|| {
                ProcessError::MockExpectationNotMet(format!(
                    "no reply registered for `{}`",
                    command.display()
                ))
            })?;

        if let Some(left) = reply.remaining.as_mut() {
            if *left == 0 {
                return Err(ProcessError::MockExpectationNotMet(format!(
                    "`{}` ran more often than expected",
                    command.program
                )));
            }
            *left -= 1;
        }

        Ok(reply.output.clone())
    }
}

impl MockCommandConfig {
    /// Only answer calls whose arguments satisfy `matcher`
    pub fn with_args<F>(mut self, matcher: F) -> Self
    where
        F: Fn(&[String]) -> bool + Send + Sync + 'static,
    {
        self.reply.matcher = Some(Box::new(matcher));
        self
    }

    pub fn returns_stdout(mut self, stdout: &str) -> Self {
        self.reply.output.stdout = stdout.to_string();
        self
    }

    pub fn returns_stderr(mut self, stderr: &str) -> Self {
        self.reply.output.stderr = stderr.to_string();
        self
    }

    pub fn returns_exit_code(mut self, code: i32) -> Self {
        self.reply.output.status = match code {
            0 => ExitStatus::Success,
            code => ExitStatus::Error(code),
        };
        self
    }

    pub fn returns_success(self) -> Self {
        self.returns_exit_code(0)
    }

    /// Fail any call beyond the first `n`
    pub fn times(mut self, n: usize) -> Self {
        self.reply.remaining = Some(n);
        self
    }

    pub fn finish(self) {
        lock(&self.replies).push(self.reply);
    }
}
