use super::runner::ProcessCommand;

/// Assembles the command line used to launch a batch script
#[derive(Debug, Clone)]
pub struct ProcessCommandBuilder {
    program: String,
    args: Vec<String>,
}

impl ProcessCommandBuilder {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn build(self) -> ProcessCommand {
        ProcessCommand {
            program: self.program,
            args: self.args,
        }
    }
}
