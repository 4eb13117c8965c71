//! Common test utilities and helpers

#![allow(dead_code)]

use anyhow::Result;
use patternflow::config::EngineConfig;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Test context builder for setting up a data tree and a tool root
pub struct TestContextBuilder {
    temp_dir: TempDir,
    data_files: Vec<PathBuf>,
    initial_files: Vec<(PathBuf, String)>,
}

impl TestContextBuilder {
    pub fn new() -> Result<Self> {
        Ok(Self {
            temp_dir: TempDir::new()?,
            data_files: Vec::new(),
            initial_files: Vec::new(),
        })
    }

    /// Add empty data files below `data/`
    pub fn with_data_files(mut self, paths: &[&str]) -> Self {
        self.data_files
            .extend(paths.iter().map(|path| Path::new("data").join(path)));
        self
    }

    /// Add a file with content, relative to the context root
    pub fn with_file(mut self, path: impl AsRef<Path>, content: &str) -> Self {
        self.initial_files
            .push((path.as_ref().to_path_buf(), content.to_string()));
        self
    }

    pub fn build(self) -> Result<TestContext> {
        let root = self.temp_dir.path();
        fs::create_dir_all(root.join("tools/pythonlib"))?;

        for file_path in self.data_files {
            write_file(&root.join(file_path), "")?;
        }
        for (file_path, content) in self.initial_files {
            write_file(&root.join(file_path), &content)?;
        }

        Ok(TestContext {
            temp_dir: self.temp_dir,
        })
    }
}

fn write_file(path: &Path, content: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, content)?;
    Ok(())
}

/// A temporary directory holding `data/`, `out/` and `tools/`
pub struct TestContext {
    temp_dir: TempDir,
}

impl TestContext {
    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    /// `<root>/data` joined with `relative`, as a string
    pub fn data(&self, relative: &str) -> String {
        self.path().join("data").join(relative).to_string_lossy().to_string()
    }

    /// `<root>/out` joined with `relative`, as a string
    pub fn out(&self, relative: &str) -> String {
        self.path().join("out").join(relative).to_string_lossy().to_string()
    }

    pub fn tool_root(&self) -> PathBuf {
        self.path().join("tools")
    }

    /// Configuration pointing at this context's tool root
    pub fn config(&self, simulate: bool) -> EngineConfig {
        EngineConfig::default()
            .with_tool_root(self.tool_root().to_string_lossy().to_string())
            .with_simulate(simulate)
    }

    pub fn create_file(&self, path: impl AsRef<Path>, content: &str) -> Result<PathBuf> {
        let full_path = self.path().join(path);
        write_file(&full_path, content)?;
        Ok(full_path)
    }

    pub fn file_exists(&self, path: impl AsRef<Path>) -> bool {
        self.path().join(path).exists()
    }
}
