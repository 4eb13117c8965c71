use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

/// Attribute name to value, kept sorted so maps compare and hash canonically
pub type Attributes = BTreeMap<String, String>;

/// A single file together with the attributes that were resolved for it.
///
/// Two MetaFiles are equal when they describe the same path with the same
/// attributes; where they came from is irrelevant.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct MetaFile {
    path_dir: PathBuf,
    filename: String,
    attributes: Attributes,
}

impl MetaFile {
    pub fn new(filename: impl Into<String>, path_dir: impl Into<PathBuf>, attributes: Attributes) -> Self {
        Self {
            path_dir: path_dir.into(),
            filename: filename.into(),
            attributes,
        }
    }

    /// Split a full path into directory and file name
    pub fn from_path(full_path: &str, attributes: Attributes) -> Self {
        let path = Path::new(full_path);
        let filename = path
            .file_name()
            .map(|name| name.to_string_lossy().to_string())
            .unwrap_or_default();
        let path_dir = path.parent().map(Path::to_path_buf).unwrap_or_default();

        Self {
            path_dir,
            filename,
            attributes,
        }
    }

    pub fn full_path(&self) -> PathBuf {
        self.path_dir.join(&self.filename)
    }

    pub fn path_string(&self) -> String {
        self.full_path().to_string_lossy().to_string()
    }

    pub fn path_dir(&self) -> &Path {
        &self.path_dir
    }

    pub fn filename(&self) -> &str {
        &self.filename
    }

    pub fn attributes(&self) -> &Attributes {
        &self.attributes
    }

    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).map(String::as_str)
    }
}

impl fmt::Display for MetaFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<MetaFile: {}>", self.full_path().display())
    }
}
