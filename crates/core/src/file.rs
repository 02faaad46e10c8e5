use std::fmt;
use std::io::Read;
use std::path::{Path, PathBuf};

use crate::map::SourceMap;
use crate::paths;

/// Contents of a record flowing through the pipeline. Streamed contents are
/// carried so a host can hand them over, but both stages reject them.
pub enum Contents {
    Null,
    Buffer(Vec<u8>),
    Stream(Box<dyn Read + Send>),
}

impl Contents {
    pub fn text(text: impl Into<String>) -> Contents {
        Contents::Buffer(text.into().into_bytes())
    }
}

impl fmt::Debug for Contents {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Contents::Null => f.write_str("Null"),
            Contents::Buffer(bytes) => write!(f, "Buffer({} bytes)", bytes.len()),
            Contents::Stream(_) => f.write_str("Stream"),
        }
    }
}

/// In-memory file record, the vinyl-style value the pipeline passes between
/// stages. Identified by an absolute `path`; `base` is the directory the
/// display path is computed from.
#[derive(Debug)]
pub struct FileRecord {
    pub cwd: PathBuf,
    pub base: PathBuf,
    path: PathBuf,
    pub history: Vec<PathBuf>,
    pub contents: Contents,
    pub source_map: Option<SourceMap>,
}

impl FileRecord {
    pub fn new(
        cwd: impl Into<PathBuf>,
        base: impl Into<PathBuf>,
        path: impl Into<PathBuf>,
        contents: Contents,
    ) -> FileRecord {
        let path = path.into();
        FileRecord {
            cwd: cwd.into(),
            base: base.into(),
            history: vec![path.clone()],
            path,
            contents,
            source_map: None,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Rename the record; the previous path stays in `history`.
    pub fn set_path(&mut self, path: impl Into<PathBuf>) {
        let path = path.into();
        self.history.push(path.clone());
        self.path = path;
    }

    /// Display path relative to `base`.
    pub fn relative(&self) -> PathBuf {
        paths::relative(&self.base, &self.path)
    }

    pub fn relative_unix(&self) -> String {
        paths::unix_style(self.relative())
    }

    pub fn dirname(&self) -> &Path {
        self.path.parent().unwrap_or(Path::new("/"))
    }

    pub fn extension(&self) -> Option<&str> {
        self.path.extension().and_then(|e| e.to_str())
    }

    pub fn is_null(&self) -> bool {
        matches!(self.contents, Contents::Null)
    }

    pub fn is_stream(&self) -> bool {
        matches!(self.contents, Contents::Stream(_))
    }

    /// Buffered contents as text; `None` for null/stream contents or bytes
    /// that are not valid UTF-8.
    pub fn contents_str(&self) -> Option<&str> {
        match &self.contents {
            Contents::Buffer(bytes) => std::str::from_utf8(bytes).ok(),
            _ => None,
        }
    }

    pub fn set_contents_string(&mut self, text: String) {
        self.contents = Contents::Buffer(text.into_bytes());
    }

    /// New record for an emitted sibling (a `.map` file): shares cwd, base
    /// and history with this record but has its own path and contents.
    pub fn clone_for_sibling(&self, path: PathBuf, contents: Vec<u8>) -> FileRecord {
        let mut history = self.history.clone();
        history.push(path.clone());
        FileRecord {
            cwd: self.cwd.clone(),
            base: self.base.clone(),
            path,
            history,
            contents: Contents::Buffer(contents),
            source_map: None,
        }
    }
}
