use thiserror::Error;

use crate::file::FileRecord;

#[derive(Debug, Error)]
pub enum StageError {
    #[error("{0}: streaming not supported")]
    StreamingNotSupported(&'static str),
    #[error("source map serialization failed: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Per-file transform convention: a stage consumes one record and pushes
/// zero or more records downstream.
pub trait Stage {
    fn name(&self) -> &'static str;

    fn run(&self, file: FileRecord, out: &mut Vec<FileRecord>) -> Result<(), StageError>;
}

/// Drive records through a chain of stages in arrival order, one file at a
/// time per stage. Fails fast: the first stage error aborts the whole batch,
/// and records already transformed are dropped with it.
pub fn run_stages(
    stages: &[&dyn Stage],
    files: Vec<FileRecord>,
) -> Result<Vec<FileRecord>, StageError> {
    let mut current = files;
    for stage in stages {
        let mut next = Vec::with_capacity(current.len());
        for file in current {
            stage.run(file, &mut next)?;
        }
        current = next;
    }
    Ok(current)
}
