pub mod comment;
pub mod diag;
pub mod file;
pub mod init;
pub mod load;
pub mod map;
pub mod paths;
pub mod pipeline;
pub mod write;

pub use diag::{DiagnosticSink, LogSink, NopSink};
pub use file::{Contents, FileRecord};
pub use init::{InitOptions, MapInitStage};
pub use load::LoadResult;
pub use map::{apply_source_map, MergeError, SourceMap};
pub use pipeline::{run_stages, Stage, StageError};
pub use write::{MapWriteStage, SourceRootOption, UrlPrefixOption, WriteOptions};
