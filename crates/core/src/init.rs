use std::sync::Arc;

use crate::diag::{self, DiagnosticSink};
use crate::file::FileRecord;
use crate::load::{self, strip_bom};
use crate::map::SourceMap;
use crate::pipeline::{Stage, StageError};

#[derive(Default)]
pub struct InitOptions {
    /// Look for an existing map (inline comment, file-reference comment, or
    /// `.map` sibling) instead of always fabricating an identity map.
    pub load_maps: bool,
    /// Keep a consumed inline comment in the propagating content instead of
    /// stripping it. For very large files where rewriting the buffer is
    /// costly; a policy toggle, not a size threshold.
    pub large_file: bool,
}

/// Entry stage: attaches a source map to every buffered record that does not
/// already carry one, so downstream transforms have a map to update.
pub struct MapInitStage {
    options: InitOptions,
    diag: Arc<dyn DiagnosticSink>,
}

impl MapInitStage {
    pub fn new(options: InitOptions) -> MapInitStage {
        MapInitStage {
            options,
            diag: diag::default_sink(),
        }
    }

    pub fn with_diagnostics(mut self, diag: Arc<dyn DiagnosticSink>) -> MapInitStage {
        self.diag = diag;
        self
    }

    pub fn transform(&self, mut file: FileRecord) -> Result<FileRecord, StageError> {
        // pass through null records and records that already have a map
        if file.is_null() || file.source_map.is_some() {
            return Ok(file);
        }
        if file.is_stream() {
            return Err(StageError::StreamingNotSupported("init"));
        }

        let text = file
            .contents_str()
            .map(|text| strip_bom(text).to_string());

        let mut map = None;
        let mut pre_existing = None;
        let mut content = text;

        if self.options.load_maps {
            if let Some(original) = content.take() {
                let result =
                    load::load(&file, &original, self.options.large_file, self.diag.as_ref());
                if result.content != original {
                    file.set_contents_string(result.content.clone());
                }
                content = Some(result.content);
                map = result.map;
                pre_existing = result.pre_existing_comment;
            }
        }

        let mut map = match map {
            Some(mut loaded) => {
                if pre_existing.is_some() {
                    loaded.pre_existing_comment = pre_existing;
                }
                loaded
            }
            None => SourceMap::identity(file.relative_unix(), content),
        };

        // the attached map always names the current record, whatever a
        // loaded map claimed
        map.file = Some(file.relative_unix());
        file.source_map = Some(map);
        Ok(file)
    }
}

impl Stage for MapInitStage {
    fn name(&self) -> &'static str {
        "init"
    }

    fn run(&self, file: FileRecord, out: &mut Vec<FileRecord>) -> Result<(), StageError> {
        out.push(self.transform(file)?);
        Ok(())
    }
}
