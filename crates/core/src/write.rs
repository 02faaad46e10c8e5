use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::comment;
use crate::diag::{self, DiagnosticSink};
use crate::file::FileRecord;
use crate::load;
use crate::map::SourceMap;
use crate::paths;
use crate::pipeline::{Stage, StageError};

/// What the written map's `sourceRoot` should be.
pub enum SourceRootOption {
    /// Keep whatever the attached map already carries.
    Inherit,
    /// Delete any sourceRoot from the written map.
    Clear,
    /// Use this value verbatim; an empty string is preserved, it is not
    /// the same as `Clear`.
    Fixed(String),
    /// Computed per file; returning `None` deletes the value.
    Compute(Box<dyn Fn(&FileRecord) -> Option<String> + Send + Sync>),
}

impl Default for SourceRootOption {
    fn default() -> Self {
        SourceRootOption::Inherit
    }
}

/// Prefix for the written map reference instead of a file-relative path.
#[derive(Default)]
pub enum UrlPrefixOption {
    #[default]
    None,
    Fixed(String),
    Compute(Box<dyn Fn(&FileRecord) -> String + Send + Sync>),
}

pub type SourceRewriteFn = Box<dyn Fn(&str, &FileRecord) -> String + Send + Sync>;
pub type MappingUrlFn = Box<dyn Fn(&FileRecord) -> String + Send + Sync>;
pub type MapFileFn = Box<dyn Fn(&Path) -> PathBuf + Send + Sync>;

pub struct WriteOptions {
    /// Fill missing `sourcesContent` entries from disk; when off, the field
    /// is removed from the written map entirely.
    pub include_content: bool,
    /// Append the marker comment to the content record.
    pub add_comment: bool,
    pub source_root: SourceRootOption,
    /// Rewrite every source to root-absolute form (`/` + path from cwd).
    pub map_sources_absolute: bool,
    /// Custom per-source rewrite. When combined with
    /// `map_sources_absolute`, the absolute rewrite runs first and this
    /// function sees its output.
    pub map_sources: Option<SourceRewriteFn>,
    /// Full override of the written reference (external mode).
    pub source_mapping_url: Option<MappingUrlFn>,
    pub source_mapping_url_prefix: UrlPrefixOption,
    /// Declared output root, used only for `map.file` / sourceRoot math; it
    /// does not change where records are physically written downstream.
    pub dest_path: Option<PathBuf>,
    /// Rename hook for the default `.map` path.
    pub map_file: Option<MapFileFn>,
    /// Write the literal marker found at load time instead of a computed
    /// comment.
    pub reuse_pre_existing_comment: bool,
}

impl Default for WriteOptions {
    fn default() -> Self {
        WriteOptions {
            include_content: true,
            add_comment: true,
            source_root: SourceRootOption::Inherit,
            map_sources_absolute: false,
            map_sources: None,
            source_mapping_url: None,
            source_mapping_url_prefix: UrlPrefixOption::None,
            dest_path: None,
            map_file: None,
            reuse_pre_existing_comment: false,
        }
    }
}

/// Terminal stage: finalizes the attached map and emits it, either as an
/// inline base64 comment on the content record or as a sibling `.map` record
/// plus a reference comment.
pub struct MapWriteStage {
    dest: Option<PathBuf>,
    options: WriteOptions,
    diag: Arc<dyn DiagnosticSink>,
}

impl MapWriteStage {
    /// Inline mode: the serialized map is embedded in the content record.
    pub fn inline(options: WriteOptions) -> MapWriteStage {
        MapWriteStage {
            dest: None,
            options,
            diag: diag::default_sink(),
        }
    }

    /// External mode: the map is emitted as a sibling record under `dest`
    /// (relative to the record's base).
    pub fn external(dest: impl Into<PathBuf>, options: WriteOptions) -> MapWriteStage {
        MapWriteStage {
            dest: Some(dest.into()),
            options,
            diag: diag::default_sink(),
        }
    }

    pub fn with_diagnostics(mut self, diag: Arc<dyn DiagnosticSink>) -> MapWriteStage {
        self.diag = diag;
        self
    }

    /// Finalize and emit. Exactly one content record comes out; external
    /// mode adds one map record per input (emission order between the two is
    /// not contractual).
    pub fn transform(&self, mut file: FileRecord) -> Result<Vec<FileRecord>, StageError> {
        if file.is_null() {
            return Ok(vec![file]);
        }
        let Some(mut map) = file.source_map.take() else {
            return Ok(vec![file]);
        };
        if file.is_stream() {
            return Err(StageError::StreamingNotSupported("write"));
        }

        map.file = Some(file.relative_unix());

        match &self.options.source_root {
            SourceRootOption::Inherit => {}
            SourceRootOption::Clear => map.source_root = None,
            SourceRootOption::Fixed(root) => map.source_root = Some(root.clone()),
            SourceRootOption::Compute(compute) => map.source_root = compute(&file),
        }

        if self.options.include_content {
            load::load_missing_content(&mut map, &file, self.diag.as_ref());
        } else {
            map.sources_content = None;
        }

        self.rewrite_sources(&mut map, &file);
        if map.sources_content.is_some() {
            map.ensure_content_slots();
        }

        let newline = comment::detect_newline(file.contents_str().unwrap_or(""));
        let style = comment::style_for(file.extension());

        let mut output = Vec::with_capacity(2);
        let payload = match &self.dest {
            None => {
                let json = serde_json::to_string(&map)?;
                comment::encode_inline(&json)
            }
            Some(dest) => {
                let mut map_rel = paths::default_map_path(dest, file.relative());
                if let Some(rename) = &self.options.map_file {
                    map_rel = rename(&map_rel);
                }
                let map_path = paths::resolve(&file.base, &map_rel);

                self.finalize_external_paths(&mut map, &file, &map_rel, &map_path);

                let json = serde_json::to_string(&map)?;
                output.push(file.clone_for_sibling(map_path.clone(), json.into_bytes()));

                self.map_reference(&file, &map_rel, &map_path)
            }
        };

        if self.options.add_comment {
            self.append_comment(&mut file, &map, &payload, style, newline);
        }

        file.source_map = Some(map);
        output.push(file);
        Ok(output)
    }

    fn rewrite_sources(&self, map: &mut SourceMap, file: &FileRecord) {
        let rewritten: Vec<String> = map
            .sources
            .iter()
            .map(|source| {
                let mut source = source.clone();
                if self.options.map_sources_absolute && !paths::is_url(&source) {
                    source = paths::root_absolute(&file.cwd, &file.base, &source);
                }
                if let Some(rewrite) = &self.options.map_sources {
                    source = rewrite(&source, file);
                }
                paths::unix_style(&source)
            })
            .collect();
        map.sources = rewritten;
    }

    // map.file must point from the map's directory back at the output file,
    // and a relative sourceRoot is anchored at the map's directory too. With
    // a declared dest_path both are computed against that virtual output
    // tree; otherwise against the physical map path under base.
    fn finalize_external_paths(
        &self,
        map: &mut SourceMap,
        file: &FileRecord,
        map_rel: &Path,
        map_path: &Path,
    ) {
        if let Some(dest_path) = &self.options.dest_path {
            let virtual_map = paths::resolve(&file.cwd, dest_path.join(map_rel));
            let virtual_file = paths::resolve(&file.cwd, dest_path.join(file.relative()));
            let map_dir = virtual_map.parent().unwrap_or(Path::new("/"));
            map.file = Some(paths::unix_style(paths::relative(map_dir, &virtual_file)));
            let root = map.source_root.take();
            map.source_root = match root.as_deref() {
                None => Some(paths::unix_style(paths::relative(map_dir, &file.base))),
                Some(root) if root.is_empty() || root.starts_with('.') => {
                    Some(rebase_root(map_dir, &file.base, root))
                }
                _ => root.clone(),
            };
        } else {
            let map_dir = map_path.parent().unwrap_or(Path::new("/"));
            map.file = Some(paths::unix_style(paths::relative(map_dir, file.path())));
            let root = map.source_root.take();
            map.source_root = match root.as_deref() {
                Some(root) if root.is_empty() || root.starts_with('.') => {
                    Some(rebase_root(map_dir, &file.base, root))
                }
                _ => root.clone(),
            };
        }
    }

    fn map_reference(&self, file: &FileRecord, map_rel: &Path, map_path: &Path) -> String {
        if let Some(url) = &self.options.source_mapping_url {
            return url(file);
        }
        let prefix = match &self.options.source_mapping_url_prefix {
            UrlPrefixOption::None => {
                return paths::unix_style(paths::relative(file.dirname(), map_path));
            }
            UrlPrefixOption::Fixed(prefix) => prefix.clone(),
            UrlPrefixOption::Compute(compute) => compute(file),
        };
        format!(
            "{}/{}",
            prefix.trim_end_matches('/'),
            paths::unix_style(map_rel).trim_start_matches('/')
        )
    }

    fn append_comment(
        &self,
        file: &mut FileRecord,
        map: &SourceMap,
        payload: &str,
        style: comment::CommentStyle,
        newline: &str,
    ) {
        let Some(text) = file.contents_str() else {
            return;
        };
        let marker = match (&map.pre_existing_comment, self.options.reuse_pre_existing_comment) {
            (Some(literal), true) => format!("{newline}{literal}{newline}"),
            _ => comment::build_comment(payload, style, newline),
        };
        let stripped = comment::strip_trailing_comment(text);
        file.set_contents_string(format!("{stripped}{marker}"));
    }
}

// A relative sourceRoot stays portable: it is joined onto the path from the
// map's directory back to the record's base.
fn rebase_root(map_dir: &Path, base: &Path, root: &str) -> String {
    let rebased = paths::relative(map_dir, base).join(root);
    paths::unix_style(paths::normalize(rebased))
}

impl Stage for MapWriteStage {
    fn name(&self) -> &'static str {
        "write"
    }

    fn run(&self, file: FileRecord, out: &mut Vec<FileRecord>) -> Result<(), StageError> {
        out.extend(self.transform(file)?);
        Ok(())
    }
}
