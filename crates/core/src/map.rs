use serde::{Deserialize, Serialize};
use thiserror::Error;

fn default_version() -> u32 {
    3
}

/// The source-map value attached to a `FileRecord`. `mappings` is opaque
/// here: it is produced and consumed by the `sourcemap` codec, this crate
/// only carries it through.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SourceMap {
    #[serde(default = "default_version")]
    pub version: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
    #[serde(
        rename = "sourceRoot",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub source_root: Option<String>,
    #[serde(default)]
    pub sources: Vec<String>,
    #[serde(
        rename = "sourcesContent",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub sources_content: Option<Vec<Option<String>>>,
    #[serde(default)]
    pub names: Vec<String>,
    #[serde(default)]
    pub mappings: String,
    /// Literal marker comment found in the original file, kept for
    /// diagnostics and the opt-in comment passthrough. Never serialized.
    #[serde(skip)]
    pub pre_existing_comment: Option<String>,
}

impl SourceMap {
    /// Empty identity map for a file with no pre-existing mapping.
    pub fn identity(source: String, content: Option<String>) -> Self {
        SourceMap {
            version: 3,
            file: None,
            source_root: None,
            sources: vec![source],
            sources_content: Some(vec![content]),
            names: Vec::new(),
            mappings: String::new(),
            pre_existing_comment: None,
        }
    }

    /// Pad `sourcesContent` with nulls so it stays parallel to `sources`.
    pub fn ensure_content_slots(&mut self) {
        let len = self.sources.len();
        let slots = self.sources_content.get_or_insert_with(Vec::new);
        slots.resize(len, None);
    }
}

#[derive(Debug, Error)]
pub enum MergeError {
    #[error("invalid source map: {0}")]
    Map(#[from] sourcemap::Error),
    #[error("source map serialization failed: {0}")]
    Json(#[from] serde_json::Error),
}

/// Merge the map produced by a transform over the map already attached to
/// the record: each position of `generated` is traced through `existing`
/// back to the original source. Tokens that do not trace are dropped.
/// Returns a new map; neither input is mutated.
pub fn apply_source_map(
    existing: &SourceMap,
    generated: &SourceMap,
) -> Result<SourceMap, MergeError> {
    let older = sourcemap::SourceMap::from_slice(&serde_json::to_vec(existing)?)?;
    let newer = sourcemap::SourceMap::from_slice(&serde_json::to_vec(generated)?)?;

    let mut builder = sourcemap::SourceMapBuilder::new(generated.file.as_deref());
    for token in newer.tokens() {
        if let Some(original) = older.lookup_token(token.get_src_line(), token.get_src_col()) {
            let raw = builder.add(
                token.get_dst_line(),
                token.get_dst_col(),
                original.get_src_line(),
                original.get_src_col(),
                original.get_source(),
                original.get_name(),
                false,
            );
            if raw.src_id != u32::MAX {
                builder.set_source_contents(
                    raw.src_id,
                    older.get_source_contents(original.get_src_id()),
                );
            }
        }
    }

    let mut buf = Vec::new();
    builder.into_sourcemap().to_writer(&mut buf)?;
    let mut merged: SourceMap = serde_json::from_slice(&buf)?;
    merged.file = generated.file.clone();
    merged.pre_existing_comment = existing.pre_existing_comment.clone();
    Ok(merged)
}
