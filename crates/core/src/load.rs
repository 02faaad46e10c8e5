use std::fs;
use std::path::{Path, PathBuf};

use crate::comment;
use crate::diag::DiagnosticSink;
use crate::file::FileRecord;
use crate::map::SourceMap;
use crate::paths;

/// Outcome of a map search. `map` is `None` when nothing loadable was found;
/// `content` is the record text with any consumed marker comment removed and
/// is what should propagate downstream either way.
pub struct LoadResult {
    pub map: Option<SourceMap>,
    pub content: String,
    pub pre_existing_comment: Option<String>,
}

pub fn strip_bom(text: &str) -> &str {
    text.strip_prefix('\u{feff}').unwrap_or(text)
}

/// Locate an existing map for `file`, first match wins: a trailing inline
/// comment, then a trailing file-reference comment, then a same-named `.map`
/// sibling on disk. Malformed or unreadable maps are swallowed and reported
/// as "no map found"; the caller falls back to an identity map.
///
/// `keep_inline_comment` leaves a consumed inline comment in the propagating
/// content (the large-file mode, where rewriting the buffer is costly).
pub fn load(
    file: &FileRecord,
    content: &str,
    keep_inline_comment: bool,
    diag: &dyn DiagnosticSink,
) -> LoadResult {
    let mut result = LoadResult {
        map: None,
        content: content.to_string(),
        pre_existing_comment: None,
    };
    let mut map_dir: PathBuf = file.dirname().to_path_buf();

    if let Some((marker, payload)) = comment::find_trailing_inline(content) {
        // sources in an inline map are relative to the file itself
        result.pre_existing_comment = Some(marker);
        let parsed = comment::decode_inline(&payload)
            .and_then(|json| serde_json::from_str::<SourceMap>(&json).ok());
        match parsed {
            Some(map) => {
                result.map = Some(map);
                if !keep_inline_comment {
                    result.content = comment::strip_trailing_comment(content);
                }
            }
            None => diag.note(&format!(
                "unreadable inline source map in {}",
                file.path().display()
            )),
        }
    } else if let Some((marker, reference)) = comment::find_trailing_reference(content) {
        // the comment is consumed whether or not the referenced file loads
        let map_file = paths::resolve(&map_dir, Path::new(&reference));
        result.pre_existing_comment = Some(marker);
        result.content = comment::strip_trailing_comment(content);
        map_dir = map_file.parent().unwrap_or(Path::new("/")).to_path_buf();
        match read_map_file(&map_file) {
            Some(map) => result.map = Some(map),
            None => diag.note(&format!("map file not found: {}", map_file.display())),
        }
    } else {
        let mut sibling = file.path().as_os_str().to_os_string();
        sibling.push(".map");
        let sibling = PathBuf::from(sibling);
        map_dir = sibling.parent().unwrap_or(Path::new("/")).to_path_buf();
        if let Some(map) = read_map_file(&sibling) {
            result.map = Some(map);
        }
    }

    if let Some(map) = result.map.as_mut() {
        fix_sources(map, &map_dir, file, &result.content, diag);
    }
    result
}

fn read_map_file(path: &Path) -> Option<SourceMap> {
    let raw = fs::read_to_string(path).ok()?;
    serde_json::from_str(strip_bom(&raw)).ok()
}

/// Normalize a loaded map in place: every non-URL source is resolved against
/// the map's own directory (plus its `sourceRoot`), rewritten relative to the
/// record's base, and its content slot filled from memory or disk. URL-form
/// sources are left untouched with a null content slot. Read failures
/// degrade that entry to null; they never abort.
fn fix_sources(
    map: &mut SourceMap,
    map_dir: &Path,
    file: &FileRecord,
    file_content: &str,
    diag: &dyn DiagnosticSink,
) {
    let len = map.sources.len();
    let mut contents = map.sources_content.take().unwrap_or_default();
    contents.resize(len, None);
    let root = map.source_root.clone();

    for (i, source) in map.sources.iter_mut().enumerate() {
        if paths::is_url(source) {
            continue;
        }
        if let Some(root) = root.as_deref() {
            if paths::is_url(root) {
                contents[i] = None;
                continue;
            }
        }

        let resolve_dir = match root.as_deref() {
            Some(root) if !root.is_empty() => paths::resolve(map_dir, Path::new(root)),
            _ => map_dir.to_path_buf(),
        };
        let abs = paths::resolve(&resolve_dir, Path::new(source.as_str()));
        *source = paths::unix_style(paths::relative(&file.base, &abs));

        if contents[i].as_deref().map_or(true, str::is_empty) {
            contents[i] = if abs == file.path() {
                Some(file_content.to_string())
            } else {
                read_source_file(&abs, diag)
            };
        }
    }
    map.sources_content = Some(contents);
}

/// Fill missing `sourcesContent` slots for a map whose sources are relative
/// to the record's base (the shape both stages hand around). Used at write
/// time when the content-inclusion policy is on.
pub(crate) fn load_missing_content(
    map: &mut SourceMap,
    file: &FileRecord,
    diag: &dyn DiagnosticSink,
) {
    let len = map.sources.len();
    let mut contents = map.sources_content.take().unwrap_or_default();
    contents.resize(len, None);

    for (i, source) in map.sources.iter().enumerate() {
        if paths::is_url(source) {
            continue;
        }
        if contents[i].as_deref().map_or(true, str::is_empty) {
            let abs = paths::resolve(&file.base, Path::new(source.as_str()));
            contents[i] = if abs == file.path() {
                file.contents_str().map(|text| strip_bom(text).to_string())
            } else {
                read_source_file(&abs, diag)
            };
        }
    }
    map.sources_content = Some(contents);
}

fn read_source_file(path: &Path, diag: &dyn DiagnosticSink) -> Option<String> {
    match fs::read_to_string(path) {
        Ok(raw) => Some(strip_bom(&raw).to_string()),
        Err(_) => {
            diag.note(&format!("source file not found: {}", path.display()));
            None
        }
    }
}
