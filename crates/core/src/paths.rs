use std::path::{Component, Path, PathBuf};

use once_cell::sync::Lazy;
use regex::Regex;

static URL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(https?|webpack(-[^:]+)?)://").unwrap()
});

/// True for absolute-scheme sources (`http(s)://`, `webpack://`,
/// `webpack-foo://`) that must never be resolved against the filesystem.
pub fn is_url(source: &str) -> bool {
    URL_RE.is_match(source)
}

/// Convert a path to forward-slash form so emitted maps stay portable.
pub fn unix_style<P: AsRef<Path>>(path: P) -> String {
    path.as_ref()
        .to_string_lossy()
        .replace(std::path::MAIN_SEPARATOR, "/")
}

/// Lexically fold `.` and `..` components. Never touches the filesystem.
pub fn normalize<P: AsRef<Path>>(path: P) -> PathBuf {
    let mut parts: Vec<Component> = Vec::new();
    for comp in path.as_ref().components() {
        match comp {
            Component::CurDir => {}
            Component::ParentDir => match parts.last() {
                Some(Component::Normal(_)) => {
                    parts.pop();
                }
                // ".." above the root stays at the root
                Some(Component::RootDir) | Some(Component::Prefix(_)) => {}
                _ => parts.push(comp),
            },
            other => parts.push(other),
        }
    }
    let mut out = PathBuf::new();
    for comp in &parts {
        out.push(comp.as_os_str());
    }
    if out.as_os_str().is_empty() {
        out.push(".");
    }
    out
}

/// Resolve `rel` against `base_dir` (Node `path.resolve` for two arguments):
/// an absolute `rel` wins outright, otherwise the join is normalized.
pub fn resolve<B: AsRef<Path>, R: AsRef<Path>>(base_dir: B, rel: R) -> PathBuf {
    let rel = rel.as_ref();
    if rel.is_absolute() {
        normalize(rel)
    } else {
        normalize(base_dir.as_ref().join(rel))
    }
}

/// Relative path from the directory `from` to `to` (Node `path.relative`),
/// computed lexically on normalized inputs.
pub fn relative<F: AsRef<Path>, T: AsRef<Path>>(from: F, to: T) -> PathBuf {
    let from = normalize(from);
    let to = normalize(to);
    let from_comps: Vec<Component> = from.components().collect();
    let to_comps: Vec<Component> = to.components().collect();
    let common = from_comps
        .iter()
        .zip(to_comps.iter())
        .take_while(|(a, b)| a == b)
        .count();

    let mut out = PathBuf::new();
    for _ in common..from_comps.len() {
        out.push("..");
    }
    for comp in &to_comps[common..] {
        out.push(comp.as_os_str());
    }
    out
}

/// Default on-disk name for the map of `relative` written under `dest`:
/// `.map` is appended to the full file name, the extension is kept
/// (`foo.js` becomes `foo.js.map`).
pub fn default_map_path<D: AsRef<Path>, R: AsRef<Path>>(dest: D, relative: R) -> PathBuf {
    let mut joined = normalize(dest.as_ref().join(relative)).into_os_string();
    joined.push(".map");
    PathBuf::from(joined)
}

/// Root-absolute form of a base-relative source entry: `/` followed by the
/// path from the project root (`cwd`) to the source.
pub fn root_absolute<C: AsRef<Path>, B: AsRef<Path>>(cwd: C, base: B, source: &str) -> String {
    let abs = resolve(base, Path::new(source));
    format!("/{}", unix_style(relative(cwd, abs)))
}
