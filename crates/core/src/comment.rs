use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use once_cell::sync::Lazy;
use regex::Regex;

// Any sourceMappingURL marker comment (inline data or file reference),
// line or block style. Used only to find the trailing occurrence. Multiline
// `$` matches before `\n` only, so the carriage return of a CRLF ending is
// consumed explicitly.
static MARKER_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r#"(?m)(?://[#@][ \t]+sourceMappingURL=[^\s'"`]+[ \t]*\r?$)|(?:/\*[#@][ \t]+sourceMappingURL=[^*]+\*/[ \t]*\r?$)"#,
    )
    .unwrap()
});

// Inline data-URI form. Group 1 marks base64, group 2 is the payload.
static INLINE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?://|/\*)[#@][ \t]+sourceMappingURL=data:(?:(?:application|text)/json)?(?:;charset=[^;,]*)?(?:;(base64))?,([A-Za-z0-9+/=%._!~'()\-]*)",
    )
    .unwrap()
});

// File-reference form. Group 1 (line) or group 2 (block) is the path.
static FILE_REF_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r#"(?m)(?://[#@][ \t]+sourceMappingURL=([^\s'"`]+?)[ \t]*\r?$)|(?:/\*[#@][ \t]+sourceMappingURL=([^*]+?)[ \t]*\*/[ \t]*\r?$)"#,
    )
    .unwrap()
});

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CommentStyle {
    Line,
    Block,
}

/// Comment style for a file extension: `css` gets the block form, `js` and
/// anything unknown the line form.
pub fn style_for(extension: Option<&str>) -> CommentStyle {
    match extension {
        Some("css") => CommentStyle::Block,
        _ => CommentStyle::Line,
    }
}

/// Dominant line-ending style of `content`; `\n` when empty or tied.
pub fn detect_newline(content: &str) -> &'static str {
    let crlf = content.matches("\r\n").count();
    let lf = content.matches('\n').count() - crlf;
    if crlf > lf {
        "\r\n"
    } else {
        "\n"
    }
}

pub fn build_comment(payload: &str, style: CommentStyle, newline: &str) -> String {
    match style {
        CommentStyle::Line => format!("{newline}//# sourceMappingURL={payload}{newline}"),
        CommentStyle::Block => format!("{newline}/*# sourceMappingURL={payload} */{newline}"),
    }
}

/// Inline data-URI payload for a serialized map. The written form is always
/// `data:application/json;charset=utf8;base64,<b64>`.
pub fn encode_inline(json: &str) -> String {
    format!(
        "data:application/json;charset=utf8;base64,{}",
        STANDARD.encode(json.as_bytes())
    )
}

#[derive(Clone, Debug)]
pub struct InlinePayload {
    pub base64: bool,
    pub data: String,
}

/// Decode an inline payload into the raw JSON text. `None` on undecodable
/// base64 or non-UTF-8 data.
pub fn decode_inline(payload: &InlinePayload) -> Option<String> {
    if payload.base64 {
        let bytes = STANDARD.decode(payload.data.as_bytes()).ok()?;
        String::from_utf8(bytes).ok()
    } else {
        Some(payload.data.clone())
    }
}

// The marker is only honored when nothing but whitespace follows it, so
// marker-looking text mid-file is never picked up.
fn trailing(content: &str) -> Option<regex::Match<'_>> {
    let found = MARKER_RE.find_iter(content).last()?;
    if content[found.end()..].trim().is_empty() {
        Some(found)
    } else {
        None
    }
}

/// The literal trailing marker comment, if the content ends with one.
pub fn detect_pre_existing(content: &str) -> Option<String> {
    trailing(content).map(|m| m.as_str().trim_end().to_string())
}

/// Trailing inline marker plus its decoded payload descriptor.
pub fn find_trailing_inline(content: &str) -> Option<(String, InlinePayload)> {
    let found = trailing(content)?;
    let caps = INLINE_RE.captures(found.as_str())?;
    let payload = InlinePayload {
        base64: caps.get(1).is_some(),
        data: caps.get(2).map(|m| m.as_str().to_string()).unwrap_or_default(),
    };
    Some((found.as_str().trim_end().to_string(), payload))
}

/// Trailing file-reference marker plus the referenced map path.
pub fn find_trailing_reference(content: &str) -> Option<(String, String)> {
    let found = trailing(content)?;
    let caps = FILE_REF_RE.captures(found.as_str())?;
    let path = caps
        .get(1)
        .or_else(|| caps.get(2))
        .map(|m| m.as_str().to_string())?;
    if path.starts_with("data:") {
        return None;
    }
    Some((found.as_str().trim_end().to_string(), path))
}

/// Remove exactly one trailing marker comment, including the newline that
/// terminates its line. A no-op when there is none, so stripping is
/// idempotent on comment-free content.
pub fn strip_trailing_comment(content: &str) -> String {
    match trailing(content) {
        Some(found) => {
            let rest = &content[found.end()..];
            let rest = rest.strip_prefix('\n').unwrap_or(rest);
            let mut out = String::with_capacity(content.len());
            out.push_str(&content[..found.start()]);
            out.push_str(rest);
            out
        }
        None => content.to_string(),
    }
}
