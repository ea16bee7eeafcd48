use sha2::{Digest, Sha256};
use url::Url;

const FALLBACK_STEM: &str = "reporte";
const DEFAULT_EXTENSION: &str = "xlsx";
const MAX_NAME_LEN: usize = 120;

/// Local file name for a downloaded report.
///
/// Prefers the server-suggested name, then the link's last path segment, then
/// `reporte--{short_hash(link)}.xlsx`. The result is safe on Windows.
pub fn download_filename(suggested: Option<&str>, link: &Url) -> String {
    let candidate = suggested
        .map(str::to_string)
        .or_else(|| last_segment(link))
        .map(|name| sanitize(&name))
        .filter(|name| !name.is_empty());

    let name = match candidate {
        Some(name) => name,
        None => format!("{FALLBACK_STEM}--{}", short_hash(link.as_str())),
    };

    if name.rsplit_once('.').is_some_and(|(stem, ext)| !stem.is_empty() && !ext.is_empty()) {
        name
    } else {
        format!("{name}.{DEFAULT_EXTENSION}")
    }
}

fn last_segment(link: &Url) -> Option<String> {
    link.path_segments()?
        .filter(|segment| !segment.is_empty())
        .last()
        .map(|segment| match urlencoding::decode(segment) {
            Ok(decoded) => decoded.into_owned(),
            Err(_) => segment.to_string(),
        })
}

fn sanitize(input: &str) -> String {
    let cleaned: String = input
        .chars()
        .map(|c| if is_forbidden(c) { '_' } else { c })
        .collect();
    let cleaned = cleaned.trim_matches(&['_', ' ', '.'][..]);

    // Collapse multiple underscores
    let mut compacted = String::with_capacity(cleaned.len());
    let mut prev_underscore = false;
    for c in cleaned.chars() {
        if c == '_' {
            if !prev_underscore {
                compacted.push(c);
            }
            prev_underscore = true;
        } else {
            compacted.push(c);
            prev_underscore = false;
        }
    }

    if compacted.chars().count() > MAX_NAME_LEN {
        compacted = compacted.chars().take(MAX_NAME_LEN).collect();
    }
    let stem = compacted.split('.').next().unwrap_or_default();
    if is_reserved_windows_name(stem) {
        compacted.insert(stem.len(), '_');
    }
    compacted
}

fn is_forbidden(c: char) -> bool {
    matches!(c,
        '\\' | '/' | ':' | '*' | '?' | '"' | '<' | '>' | '|' | '\0'..='\u{1F}'
    )
}

fn is_reserved_windows_name(name: &str) -> bool {
    const RESERVED: &[&str] = &[
        "CON", "PRN", "AUX", "NUL", "COM1", "COM2", "COM3", "COM4", "COM5", "COM6", "COM7", "COM8",
        "COM9", "LPT1", "LPT2", "LPT3", "LPT4", "LPT5", "LPT6", "LPT7", "LPT8", "LPT9",
    ];
    RESERVED.iter().any(|r| r.eq_ignore_ascii_case(name))
}

fn short_hash(input: &str) -> String {
    let digest = Sha256::digest(input.as_bytes());
    digest.iter().take(4).map(|byte| format!("{byte:02x}")).collect()
}
