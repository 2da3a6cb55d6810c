use once_cell::sync::Lazy;
use pulldown_cmark::{Options, Parser as MdParser};
use regex::Regex;
use std::{collections::BTreeMap, fs::read_to_string, path::Path, result::Result};

use crate::{codec::DocCodec, error::FolioError, properties::ContentClass};

pub use pulldown_cmark;

/// `Key: value` lines at the top of a markdown file, as written by the sidecar injector.
static HEADER_LINE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?P<key>[A-Za-z][A-Za-z0-9_-]*):\s+(?P<value>.+)$")
        .expect("header line pattern is a valid regex")
});

/// `^name^` inline include of a partial from the document's own directory.
static INCLUDE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\^(?P<name>[^\^/\\\n]+)\^").expect("include pattern is a valid regex")
});

pub fn folio_md_options() -> Options {
    let mut md_options = Options::empty();
    // Enabled explicitly rather than via Options::all() for reproducible output.
    md_options.insert(Options::ENABLE_DEFINITION_LIST);
    md_options.insert(Options::ENABLE_FOOTNOTES);
    md_options.insert(Options::ENABLE_GFM);
    md_options.insert(Options::ENABLE_STRIKETHROUGH);
    md_options.insert(Options::ENABLE_TABLES);
    md_options.insert(Options::ENABLE_TASKLISTS);
    md_options
}

/// Split a markdown file into its metadata header and body.
///
/// The header is the leading run of `Key: value` lines; it ends at the first blank line or at the
/// first line that does not look like a header entry.
pub fn split_header(content: &str) -> (BTreeMap<String, String>, &str) {
    let mut metadata = BTreeMap::new();
    let mut body_start = 0;
    for line in content.split_inclusive('\n') {
        let trimmed = line.trim_end_matches(['\r', '\n']);
        if trimmed.trim().is_empty() {
            if !metadata.is_empty() {
                body_start += line.len();
            }
            break;
        }
        match HEADER_LINE_RE.captures(trimmed) {
            Some(caps) => {
                metadata.insert(caps["key"].to_lowercase(), caps["value"].trim().to_string());
                body_start += line.len();
            }
            None => break,
        }
    }
    (metadata, &content[body_start..])
}

/// Replace every `^name^` in `body` with the content of the partial `_name` in `dir`. A name that
/// already starts with `_` is used as is. A missing partial is an error.
pub fn expand_includes(body: &str, dir: &Path) -> Result<String, FolioError> {
    let mut expanded = String::with_capacity(body.len());
    let mut last = 0;
    for caps in INCLUDE_RE.captures_iter(body) {
        let (Some(whole), Some(name)) = (caps.get(0), caps.name("name")) else {
            continue;
        };
        let name = name.as_str().trim();
        let partial = if name.starts_with('_') {
            name.to_string()
        } else {
            format!("_{name}")
        };
        let path = dir.join(&partial);
        let html = read_to_string(&path).map_err(|e| {
            FolioError::NotFound(format!("included partial {path:?} could not be read: {e}"))
        })?;
        tracing::trace!("[expand_includes] {:?}", path);
        expanded.push_str(&body[last..whole.start()]);
        expanded.push_str(html.trim_end());
        last = whole.end();
    }
    expanded.push_str(&body[last..]);
    Ok(expanded)
}

pub fn to_html(content: &str, output: &mut String) -> Result<(), FolioError> {
    let parser = MdParser::new_ext(content, folio_md_options());
    pulldown_cmark::html::write_html_fmt(output, parser)?;
    Ok(())
}

#[derive(Debug, Default, Clone)]
pub struct MdCodec;

impl DocCodec for MdCodec {
    fn class(&self) -> ContentClass {
        ContentClass::Document
    }

    fn render(&self, content: &str, dir: &Path) -> Result<Option<String>, FolioError> {
        let (_, body) = split_header(content);
        let body = expand_includes(body, dir)?;
        let mut html = String::with_capacity(body.len() * 3 / 2);
        to_html(&body, &mut html)?;
        Ok(Some(html))
    }

    fn embedded_metadata(&self, content: &str) -> BTreeMap<String, String> {
        split_header(content).0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_log::test;

    #[test]
    fn test_split_header() {
        let content = "Title: About Us\nAuthor: Pat Doe\n\n# About\n\nBody text.\n";
        let (metadata, body) = split_header(content);
        assert_eq!(metadata.get("title").map(String::as_str), Some("About Us"));
        assert_eq!(metadata.get("author").map(String::as_str), Some("Pat Doe"));
        assert_eq!(body, "# About\n\nBody text.\n");
    }

    #[test]
    fn test_no_header() {
        let content = "# About\n\nTitle: not a header\n";
        let (metadata, body) = split_header(content);
        assert!(metadata.is_empty());
        assert_eq!(body, content);
    }

    #[test]
    fn test_render_strips_header() {
        let html = MdCodec
            .render("Title: About\n\nSee [the plan](plan.html).\n", Path::new(""))
            .unwrap()
            .unwrap();
        assert!(html.contains(r#"<a href="plan.html">the plan</a>"#));
        assert!(!html.contains("Title:"));
    }

    #[test]
    fn test_include_partial_from_same_directory() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("_contact.html"),
            "<div class=\"contact\">Call 555-0100</div>\n",
        )
        .unwrap();
        let html = MdCodec
            .render("# Office\n\n^contact.html^\n\nAlso ^_contact.html^ here.\n", dir.path())
            .unwrap()
            .unwrap();
        assert_eq!(html.matches(r#"<div class="contact">Call 555-0100</div>"#).count(), 2);
        assert!(!html.contains("^contact.html^"));
    }

    #[test]
    fn test_missing_partial_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = MdCodec.render("^nope.html^\n", dir.path()).unwrap_err();
        assert!(matches!(err, FolioError::NotFound(_)));
    }

    #[test]
    fn test_include_names_stay_in_the_directory() {
        let body = "^../secret.html^";
        assert_eq!(expand_includes(body, Path::new("")).unwrap(), body);
    }
}
