use once_cell::sync::Lazy;
use regex::Regex;
use std::{collections::BTreeMap, path::Path};

use crate::{codec::DocCodec, error::FolioError, properties::ContentClass};

static TITLE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?is)<title[^>]*>(?P<title>.*?)</title>").expect("title pattern is a valid regex")
});

static META_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)<meta\s+name\s*=\s*"(?P<name>[^"]+)"\s+content\s*=\s*"(?P<content>[^"]*)"\s*/?>"#)
        .expect("meta pattern is a valid regex")
});

/// Undo the attribute escaping applied when sanitized pages were written.
pub fn unescape_html(text: &str) -> String {
    text.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&#x27;", "'")
        .replace("&amp;", "&")
}

/// Sanitized HTML exports. Content is already publishable, so rendering is the identity.
#[derive(Debug, Default, Clone)]
pub struct HtmlCodec;

impl DocCodec for HtmlCodec {
    fn class(&self) -> ContentClass {
        ContentClass::Document
    }

    fn render(&self, content: &str, _dir: &Path) -> Result<Option<String>, FolioError> {
        Ok(Some(content.to_string()))
    }

    fn embedded_metadata(&self, content: &str) -> BTreeMap<String, String> {
        let mut metadata = BTreeMap::new();
        for caps in META_RE.captures_iter(content) {
            let name = caps["name"].trim().to_lowercase();
            // charset and http-equiv style entries are not record metadata
            if name == "charset" || name.is_empty() {
                continue;
            }
            metadata.insert(name, unescape_html(caps["content"].trim()));
        }
        if let Some(caps) = TITLE_RE.captures(content) {
            let title = unescape_html(caps["title"].trim());
            if !title.is_empty() {
                metadata.insert("title".to_string(), title);
            }
        }
        metadata
    }
}
