//! Rewrite links between mirrored documents.
//!
//! Exported documents link to each other through a redirect wrapper:
//! `https://www.google.com/url?q=https://docs.google.com/document/d/<id>/...`. The `<id>` is the
//! origin identifier of the target, which the [`RecordStore`] maps back to mirrored locations.
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use std::collections::{BTreeMap, BTreeSet};

use crate::{
    paths::href_for_location,
    properties::{ContentClass, ContentItem, Record},
    store::RecordStore,
};

/// A redirect-wrapped document link inside a link-carrying attribute. The quote characters are
/// captured separately and compared by the replacer.
pub static GDRIVE_LINK_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r#"(?x)
        (?P<markup><\s*[^>]*(?:href|src|poster|data|cite|formaction|action)\s*=\s*)
        (?P<open>["'])
        https://www\.google\.com/url\?q=https://docs\.google\.com/document/d/
        (?P<docid>[-_a-zA-Z0-9]+)
        (?P<rest>/[^"'>]*)
        (?P<close>["'])
        "#,
    )
    .expect("drive link pattern is a valid regex")
});

/// Content after rewriting, with the number of links that were replaced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rewrite {
    pub content: String,
    pub substitutions: usize,
}

pub struct LinkRewriter<'a> {
    store: &'a RecordStore,
    site_url: &'a str,
    /// Locations that are never link targets.
    excluded: Option<&'a BTreeSet<String>>,
}

impl<'a> LinkRewriter<'a> {
    pub fn new(store: &'a RecordStore, site_url: &'a str) -> LinkRewriter<'a> {
        LinkRewriter {
            store,
            site_url,
            excluded: None,
        }
    }

    /// Skip the records at `locations` when looking up link targets.
    pub fn excluding(mut self, locations: &'a BTreeSet<String>) -> LinkRewriter<'a> {
        self.excluded = Some(locations);
        self
    }

    /// The rendered document an origin id points at: the first document with that id in
    /// discovery order. Sidecar-only, static, menu and excluded records are never link targets.
    pub fn closest_document(&self, source_id: &str) -> Option<&'a ContentItem> {
        self.store
            .get_by_origin_id(source_id)
            .into_iter()
            .filter_map(Record::as_content)
            .filter(|item| {
                self.excluded
                    .map(|excluded| !excluded.contains(&item.meta.location))
                    .unwrap_or(true)
            })
            .find(|item| item.class == ContentClass::Document)
    }

    pub fn href_for(&self, source_id: &str) -> Option<String> {
        self.closest_document(source_id)
            .map(|item| href_for_location(self.site_url, &item.url))
    }

    /// Replace every recognized link whose target is known. Unknown ids are left as they are.
    pub fn rewrite(&self, content: &str) -> Rewrite {
        let mut substitutions = 0;
        let rewritten = GDRIVE_LINK_RE.replace_all(content, |caps: &Captures| {
            if caps["open"] != caps["close"] {
                return caps[0].to_string();
            }
            match self.href_for(&caps["docid"]) {
                Some(href) => {
                    substitutions += 1;
                    format!("{}{}{}{}", &caps["markup"], &caps["open"], href, &caps["close"])
                }
                None => {
                    tracing::debug!("[LinkRewriter] no document for id {}", &caps["docid"]);
                    caps[0].to_string()
                }
            }
        });
        Rewrite {
            content: rewritten.into_owned(),
            substitutions,
        }
    }

    /// Rewrite every rendered document in place; returns the total number of substitutions.
    pub fn rewrite_all(&self, rendered: &mut BTreeMap<String, String>) -> usize {
        let mut total = 0;
        for (location, content) in rendered.iter_mut() {
            let rewrite = self.rewrite(content);
            if rewrite.substitutions > 0 {
                tracing::debug!(
                    "[LinkRewriter] {}: {} substitution(s)",
                    location,
                    rewrite.substitutions
                );
                total += rewrite.substitutions;
                *content = rewrite.content;
            }
        }
        total
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::properties::RecordMeta;
    use test_log::test;

    const DOC_LINK: &str = "https://www.google.com/url?q=https://docs.google.com/document/d/1mZdFHJor-_x9/edit&amp;sa=D&amp;ust=1455";

    fn store() -> RecordStore {
        let mut store = RecordStore::new();
        // a sidecar-only record for the same id is discovered first and must be skipped
        store
            .put(Record::Content(ContentItem::new(
                RecordMeta::new("pages/old/plan.html", "Old Plan").with_source_id("1mZdFHJor-_x9"),
                ContentClass::Sidecar,
            )))
            .unwrap();
        store
            .put(Record::Content(ContentItem::new(
                RecordMeta::new("pages/district/plan.md", "Plan").with_source_id("1mZdFHJor-_x9"),
                ContentClass::Document,
            )))
            .unwrap();
        store
            .put(Record::Content(ContentItem::new(
                RecordMeta::new("pages/district/copy.html", "Copy").with_source_id("1mZdFHJor-_x9"),
                ContentClass::Document,
            )))
            .unwrap();
        store
    }

    #[test]
    fn test_no_links_is_unchanged() {
        let store = store();
        let rewriter = LinkRewriter::new(&store, "");
        let content = r#"<p>See <a href="https://example.org/x">this</a>.</p>"#;
        let rewrite = rewriter.rewrite(content);
        assert_eq!(rewrite.content, content);
        assert_eq!(rewrite.substitutions, 0);
    }

    #[test]
    fn test_known_link_is_rewritten_to_first_document() {
        let store = store();
        let rewriter = LinkRewriter::new(&store, "http://127.0.0.1:8088/ksd");
        let content = format!(r#"<p>Read <a rel="nofollow" href="{DOC_LINK}">the plan</a>.</p>"#);
        let rewrite = rewriter.rewrite(&content);
        assert_eq!(rewrite.substitutions, 1);
        assert_eq!(
            rewrite.content,
            r#"<p>Read <a rel="nofollow" href="http://127.0.0.1:8088/ksd/pages/district/plan.html">the plan</a>.</p>"#
        );
    }

    #[test]
    fn test_unknown_id_is_left_alone() {
        let store = store();
        let rewriter = LinkRewriter::new(&store, "");
        let content = r#"<a href='https://www.google.com/url?q=https://docs.google.com/document/d/unknownId/edit'>x</a>"#;
        let rewrite = rewriter.rewrite(content);
        assert_eq!(rewrite.content, content);
        assert_eq!(rewrite.substitutions, 0);
    }

    #[test]
    fn test_mismatched_quotes_are_left_alone() {
        let store = store();
        let rewriter = LinkRewriter::new(&store, "");
        let content = format!(r#"<a href="{DOC_LINK}'>x</a>"#);
        assert_eq!(rewriter.rewrite(&content).substitutions, 0);
    }

    #[test]
    fn test_rewrite_all_counts() {
        let store = store();
        let rewriter = LinkRewriter::new(&store, "");
        let mut rendered = BTreeMap::new();
        rendered.insert(
            "pages/a.html".to_string(),
            format!(r#"<a href="{DOC_LINK}">1</a> <img src='{DOC_LINK}'>"#),
        );
        rendered.insert("pages/b.html".to_string(), "<p>none</p>".to_string());
        assert_eq!(rewriter.rewrite_all(&mut rendered), 2);
        assert!(rendered["pages/a.html"].contains(r#"href="pages/district/plan.html""#));
        assert!(rendered["pages/a.html"].contains("src='pages/district/plan.html'"));
    }

    #[test]
    fn test_excluded_document_is_not_a_target() {
        let store = store();
        let excluded = BTreeSet::from(["pages/district/plan.md".to_string()]);
        let rewriter = LinkRewriter::new(&store, "").excluding(&excluded);
        assert_eq!(
            rewriter.href_for("1mZdFHJor-_x9").as_deref(),
            Some("pages/district/copy.html")
        );

        let only = BTreeSet::from([
            "pages/district/plan.md".to_string(),
            "pages/district/copy.html".to_string(),
        ]);
        let rewriter = LinkRewriter::new(&store, "").excluding(&only);
        let content = format!(r#"<a href="{DOC_LINK}">x</a>"#);
        let rewrite = rewriter.rewrite(&content);
        assert_eq!(rewrite.substitutions, 0);
        assert_eq!(rewrite.content, content);
    }
}
