//! Stand-in index pages for folders, and the section context of every page.
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

use crate::{
    paths::{href_for_location, LocationPath},
    properties::{ContentClass, MenuItem, ResolvedMenuItem, SectionLinkEntry},
    site::sections::{Section, SectionMap},
    store::RecordStore,
};

pub const LISTING_CONTENT: &str = "<p>Click on the links in the Contents area.</p>";
pub const NO_CONTENT: &str = "<p>This section has no content.</p>";
pub const INDEX_NAME: &str = "index.html";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PageTemplate {
    /// Redirect to another page
    Alias,
    /// Page rendered inside a section, with the section's table of contents
    Section,
}

impl PageTemplate {
    pub fn name(&self) -> &'static str {
        match self {
            PageTemplate::Alias => "alias",
            PageTemplate::Section => "section",
        }
    }
}

/// A synthesized `<dir>/index.html`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IndexPage {
    pub location: String,
    pub dir: String,
    pub template: PageTemplate,
    pub slug: String,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub redirect_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub submenu: Vec<ResolvedMenuItem>,
}

impl IndexPage {
    pub fn is_alias(&self) -> bool {
        self.template == PageTemplate::Alias
    }
}

/// First entry to redirect to: documents win over other content.
fn alias_target(contents: &[SectionLinkEntry]) -> Option<&SectionLinkEntry> {
    contents
        .iter()
        .find(|entry| entry.class == ContentClass::Document)
        .or_else(|| contents.first())
}

/// Build the stand-in index page of `section`, or `None` if the folder has its own index
/// document.
pub fn synthesize_index(section: &Section, site_url: &str) -> Option<IndexPage> {
    if let Some(index) = section.index_document.as_ref() {
        tracing::debug!("[synthesize_index] {} has index document {}", section.dir, index);
        return None;
    }
    let location = LocationPath::new(&section.dir).join(INDEX_NAME);
    let page = match alias_target(&section.contents) {
        Some(target) => IndexPage {
            location,
            dir: section.dir.clone(),
            template: PageTemplate::Alias,
            slug: section.slug.clone(),
            title: target.title.clone(),
            redirect_url: Some(href_for_location(site_url, &target.location)),
            content: None,
            submenu: Vec::new(),
        },
        None => IndexPage {
            location,
            dir: section.dir.clone(),
            template: PageTemplate::Section,
            slug: section.slug.clone(),
            title: section.title.clone(),
            redirect_url: None,
            content: Some(
                if section.subtopics.is_empty() {
                    NO_CONTENT
                } else {
                    LISTING_CONTENT
                }
                .to_string(),
            ),
            submenu: if section.subtopics.is_empty() {
                Vec::new()
            } else {
                section.navmenu.clone()
            },
        },
    };
    Some(page)
}

/// Index pages for every section, in the order the sections were resolved.
pub fn synthesize_indices(sections: &SectionMap, order: &[String], site_url: &str) -> Vec<IndexPage> {
    order
        .iter()
        .filter_map(|dir| sections.get(dir))
        .filter_map(|section| synthesize_index(section, site_url))
        .collect()
}

/// Rendering context of a page that lives inside a section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PageContext {
    pub location: String,
    pub url: String,
    pub template: PageTemplate,
    pub section: String,
    pub section_links: Vec<SectionLinkEntry>,
}

/// The section a page belongs to: the nearest ancestor directory that has a section.
pub fn section_for<'s>(sections: &'s SectionMap, location: &str) -> Option<&'s Section> {
    LocationPath::new(location)
        .ancestors()
        .find_map(|dir| sections.get(dir))
}

/// Assign every rendered document to its section. Documents in `failed` get no page context.
pub fn assign_sections(
    store: &RecordStore,
    sections: &SectionMap,
    failed: &BTreeSet<String>,
) -> BTreeMap<String, PageContext> {
    store
        .contents()
        .filter(|item| item.class == ContentClass::Document)
        .filter(|item| !failed.contains(&item.meta.location))
        .filter_map(|item| {
            section_for(sections, &item.meta.location).map(|section| {
                (
                    item.meta.location.clone(),
                    PageContext {
                        location: item.meta.location.clone(),
                        url: item.url.clone(),
                        template: PageTemplate::Section,
                        section: section.dir.clone(),
                        section_links: section.contents.clone(),
                    },
                )
            })
        })
        .collect()
}

/// Menu descriptors as written to `_navmenu_auto_.yml`.
#[derive(Debug, Serialize)]
pub struct AutoMenuFile<'a> {
    pub navmenu: &'a [MenuItem],
}
