//! [crate::properties] contains the basic building blocks of a site build: the metadata records
//! read from sidecar files, the table-of-contents entries derived from them, and the menu items
//! that make up navigation trees.
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::{
    collections::BTreeMap,
    fmt::{Display, Formatter},
};

use crate::paths::LocationPath;

/// Priority assigned to items whose source name carries no `NNN]` prefix. Pinned items always
/// carry a smaller number, so they sort first.
pub const SORT_PRIORITY_DEFAULT: u32 = 999;

static PRIORITY_PREFIX_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(([0-9]{3})\]\s*)(.+)$").expect("priority prefix pattern is a valid regex")
});

static TITLE_CLEANUP_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(^_|_*\.(pdf|yml|md|html)$)").expect("title cleanup pattern is a valid regex")
});

/// Build the composite sort key used for every table of contents.
pub fn compose_sorted_title(sort_priority: u32, title: &str) -> String {
    format!("{sort_priority:03}]{title}")
}

/// Title-derived ordering keys of a source item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TitleKeys {
    pub title: String,
    pub sort_priority: u32,
    pub sorted_title: String,
}

impl TitleKeys {
    /// Split a raw source name such as `"010] About Us.pdf"` into its cleaned title
    /// (`"About Us"`), its priority (`10`) and the composite sort key (`"010]About Us"`).
    pub fn from_raw_title(raw: &str) -> TitleKeys {
        let raw = raw.trim();
        let (sort_priority, remainder) = match PRIORITY_PREFIX_RE.captures(raw) {
            Some(caps) => (
                caps[2].parse::<u32>().unwrap_or(SORT_PRIORITY_DEFAULT),
                caps.get(3).map(|m| m.as_str()).unwrap_or(raw),
            ),
            None => (SORT_PRIORITY_DEFAULT, raw),
        };
        let title = TITLE_CLEANUP_RE.replace_all(remainder, "").trim().to_string();
        let sorted_title = compose_sorted_title(sort_priority, &title);
        TitleKeys {
            title,
            sort_priority,
            sorted_title,
        }
    }
}

/// The closed set of record classes. `Document` and `Static` are rendered content; `Sidecar` is a
/// metadata record with no rendered content of its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentClass {
    Document,
    Static,
    Sidecar,
    Folder,
    NavMenu,
}

impl ContentClass {
    pub fn is_rendered(&self) -> bool {
        matches!(self, ContentClass::Document | ContentClass::Static)
    }
}

impl Display for ContentClass {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ContentClass::Document => "document",
            ContentClass::Static => "static",
            ContentClass::Sidecar => "sidecar",
            ContentClass::Folder => "folder",
            ContentClass::NavMenu => "navmenu",
        };
        write!(f, "{name}")
    }
}

/// Fields shared by every record, validated when the sidecar is read.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordMeta {
    pub location: String,
    pub source_id: Option<String>,
    pub dirname: Option<String>,
    pub basename: Option<String>,
    pub basename_raw: Option<String>,
    pub title: String,
    pub slug: String,
    pub relative_url: Option<String>,
    pub source_type: Option<String>,
    pub exported_type: Option<String>,
    pub sort_priority: u32,
    pub sorted_title: String,
    pub summary: Option<String>,
    pub author: Option<String>,
    pub email: Option<String>,
    pub date: Option<String>,
    pub modified: Option<String>,
    pub version: Option<String>,
    pub template: Option<String>,
    pub export_as: Option<String>,
    /// User-supplied keys with no dedicated field.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub extra: BTreeMap<String, serde_yaml::Value>,
}

impl RecordMeta {
    /// Minimal record for `location` with `title`; every derived key is filled from the title.
    pub fn new(location: impl Into<String>, title: impl Into<String>) -> RecordMeta {
        let title = title.into();
        RecordMeta {
            location: location.into(),
            source_id: None,
            dirname: None,
            basename: None,
            basename_raw: None,
            slug: crate::paths::slugify(&title),
            relative_url: None,
            source_type: None,
            exported_type: None,
            sort_priority: SORT_PRIORITY_DEFAULT,
            sorted_title: compose_sorted_title(SORT_PRIORITY_DEFAULT, &title),
            title,
            summary: None,
            author: None,
            email: None,
            date: None,
            modified: None,
            version: None,
            template: None,
            export_as: None,
            extra: BTreeMap::new(),
        }
    }

    pub fn with_source_id(mut self, source_id: impl Into<String>) -> RecordMeta {
        self.source_id = Some(source_id.into());
        self
    }

    /// Set the priority and recompute the composite sort key.
    pub fn with_sort_priority(mut self, sort_priority: u32) -> RecordMeta {
        self.sort_priority = sort_priority;
        self.sorted_title = compose_sorted_title(sort_priority, &self.title);
        self
    }

    pub fn path(&self) -> LocationPath<'_> {
        LocationPath::new(&self.location)
    }
}

/// A renderable unit (document or static asset), or a sidecar-only record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentItem {
    pub meta: RecordMeta,
    pub class: ContentClass,
    /// Site-relative location the item is published at.
    pub url: String,
    /// Location of the sidecar the metadata was read from, if any.
    pub sidecar: Option<String>,
}

impl ContentItem {
    /// Documents publish as `.html`; everything else keeps its own path.
    pub fn new(meta: RecordMeta, class: ContentClass) -> ContentItem {
        let url = match class {
            ContentClass::Document => meta.path().replace_extension("html"),
            _ => meta.location.clone(),
        };
        ContentItem {
            meta,
            class,
            url,
            sidecar: None,
        }
    }

    pub fn with_sidecar(mut self, sidecar: impl Into<String>) -> ContentItem {
        self.sidecar = Some(sidecar.into());
        self
    }
}

/// Directory-level record, stored at `<dir>/_folder_.yml`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FolderRecord {
    pub meta: RecordMeta,
}

impl FolderRecord {
    pub fn new(meta: RecordMeta) -> FolderRecord {
        FolderRecord { meta }
    }

    /// The directory this record describes.
    pub fn dir(&self) -> &str {
        self.meta.path().dir()
    }
}

/// Hand-authored menu, stored at `<dir>/_navmenu_.yml`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NavMenuRecord {
    pub meta: RecordMeta,
    pub navmenu: Vec<MenuItem>,
}

impl NavMenuRecord {
    pub fn new(meta: RecordMeta, navmenu: Vec<MenuItem>) -> NavMenuRecord {
        NavMenuRecord { meta, navmenu }
    }

    pub fn dir(&self) -> &str {
        self.meta.path().dir()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "record", rename_all = "lowercase")]
pub enum Record {
    Content(ContentItem),
    Folder(FolderRecord),
    NavMenu(NavMenuRecord),
}

impl Record {
    pub fn meta(&self) -> &RecordMeta {
        match self {
            Record::Content(item) => &item.meta,
            Record::Folder(folder) => &folder.meta,
            Record::NavMenu(menu) => &menu.meta,
        }
    }

    pub fn location(&self) -> &str {
        &self.meta().location
    }

    pub fn source_id(&self) -> Option<&str> {
        self.meta().source_id.as_deref()
    }

    pub fn content_class(&self) -> ContentClass {
        match self {
            Record::Content(item) => item.class,
            Record::Folder(_) => ContentClass::Folder,
            Record::NavMenu(_) => ContentClass::NavMenu,
        }
    }

    pub fn as_content(&self) -> Option<&ContentItem> {
        match self {
            Record::Content(item) => Some(item),
            _ => None,
        }
    }

    pub fn as_folder(&self) -> Option<&FolderRecord> {
        match self {
            Record::Folder(folder) => Some(folder),
            _ => None,
        }
    }

    pub fn as_navmenu(&self) -> Option<&NavMenuRecord> {
        match self {
            Record::NavMenu(menu) => Some(menu),
            _ => None,
        }
    }
}

/// One row of a folder's `contents` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SectionLinkEntry {
    pub sorted_title: String,
    pub title: String,
    pub location: String,
    pub class: ContentClass,
}

/// One row of a folder's `subtopics` table. `sub_folder` is the location of the child folder's
/// own record, so its resolved section can be looked up.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubtopicEntry {
    pub sorted_title: String,
    pub title: String,
    pub location: String,
    pub sub_folder: String,
    pub class: ContentClass,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MenuItemKind {
    LinkLocal,
    LinkExternal,
    Doc,
    Pdf,
    Section,
    Folder,
    Include,
    #[serde(other)]
    Unknown,
}

impl MenuItemKind {
    pub fn is_link(&self) -> bool {
        matches!(self, MenuItemKind::LinkLocal | MenuItemKind::LinkExternal)
    }

    pub fn is_section(&self) -> bool {
        matches!(self, MenuItemKind::Section | MenuItemKind::Folder)
    }
}

impl Display for MenuItemKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            MenuItemKind::LinkLocal => "link-local",
            MenuItemKind::LinkExternal => "link-external",
            MenuItemKind::Doc => "doc",
            MenuItemKind::Pdf => "pdf",
            MenuItemKind::Section => "section",
            MenuItemKind::Folder => "folder",
            MenuItemKind::Include => "include",
            MenuItemKind::Unknown => "unknown",
        };
        write!(f, "{name}")
    }
}

/// Menu descriptor as written in a `_navmenu_.yml` file or synthesized from folders.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MenuItem {
    pub title: String,
    #[serde(rename = "type")]
    pub kind: MenuItemKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub href: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub submenu: Option<Vec<MenuItem>>,
}

impl MenuItem {
    pub fn new(title: impl Into<String>, kind: MenuItemKind) -> MenuItem {
        MenuItem {
            title: title.into(),
            kind,
            href: None,
            submenu: None,
        }
    }

    pub fn with_href(mut self, href: impl Into<String>) -> MenuItem {
        self.href = Some(href.into());
        self
    }

    pub fn with_submenu(mut self, submenu: Vec<MenuItem>) -> MenuItem {
        self.submenu = Some(submenu);
        self
    }
}

/// A menu node after resolution: display name, qualified URL and resolved children.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedMenuItem {
    pub name: String,
    pub href: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub submenu: Vec<ResolvedMenuItem>,
    /// True when `href` is the diagnostic "not found" link.
    #[serde(skip)]
    pub fallback: bool,
}
