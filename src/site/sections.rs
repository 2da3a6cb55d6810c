//! Reconstruct the folder hierarchy of a site from folder records alone.
//!
//! Every `_folder_.yml` record becomes a [`Section`] carrying its ordered table of contents
//! (direct child content), its ordered subtopics (direct child folders) and the menu descriptors
//! auto-built from those subtopics. Sections are resolved deepest first: a parent's descriptors
//! embed its children's, so the children must be final before the parent is visited.
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

use crate::{
    codec::{diagnostic::BuildDiagnostic, NAVMENU_NAME},
    paths::LocationPath,
    properties::{
        ContentClass, ContentItem, FolderRecord, MenuItem, MenuItemKind, Record,
        ResolvedMenuItem, SectionLinkEntry, SubtopicEntry,
    },
    store::{excluded_by, RecordStore},
};

/// The resolved view of one folder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Section {
    pub dir: String,
    /// Location of the folder record this section was built from.
    pub folder: String,
    pub title: String,
    pub slug: String,
    pub sorted_title: String,
    pub contents: Vec<SectionLinkEntry>,
    pub subtopics: Vec<SubtopicEntry>,
    /// Menu descriptors derived from the subtopics, before URL resolution.
    #[serde(skip)]
    pub menu_items: Vec<MenuItem>,
    /// The resolved form of `menu_items`. Written once by the menu resolver.
    pub navmenu: Vec<ResolvedMenuItem>,
    /// A document named `index.*` among the direct contents, if any.
    pub index_document: Option<String>,
}

pub type SectionMap = BTreeMap<String, Section>;

/// Output of [`resolve_sections`].
#[derive(Debug, Clone, Default)]
pub struct SectionSet {
    pub sections: SectionMap,
    /// Directories in the order they were resolved (deepest first).
    pub order: Vec<String>,
    /// Directories whose folder record is malformed or untitled.
    pub excluded_dirs: BTreeSet<String>,
    /// Locations of records left out of the site. Later passes skip them.
    pub failed: BTreeSet<String>,
    pub diagnostics: Vec<BuildDiagnostic>,
}

impl SectionSet {
    pub fn is_failed(&self, location: &str) -> bool {
        self.failed.contains(location)
    }
}

fn parent_dir(dir: &str) -> &str {
    LocationPath::new(dir).dir()
}

/// Sort ascending on the composite sort key, then on location.
fn by_sort_key<T, F: Fn(&T) -> (&str, &str)>(entries: &mut [T], key: F) {
    entries.sort_by(|a, b| key(a).cmp(&key(b)));
}

fn is_index_document(item: &ContentItem) -> bool {
    item.class == ContentClass::Document && item.meta.path().stem().eq_ignore_ascii_case("index")
}

/// Compute contents, subtopics and menu descriptors of every folder in `store`.
///
/// Folders whose own record failed to parse exclude their whole subtree; every record in such a
/// subtree is reported as a failed item.
pub fn resolve_sections(store: &RecordStore) -> SectionSet {
    let mut set = SectionSet::default();
    let excluded = store.excluded_dirs();

    for record in store.records() {
        if let Some(dir) = excluded_by(record.location(), &excluded) {
            set.diagnostics.push(BuildDiagnostic::failed_item(
                record.location(),
                format!("skipped: the folder record of {dir} is missing or malformed"),
            ));
            set.failed.insert(record.location().to_string());
        }
    }

    let mut folders: Vec<&FolderRecord> = store
        .folders()
        .filter(|f| excluded_by(&f.meta.location, &excluded).is_none())
        .collect();

    let mut children_of: BTreeMap<&str, Vec<&FolderRecord>> = BTreeMap::new();
    for &folder in folders.iter() {
        children_of
            .entry(parent_dir(folder.dir()))
            .or_default()
            .push(folder);
    }

    let mut contents_of: BTreeMap<&str, Vec<&ContentItem>> = BTreeMap::new();
    for item in store.contents() {
        if !item.class.is_rendered() || set.is_failed(&item.meta.location) {
            continue;
        }
        if item.meta.title.trim().is_empty() {
            set.diagnostics.push(BuildDiagnostic::failed_item(
                &item.meta.location,
                "missing required field 'title'",
            ));
            set.failed.insert(item.meta.location.clone());
            continue;
        }
        contents_of.entry(item.meta.path().dir()).or_default().push(item);
    }

    folders.sort_by(|a, b| {
        LocationPath::new(b.dir())
            .depth()
            .cmp(&LocationPath::new(a.dir()).depth())
            .then_with(|| a.meta.location.cmp(&b.meta.location))
    });

    for folder in folders {
        let dir = folder.dir();
        let mut contents: Vec<SectionLinkEntry> = contents_of
            .get(dir)
            .map(|items| {
                items
                    .iter()
                    .map(|item| SectionLinkEntry {
                        sorted_title: item.meta.sorted_title.clone(),
                        title: item.meta.title.clone(),
                        location: item.url.clone(),
                        class: item.class,
                    })
                    .collect()
            })
            .unwrap_or_default();
        by_sort_key(&mut contents, |e| (e.sorted_title.as_str(), e.location.as_str()));

        let index_document = contents_of
            .get(dir)
            .and_then(|items| items.iter().find(|item| is_index_document(item)))
            .map(|item| item.meta.location.clone());

        let mut subtopics: Vec<SubtopicEntry> = children_of
            .get(dir)
            .map(|children| {
                children
                    .iter()
                    .map(|child| SubtopicEntry {
                        sorted_title: child.meta.sorted_title.clone(),
                        title: child.meta.title.clone(),
                        location: child.dir().to_string(),
                        sub_folder: child.meta.location.clone(),
                        class: ContentClass::Folder,
                    })
                    .collect()
            })
            .unwrap_or_default();
        by_sort_key(&mut subtopics, |e| (e.sorted_title.as_str(), e.location.as_str()));

        let menu_items = subtopic_menu(store, &set.sections, &subtopics);
        tracing::debug!(
            "[resolve_sections] {}: {} content item(s), {} subtopic(s)",
            dir,
            contents.len(),
            subtopics.len()
        );
        set.order.push(dir.to_string());
        set.sections.insert(
            dir.to_string(),
            Section {
                dir: dir.to_string(),
                folder: folder.meta.location.clone(),
                title: folder.meta.title.clone(),
                slug: folder.meta.slug.clone(),
                sorted_title: folder.meta.sorted_title.clone(),
                contents,
                subtopics,
                menu_items,
                navmenu: Vec::new(),
                index_document,
            },
        );
    }
    set.excluded_dirs = excluded;
    set
}

/// Menu descriptors for a folder's subtopics. A child with a hand-authored menu is included; a
/// child with its own non-empty descriptors becomes a section; anything else is a local link.
fn subtopic_menu(
    store: &RecordStore,
    resolved: &SectionMap,
    subtopics: &[SubtopicEntry],
) -> Vec<MenuItem> {
    subtopics
        .iter()
        .map(|topic| {
            let child_menu = LocationPath::new(&topic.location).join(NAVMENU_NAME);
            if matches!(
                store.get_by_location(&child_menu),
                Some(Record::NavMenu(_))
            ) {
                return MenuItem::new(&topic.title, MenuItemKind::Include);
            }
            match resolved
                .get(&topic.location)
                .filter(|child| !child.menu_items.is_empty())
            {
                Some(child) => MenuItem::new(&topic.title, MenuItemKind::Section)
                    .with_href(&topic.location)
                    .with_submenu(child.menu_items.clone()),
                None => {
                    MenuItem::new(&topic.title, MenuItemKind::LinkLocal).with_href(&topic.location)
                }
            }
        })
        .collect()
}
