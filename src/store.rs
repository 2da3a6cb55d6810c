//! In-memory index of every record discovered under the content root.
//!
//! [`RecordStore`] owns the records for one build pass. It is keyed by location (unique) and keeps
//! an auxiliary multimap from origin identifier to every location carrying that identifier, in
//! insertion order. Origin identifiers are deliberately *not* treated as unique: one source
//! document may be mirrored into more than one output, or renamed between runs.
use std::collections::{BTreeMap, BTreeSet, HashMap};

use crate::{
    error::FolioError,
    paths::LocationPath,
    properties::{ContentItem, FolderRecord, NavMenuRecord, Record},
};

#[derive(Debug, Clone, Default)]
pub struct RecordStore {
    records: BTreeMap<String, Record>,
    /// source_id -> locations, in insertion order
    by_origin: HashMap<String, Vec<String>>,
    /// Discovery position of every location
    order: HashMap<String, usize>,
    /// Locations whose sidecar could not be turned into a record, with the reason.
    failed: BTreeMap<String, FolioError>,
}

impl RecordStore {
    pub fn new() -> Self {
        RecordStore::default()
    }

    /// Insert a record. Locations are unique for the lifetime of the store.
    pub fn put(&mut self, record: Record) -> Result<(), FolioError> {
        let location = record.location().to_string();
        if self.records.contains_key(&location) {
            return Err(FolioError::DuplicateLocation(location));
        }
        if let Some(source_id) = record.source_id() {
            self.by_origin
                .entry(source_id.to_string())
                .or_default()
                .push(location.clone());
        }
        tracing::trace!(
            "[RecordStore::put] {} ({})",
            location,
            record.content_class()
        );
        self.order.insert(location.clone(), self.order.len());
        self.records.insert(location, record);
        Ok(())
    }

    pub fn get_by_location(&self, location: &str) -> Option<&Record> {
        self.records.get(location)
    }

    /// Every record sharing `source_id`, in discovery order. Empty when the id is unknown.
    pub fn get_by_origin_id(&self, source_id: &str) -> Vec<&Record> {
        self.by_origin
            .get(source_id)
            .map(|locations| {
                locations
                    .iter()
                    .filter_map(|location| self.records.get(location))
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn contains(&self, location: &str) -> bool {
        self.records.contains_key(location)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Records ordered by location.
    pub fn records(&self) -> impl Iterator<Item = &Record> {
        self.records.values()
    }

    /// Position of `location` in discovery order.
    pub fn discovery_index(&self, location: &str) -> Option<usize> {
        self.order.get(location).copied()
    }

    pub fn contents(&self) -> impl Iterator<Item = &ContentItem> {
        self.records.values().filter_map(Record::as_content)
    }

    pub fn folders(&self) -> impl Iterator<Item = &FolderRecord> {
        self.records.values().filter_map(Record::as_folder)
    }

    pub fn navmenus(&self) -> impl Iterator<Item = &NavMenuRecord> {
        self.records.values().filter_map(Record::as_navmenu)
    }

    /// Remember a location whose record could not be built.
    pub fn mark_failed(&mut self, location: impl Into<String>, error: FolioError) {
        let location = location.into();
        tracing::warn!("[RecordStore] {} failed: {}", location, error);
        self.failed.insert(location, error);
    }

    pub fn failed(&self) -> &BTreeMap<String, FolioError> {
        &self.failed
    }

    /// Directories whose own folder record failed to parse. Everything below them is excluded
    /// from section resolution.
    pub fn failed_folder_dirs(&self) -> BTreeSet<String> {
        self.failed
            .keys()
            .filter(|location| {
                LocationPath::new(location.as_str()).basename() == crate::codec::FOLDER_NAME
            })
            .map(|location| LocationPath::new(location.as_str()).dir().to_string())
            .collect()
    }

    /// Directories left out of the site: their folder record failed to parse or carries a blank
    /// title. Every record below them is excluded from all resolution passes.
    pub fn excluded_dirs(&self) -> BTreeSet<String> {
        let mut dirs = self.failed_folder_dirs();
        dirs.extend(
            self.folders()
                .filter(|f| f.meta.title.trim().is_empty())
                .map(|f| f.dir().to_string()),
        );
        dirs
    }
}

/// The first of `dirs` that contains `location`, if any.
pub fn excluded_by<'d>(location: &str, dirs: &'d BTreeSet<String>) -> Option<&'d str> {
    let path = LocationPath::new(location);
    dirs.iter()
        .find(|dir| path.path == dir.as_str() || path.is_within(dir))
        .map(String::as_str)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::properties::{ContentClass, RecordMeta};
    use test_log::test;

    fn doc(location: &str, source_id: &str) -> Record {
        Record::Content(ContentItem::new(
            RecordMeta::new(location, "Doc").with_source_id(source_id),
            ContentClass::Document,
        ))
    }

    #[test]
    fn test_put_and_get_by_location() {
        let mut store = RecordStore::new();
        store.put(doc("pages/a.html", "id-a")).unwrap();
        assert!(store.get_by_location("pages/a.html").is_some());
        assert!(store.get_by_location("pages/b.html").is_none());
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_duplicate_location_is_rejected() {
        let mut store = RecordStore::new();
        store.put(doc("pages/a.html", "id-a")).unwrap();
        let err = store.put(doc("pages/a.html", "id-b")).unwrap_err();
        assert_eq!(err, FolioError::DuplicateLocation("pages/a.html".to_string()));
        // The rejected record must not leak into the origin index
        assert!(store.get_by_origin_id("id-b").is_empty());
    }

    #[test]
    fn test_origin_multimap_preserves_insertion_order() {
        let mut store = RecordStore::new();
        store.put(doc("pages/z.html", "shared")).unwrap();
        store.put(doc("pages/a.html", "shared")).unwrap();
        store.put(doc("pages/m.html", "other")).unwrap();

        let shared: Vec<&str> = store
            .get_by_origin_id("shared")
            .into_iter()
            .map(Record::location)
            .collect();
        assert_eq!(shared, vec!["pages/z.html", "pages/a.html"]);
        assert!(store.get_by_origin_id("missing").is_empty());
        assert_eq!(store.discovery_index("pages/a.html"), Some(1));
    }

    #[test]
    fn test_failed_folder_dirs() {
        let mut store = RecordStore::new();
        store.mark_failed(
            "pages/district/_folder_.yml",
            FolioError::missing_field("pages/district/_folder_.yml", "title"),
        );
        store.mark_failed(
            "pages/district/_meta_a.html.yml",
            FolioError::missing_field("pages/district/_meta_a.html.yml", "title"),
        );
        let dirs = store.failed_folder_dirs();
        assert_eq!(dirs.len(), 1);
        assert!(dirs.contains("pages/district"));
    }

    #[test]
    fn test_excluded_dirs_cover_blank_titles() {
        let mut store = RecordStore::new();
        store.mark_failed(
            "pages/board/_folder_.yml",
            FolioError::missing_field("pages/board/_folder_.yml", "title"),
        );
        store
            .put(Record::Folder(FolderRecord::new(RecordMeta::new(
                "pages/staff/_folder_.yml",
                "  ",
            ))))
            .unwrap();
        let dirs = store.excluded_dirs();
        assert_eq!(dirs.len(), 2);
        assert_eq!(excluded_by("pages/staff/jobs/a.html", &dirs), Some("pages/staff"));
        assert_eq!(excluded_by("pages/board", &dirs), Some("pages/board"));
        assert_eq!(excluded_by("pages/boardroom/a.html", &dirs), None);
    }
}
