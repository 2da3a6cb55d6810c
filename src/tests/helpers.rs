//! Shared test utilities for building record stores in memory

use crate::{
    properties::{ContentClass, ContentItem, FolderRecord, MenuItem, NavMenuRecord, Record, RecordMeta},
    store::RecordStore,
};

/// Initialize logging for tests
pub fn init_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init()
        .ok();
}

pub fn folder(dir: &str, title: &str) -> Record {
    Record::Folder(FolderRecord::new(RecordMeta::new(
        format!("{dir}/_folder_.yml"),
        title,
    )))
}

pub fn document(location: &str, title: &str, sort_priority: u32) -> Record {
    Record::Content(ContentItem::new(
        RecordMeta::new(location, title).with_sort_priority(sort_priority),
        ContentClass::Document,
    ))
}

/// A metadata record with no rendered content of its own.
pub fn sidecar_only(location: &str, title: &str, sort_priority: u32) -> Record {
    Record::Content(ContentItem::new(
        RecordMeta::new(location, title).with_sort_priority(sort_priority),
        ContentClass::Sidecar,
    ))
}

pub fn navmenu(dir: &str, items: Vec<MenuItem>) -> Record {
    Record::NavMenu(NavMenuRecord::new(
        RecordMeta::new(format!("{dir}/_navmenu_.yml"), "navmenu"),
        items,
    ))
}

pub fn store_of(records: Vec<Record>) -> RecordStore {
    init_logging();
    let mut store = RecordStore::new();
    for record in records {
        store.put(record).unwrap();
    }
    store
}

/// `/district` with an `about.md` record (priority 1) and an empty `/district/staff` folder.
pub fn district_store(about: Record) -> RecordStore {
    store_of(vec![
        folder("/district", "District"),
        about,
        folder("/district/staff", "Staff"),
    ])
}

pub fn with_source_id(mut record: Record, source_id: &str) -> Record {
    match &mut record {
        Record::Content(item) => item.meta.source_id = Some(source_id.to_string()),
        Record::Folder(folder) => folder.meta.source_id = Some(source_id.to_string()),
        Record::NavMenu(menu) => menu.meta.source_id = Some(source_id.to_string()),
    }
    record
}
