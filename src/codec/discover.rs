//! Walk a mirrored drive tree and load every record it holds into a [`RecordStore`].
//!
//! Discovery visits directories in sorted file-name order, so the order in which records enter
//! the store (and therefore the tie-break order of origin id lookups) is the same on every run.
use globset::GlobSet;
use std::{
    collections::{BTreeMap, HashSet},
    fs::read_to_string,
    path::{Path, PathBuf},
};
use walkdir::{DirEntry, WalkDir};

use crate::{
    codec::{
        diagnostic::BuildDiagnostic,
        meta_filename,
        sidecar::{
            content_basename_for_meta, read_content, read_folder, read_navmenu,
            read_sidecar_only, read_yaml_record,
        },
        CODECS, FOLDER_NAME, NAVMENU_AUTO_NAME, NAVMENU_META_NAME, NAVMENU_NAME,
    },
    config::SiteConfig,
    error::FolioError,
    paths::{os_path_to_string, string_to_os_path, LocationPath},
    properties::{ContentClass, Record, TitleKeys},
    store::RecordStore,
};

/// Everything read from disk in one ingest pass.
#[derive(Debug, Default)]
pub struct Discovery {
    pub store: RecordStore,
    /// Rendered HTML of every document, keyed by the document's location.
    pub rendered: BTreeMap<String, String>,
    pub diagnostics: Vec<BuildDiagnostic>,
}

impl Discovery {
    fn fail(&mut self, location: &str, error: FolioError) {
        self.diagnostics
            .push(BuildDiagnostic::from_error(location, &error));
        self.store.mark_failed(location, error);
    }

    fn put(&mut self, record: Record) {
        let location = record.location().to_string();
        if let Err(e) = self.store.put(record) {
            self.fail(&location, e);
        }
    }
}

fn is_hidden(entry: &DirEntry) -> bool {
    entry
        .file_name()
        .to_str()
        .map(|s| s.starts_with("."))
        .unwrap_or(false)
}

fn is_yaml(ext: &str) -> bool {
    ext.eq_ignore_ascii_case("yml") || ext.eq_ignore_ascii_case("yaml")
}

/// Sorted list of the files below `path`, skipping hidden entries.
fn iter_files<P: AsRef<Path>>(path: P) -> Vec<PathBuf> {
    WalkDir::new(&path)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| !is_hidden(e) || e.path() == path.as_ref())
        .filter_map(|e| match e {
            Ok(entry) => Some(entry),
            Err(err) => {
                tracing::warn!("[discover] skipping unreadable entry: {}", err);
                None
            }
        })
        .filter(|e| e.file_type().is_file())
        .map(DirEntry::into_path)
        .collect()
}

/// Load every record under the configured page paths of `content_root`.
///
/// Per-item problems are reported as diagnostics and recorded in the store's failed set; only
/// problems with the content root itself are returned as errors.
pub fn discover<P: AsRef<Path>>(
    content_root: P,
    config: &SiteConfig,
) -> Result<Discovery, FolioError> {
    let content_root = content_root.as_ref();
    if !content_root.is_dir() {
        return Err(FolioError::NotFound(format!(
            "content root {content_root:?} is not a directory"
        )));
    }
    let ignore = config.ignore_matcher()?;
    let mut discovery = Discovery::default();

    let mut locations = Vec::new();
    for page_path in config.page_paths.iter() {
        let root = content_root.join(page_path);
        if !root.is_dir() {
            tracing::warn!("[discover] page path {:?} does not exist", root);
            discovery.diagnostics.push(BuildDiagnostic::warning(format!(
                "page path '{page_path}' does not exist"
            )));
            continue;
        }
        for file in iter_files(&root) {
            let location = os_path_to_string(file.strip_prefix(content_root)?);
            if is_ignored(&location, ignore.as_ref()) {
                tracing::debug!("[discover] ignoring {}", location);
                continue;
            }
            locations.push(location);
        }
    }
    let present: HashSet<&str> = locations.iter().map(String::as_str).collect();
    tracing::debug!("[discover] {} files under {:?}", locations.len(), content_root);

    for location in locations.iter() {
        load_location(content_root, location, &present, &mut discovery);
    }
    tracing::info!(
        "[discover] loaded {} records ({} failed)",
        discovery.store.len(),
        discovery.store.failed().len()
    );
    Ok(discovery)
}

fn is_ignored(location: &str, ignore: Option<&GlobSet>) -> bool {
    let basename = LocationPath::new(location).basename();
    basename == NAVMENU_AUTO_NAME || ignore.map(|re| re.is_match(basename)).unwrap_or(false)
}

fn read_location(content_root: &Path, location: &str) -> Result<String, FolioError> {
    Ok(read_to_string(content_root.join(location))?)
}

/// Read the sidecar of `location` when one was discovered.
fn read_sidecar(
    content_root: &Path,
    location: &str,
    present: &HashSet<&str>,
) -> Result<Option<(String, String)>, FolioError> {
    let path = LocationPath::new(location);
    let sidecar_location = LocationPath::new(path.dir()).join(meta_filename(path.basename()));
    if !present.contains(sidecar_location.as_str()) {
        return Ok(None);
    }
    let yaml = read_location(content_root, &sidecar_location)?;
    Ok(Some((sidecar_location, yaml)))
}

fn load_location(
    content_root: &Path,
    location: &str,
    present: &HashSet<&str>,
    discovery: &mut Discovery,
) {
    let path = LocationPath::new(location);
    let basename = path.basename();
    let dir = LocationPath::new(path.dir());

    let loaded: Result<Option<Record>, FolioError> = if basename == FOLDER_NAME {
        read_location(content_root, location)
            .and_then(|yaml| read_folder(location, &yaml))
            .map(|folder| Some(Record::Folder(folder)))
    } else if basename == NAVMENU_NAME {
        let origin_location = dir.join(NAVMENU_META_NAME);
        read_location(content_root, location).and_then(|yaml| {
            let origin = if present.contains(origin_location.as_str()) {
                Some(read_location(content_root, &origin_location)?)
            } else {
                None
            };
            read_navmenu(location, &yaml, origin.as_deref())
                .map(|menu| Some(Record::NavMenu(menu)))
        })
    } else if basename == NAVMENU_META_NAME {
        // consumed together with the menu it describes
        Ok(None)
    } else if let Some(described) = content_basename_for_meta(basename) {
        let described_location = dir.join(described);
        if present.contains(described_location.as_str()) {
            // consumed together with the content it describes
            Ok(None)
        } else {
            tracing::debug!(
                "[discover] {} describes missing {}; storing sidecar-only record",
                location,
                described_location
            );
            read_location(content_root, location)
                .and_then(|yaml| read_sidecar_only(&described_location, location, &yaml))
                .map(|item| Some(Record::Content(item)))
        }
    } else if basename.starts_with('_') {
        tracing::debug!("[discover] {} is a partial, not a page", location);
        Ok(None)
    } else if is_yaml(path.ext()) {
        read_location(content_root, location).and_then(|yaml| {
            let sidecar = read_sidecar(content_root, location, present)?;
            read_yaml_record(
                location,
                &yaml,
                sidecar.as_ref().map(|(l, y)| (l.as_str(), y.as_str())),
            )
            .map(|item| Some(Record::Content(item)))
        })
    } else {
        load_content(content_root, location, present, discovery)
    };

    match loaded {
        Ok(Some(record)) => discovery.put(record),
        Ok(None) => {}
        Err(e) => discovery.fail(location, e),
    }
}

fn load_content(
    content_root: &Path,
    location: &str,
    present: &HashSet<&str>,
    discovery: &mut Discovery,
) -> Result<Option<Record>, FolioError> {
    let path = LocationPath::new(location);
    let Some(codec) = CODECS.get(path.ext()) else {
        tracing::debug!("[discover] no codec for {}, skipping", location);
        return Ok(None);
    };
    let sidecar = read_sidecar(content_root, location, present)?;
    let class = codec.class();

    let (mut embedded, rendered) = if class == ContentClass::Document {
        let text = read_location(content_root, location)?;
        let dir = content_root.join(string_to_os_path(path.dir()));
        (codec.embedded_metadata(&text), codec.render(&text, &dir)?)
    } else {
        (BTreeMap::new(), None)
    };

    if sidecar.is_none() && class == ContentClass::Static && !embedded.contains_key("title") {
        let keys = TitleKeys::from_raw_title(path.stem());
        tracing::warn!(
            "[discover] {} has no sidecar, titling it '{}' from its file name",
            location,
            keys.title
        );
        discovery.diagnostics.push(BuildDiagnostic::warning(format!(
            "{location} has no sidecar; title taken from its file name"
        )));
        embedded.insert("title".to_string(), keys.title);
        embedded.insert("sort_priority".to_string(), keys.sort_priority.to_string());
    }

    let item = read_content(
        location,
        class,
        &embedded,
        sidecar.as_ref().map(|(l, y)| (l.as_str(), y.as_str())),
    )?;
    if let Some(html) = rendered {
        discovery.rendered.insert(location.to_string(), html);
    }
    Ok(Some(Record::Content(item)))
}
