//! YAML sidecar records.
//!
//! Sidecars are flat YAML mappings written next to (or instead of) a content file. This module
//! turns them into validated [`RecordMeta`] values: required keys are checked here, once, so the
//! resolvers never see a record without a title.
use serde::Deserialize;
use serde_yaml::{Mapping, Value};
use std::collections::BTreeMap;

use crate::{
    codec::{META_PREFIX, META_SUFFIX},
    error::FolioError,
    paths::{slugify, LocationPath},
    properties::{
        compose_sorted_title, ContentClass, ContentItem, FolderRecord, MenuItem, NavMenuRecord,
        RecordMeta, SORT_PRIORITY_DEFAULT,
    },
};

/// Keys of the menu's origin metadata that are copied onto a hand-authored menu record.
const NAVMENU_ORIGIN_KEYS: [&str; 9] = [
    "author",
    "basename",
    "date",
    "dirname",
    "email",
    "modified",
    "source_id",
    "source_type",
    "version",
];

/// Scalars arrive as strings, numbers or booleans depending on who wrote the sidecar.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum Scalar {
    Str(String),
    Int(i64),
    Float(f64),
    Bool(bool),
}

impl Scalar {
    fn into_string(self) -> String {
        match self {
            Scalar::Str(s) => s,
            Scalar::Int(i) => i.to_string(),
            Scalar::Float(f) => f.to_string(),
            Scalar::Bool(b) => b.to_string(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct RawSidecar {
    title: Option<Scalar>,
    source_id: Option<Scalar>,
    dirname: Option<Scalar>,
    basename: Option<Scalar>,
    basename_raw: Option<Scalar>,
    slug: Option<Scalar>,
    relative_url: Option<Scalar>,
    source_type: Option<Scalar>,
    exported_type: Option<Scalar>,
    sort_priority: Option<Scalar>,
    sorted_title: Option<Scalar>,
    summary: Option<Scalar>,
    author: Option<Scalar>,
    email: Option<Scalar>,
    date: Option<Scalar>,
    modified: Option<Scalar>,
    version: Option<Scalar>,
    template: Option<Scalar>,
    export_as: Option<Scalar>,
    navmenu: Option<Vec<MenuItem>>,
    #[serde(flatten)]
    extra: BTreeMap<String, Value>,
}

fn text(field: Option<Scalar>) -> Option<String> {
    field
        .map(Scalar::into_string)
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

/// Name of the sidecar describing content file `basename`.
pub fn meta_filename(basename: &str) -> String {
    format!("{META_PREFIX}{basename}{META_SUFFIX}")
}

/// Inverse of [`meta_filename`]: the content basename a sidecar describes.
pub fn content_basename_for_meta(meta_basename: &str) -> Option<&str> {
    meta_basename
        .strip_prefix(META_PREFIX)
        .and_then(|rest| rest.strip_suffix(META_SUFFIX))
        .filter(|rest| !rest.is_empty())
}

/// Parse YAML text into a mapping. An empty document is an empty mapping.
pub fn parse_mapping(location: &str, text: &str) -> Result<Mapping, FolioError> {
    match serde_yaml::from_str::<Value>(text)? {
        Value::Null => Ok(Mapping::new()),
        Value::Mapping(mapping) => Ok(mapping),
        other => Err(FolioError::Serialization(format!(
            "{location}: expected a YAML mapping, found {}",
            match other {
                Value::Sequence(_) => "a sequence",
                Value::Tagged(_) => "a tagged value",
                _ => "a scalar",
            }
        ))),
    }
}

/// Lay `overlay` over `base`; keys with a null value in the overlay do not erase base values.
pub fn merge_mappings(mut base: Mapping, overlay: Mapping) -> Mapping {
    for (key, value) in overlay {
        if value.is_null() && base.contains_key(&key) {
            continue;
        }
        base.insert(key, value);
    }
    base
}

fn string_mapping(values: &BTreeMap<String, String>) -> Mapping {
    values
        .iter()
        .map(|(k, v)| (Value::String(k.clone()), Value::String(v.clone())))
        .collect()
}

/// Build validated metadata for `location`. A missing title is an error unless `default_title`
/// supplies one.
fn build_meta(
    location: &str,
    mapping: Mapping,
    default_title: Option<&str>,
) -> Result<(RecordMeta, Option<Vec<MenuItem>>), FolioError> {
    let raw: RawSidecar = serde_yaml::from_value(Value::Mapping(mapping))
        .map_err(|e| FolioError::Serialization(format!("{location}: {e}")))?;
    let title = text(raw.title)
        .or_else(|| default_title.map(str::to_string))
        .ok_or_else(|| FolioError::missing_field(location, "title"))?;
    let sort_priority = match text(raw.sort_priority) {
        Some(priority) => priority.parse::<u32>().map_err(|_| {
            FolioError::Serialization(format!(
                "{location}: sort_priority '{priority}' is not a non-negative integer"
            ))
        })?,
        None => SORT_PRIORITY_DEFAULT,
    };
    let path = LocationPath::new(location);
    let meta = RecordMeta {
        location: location.to_string(),
        source_id: text(raw.source_id),
        dirname: text(raw.dirname).or_else(|| Some(path.dir().to_string())),
        basename: text(raw.basename).or_else(|| Some(path.basename().to_string())),
        basename_raw: text(raw.basename_raw),
        slug: text(raw.slug).unwrap_or_else(|| slugify(&title)),
        relative_url: text(raw.relative_url),
        source_type: text(raw.source_type),
        exported_type: text(raw.exported_type),
        sort_priority,
        sorted_title: text(raw.sorted_title)
            .unwrap_or_else(|| compose_sorted_title(sort_priority, &title)),
        summary: text(raw.summary),
        author: text(raw.author),
        email: text(raw.email),
        date: text(raw.date),
        modified: text(raw.modified),
        version: text(raw.version),
        template: text(raw.template),
        export_as: text(raw.export_as),
        extra: raw.extra,
        title,
    };
    Ok((meta, raw.navmenu))
}

/// Read a `_folder_.yml` record.
pub fn read_folder(location: &str, yaml: &str) -> Result<FolderRecord, FolioError> {
    let mapping = parse_mapping(location, yaml)?;
    let (meta, _) = build_meta(location, mapping, None)?;
    Ok(FolderRecord::new(meta))
}

/// Read a `_navmenu_.yml` record, merging selected keys from its origin metadata when present.
pub fn read_navmenu(
    location: &str,
    yaml: &str,
    origin_yaml: Option<&str>,
) -> Result<NavMenuRecord, FolioError> {
    let mut mapping = parse_mapping(location, yaml)?;
    if let Some(origin_yaml) = origin_yaml {
        let origin = parse_mapping(location, origin_yaml)?;
        for key in NAVMENU_ORIGIN_KEYS {
            let key = Value::String(key.to_string());
            if let Some(value) = origin.get(&key).filter(|v| !v.is_null()) {
                mapping.insert(key, value.clone());
            }
        }
    }
    let path = LocationPath::new(location);
    let default_title = LocationPath::new(path.dir()).basename().to_string();
    let (meta, navmenu) = build_meta(location, mapping, Some(&default_title))?;
    let navmenu = navmenu.ok_or_else(|| FolioError::missing_field(location, "navmenu"))?;
    Ok(NavMenuRecord::new(meta, navmenu))
}

/// Build the record of a rendered content file from the metadata embedded in the file, overlaid
/// by its sidecar when there is one.
pub fn read_content(
    location: &str,
    class: ContentClass,
    embedded: &BTreeMap<String, String>,
    sidecar: Option<(&str, &str)>,
) -> Result<ContentItem, FolioError> {
    let mut mapping = string_mapping(embedded);
    if let Some((sidecar_location, sidecar_yaml)) = sidecar {
        mapping = merge_mappings(mapping, parse_mapping(sidecar_location, sidecar_yaml)?);
    }
    let (meta, _) = build_meta(location, mapping, None)?;
    let item = ContentItem::new(meta, class);
    Ok(match sidecar {
        Some((sidecar_location, _)) => item.with_sidecar(sidecar_location),
        None => item,
    })
}

/// Build a record from a sidecar with no rendered content. `location` is the location the
/// sidecar describes; for pre-authored YAML records it is the sidecar's own location.
pub fn read_sidecar_only(
    location: &str,
    sidecar_location: &str,
    yaml: &str,
) -> Result<ContentItem, FolioError> {
    let mapping = parse_mapping(sidecar_location, yaml)?;
    let (meta, _) = build_meta(location, mapping, None)?;
    Ok(ContentItem::new(meta, ContentClass::Sidecar).with_sidecar(sidecar_location))
}

/// A pre-authored YAML record: the file is its own metadata, optionally overlaid by a sidecar.
pub fn read_yaml_record(
    location: &str,
    yaml: &str,
    sidecar: Option<(&str, &str)>,
) -> Result<ContentItem, FolioError> {
    let mut mapping = parse_mapping(location, yaml)?;
    let mut sidecar_location = location;
    if let Some((overlay_location, overlay_yaml)) = sidecar {
        mapping = merge_mappings(mapping, parse_mapping(overlay_location, overlay_yaml)?);
        sidecar_location = overlay_location;
    }
    let (meta, _) = build_meta(location, mapping, None)?;
    Ok(ContentItem::new(meta, ContentClass::Sidecar).with_sidecar(sidecar_location))
}
