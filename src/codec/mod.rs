//! Reading mirrored files into records, and driving the site build.
//!
//! This module provides the I/O boundary of the crate: everything that turns files on disk into
//! [`Record`](crate::properties::Record)s in a [`RecordStore`](crate::store::RecordStore), and the
//! [`SiteCompiler`] that runs the resolution passes over that store.
//!
//! ## Key Components
//!
//! - [`DocCodec`] trait - Classify and render one kind of content file
//! - [`CodecMap`] - Global registry of available codecs by extension (accessible via [`CODECS`])
//! - [`sidecar`] - YAML sidecar parsing and validation
//! - [`discover`] - Walks the content root and pairs content files with their sidecars
//! - [`SiteCompiler`] - Runs ingest → sections → menus → links → index pages → emit
//! - [`BuildDiagnostic`] - Non-fatal problems collected over a pass
//!
//! ## Reserved Filenames
//!
//! Each directory of the mirrored tree may contain:
//!
//! - [`FOLDER_NAME`] - the folder-level record
//! - [`NAVMENU_NAME`] - a hand-authored navigation menu
//! - [`NAVMENU_META_NAME`] - origin metadata for that menu
//! - `_meta_<file>.yml` - the sidecar of content file `<file>` (see [`meta_filename`])
//! - `_<name>` - a partial, only ever pulled into markdown documents by a `^name^` include
//!
//! ## Built-in Codecs
//!
//! - **HTML** (`.html`, `.htm`) - documents, passed through
//! - **Markdown** (`.md`, `.markdown`, `.mkd`, `.mdown`) - documents, rendered with pulldown-cmark
//! - **Static** (`.pdf`, images) - published as-is
//!
//! Register custom codecs via [`CodecMap::insert`]:
//!
//! ```rust
//! use folio_core::{codec::{CODECS, DocCodec}, properties::ContentClass, FolioError};
//! use std::{collections::BTreeMap, path::Path};
//!
//! #[derive(Default, Clone)]
//! struct TextCodec;
//!
//! impl DocCodec for TextCodec {
//!     fn class(&self) -> ContentClass {
//!         ContentClass::Document
//!     }
//!
//!     fn render(&self, content: &str, _dir: &Path) -> Result<Option<String>, FolioError> {
//!         Ok(Some(format!("<pre>{content}</pre>")))
//!     }
//!
//!     fn embedded_metadata(&self, _content: &str) -> BTreeMap<String, String> {
//!         BTreeMap::new()
//!     }
//! }
//! CODECS.insert::<TextCodec>("txt".to_string());
//! ```

use once_cell::sync::Lazy;
use parking_lot::RwLock;
use std::{collections::BTreeMap, path::Path, result::Result, sync::Arc, time::Duration};

use crate::{error::FolioError, properties::ContentClass};

pub mod compiler;
pub mod diagnostic;
pub mod discover;
pub mod html;
pub mod md;
pub mod sidecar;

pub use compiler::SiteCompiler;
pub use diagnostic::{BuildDiagnostic, BuildReport};
pub use sidecar::meta_filename;

/// Folder-level sidecar, one per directory.
pub const FOLDER_NAME: &str = "_folder_.yml";
/// Hand-authored navigation menu, one per directory.
pub const NAVMENU_NAME: &str = "_navmenu_.yml";
/// Origin metadata captured for a hand-authored navigation menu.
pub const NAVMENU_META_NAME: &str = "_meta__navmenu_.yml.yml";
/// Auto-built menu written by the emit stage. Never read back.
pub const NAVMENU_AUTO_NAME: &str = "_navmenu_auto_.yml";
pub const META_PREFIX: &str = "_meta_";
pub const META_SUFFIX: &str = ".yml";

/// Global singleton codec map with builtin codecs (html, md, static assets)
pub static CODECS: Lazy<CodecMap> = Lazy::new(CodecMap::create);

/// One kind of content file.
pub trait DocCodec: Sync + Send {
    /// The class of record produced for files handled by this codec.
    fn class(&self) -> ContentClass;

    /// Render raw file content into publishable HTML. Static content returns `None`.
    ///
    /// `dir` is the directory holding the file on disk; codecs that pull in neighbouring files
    /// resolve them against it.
    fn render(&self, content: &str, dir: &Path) -> Result<Option<String>, FolioError>;

    /// Metadata carried inside the file itself (HTML `<title>`/`<meta>`, markdown header lines).
    /// Keys are lower-case.
    fn embedded_metadata(&self, content: &str) -> BTreeMap<String, String>;
}

#[derive(Debug, Default, Clone)]
pub struct StaticCodec;

impl DocCodec for StaticCodec {
    fn class(&self) -> ContentClass {
        ContentClass::Static
    }

    fn render(&self, _content: &str, _dir: &Path) -> Result<Option<String>, FolioError> {
        Ok(None)
    }

    fn embedded_metadata(&self, _content: &str) -> BTreeMap<String, String> {
        BTreeMap::new()
    }
}

// It is better to express the complexity of the singleton than hide it. Also the CodecMap methods
// are used to properly unwrap this structure.
#[allow(clippy::type_complexity)]
pub struct CodecMap(Arc<RwLock<Vec<(String, Arc<dyn DocCodec>)>>>);

impl Clone for CodecMap {
    fn clone(&self) -> Self {
        CodecMap(self.0.clone())
    }
}

impl CodecMap {
    pub fn create() -> Self {
        let html: Arc<dyn DocCodec> = Arc::new(html::HtmlCodec);
        let md: Arc<dyn DocCodec> = Arc::new(md::MdCodec);
        let static_codec: Arc<dyn DocCodec> = Arc::new(StaticCodec);
        let mut codecs = vec![
            ("html".to_string(), html.clone()),
            ("htm".to_string(), html),
        ];
        for ext in ["md", "markdown", "mkd", "mdown"] {
            codecs.push((ext.to_string(), md.clone()));
        }
        for ext in ["pdf", "png", "jpg", "jpeg", "gif", "svg"] {
            codecs.push((ext.to_string(), static_codec.clone()));
        }
        CodecMap(Arc::new(RwLock::new(codecs)))
    }

    pub fn insert<T: DocCodec + Clone + Default + Send + Sync + 'static>(&self, extension: String) {
        while self.0.is_locked() {
            tracing::info!("[CodecMap::insert] Waiting for write access to the codec map");
            std::thread::sleep(Duration::from_millis(100));
        }
        let extension = extension.to_lowercase();
        let mut writer = self.0.write();
        if let Some(entry) = writer.iter_mut().find(|(ext, _)| ext == &extension) {
            entry.1 = Arc::new(T::default());
        } else {
            writer.push((extension, Arc::new(T::default())));
        }
    }

    /// Look up the codec for a file extension (case-insensitive).
    pub fn get(&self, ext: &str) -> Option<Arc<dyn DocCodec>> {
        let ext = ext.to_lowercase();
        let reader = self.0.read();
        reader
            .iter()
            .find(|(codec_ext, _value)| &ext == codec_ext)
            .map(|(_codec_ext, value)| value.clone())
    }

    pub fn extensions(&self) -> Vec<String> {
        let reader = self.0.read();
        reader
            .iter()
            .map(|(codec_ext, _value)| codec_ext.clone())
            .collect::<Vec<String>>()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_log::test;

    #[test]
    fn test_builtin_codec_classes() {
        assert_eq!(CODECS.get("html").unwrap().class(), ContentClass::Document);
        assert_eq!(CODECS.get("MD").unwrap().class(), ContentClass::Document);
        assert_eq!(CODECS.get("pdf").unwrap().class(), ContentClass::Static);
        assert!(CODECS.get("yml").is_none());
        assert!(CODECS.get("docx").is_none());
    }

    #[test]
    fn test_static_codec_does_not_render() {
        let codec = StaticCodec;
        assert_eq!(codec.render("%PDF-1.4", Path::new("")).unwrap(), None);
        assert!(codec.embedded_metadata("%PDF-1.4").is_empty());
    }
}
