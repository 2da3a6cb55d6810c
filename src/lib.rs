//! # folio-core
//!
//! A Rust library that turns a mirrored cloud-drive document tree into a navigable static site.
//!
//! ## Overview
//!
//! A drive mirror is a directory tree where every downloaded file sits next to a YAML *sidecar*
//! holding the metadata the drive knew about it (title, origin id, priority, author, ...), and
//! every directory carries a `_folder_.yml` record of its own. folio-core reads such a tree into
//! a [`store::RecordStore`] and resolves the structure a site needs from it:
//!
//! - **Sections**: per-folder, ordered tables of contents and subtopics
//! - **Navigation menus**: hand-authored or auto-built menu trees with site-qualified URLs
//! - **Cross-references**: links between drive documents rewritten to their mirrored pages
//! - **Index pages**: stand-in `index.html` pages for folders that lack one
//!
//! ### Key Features
//!
//! - **Deterministic**: explicit sort keys and a fixed deepest-first traversal; re-running a pass
//!   over an unchanged store gives identical output
//! - **Validated at the boundary**: sidecars are checked once, when read, into closed record types
//! - **Partial-failure tolerant**: bad items are reported and excluded, bad menu nodes degrade to a
//!   diagnostic "not found" link, and the build carries on
//! - **Extensible codecs**: register new content types through the [`codec::DocCodec`] trait
//!
//! ## Architecture
//!
//! - **[`store`]**: the record index, by location and by origin id
//! - **[`codec`]**: sidecar parsing, content codecs, tree discovery, and the [`codec::SiteCompiler`]
//!   pipeline driver
//! - **[`site`]**: the resolution passes (sections, menus, links, index pages)
//! - **[`properties`]**: records, menu items, table-of-contents entries
//! - **[`paths`]**: location strings, slugs and URL qualification
//! - **[`config`]**: `folio.toml` site configuration
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use folio_core::{codec::SiteCompiler, config::SiteConfig};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = SiteConfig::load("./drive/folio.toml")?;
//!     let mut compiler = SiteCompiler::new(config);
//!
//!     // ingest -> sections -> menus -> links -> index pages
//!     let report = compiler.build("./drive")?;
//!     for diagnostic in report.diagnostics.iter() {
//!         println!("{diagnostic}");
//!     }
//!
//!     compiler.emit("./output")?;
//!     Ok(())
//! }
//! ```
//!
//! ### Resolving an In-Memory Store
//!
//! The resolution passes do not need a filesystem:
//!
//! ```rust
//! use folio_core::{
//!     properties::{FolderRecord, Record, RecordMeta},
//!     site::resolve_sections,
//!     store::RecordStore,
//! };
//!
//! let mut store = RecordStore::new();
//! store.put(Record::Folder(FolderRecord::new(RecordMeta::new("/district/_folder_.yml", "District"))))?;
//! store.put(Record::Folder(FolderRecord::new(RecordMeta::new("/district/staff/_folder_.yml", "Staff"))))?;
//!
//! let set = resolve_sections(&store);
//! assert_eq!(set.sections["/district"].subtopics[0].location, "/district/staff");
//! assert!(set.sections["/district/staff"].contents.is_empty());
//! # Ok::<(), folio_core::FolioError>(())
//! ```
//!
//! ## Features
//!
//! - **default**: the library
//! - **bin**: the `folio` command-line tool

pub mod codec;
pub mod config;
pub mod error;
pub mod paths;
pub mod properties;
pub mod site;
pub mod store;
#[cfg(test)]
mod tests;

pub use error::*;
