//! Site structure resolution over a populated [`RecordStore`](crate::store::RecordStore).
//!
//! - [`sections`] - folder hierarchy, tables of contents and auto-built menu descriptors
//! - [`navmenu`] - menu descriptor resolution and top-level menu selection
//! - [`links`] - rewriting of links between mirrored documents
//! - [`index_pages`] - stand-in index pages and page-to-section assignment
//!
//! None of these passes mutate the store, so re-running them over the same store gives the same
//! output.
pub mod index_pages;
pub mod links;
pub mod navmenu;
pub mod sections;

pub use index_pages::{IndexPage, PageContext, PageTemplate};
pub use links::{LinkRewriter, Rewrite};
pub use navmenu::{MenuResolver, MenuSource, TopMenu};
pub use sections::{resolve_sections, Section, SectionMap, SectionSet};
