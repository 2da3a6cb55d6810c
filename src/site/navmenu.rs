//! Resolve menu descriptors into `(name, url, children)` trees.
//!
//! Hand-authored menus are resolved deepest directory first and registered under their directory,
//! so an `include` item can embed a deeper menu that is already final. Folder sections then get
//! their auto-built menus resolved against the same registry, and finally one menu is picked as
//! the site-wide `MENUITEMS`.
//!
//! Per-node problems never abort a build: [`MenuResolver::resolve_menu`] replaces the offending
//! node with a "not found" link that carries the slug and directory as query parameters, and
//! records a [`BuildDiagnostic::NavmenuFallback`].
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

use crate::{
    codec::diagnostic::BuildDiagnostic,
    config::SiteConfig,
    error::FolioError,
    paths::{href_for_location, is_external_link, slugify, LocationPath},
    properties::{MenuItem, MenuItemKind, NavMenuRecord, ResolvedMenuItem},
    site::sections::SectionMap,
    store::RecordStore,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MenuSource {
    HandAuthored,
    Auto,
}

/// The menu chosen as the site-wide `MENUITEMS`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TopMenu {
    pub dir: String,
    pub source: MenuSource,
    pub items: Vec<ResolvedMenuItem>,
    /// Unresolved descriptors of an auto-built menu, written out as `_navmenu_auto_.yml`.
    #[serde(skip)]
    pub descriptors: Vec<MenuItem>,
}

#[derive(Debug, Clone)]
pub struct MenuResolver {
    site_url: String,
    not_found_page: String,
    /// Hand-authored menus resolved so far, by directory
    resolved: BTreeMap<String, Vec<ResolvedMenuItem>>,
}

impl MenuResolver {
    pub fn new(site_url: impl Into<String>, not_found_page: impl Into<String>) -> MenuResolver {
        MenuResolver {
            site_url: site_url.into(),
            not_found_page: not_found_page.into(),
            resolved: BTreeMap::new(),
        }
    }

    pub fn from_config(config: &SiteConfig) -> MenuResolver {
        MenuResolver::new(&config.site_url, &config.not_found_page)
    }

    /// Menu previously registered for `dir`.
    pub fn resolved(&self, dir: &str) -> Option<&[ResolvedMenuItem]> {
        self.resolved.get(dir).map(Vec::as_slice)
    }

    pub fn register(&mut self, dir: impl Into<String>, items: Vec<ResolvedMenuItem>) {
        self.resolved.insert(dir.into(), items);
    }

    pub fn menus(&self) -> &BTreeMap<String, Vec<ResolvedMenuItem>> {
        &self.resolved
    }

    /// Qualify a link against the site URL; external links pass through.
    fn qualify(&self, link: &str) -> String {
        if is_external_link(link) {
            link.to_string()
        } else {
            href_for_location(&self.site_url, link)
        }
    }

    /// The diagnostic "not found" link for a node that has no usable URL.
    pub fn fallback_href(&self, slug: &str, dir: &str) -> String {
        let query = url::form_urlencoded::Serializer::new(String::new())
            .append_pair("context", "navmenu")
            .append_pair("slug", slug)
            .append_pair("dir", dir)
            .finish();
        self.qualify(&format!("{}?{}", self.not_found_page, query))
    }

    fn fallback(&self, item: &MenuItem, dir: &str, submenu: Vec<ResolvedMenuItem>) -> ResolvedMenuItem {
        ResolvedMenuItem {
            name: item.title.clone(),
            href: self.fallback_href(&slugify(&item.title), dir),
            submenu,
            fallback: true,
        }
    }

    /// Resolve one descriptor in directory `dir`, failing on the first ill-formed node.
    pub fn resolve_item(&self, item: &MenuItem, dir: &str) -> Result<ResolvedMenuItem, FolioError> {
        self.resolve_node(item, dir, None)
    }

    /// Resolve a whole menu, substituting fallback links for ill-formed nodes.
    pub fn resolve_menu(
        &self,
        items: &[MenuItem],
        dir: &str,
        diagnostics: &mut Vec<BuildDiagnostic>,
    ) -> Vec<ResolvedMenuItem> {
        let mut menu = Vec::with_capacity(items.len());
        for item in items {
            let resolved = match self.resolve_node(item, dir, Some(&mut *diagnostics)) {
                Ok(resolved) => resolved,
                Err(e) => {
                    diagnostics.push(BuildDiagnostic::navmenu_fallback(
                        dir,
                        slugify(&item.title),
                        e.to_string(),
                    ));
                    self.fallback(item, dir, Vec::new())
                }
            };
            menu.push(resolved);
        }
        menu
    }

    /// With `diagnostics` present, recoverable errors of this node and its children become
    /// fallbacks; without, they propagate.
    fn resolve_node(
        &self,
        item: &MenuItem,
        dir: &str,
        mut diagnostics: Option<&mut Vec<BuildDiagnostic>>,
    ) -> Result<ResolvedMenuItem, FolioError> {
        match self.resolve_links(item, dir, diagnostics.as_deref_mut()) {
            Ok(resolved) => {
                if resolved.fallback {
                    if let Some(diagnostics) = diagnostics {
                        diagnostics.push(BuildDiagnostic::navmenu_fallback(
                            dir,
                            slugify(&item.title),
                            "no link could be determined",
                        ));
                    }
                }
                Ok(resolved)
            }
            Err(e) if e.is_recoverable() => match diagnostics {
                Some(diagnostics) => {
                    tracing::warn!("[MenuResolver] {}: {}", dir, e);
                    diagnostics.push(BuildDiagnostic::navmenu_fallback(
                        dir,
                        slugify(&item.title),
                        e.to_string(),
                    ));
                    Ok(self.fallback(item, dir, Vec::new()))
                }
                None => Err(e),
            },
            Err(e) => Err(e),
        }
    }

    fn resolve_links(
        &self,
        item: &MenuItem,
        dir: &str,
        mut diagnostics: Option<&mut Vec<BuildDiagnostic>>,
    ) -> Result<ResolvedMenuItem, FolioError> {
        let slug = slugify(&item.title);
        let here = LocationPath::new(dir);
        let mut link = item.href.clone().filter(|href| !href.trim().is_empty());
        let mut submenu = Vec::new();

        match (item.kind, item.submenu.as_ref()) {
            (MenuItemKind::Include, _) => {
                let location = here.join(&slug);
                let included = self.resolved.get(&location).ok_or_else(|| {
                    FolioError::IllformedNavmenu(format!(
                        "cannot find included navmenu {location}"
                    ))
                })?;
                submenu = included.clone();
            }
            (MenuItemKind::Section | MenuItemKind::Folder, Some(children)) => {
                let subdir = here.join(&slug);
                for child in children {
                    submenu.push(self.resolve_node(child, &subdir, diagnostics.as_deref_mut())?);
                }
            }
            (kind, Some(_)) => {
                return Err(FolioError::IllformedNavmenu(format!(
                    "submenu found for '{}' of type {kind}",
                    item.title
                )))
            }
            (MenuItemKind::Section | MenuItemKind::Folder, None) if link.is_none() => {
                return Err(FolioError::IllformedNavmenu(format!(
                    "missing submenu for '{}' of type {}",
                    item.title, item.kind
                )))
            }
            (MenuItemKind::LinkLocal | MenuItemKind::LinkExternal, None) if link.is_none() => {
                return Err(FolioError::IllformedNavmenu(format!(
                    "link missing for '{}' of type {}",
                    item.title, item.kind
                )))
            }
            (MenuItemKind::Doc, None) if link.is_none() => {
                link = Some(format!("{}.html", here.join(&slug)));
            }
            (MenuItemKind::Pdf, None) if link.is_none() => {
                link = Some(format!("{}.pdf", here.join(&slug)));
            }
            (MenuItemKind::Unknown, None) => {
                return Err(FolioError::IllformedNavmenu(format!(
                    "unknown menu item type for '{}'",
                    item.title
                )))
            }
            _ => {}
        }

        // Links set on this node are qualified here; links adopted from children already are.
        let href = match link {
            Some(link) => Some(self.qualify(&link)),
            None => submenu
                .iter()
                .find(|child| !child.fallback)
                .map(|child| child.href.clone()),
        };
        Ok(match href {
            Some(href) => ResolvedMenuItem {
                name: item.title.clone(),
                href,
                submenu,
                fallback: false,
            },
            None => self.fallback(item, dir, submenu),
        })
    }

    /// Resolve every hand-authored menu in `store`, deepest directory first, registering each
    /// under its directory. Menus below an excluded directory are skipped.
    pub fn resolve_navmenus(
        &mut self,
        store: &RecordStore,
        excluded: &BTreeSet<String>,
        diagnostics: &mut Vec<BuildDiagnostic>,
    ) {
        let mut menus: Vec<&NavMenuRecord> = store
            .navmenus()
            .filter(|menu| {
                let path = LocationPath::new(&menu.meta.location);
                !excluded.iter().any(|dir| path.is_within(dir))
            })
            .collect();
        menus.sort_by(|a, b| {
            LocationPath::new(b.dir())
                .depth()
                .cmp(&LocationPath::new(a.dir()).depth())
                .then_with(|| a.meta.location.cmp(&b.meta.location))
        });
        for menu in menus {
            let items = self.resolve_menu(&menu.navmenu, menu.dir(), diagnostics);
            tracing::debug!(
                "[MenuResolver] resolved {} item(s) for {}",
                items.len(),
                menu.dir()
            );
            self.register(menu.dir(), items);
        }
    }

    /// Resolve the auto-built menu of every section, following the order sections were built in.
    pub fn resolve_sections(
        &self,
        sections: &mut SectionMap,
        order: &[String],
        diagnostics: &mut Vec<BuildDiagnostic>,
    ) {
        for dir in order {
            if let Some(section) = sections.get_mut(dir) {
                section.navmenu = self.resolve_menu(&section.menu_items, dir, diagnostics);
            }
        }
    }

    /// Pick the site-wide menu: a hand-authored menu at a page root if there is one, else (with
    /// `auto_menu`) the auto-built menu of the shallowest section under a page root. Hand-authored
    /// menus deeper in the tree only serve as include targets.
    pub fn select_top_menu(
        &self,
        sections: &SectionMap,
        auto_menu: bool,
        page_roots: &[String],
    ) -> Option<TopMenu> {
        let by_depth = |a: &&String, b: &&String| {
            LocationPath::new(a.as_str())
                .depth()
                .cmp(&LocationPath::new(b.as_str()).depth())
                .then_with(|| a.cmp(b))
        };
        let is_root = |dir: &str| {
            page_roots.is_empty()
                || page_roots
                    .iter()
                    .any(|root| root.trim_end_matches('/') == dir)
        };
        if let Some(dir) = self
            .resolved
            .keys()
            .filter(|dir| is_root(dir.as_str()))
            .min_by(by_depth)
        {
            return Some(TopMenu {
                dir: dir.clone(),
                source: MenuSource::HandAuthored,
                items: self.resolved[dir].clone(),
                descriptors: Vec::new(),
            });
        }
        if !auto_menu {
            return None;
        }
        let under_root = |dir: &str| {
            page_roots.is_empty()
                || page_roots.iter().any(|root| {
                    let root = root.trim_end_matches('/');
                    dir == root || LocationPath::new(dir).is_within(root)
                })
        };
        sections
            .iter()
            .filter(|(dir, section)| under_root(dir.as_str()) && !section.navmenu.is_empty())
            .map(|(dir, _)| dir)
            .min_by(by_depth)
            .map(|dir| {
                let section = &sections[dir];
                TopMenu {
                    dir: dir.clone(),
                    source: MenuSource::Auto,
                    items: section.navmenu.clone(),
                    descriptors: section.menu_items.clone(),
                }
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_log::test;

    fn resolver() -> MenuResolver {
        MenuResolver::new("http://127.0.0.1:8088/ksd", "404.html")
    }

    fn link(title: &str, href: &str) -> MenuItem {
        MenuItem::new(title, MenuItemKind::LinkLocal).with_href(href)
    }

    #[test]
    fn test_explicit_links() {
        let r = resolver();
        let local = r.resolve_item(&link("Home", "/index.html"), "pages").unwrap();
        assert_eq!(local.href, "http://127.0.0.1:8088/ksd/index.html");

        let external = MenuItem::new("Board", MenuItemKind::LinkExternal)
            .with_href("https://example.org/board");
        let external = r.resolve_item(&external, "pages").unwrap();
        assert_eq!(external.href, "https://example.org/board");

        let mail = r
            .resolve_item(&link("Mail", "mailto:office@example.org"), "pages")
            .unwrap();
        assert_eq!(mail.href, "mailto:office@example.org");
    }

    #[test]
    fn test_doc_and_pdf_links_are_synthesized() {
        let r = MenuResolver::new("", "404.html");
        let doc = r
            .resolve_item(&MenuItem::new("Annual Report", MenuItemKind::Doc), "pages/district")
            .unwrap();
        assert_eq!(doc.href, "pages/district/annual-report.html");
        let pdf = r
            .resolve_item(&MenuItem::new("Budget", MenuItemKind::Pdf), "pages/district")
            .unwrap();
        assert_eq!(pdf.href, "pages/district/budget.pdf");
    }

    #[test]
    fn test_section_adopts_first_child_link() {
        let r = MenuResolver::new("", "404.html");
        let section = MenuItem::new("Staff", MenuItemKind::Section).with_submenu(vec![
            MenuItem::new("Directory", MenuItemKind::Doc),
            link("Jobs", "/jobs.html"),
        ]);
        let resolved = r.resolve_item(&section, "pages").unwrap();
        assert_eq!(resolved.href, "pages/staff/directory.html");
        assert_eq!(resolved.submenu.len(), 2);
        assert_eq!(resolved.submenu[1].href, "jobs.html");
    }

    #[test]
    fn test_missing_href_is_strict_error() {
        let r = resolver();
        let err = r
            .resolve_item(&MenuItem::new("Home", MenuItemKind::LinkLocal), "pages")
            .unwrap_err();
        assert!(matches!(err, FolioError::IllformedNavmenu(_)));
    }

    #[test]
    fn test_missing_href_degrades_to_fallback() {
        let r = resolver();
        let mut diagnostics = Vec::new();
        let menu = r.resolve_menu(
            &[
                MenuItem::new("Home Page", MenuItemKind::LinkLocal),
                link("About", "about.html"),
            ],
            "pages/district",
            &mut diagnostics,
        );
        assert_eq!(menu.len(), 2);
        assert!(menu[0].fallback);
        assert_eq!(
            menu[0].href,
            "http://127.0.0.1:8088/ksd/404.html?context=navmenu&slug=home-page&dir=pages%2Fdistrict"
        );
        assert!(!menu[1].fallback);
        assert_eq!(diagnostics.len(), 1);
        assert!(diagnostics[0].is_navmenu_fallback());
    }

    #[test]
    fn test_bad_child_only_affects_that_child() {
        let r = MenuResolver::new("", "404.html");
        let mut diagnostics = Vec::new();
        let section = MenuItem::new("Staff", MenuItemKind::Section).with_submenu(vec![
            MenuItem::new("Broken", MenuItemKind::LinkExternal),
            link("Jobs", "/jobs.html"),
        ]);
        let menu = r.resolve_menu(&[section], "pages", &mut diagnostics);
        assert!(!menu[0].fallback);
        assert_eq!(menu[0].href, "jobs.html");
        assert!(menu[0].submenu[0].fallback);
        assert_eq!(diagnostics.len(), 1);
    }

    #[test]
    fn test_include_uses_registered_menu() {
        let mut r = MenuResolver::new("", "404.html");
        let mut diagnostics = Vec::new();
        let staff = r.resolve_menu(&[link("Directory", "/staff/dir.html")], "/district/staff", &mut diagnostics);
        r.register("/district/staff", staff);

        let include = r
            .resolve_item(&MenuItem::new("Staff", MenuItemKind::Include), "/district")
            .unwrap();
        assert_eq!(include.href, "staff/dir.html");
        assert_eq!(include.submenu.len(), 1);
        assert!(diagnostics.is_empty());
    }

    #[test]
    fn test_include_of_unknown_menu_fails() {
        let r = resolver();
        let err = r
            .resolve_item(&MenuItem::new("Staff", MenuItemKind::Include), "/district")
            .unwrap_err();
        assert_eq!(
            err,
            FolioError::IllformedNavmenu("cannot find included navmenu /district/staff".to_string())
        );
    }

    #[test]
    fn test_submenu_on_link_is_rejected() {
        let r = resolver();
        let item = link("Home", "index.html").with_submenu(vec![link("a", "a.html")]);
        assert!(r.resolve_item(&item, "pages").is_err());
    }

    #[test]
    fn test_unknown_kind_falls_back() {
        let r = resolver();
        let mut diagnostics = Vec::new();
        let menu = r.resolve_menu(
            &[MenuItem::new("Carousel", MenuItemKind::Unknown)],
            "pages",
            &mut diagnostics,
        );
        assert!(menu[0].fallback);
        assert_eq!(diagnostics.len(), 1);
    }

    #[test]
    fn test_well_formed_tree_has_no_fallbacks() {
        let r = resolver();
        let mut diagnostics = Vec::new();
        let tree = vec![
            link("Home", "index.html"),
            MenuItem::new("District", MenuItemKind::Section).with_submenu(vec![
                link("About", "district/about.html"),
                MenuItem::new("Board", MenuItemKind::Folder)
                    .with_submenu(vec![MenuItem::new("Minutes", MenuItemKind::Pdf)]),
            ]),
        ];
        let menu = r.resolve_menu(&tree, "pages", &mut diagnostics);
        assert!(diagnostics.is_empty());
        assert!(menu.iter().all(|item| !item.fallback));
        assert_eq!(
            menu[1].submenu[1].submenu[0].href,
            "http://127.0.0.1:8088/ksd/pages/district/board/minutes.pdf"
        );
    }

    #[test]
    fn test_only_page_root_menus_are_top_level() {
        let mut r = resolver();
        let mut diagnostics = Vec::new();
        let staff = r.resolve_menu(&[link("Jobs", "jobs.html")], "pages/staff", &mut diagnostics);
        r.register("pages/staff", staff);

        let roots = vec!["pages".to_string()];
        assert!(r.select_top_menu(&SectionMap::new(), false, &roots).is_none());

        let home = r.resolve_menu(&[link("Home", "index.html")], "pages", &mut diagnostics);
        r.register("pages", home);
        let top = r.select_top_menu(&SectionMap::new(), false, &roots).unwrap();
        assert_eq!(top.dir, "pages");
        assert_eq!(top.source, MenuSource::HandAuthored);
        assert_eq!(top.items[0].name, "Home");
    }
}
