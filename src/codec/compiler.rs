use serde::Serialize;
use std::{
    collections::{BTreeMap, BTreeSet},
    fs,
    path::{Path, PathBuf},
};

use crate::{
    codec::{
        diagnostic::{BuildDiagnostic, BuildReport},
        discover::discover,
        NAVMENU_AUTO_NAME,
    },
    config::SiteConfig,
    error::FolioError,
    paths::{string_to_os_path, LocationPath},
    properties::{ContentClass, ResolvedMenuItem},
    site::{
        index_pages::{assign_sections, synthesize_indices, AutoMenuFile},
        resolve_sections, IndexPage, LinkRewriter, MenuResolver, MenuSource, PageContext,
        PageTemplate, SectionMap, TopMenu,
    },
    store::RecordStore,
};

/// Name of the rendering context written by [`SiteCompiler::emit`].
pub const SITE_CONTEXT_NAME: &str = "site.json";

/// Everything the rendering collaborator needs, as written to `site.json`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SiteContext {
    #[serde(rename = "MENUITEMS")]
    pub menu_items: Vec<ResolvedMenuItem>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_menu_dir: Option<String>,
    pub navmenus: BTreeMap<String, Vec<ResolvedMenuItem>>,
    pub sections: SectionMap,
    pub pages: BTreeMap<String, PageContext>,
    pub index_pages: Vec<IndexPage>,
}

/// Drives the stages of a site build over one [`RecordStore`].
///
/// ## Stages
///
/// 1. **ingest** - walk the content root, pair content with sidecars, fill the store
/// 2. **resolve sections** - contents, subtopics and menu descriptors per folder, deepest first
/// 3. **resolve menus** - hand-authored menus deepest first, then section menus, then `MENUITEMS`
/// 4. **rewrite links** - replace redirect-wrapped document links in rendered content
/// 5. **synthesize indices** - stand-in `index.html` for folders without one
/// 6. **emit** - write pages, index pages and the rendering context
///
/// [`SiteCompiler::build`] runs stages 1-5; [`SiteCompiler::emit`] is separate so callers can
/// inspect the resolved site first. Resolution stages only read the store and the ingested
/// content, so running them again produces the same output and the same report.
///
/// ## Failure Model
///
/// Items that cannot be read, and everything below a malformed folder, are reported in the
/// [`BuildReport`] and left out of every later stage: they get no page context, are never link
/// targets and are not written. Menu nodes that cannot be resolved degrade to a "not found" link. Only problems with the content root, the
/// configuration, or the output directory return `Err`.
pub struct SiteCompiler {
    config: SiteConfig,
    content_root: Option<PathBuf>,
    store: RecordStore,
    /// Rendered HTML by document location, as ingested
    source: BTreeMap<String, String>,
    /// `source` after link rewriting
    rendered: BTreeMap<String, String>,
    ingest_diagnostics: Vec<BuildDiagnostic>,
    sections: SectionMap,
    /// Section directories, deepest first
    section_order: Vec<String>,
    excluded_dirs: BTreeSet<String>,
    /// Record locations excluded by section resolution
    failed: BTreeSet<String>,
    resolver: MenuResolver,
    top_menu: Option<TopMenu>,
    pages: BTreeMap<String, PageContext>,
    index_pages: Vec<IndexPage>,
    report: BuildReport,
}

impl SiteCompiler {
    pub fn new(config: SiteConfig) -> Self {
        Self::from_store(RecordStore::new(), config)
    }

    /// Create a compiler over an already populated store, skipping ingest.
    pub fn from_store(store: RecordStore, config: SiteConfig) -> Self {
        let resolver = MenuResolver::from_config(&config);
        Self {
            config,
            content_root: None,
            store,
            source: BTreeMap::new(),
            rendered: BTreeMap::new(),
            ingest_diagnostics: Vec::new(),
            sections: SectionMap::new(),
            section_order: Vec::new(),
            excluded_dirs: BTreeSet::new(),
            failed: BTreeSet::new(),
            resolver,
            top_menu: None,
            pages: BTreeMap::new(),
            index_pages: Vec::new(),
            report: BuildReport::default(),
        }
    }

    /// Supply rendered document content for a store built in memory.
    pub fn with_rendered(mut self, rendered: BTreeMap<String, String>) -> Self {
        self.rendered = rendered.clone();
        self.source = rendered;
        self
    }

    pub fn config(&self) -> &SiteConfig {
        &self.config
    }

    pub fn store(&self) -> &RecordStore {
        &self.store
    }

    pub fn rendered(&self) -> &BTreeMap<String, String> {
        &self.rendered
    }

    pub fn sections(&self) -> &SectionMap {
        &self.sections
    }

    /// Section directories in the order they were resolved.
    pub fn section_order(&self) -> &[String] {
        &self.section_order
    }

    pub fn top_menu(&self) -> Option<&TopMenu> {
        self.top_menu.as_ref()
    }

    pub fn index_pages(&self) -> &[IndexPage] {
        &self.index_pages
    }

    pub fn pages(&self) -> &BTreeMap<String, PageContext> {
        &self.pages
    }

    pub fn report(&self) -> &BuildReport {
        &self.report
    }

    /// Record locations left out of the site by the last section pass.
    pub fn failed(&self) -> &BTreeSet<String> {
        &self.failed
    }

    /// Load every record under `content_root`, replacing the current store.
    pub fn ingest<P: AsRef<Path>>(&mut self, content_root: P) -> Result<(), FolioError> {
        let content_root = content_root.as_ref();
        tracing::info!("[SiteCompiler] ingesting {:?}", content_root);
        let discovery = discover(content_root, &self.config)?;
        self.store = discovery.store;
        self.rendered = discovery.rendered.clone();
        self.source = discovery.rendered;
        self.ingest_diagnostics = discovery.diagnostics;
        self.report = BuildReport::default();
        self.report.extend(self.ingest_diagnostics.iter().cloned());
        self.content_root = Some(content_root.to_path_buf());
        Ok(())
    }

    pub fn resolve_sections(&mut self) {
        let set = resolve_sections(&self.store);
        tracing::info!("[SiteCompiler] resolved {} section(s)", set.sections.len());
        self.sections = set.sections;
        self.section_order = set.order;
        self.excluded_dirs = set.excluded_dirs;
        self.failed = set.failed;
        self.report.extend(set.diagnostics);
        self.pages = assign_sections(&self.store, &self.sections, &self.failed);
    }

    pub fn resolve_menus(&mut self) {
        let mut diagnostics = Vec::new();
        let mut resolver = MenuResolver::from_config(&self.config);
        resolver.resolve_navmenus(&self.store, &self.excluded_dirs, &mut diagnostics);
        resolver.resolve_sections(&mut self.sections, &self.section_order, &mut diagnostics);
        self.top_menu =
            resolver.select_top_menu(&self.sections, self.config.auto_menu, &self.config.page_paths);
        match self.top_menu.as_ref() {
            Some(top) => tracing::info!(
                "[SiteCompiler] top-level menu from {} ({:?}, {} item(s))",
                top.dir,
                top.source,
                top.items.len()
            ),
            None => tracing::info!("[SiteCompiler] no top-level menu"),
        }
        self.resolver = resolver;
        self.report.extend(diagnostics);
    }

    /// Rewrite cross-document links in every ingested document. Returns the substitution count.
    pub fn rewrite_links(&mut self) -> usize {
        let rewriter =
            LinkRewriter::new(&self.store, &self.config.site_url).excluding(&self.failed);
        let mut rendered = self.source.clone();
        let substitutions = rewriter.rewrite_all(&mut rendered);
        tracing::info!("[SiteCompiler] {} link substitution(s)", substitutions);
        self.rendered = rendered;
        self.report.substitutions = substitutions;
        substitutions
    }

    pub fn synthesize_indices(&mut self) {
        self.index_pages =
            synthesize_indices(&self.sections, &self.section_order, &self.config.site_url);
        tracing::info!(
            "[SiteCompiler] synthesized {} index page(s)",
            self.index_pages.len()
        );
    }

    /// Run every resolution stage over a store that is already populated. The report is rebuilt
    /// from the ingest diagnostics each time.
    pub fn resolve(&mut self) -> &BuildReport {
        self.report = BuildReport::default();
        self.report.extend(self.ingest_diagnostics.iter().cloned());
        self.resolve_sections();
        self.resolve_menus();
        self.rewrite_links();
        self.synthesize_indices();
        &self.report
    }

    /// Ingest `content_root` and run every resolution stage.
    pub fn build<P: AsRef<Path>>(&mut self, content_root: P) -> Result<&BuildReport, FolioError> {
        self.ingest(content_root)?;
        Ok(self.resolve())
    }

    pub fn context(&self) -> SiteContext {
        SiteContext {
            menu_items: self
                .top_menu
                .as_ref()
                .map(|top| top.items.clone())
                .unwrap_or_default(),
            top_menu_dir: self.top_menu.as_ref().map(|top| top.dir.clone()),
            navmenus: self.resolver.menus().clone(),
            sections: self.sections.clone(),
            pages: self.pages.clone(),
            index_pages: self.index_pages.clone(),
        }
    }

    /// Write the resolved site below `output_dir`.
    pub fn emit<P: AsRef<Path>>(&self, output_dir: P) -> Result<(), FolioError> {
        let output_dir = output_dir.as_ref();
        fs::create_dir_all(output_dir)?;

        for item in self
            .store
            .contents()
            .filter(|item| !self.failed.contains(&item.meta.location))
        {
            match item.class {
                ContentClass::Document => {
                    if let Some(html) = self.rendered.get(&item.meta.location) {
                        write_file(output_dir, &item.url, html)?;
                    }
                }
                ContentClass::Static => {
                    if let Some(content_root) = self.content_root.as_ref() {
                        let to = output_dir.join(string_to_os_path(&item.url));
                        if let Some(parent) = to.parent() {
                            fs::create_dir_all(parent)?;
                        }
                        fs::copy(content_root.join(string_to_os_path(&item.meta.location)), to)?;
                    }
                }
                _ => {}
            }
        }

        for page in self.index_pages.iter() {
            write_file(output_dir, &page.location, &index_page_html(page))?;
        }

        if let Some(top) = self.top_menu.as_ref() {
            if top.source == MenuSource::Auto {
                let location = LocationPath::new(&top.dir).join(NAVMENU_AUTO_NAME);
                let yaml = serde_yaml::to_string(&AutoMenuFile {
                    navmenu: &top.descriptors,
                })?;
                write_file(output_dir, &location, &format!("---\n{yaml}"))?;
            }
        }

        let context = serde_json::to_string_pretty(&self.context())?;
        write_file(output_dir, SITE_CONTEXT_NAME, &context)?;
        tracing::info!("[SiteCompiler] wrote site to {:?}", output_dir);
        Ok(())
    }
}

fn write_file(output_dir: &Path, location: &str, content: &str) -> Result<(), FolioError> {
    let path = output_dir.join(string_to_os_path(location.trim_start_matches('/')));
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(&path, content)?;
    tracing::debug!("[SiteCompiler] wrote {:?}", path);
    Ok(())
}

fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

fn menu_html(items: &[ResolvedMenuItem], html: &mut String) {
    if items.is_empty() {
        return;
    }
    html.push_str("<ul>\n");
    for item in items {
        html.push_str(&format!(
            "<li><a href=\"{}\">{}</a>",
            escape_html(&item.href),
            escape_html(&item.name)
        ));
        menu_html(&item.submenu, html);
        html.push_str("</li>\n");
    }
    html.push_str("</ul>\n");
}

/// Minimal standalone HTML for a synthesized index page.
pub fn index_page_html(page: &IndexPage) -> String {
    let title = escape_html(&page.title);
    let mut html = String::from("<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n");
    html.push_str(&format!("<title>{title}</title>\n"));
    html.push_str(&format!(
        "<meta name=\"template\" content=\"{}\">\n",
        page.template.name()
    ));
    if let (PageTemplate::Alias, Some(redirect)) = (page.template, page.redirect_url.as_ref()) {
        html.push_str(&format!(
            "<meta http-equiv=\"refresh\" content=\"0; url={}\">\n",
            escape_html(redirect)
        ));
    }
    html.push_str("</head>\n<body>\n");
    html.push_str(&format!("<h1>{title}</h1>\n"));
    if let Some(content) = page.content.as_ref() {
        html.push_str(content);
        html.push('\n');
    }
    menu_html(&page.submenu, &mut html);
    html.push_str("</body>\n</html>\n");
    html
}
