use super::helpers::*;
use crate::{
    codec::SiteCompiler,
    config::SiteConfig,
    error::FolioError,
    properties::{ContentClass, MenuItem, MenuItemKind},
    site::{
        index_pages::{synthesize_index, NO_CONTENT},
        resolve_sections, LinkRewriter, MenuResolver, MenuSource, PageTemplate,
    },
};
use std::collections::BTreeMap;
use test_log::test;

#[test]
fn test_district_with_sidecar_only_about() {
    let store = district_store(sidecar_only("/district/about.md", "About", 1));
    let set = resolve_sections(&store);

    let district = &set.sections["/district"];
    assert!(district.contents.is_empty());
    assert_eq!(district.subtopics.len(), 1);
    assert_eq!(district.subtopics[0].title, "Staff");
    assert_eq!(district.subtopics[0].location, "/district/staff");

    let staff = &set.sections["/district/staff"];
    assert!(staff.contents.is_empty());
    assert!(staff.subtopics.is_empty());

    let placeholder = synthesize_index(staff, "").unwrap();
    assert_eq!(placeholder.template, PageTemplate::Section);
    assert_eq!(placeholder.content.as_deref(), Some(NO_CONTENT));
    assert_eq!(placeholder.location, "/district/staff/index.html");
}

#[test]
fn test_district_with_rendered_about() {
    let store = district_store(document("/district/about.md", "About", 1));
    let set = resolve_sections(&store);

    let district = &set.sections["/district"];
    assert_eq!(district.contents.len(), 1);
    assert_eq!(district.contents[0].location, "/district/about.html");
    assert_eq!(district.contents[0].sorted_title, "001]About");
    assert_eq!(district.contents[0].class, ContentClass::Document);

    let index = synthesize_index(district, "").unwrap();
    assert!(index.is_alias());
    assert_eq!(index.redirect_url.as_deref(), Some("district/about.html"));
}

#[test]
fn test_include_without_resolved_menu_is_illformed() {
    let store = district_store(document("/district/about.md", "About", 1));
    let mut resolver = MenuResolver::new("", "404.html");
    let mut diagnostics = Vec::new();
    resolver.resolve_navmenus(&store, &store.excluded_dirs(), &mut diagnostics);
    assert!(resolver.resolved("/district/staff").is_none());

    let err = resolver
        .resolve_item(&MenuItem::new("Staff", MenuItemKind::Include), "/district")
        .unwrap_err();
    assert!(matches!(err, FolioError::IllformedNavmenu(_)));
}

#[test]
fn test_deepest_menus_resolve_before_their_includers() {
    let store = store_of(vec![
        folder("/district", "District"),
        folder("/district/staff", "Staff"),
        navmenu(
            "/district",
            vec![
                MenuItem::new("Home", MenuItemKind::LinkLocal).with_href("/index.html"),
                MenuItem::new("Staff", MenuItemKind::Include),
            ],
        ),
        navmenu(
            "/district/staff",
            vec![MenuItem::new("Directory", MenuItemKind::Doc)],
        ),
    ]);
    let mut resolver = MenuResolver::new("http://example.org", "404.html");
    let mut diagnostics = Vec::new();
    resolver.resolve_navmenus(&store, &store.excluded_dirs(), &mut diagnostics);
    assert!(diagnostics.is_empty(), "{diagnostics:?}");

    let district = resolver.resolved("/district").unwrap();
    assert_eq!(district[1].name, "Staff");
    assert_eq!(
        district[1].href,
        "http://example.org/district/staff/directory.html"
    );
    assert_eq!(district[1].submenu.len(), 1);
}

#[test]
fn test_sections_resolve_deepest_first() {
    let store = store_of(vec![
        folder("/a", "A"),
        folder("/a/b", "B"),
        folder("/a/b/c", "C"),
        folder("/z", "Z"),
        folder("/z/y", "Y"),
    ]);
    let set = resolve_sections(&store);
    let position = |dir: &str| set.order.iter().position(|d| d == dir).unwrap();
    for (ancestor, descendant) in [("/a", "/a/b"), ("/a/b", "/a/b/c"), ("/a", "/a/b/c"), ("/z", "/z/y")] {
        assert!(position(descendant) < position(ancestor));
    }
}

#[test]
fn test_resolution_is_idempotent() {
    let store = store_of(vec![
        folder("/district", "District"),
        document("/district/b.html", "Beta", 5),
        document("/district/a.html", "Alpha", 5),
        folder("/district/staff", "Staff"),
        folder("/district/staff/jobs", "Jobs"),
        navmenu(
            "/district/staff",
            vec![MenuItem::new("Openings", MenuItemKind::Doc)],
        ),
    ]);
    let config = SiteConfig {
        auto_menu: true,
        page_paths: vec!["/district".to_string()],
        ..SiteConfig::default()
    };
    let mut compiler = SiteCompiler::from_store(store, config);
    let first_report = compiler.resolve().clone();
    let first = serde_json::to_string(&compiler.context()).unwrap();
    let second_report = compiler.resolve().clone();
    let second = serde_json::to_string(&compiler.context()).unwrap();
    assert_eq!(first, second);
    assert_eq!(first_report, second_report);

    // the hand-authored menu at /district/staff is below the page root, so the auto-built
    // menu of /district is the top-level one and includes it
    let top = compiler.top_menu().unwrap();
    assert_eq!(top.dir, "/district");
    assert_eq!(top.source, MenuSource::Auto);
    assert_eq!(top.items[0].name, "Staff");
    assert_eq!(top.items[0].submenu.len(), 1);
}

#[test]
fn test_sidecar_only_records_are_not_link_targets() {
    // the sidecar-only record is discovered first
    let store = store_of(vec![
        with_source_id(sidecar_only("/old/plan.html", "Plan", 1), "1abcDEF"),
        with_source_id(document("/district/plan.md", "Plan", 1), "1abcDEF"),
    ]);
    let rewriter = LinkRewriter::new(&store, "");
    assert_eq!(
        rewriter.href_for("1abcDEF").as_deref(),
        Some("district/plan.html")
    );
    assert!(rewriter.href_for("unknown").is_none());
}

#[test]
fn test_rewrite_through_compiler() {
    let store = store_of(vec![
        folder("/district", "District"),
        with_source_id(document("/district/plan.md", "Plan", 1), "1abcDEF"),
    ]);
    let mut rendered = BTreeMap::new();
    rendered.insert(
        "/district/plan.md".to_string(),
        r#"<a href="https://www.google.com/url?q=https://docs.google.com/document/d/1abcDEF/edit">self</a>"#
            .to_string(),
    );
    let mut compiler =
        SiteCompiler::from_store(store, SiteConfig::default()).with_rendered(rendered);
    assert_eq!(compiler.rewrite_links(), 1);
    assert_eq!(
        compiler.rendered()["/district/plan.md"],
        r#"<a href="district/plan.html">self</a>"#
    );
    assert_eq!(compiler.report().substitutions, 1);
}
