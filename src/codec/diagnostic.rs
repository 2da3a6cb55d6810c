//! Diagnostic types for a site build.
//!
//! Resolution passes are partial-failure tolerant: a bad item or menu node is reported here and
//! the pass continues. The [`BuildReport`] collects everything a pass produced so the caller can
//! print a single summary at the end.

use serde::Serialize;

use crate::error::FolioError;

/// Diagnostic information produced during a build pass.
///
/// Diagnostics represent non-fatal issues. Fatal errors propagate as `Err` from the pass itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum BuildDiagnostic {
    /// An item that could not be turned into a record, or whose subtree was skipped.
    ///
    /// The item is excluded from every later pass.
    FailedItem {
        /// Location of the offending item
        location: String,
        /// Description of what went wrong
        message: String,
    },

    /// A menu node that resolved to the "not found" link instead of a real URL.
    NavmenuFallback {
        /// Directory the node was resolved in
        dir: String,
        /// Slug of the node's title
        slug: String,
        /// Why no link could be determined
        message: String,
    },

    /// A warning message about the build (e.g. a static file without a sidecar)
    Warning(String),

    /// An informational message about the build
    Info(String),
}

impl BuildDiagnostic {
    /// Create a failed item diagnostic
    pub fn failed_item(location: impl Into<String>, message: impl Into<String>) -> Self {
        Self::FailedItem {
            location: location.into(),
            message: message.into(),
        }
    }

    /// Failed item diagnostic for an error returned while reading `location`
    pub fn from_error(location: impl Into<String>, error: &FolioError) -> Self {
        Self::failed_item(location, error.to_string())
    }

    pub fn navmenu_fallback(
        dir: impl Into<String>,
        slug: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::NavmenuFallback {
            dir: dir.into(),
            slug: slug.into(),
            message: message.into(),
        }
    }

    /// Create a warning diagnostic
    pub fn warning(message: impl Into<String>) -> Self {
        Self::Warning(message.into())
    }

    /// Create an info diagnostic
    pub fn info(message: impl Into<String>) -> Self {
        Self::Info(message.into())
    }

    /// Check if this diagnostic represents a failed item
    pub fn is_failed_item(&self) -> bool {
        matches!(self, Self::FailedItem { .. })
    }

    /// Get the failed location if this is a failed item
    pub fn as_failed_item(&self) -> Option<(&str, &str)> {
        match self {
            Self::FailedItem { location, message } => Some((location.as_str(), message.as_str())),
            _ => None,
        }
    }

    pub fn is_navmenu_fallback(&self) -> bool {
        matches!(self, Self::NavmenuFallback { .. })
    }

    pub fn is_warning(&self) -> bool {
        matches!(self, Self::Warning(_))
    }
}

impl std::fmt::Display for BuildDiagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::FailedItem { location, message } => write!(f, "Failed {location}: {message}"),
            Self::NavmenuFallback { dir, slug, message } => {
                write!(f, "Navmenu fallback for '{slug}' in {dir}: {message}")
            }
            Self::Warning(msg) => write!(f, "Warning: {msg}"),
            Self::Info(msg) => write!(f, "Info: {msg}"),
        }
    }
}

/// Aggregated outcome of a build pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BuildReport {
    pub diagnostics: Vec<BuildDiagnostic>,
    /// Total number of cross-reference links rewritten.
    pub substitutions: usize,
}

impl BuildReport {
    pub fn push(&mut self, diagnostic: BuildDiagnostic) {
        self.diagnostics.push(diagnostic);
    }

    pub fn extend<I: IntoIterator<Item = BuildDiagnostic>>(&mut self, diagnostics: I) {
        self.diagnostics.extend(diagnostics);
    }

    pub fn failed_count(&self) -> usize {
        self.diagnostics.iter().filter(|d| d.is_failed_item()).count()
    }

    /// Locations of every failed item, in the order they were reported.
    pub fn failed_locations(&self) -> Vec<&str> {
        self.diagnostics
            .iter()
            .filter_map(BuildDiagnostic::as_failed_item)
            .map(|(location, _)| location)
            .collect()
    }

    pub fn fallback_count(&self) -> usize {
        self.diagnostics
            .iter()
            .filter(|d| d.is_navmenu_fallback())
            .count()
    }

    /// No failed items and no menu fallbacks. Warnings do not count.
    pub fn is_clean(&self) -> bool {
        self.failed_count() == 0 && self.fallback_count() == 0
    }
}

impl std::fmt::Display for BuildReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} failed item(s), {} menu fallback(s), {} link substitution(s)",
            self.failed_count(),
            self.fallback_count(),
            self.substitutions
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_log::test;

    #[test]
    fn test_build_diagnostic_creation() {
        let warning = BuildDiagnostic::warning("Test warning");
        let info = BuildDiagnostic::info("Test info");
        let failed = BuildDiagnostic::failed_item("pages/a.html", "missing title");

        assert!(warning.is_warning());
        assert!(matches!(info, BuildDiagnostic::Info(_)));
        assert!(failed.is_failed_item());
        assert_eq!(
            failed.as_failed_item(),
            Some(("pages/a.html", "missing title"))
        );
        assert!(warning.as_failed_item().is_none());
    }

    #[test]
    fn test_report_counts() {
        let mut report = BuildReport::default();
        assert!(report.is_clean());

        report.push(BuildDiagnostic::warning("static file without sidecar"));
        assert!(report.is_clean());

        report.push(BuildDiagnostic::navmenu_fallback("pages", "home", "missing href"));
        report.push(BuildDiagnostic::from_error(
            "pages/b.html",
            &FolioError::missing_field("pages/b.html", "title"),
        ));
        assert!(!report.is_clean());
        assert_eq!(report.failed_count(), 1);
        assert_eq!(report.fallback_count(), 1);
        assert_eq!(report.failed_locations(), vec!["pages/b.html"]);
    }

    #[test]
    fn test_display() {
        let fallback = BuildDiagnostic::navmenu_fallback("pages", "home", "missing href");
        assert_eq!(
            fallback.to_string(),
            "Navmenu fallback for 'home' in pages: missing href"
        );
    }
}
