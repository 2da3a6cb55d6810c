//! Location strings and URL helpers.
//!
//! Every record in a [`crate::store::RecordStore`] is keyed by its *location*: the mirrored path
//! of the file relative to the content root, always written with `/` separators regardless of
//! host OS. [`LocationPath`] splits such a string into directory, basename and extension without
//! allocating, and provides the handful of joins the resolvers need.
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::{
    borrow::Cow,
    fmt::{Display, Formatter},
    path::{Component, Path, PathBuf, MAIN_SEPARATOR_STR},
};
use unicode_normalization::UnicodeNormalization;

/// URI schemes that are passed through untouched instead of being qualified against the site URL.
static EXTERNAL_LINK_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?:https?|ftp|mailto):").expect("external link pattern is a valid regex")
});

/// Utility function to replace separators and convert to unicode (via to_string_lossy) on os path.
pub fn os_path_to_string<P: AsRef<Path>>(os_path_ref: P) -> String {
    let res = os_path_ref
        .as_ref()
        .components()
        .map(|c| match c {
            Component::RootDir => Cow::from("".to_string()),
            _ => c.as_os_str().to_string_lossy(),
        })
        .collect::<Vec<_>>()
        .join("/");
    tracing::trace!(
        "os_path_to_string: turned {:?} into {}",
        os_path_ref.as_ref().components(),
        res
    );
    res
}

pub fn string_to_os_path(path_string: &str) -> PathBuf {
    let res = PathBuf::from(path_string.replace('/', MAIN_SEPARATOR_STR));
    tracing::trace!("string_to_os_path: turned '{}' into {:?}", path_string, res);
    res
}

/// Turn a title into a lower-case, hyphenated, URL-safe slug.
///
/// Accented characters are decomposed and their marks dropped; anything else outside of
/// `[a-z0-9_-]` and whitespace is removed. Runs of whitespace and hyphens collapse into a single
/// hyphen and leading/trailing hyphens are trimmed.
pub fn slugify(title: &str) -> String {
    let mut slug = String::with_capacity(title.len());
    let mut pending_sep = false;
    for c in title.nfkd().filter(char::is_ascii) {
        if c.is_ascii_alphanumeric() || c == '_' {
            if pending_sep && !slug.is_empty() {
                slug.push('-');
            }
            pending_sep = false;
            slug.push(c.to_ascii_lowercase());
        } else if c.is_whitespace() || c == '-' {
            pending_sep = true;
        }
    }
    slug
}

/// True for links with a recognized external scheme (`http`, `https`, `ftp`, `mailto`).
pub fn is_external_link(link: &str) -> bool {
    EXTERNAL_LINK_RE.is_match(link)
}

/// Qualify a site-relative location against the site base URL. External links are returned
/// unchanged. An empty base URL leaves the location relative (with its leading slash removed).
pub fn href_for_location(site_url: &str, location: &str) -> String {
    if is_external_link(location) {
        return location.to_string();
    }
    let relative = location.trim_start_matches('/');
    if site_url.is_empty() {
        relative.to_string()
    } else {
        format!("{}/{}", site_url.trim_end_matches('/'), relative)
    }
}

/// Borrowed view of a `/`-separated location string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocationPath<'a> {
    pub path: &'a str,
    /// Index of the last '/' (after trailing slashes are ignored)
    dir_sep: Option<usize>,
    /// Index of the '.' separating basename stem from extension
    ext_sep: Option<usize>,
}

impl<'a> LocationPath<'a> {
    pub fn new(path: &'a str) -> LocationPath<'a> {
        let trimmed = if path.len() > 1 {
            path.trim_end_matches('/')
        } else {
            path
        };
        let dir_sep = trimmed.rfind('/');
        let base_start = dir_sep.map(|idx| idx + 1).unwrap_or(0);
        let ext_sep = trimmed[base_start..]
            .rfind('.')
            // Hidden files (".DS_Store") have no extension
            .filter(|idx| *idx > 0)
            .map(|idx| idx + base_start);
        LocationPath {
            path: trimmed,
            dir_sep,
            ext_sep,
        }
    }

    pub fn is_absolute(&self) -> bool {
        self.path.starts_with('/')
    }

    /// The directory portion, `os.path.dirname` style. A rooted single segment returns "/".
    pub fn dir(&self) -> &'a str {
        match self.dir_sep {
            Some(0) => &self.path[0..1],
            Some(idx) => &self.path[0..idx],
            None => "",
        }
    }

    pub fn basename(&self) -> &'a str {
        let start_idx = self.dir_sep.map(|idx| idx + 1).unwrap_or(0);
        &self.path[start_idx..]
    }

    pub fn stem(&self) -> &'a str {
        let start_idx = self.dir_sep.map(|idx| idx + 1).unwrap_or(0);
        let stop_idx = self.ext_sep.unwrap_or(self.path.len());
        &self.path[start_idx..stop_idx]
    }

    pub fn ext(&self) -> &'a str {
        self.ext_sep
            .map(|idx| &self.path[idx + 1..])
            .unwrap_or("")
    }

    /// Number of non-empty path segments.
    pub fn depth(&self) -> usize {
        self.path.split('/').filter(|part| !part.is_empty()).count()
    }

    /// Join a relative tail onto this location. Absolute tails replace the location entirely.
    pub fn join<E: AsRef<str>>(&self, end_ref: E) -> String {
        let end = end_ref.as_ref();
        if end.starts_with('/') {
            return end.to_string();
        }
        if end.is_empty() {
            return self.path.to_string();
        }
        if self.path.is_empty() {
            return end.to_string();
        }
        if self.path.ends_with('/') {
            format!("{}{}", self.path, end)
        } else {
            format!("{}/{}", self.path, end)
        }
    }

    /// Every ancestor directory from the nearest to the outermost, excluding the empty root.
    pub fn ancestors(&self) -> impl Iterator<Item = &'a str> {
        let mut current = Some(self.dir());
        std::iter::from_fn(move || {
            let dir = current.take()?;
            if dir.is_empty() {
                return None;
            }
            if dir != "/" {
                current = Some(LocationPath::new(dir).dir());
            }
            Some(dir)
        })
    }

    /// True when `self` lies strictly below the directory `dir`.
    pub fn is_within(&self, dir: &str) -> bool {
        if dir == "/" {
            return self.is_absolute() && self.path.len() > 1;
        }
        let dir = dir.trim_end_matches('/');
        if dir.is_empty() {
            return !self.path.is_empty() && !self.is_absolute();
        }
        self.path.len() > dir.len()
            && self.path.starts_with(dir)
            && self.path.as_bytes()[dir.len()] == b'/'
    }

    pub fn replace_extension(&self, new_extension: &str) -> String {
        match self.ext_sep {
            Some(idx) => format!("{}.{}", &self.path[0..idx], new_extension),
            None => format!("{}.{}", self.path, new_extension),
        }
    }
}

impl<'a, T: AsRef<str> + ?Sized> From<&'a T> for LocationPath<'a> {
    fn from(s: &'a T) -> LocationPath<'a> {
        LocationPath::new(s.as_ref())
    }
}

impl<'a> AsRef<str> for LocationPath<'a> {
    fn as_ref(&self) -> &str {
        self.path
    }
}

impl<'a> Display for LocationPath<'a> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.path)
    }
}
