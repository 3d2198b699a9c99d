//! Resolution of filesystem and web paths referenced by a document.
//!
//! All paths are handled in their posix form (forward slashes) regardless of the
//! host, so resolution is deterministic across platforms. The file separator given
//! to [`PathResolver::new`] only decides which absolute roots are recognized: a
//! backslash separator enables drive letters (`C:/`) and UNC roots (`//server`).
//!
//! System paths can be confined to a *jail*: a directory that resolved paths must
//! not escape. Depending on [`ResolveOptions::recover`], an escape attempt is either
//! clamped back inside the jail or reported as an [`Error::PathOutsideJail`].

use std::{
    path::MAIN_SEPARATOR,
    sync::LazyLock,
};

use regex::Regex;
use tracing::instrument;

use crate::Error;

const DOT_DOT: &str = "..";

#[allow(clippy::expect_used)]
static URI_PREFIX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\p{Alphabetic}[\p{Alphabetic}\p{Nd}.+-]+:/{0,2}")
        .expect("URI prefix pattern must compile")
});

/// The root of a partitioned path.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PathRoot {
    /// A relative path such as `images/tiger.png`.
    Relative,
    /// A relative path that starts with `./`.
    Current,
    /// A posix absolute path such as `/usr/share`.
    Posix,
    /// A UNC path such as `//server/share` (only with a backslash file separator).
    Unc,
    /// A drive root including its trailing slash, e.g. `C:/` (only with a backslash
    /// file separator).
    Drive(String),
}

impl PathRoot {
    /// The root marker: `""`, `"."`, `"/"`, `"//"` or the drive root.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Relative => "",
            Self::Current => ".",
            Self::Posix => "/",
            Self::Unc => "//",
            Self::Drive(drive) => drive,
        }
    }

    /// Text prepended to the joined segments to rebuild the path.
    fn prefix(&self) -> &str {
        match self {
            Self::Relative => "",
            Self::Current => "./",
            Self::Posix => "/",
            Self::Unc => "//",
            Self::Drive(drive) => drive,
        }
    }

    #[must_use]
    pub fn is_absolute(&self) -> bool {
        matches!(self, Self::Posix | Self::Unc | Self::Drive(_))
    }
}

/// A path split into its root and its normalized segments.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PartitionedPath {
    /// Non-empty segments, without `.` and with every resolvable `..` applied.
    /// Leading `..` segments that have nothing to pop are kept.
    pub segments: Vec<String>,
    pub root: PathRoot,
    /// The original path with backslashes replaced by forward slashes.
    pub posix_path: String,
}

/// Options for [`PathResolver::resolve_system_path`].
#[derive(Clone, Debug)]
pub struct ResolveOptions<'a> {
    /// Clamp paths that escape the jail instead of failing.
    pub recover: bool,
    /// Describes the target in messages (e.g. `"include file"`).
    pub target_name: &'a str,
}

impl Default for ResolveOptions<'_> {
    fn default() -> Self {
        Self {
            recover: true,
            target_name: "path",
        }
    }
}

impl<'a> ResolveOptions<'a> {
    #[must_use]
    pub fn strict(target_name: &'a str) -> Self {
        Self {
            recover: false,
            target_name,
        }
    }

    #[must_use]
    pub fn recovering(target_name: &'a str) -> Self {
        Self {
            recover: true,
            target_name,
        }
    }
}

/// Replace every backslash with a forward slash.
#[must_use]
pub fn normalize(path: &str) -> String {
    path.replace('\\', "/")
}

/// Whether `path` is `base` or lies beneath it. Both must be in posix form.
#[must_use]
pub fn descends_from(path: &str, base: &str) -> bool {
    path.strip_prefix(base)
        .is_some_and(|rest| rest.is_empty() || rest.starts_with('/') || base.ends_with('/'))
}

/// Split a URI prefix (`https://`, `file:///`) off the front of `path`.
fn extract_uri_prefix(path: &str) -> (&str, Option<&str>) {
    if path.contains(':')
        && let Some(m) = URI_PREFIX.find(path)
    {
        return (path.get(m.end()..).unwrap_or_default(), Some(m.as_str()));
    }
    (path, None)
}

#[derive(Clone, Debug)]
pub struct PathResolver {
    file_separator: char,
    working_dir: String,
}

impl PathResolver {
    /// Create a resolver.
    ///
    /// Without a `file_separator` the host's separator is used. Without a
    /// `working_dir` the process's current directory is used; a relative
    /// `working_dir` is made absolute against the current directory.
    ///
    /// # Errors
    ///
    /// Returns [`Error::WorkingDirectory`] when the current directory is needed but
    /// cannot be determined. Callers should treat this as fatal.
    pub fn new(file_separator: Option<char>, working_dir: Option<&str>) -> Result<Self, Error> {
        let mut resolver = Self {
            file_separator: file_separator.unwrap_or(MAIN_SEPARATOR),
            working_dir: String::new(),
        };
        resolver.working_dir = match working_dir {
            Some(dir) if resolver.is_absolute_system_path(dir) => resolver.expand_absolute(dir),
            Some(dir) => {
                let cwd = Self::current_dir()?;
                resolver.expand_absolute(&format!("{cwd}/{}", normalize(dir)))
            }
            None => {
                let cwd = Self::current_dir()?;
                resolver.expand_absolute(&cwd)
            }
        };
        tracing::debug!(working_dir = %resolver.working_dir, "initialized path resolver");
        Ok(resolver)
    }

    fn current_dir() -> Result<String, Error> {
        let cwd = std::env::current_dir().map_err(Error::WorkingDirectory)?;
        Ok(normalize(&cwd.to_string_lossy()))
    }

    #[must_use]
    pub fn file_separator(&self) -> char {
        self.file_separator
    }

    /// The absolute working directory, in posix form.
    #[must_use]
    pub fn working_dir(&self) -> &str {
        &self.working_dir
    }

    fn windows_conventions(&self) -> bool {
        self.file_separator == '\\'
    }

    /// The drive root (`C:/`) at the start of a posix path, if any.
    fn drive_root(path: &str) -> Option<&str> {
        let bytes = path.as_bytes();
        match bytes {
            [letter, b':', b'/', ..] if letter.is_ascii_alphabetic() => path.get(..3),
            _ => None,
        }
    }

    /// Whether the path is an absolute filesystem path under the resolver's host
    /// conventions.
    #[must_use]
    pub fn is_absolute_system_path(&self, path: &str) -> bool {
        if self.windows_conventions() {
            let path = normalize(path);
            path.starts_with('/') || Self::drive_root(&path).is_some()
        } else {
            path.starts_with('/')
        }
    }

    /// Whether the path is absolute in the web (URI path) sense.
    #[must_use]
    pub fn is_absolute_web_path(&self, path: &str) -> bool {
        path.starts_with('/')
    }

    fn root_of(&self, posix_path: &str, web: bool) -> PathRoot {
        if web {
            if posix_path.starts_with('/') {
                return PathRoot::Posix;
            }
        } else if self.is_absolute_system_path(posix_path) {
            if self.windows_conventions() && posix_path.starts_with("//") {
                return PathRoot::Unc;
            }
            if posix_path.starts_with('/') {
                return PathRoot::Posix;
            }
            if let Some(drive) = Self::drive_root(posix_path) {
                return PathRoot::Drive(drive.to_string());
            }
        }
        if posix_path.starts_with("./") {
            PathRoot::Current
        } else {
            PathRoot::Relative
        }
    }

    /// Split a path into its root and normalized segments without touching the
    /// filesystem.
    #[must_use]
    pub fn partition(&self, path: &str, web: bool) -> PartitionedPath {
        let posix_path = normalize(path);
        let root = self.root_of(&posix_path, web);
        let rest = posix_path.get(root.prefix().len()..).unwrap_or_default();

        let mut segments: Vec<String> = Vec::new();
        for segment in rest.split('/') {
            match segment {
                "" | "." => {}
                DOT_DOT if segments.last().is_some_and(|last| last != DOT_DOT) => {
                    segments.pop();
                }
                segment => segments.push(segment.to_string()),
            }
        }

        PartitionedPath {
            segments,
            root,
            posix_path,
        }
    }

    /// Rebuild a path from its segments and root.
    #[must_use]
    pub fn join_path(&self, segments: &[String], root: &PathRoot) -> String {
        format!("{}{}", root.prefix(), segments.join("/"))
    }

    /// Expand an absolute path, dropping `..` segments that would climb above the
    /// root.
    fn expand_absolute(&self, path: &str) -> String {
        let parts = self.partition(path, false);
        let segments: Vec<String> = parts
            .segments
            .into_iter()
            .skip_while(|segment| segment == DOT_DOT)
            .collect();
        self.join_path(&segments, &parts.root)
    }

    /// Resolve `..` and `.` segments and anchor relative paths at the working
    /// directory.
    #[must_use]
    pub fn expand_path(&self, path: &str) -> String {
        if self.is_absolute_system_path(path) {
            self.expand_absolute(path)
        } else {
            self.expand_absolute(&format!("{}/{}", self.working_dir, normalize(path)))
        }
    }

    /// Resolve a system path from `target` and `start`, optionally confined to
    /// `jail`.
    ///
    /// An empty `start` means the working directory, and a relative `start` is
    /// anchored there. The jail never serves as the start; it only bounds the
    /// result. An empty `target` resolves to the start directory.
    ///
    /// # Errors
    ///
    /// - [`Error::JailNotAbsolute`] if `jail` is not an absolute path.
    /// - [`Error::PathOutsideJail`] if the target escapes the jail and recovery is
    ///   disabled.
    /// - [`Error::StartOutsideJail`] if the start path itself lies outside the jail
    ///   and recovery is disabled.
    #[instrument(level = "trace", skip(self))]
    pub fn resolve_system_path(
        &self,
        target: Option<&str>,
        start: Option<&str>,
        jail: Option<&str>,
        options: &ResolveOptions<'_>,
    ) -> Result<String, Error> {
        let jail = match jail {
            Some(jail) if !self.is_absolute_system_path(jail) => {
                return Err(Error::JailNotAbsolute(jail.to_string()));
            }
            Some(jail) => Some(self.expand_absolute(jail)),
            None => None,
        };
        let start = match start.filter(|start| !start.is_empty()) {
            None => self.working_dir.clone(),
            Some(start) => self.expand_path(start),
        };
        let target = self.partition(target.unwrap_or_default(), false);

        if target.root.is_absolute() {
            return self.resolve_absolute_target(target, jail.as_deref(), options);
        }

        let (mut resolved, root, floor) = match jail.as_deref() {
            Some(jail) => {
                let jail_parts = self.partition(jail, false);
                let floor = jail_parts.segments.len();
                if descends_from(&start, jail) {
                    let start_parts = self.partition(&start, false);
                    (start_parts.segments, start_parts.root, floor)
                } else if options.recover {
                    tracing::warn!(%start, %jail, "start path is outside of jail; recovering automatically");
                    (jail_parts.segments, jail_parts.root, floor)
                } else {
                    return Err(Error::StartOutsideJail {
                        start,
                        jail: jail.to_string(),
                    });
                }
            }
            None => {
                let start_parts = self.partition(&start, false);
                (start_parts.segments, start_parts.root, 0)
            }
        };

        let mut warned = false;
        for segment in target.segments {
            if segment != DOT_DOT {
                resolved.push(segment);
            } else if resolved.len() > floor {
                resolved.pop();
            } else if let Some(jail) = jail.as_deref() {
                if !options.recover {
                    return Err(Error::PathOutsideJail {
                        target_name: options.target_name.to_string(),
                        path: self.expand_absolute(&format!("{start}/{}", target.posix_path)),
                        jail: jail.to_string(),
                    });
                }
                if !warned {
                    tracing::warn!(
                        target_name = options.target_name,
                        path = %target.posix_path,
                        %jail,
                        "path has illegal reference to ancestor of jail; recovering automatically"
                    );
                    warned = true;
                }
            }
        }

        Ok(self.join_path(&resolved, &root))
    }

    fn resolve_absolute_target(
        &self,
        target: PartitionedPath,
        jail: Option<&str>,
        options: &ResolveOptions<'_>,
    ) -> Result<String, Error> {
        let segments: Vec<String> = target
            .segments
            .into_iter()
            .skip_while(|segment| segment == DOT_DOT)
            .collect();
        let resolved = self.join_path(&segments, &target.root);
        let Some(jail) = jail else {
            return Ok(resolved);
        };
        if descends_from(&resolved, jail) {
            return Ok(resolved);
        }
        if !options.recover {
            return Err(Error::PathOutsideJail {
                target_name: options.target_name.to_string(),
                path: resolved,
                jail: jail.to_string(),
            });
        }
        tracing::warn!(
            target_name = options.target_name,
            path = %resolved,
            %jail,
            "path is outside of jail; recovering automatically"
        );
        let jail_parts = self.partition(jail, false);
        let mut rerooted = jail_parts.segments;
        rerooted.extend(segments);
        Ok(self.join_path(&rerooted, &jail_parts.root))
    }

    /// Resolve a web path (e.g. an image or stylesheet URL path) against `start`.
    ///
    /// URI prefixes such as `https://` are preserved, `..` segments are resolved
    /// where possible (leading ones are kept for relative results) and spaces are
    /// encoded as `%20`.
    #[must_use]
    pub fn web_path(&self, target: &str, start: Option<&str>) -> String {
        let target = normalize(target);
        if extract_uri_prefix(&target).1.is_some() {
            return target;
        }

        let joined = match start.map(normalize).filter(|start| !start.is_empty()) {
            Some(start) if !self.is_absolute_web_path(&target) => {
                if start.ends_with('/') {
                    format!("{start}{target}")
                } else {
                    format!("{start}/{target}")
                }
            }
            Some(_) | None => target,
        };
        let (path, uri_prefix) = extract_uri_prefix(&joined);

        let parts = self.partition(path, true);
        let segments: Vec<String> = if parts.root == PathRoot::Posix || uri_prefix.is_some() {
            parts
                .segments
                .into_iter()
                .skip_while(|segment| segment == DOT_DOT)
                .collect()
        } else {
            parts.segments
        };
        let resolved = self.join_path(&segments, &parts.root).replace(' ', "%20");
        format!("{}{resolved}", uri_prefix.unwrap_or_default())
    }

    /// Express `path` relative to `base`, if `path` lies beneath it.
    ///
    /// Returns `path` unchanged when either is relative or `path` is not a descendant
    /// of `base`.
    #[must_use]
    pub fn relative_path(&self, path: &str, base: &str) -> String {
        if !(self.is_absolute_system_path(path) && self.is_absolute_system_path(base)) {
            return path.to_string();
        }
        let path = self.expand_absolute(path);
        let base = self.expand_absolute(base);
        if !descends_from(&path, &base) {
            return path;
        }
        match path.get(base.len()..).map(|rest| rest.trim_start_matches('/')) {
            Some("") | None => ".".to_string(),
            Some(rest) => rest.to_string(),
        }
    }
}
