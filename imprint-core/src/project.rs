use std::collections::HashSet;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// The conventional subdirectories of a project, resolved once at the start
/// of a run. Directories are not required to exist; an absent directory just
/// yields empty scan results downstream.
#[derive(Debug, Clone)]
pub struct ProjectPaths {
    pub root: PathBuf,
    pub pages: PathBuf,
    pub data: PathBuf,
    pub partials: PathBuf,
    pub helpers: PathBuf,
}

/// Per-directory name overrides for `ProjectPaths::resolve`.
#[derive(Debug, Clone, Default)]
pub struct DirNames {
    pub pages: Option<String>,
    pub data: Option<String>,
    pub partials: Option<String>,
    pub helpers: Option<String>,
}

impl ProjectPaths {
    pub fn resolve<P: AsRef<Path>>(root: P, names: DirNames) -> Self {
        let root = normalize_separators(root.as_ref());
        Self {
            pages: root.join(names.pages.as_deref().unwrap_or("pages")),
            data: root.join(names.data.as_deref().unwrap_or("data")),
            partials: root.join(names.partials.as_deref().unwrap_or("partials")),
            helpers: root.join(names.helpers.as_deref().unwrap_or("helpers")),
            root,
        }
    }
}

/// Rewrite backslash separators to forward slashes so downstream
/// pattern-matching sees one separator style on every platform.
fn normalize_separators(path: &Path) -> PathBuf {
    PathBuf::from(path.to_string_lossy().replace('\\', "/"))
}

/// The resolved options record for one compilation run.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct Options {
    /// Destination directory for the generated `.html` files.
    pub dest: PathBuf,
    /// Replace existing output files instead of failing on collision.
    pub overwrite: bool,
    /// Minify rendered HTML before writing.
    pub minify: bool,
    /// Emit tracing output during the run.
    pub logging: bool,
    /// Page stems to skip entirely.
    pub exclude: HashSet<String>,
    /// Type-checking configuration; enables `.ts` helper sources.
    pub typecheck_config: Option<PathBuf>,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            dest: PathBuf::from("./build"),
            overwrite: false,
            minify: false,
            logging: false,
            exclude: HashSet::new(),
            typecheck_config: None,
        }
    }
}

/// A fully resolved project: paths plus options, immutable for the duration
/// of a run.
#[derive(Debug, Clone)]
pub struct Project {
    pub paths: ProjectPaths,
    pub options: Options,
}

impl Project {
    pub fn new(paths: ProjectPaths, options: Options) -> Self {
        Self { paths, options }
    }
}
