use std::path::{Path, PathBuf};

/// Everything that can abort a compilation run. The run is fail-fast: the
/// first error surfaced here stops the whole build.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("more than one data file matches '{0}'")]
    AmbiguousDataFile(String),

    #[error("failed to parse data file {path}: {message}")]
    DataParse { path: PathBuf, message: String },

    #[error("partial '{0}' not found in partials directory")]
    MissingPartial(String),

    #[error("partial '{0}' exists with both .hbs and .handlebars extensions")]
    AmbiguousPartial(String),

    #[error("cyclic partial inclusion through '{0}'")]
    CyclicPartial(String),

    #[error("failed to load helper '{name}': {message}")]
    HelperLoad { name: String, message: String },

    #[error("more than one post-build transform candidate found")]
    AmbiguousPostBuildHelper,

    #[error("failed to render page '{page}': {message}")]
    Render { page: String, message: String },

    #[error("post-build transform failed for page '{page}': {message}")]
    PostBuild { page: String, message: String },

    #[error("could not create destination directory {path}: {source}")]
    Destination {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("output file for page '{0}' already exists (enable overwrite to replace it)")]
    FileExists(String),

    #[error("no page templates found in pages directory")]
    NoPagesFound,

    #[error("io error on {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

impl Error {
    /// Tag an unrecognized io error with the path it came from.
    pub(crate) fn io(path: &Path, source: std::io::Error) -> Self {
        Error::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}
