use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use pulldown_cmark::{Parser, html};
use serde_json::{Value, json};

use crate::error::Error;

/// Reserved logical name for the data record merged into every page.
pub const SHARED_NAME: &str = "_shared";

/// Markdown data files decode to a one-key map holding the rendered HTML
/// under this field, marking them as prose rather than key/value data.
pub const MARKDOWN_CONTENT_FIELD: &str = "content";

const DATA_EXTENSIONS: [&str; 5] = ["json", "yml", "yaml", "md", "markdown"];

/// A decoded data document together with the file it came from.
#[derive(Debug, Clone)]
pub struct DataRecord {
    pub path: PathBuf,
    pub value: Value,
}

/// Load the data record for `name` from `dir`, if one exists.
///
/// At most one file may match the logical name across the supported
/// extensions; more than one is an [`Error::AmbiguousDataFile`]. Zero
/// matches (including a missing directory) is `Ok(None)` — absence is the
/// caller's call to judge.
pub async fn load_data(dir: &Path, name: &str) -> Result<Option<DataRecord>, Error> {
    let mut matches: Vec<PathBuf> = Vec::new();

    let mut entries = match tokio::fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(Error::io(dir, e)),
    };

    while let Some(entry) = entries.next_entry().await.map_err(|e| Error::io(dir, e))? {
        let path = entry.path();
        let file_type = entry.file_type().await.map_err(|e| Error::io(&path, e))?;
        if !file_type.is_file() {
            continue;
        }
        let stem_matches = path.file_stem().is_some_and(|s| s == name);
        let ext_supported = extension(&path)
            .map(|e| DATA_EXTENSIONS.contains(&e.as_str()))
            .unwrap_or(false);
        if stem_matches && ext_supported {
            matches.push(path);
        }
    }

    match matches.as_slice() {
        [] => Ok(None),
        [path] => {
            tracing::debug!(name, path = %path.display(), "loaded data file");
            let value = decode(path).await?;
            Ok(Some(DataRecord {
                path: path.clone(),
                value,
            }))
        }
        _ => Err(Error::AmbiguousDataFile(name.to_string())),
    }
}

async fn decode(path: &Path) -> Result<Value, Error> {
    let text = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| Error::io(path, e))?;

    let ext = extension(path).unwrap_or_default();
    match ext.as_str() {
        "json" => serde_json::from_str(&text).map_err(|e| Error::DataParse {
            path: path.to_path_buf(),
            message: e.to_string(),
        }),
        "yml" | "yaml" => serde_yaml::from_str(&text).map_err(|e| Error::DataParse {
            path: path.to_path_buf(),
            message: e.to_string(),
        }),
        // Markdown is prose, not a map; wrap the rendered HTML.
        _ => Ok(markdown_to_value(&text)),
    }
}

fn markdown_to_value(text: &str) -> Value {
    let mut rendered = String::new();
    html::push_html(&mut rendered, Parser::new(text));
    json!({ MARKDOWN_CONTENT_FIELD: rendered })
}

fn extension(path: &Path) -> Option<String> {
    path.extension().map(|e| e.to_string_lossy().to_string())
}
