use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde_json::{Map, Value};

use crate::data::{self, DataRecord};
use crate::engine::Engine;
use crate::error::Error;
use crate::helpers::{self, ScriptLoader};
use crate::output;
use crate::partials::{self, PARTIAL_EXTENSIONS};
use crate::project::Project;

/// Key under which shared data is injected into every page's context.
pub const SHARED_KEY: &str = data::SHARED_NAME;

/// One fully rendered page, ready for the output writer.
#[derive(Debug, Clone)]
pub struct CompiledPage {
    pub name: String,
    pub html: String,
}

/// Run the whole pipeline and write the results.
///
/// All pages render into memory first; nothing touches the destination until
/// every render has succeeded.
pub async fn compile_and_write(
    project: &Project,
    loader: Option<&dyn ScriptLoader>,
) -> Result<Vec<CompiledPage>, Error> {
    let pages = compile_project(project, loader).await?;
    output::write_all(&project.options.dest, &pages, project.options.overwrite).await?;
    Ok(pages)
}

/// Render every non-excluded page of the project.
pub async fn compile_project(
    project: &Project,
    loader: Option<&dyn ScriptLoader>,
) -> Result<Vec<CompiledPage>, Error> {
    let typecheck = project.options.typecheck_config.is_some();
    let mut engine = Engine::new();

    helpers::register_helpers(&mut engine, loader, &project.paths.helpers, typecheck).await?;
    helpers::register_post_build(&mut engine, loader, &project.paths.root, typecheck).await?;

    let shared = data::load_data(&project.paths.data, data::SHARED_NAME).await?;

    let pages = discover_pages(&project.paths.pages).await?;
    if pages.is_empty() {
        return Err(Error::NoPagesFound);
    }
    tracing::info!(count = pages.len(), "discovered page templates");

    let mut compiled = Vec::new();
    for (name, path) in pages {
        if project.options.exclude.contains(&name) {
            tracing::debug!(page = %name, "excluded from compilation");
            continue;
        }
        let html = render_page(&mut engine, project, &name, &path, shared.as_ref()).await?;
        compiled.push(CompiledPage { name, html });
    }
    Ok(compiled)
}

/// Scan the pages directory for template files. Enumeration order is not
/// stable across platforms, so the result is sorted by name; nothing else
/// may depend on processing order.
async fn discover_pages(dir: &Path) -> Result<Vec<(String, PathBuf)>, Error> {
    let mut pages = Vec::new();

    let mut entries = match tokio::fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(pages),
        Err(e) => return Err(Error::io(dir, e)),
    };

    while let Some(entry) = entries.next_entry().await.map_err(|e| Error::io(dir, e))? {
        let path = entry.path();
        let file_type = entry.file_type().await.map_err(|e| Error::io(&path, e))?;
        if !file_type.is_file() {
            continue;
        }
        let is_template = path
            .extension()
            .is_some_and(|e| PARTIAL_EXTENSIONS.iter().any(|x| e == *x));
        if !is_template {
            continue;
        }
        if let Some(stem) = path.file_stem().map(|s| s.to_string_lossy().to_string()) {
            pages.push((stem, path));
        }
    }

    pages.sort();
    Ok(pages)
}

async fn render_page(
    engine: &mut Engine,
    project: &Project,
    name: &str,
    path: &Path,
    shared: Option<&DataRecord>,
) -> Result<String, Error> {
    let text = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| Error::io(path, e))?;

    partials::resolve_partials(engine, &project.paths.partials, &text).await?;

    let page_data = data::load_data(&project.paths.data, name).await?;
    let had_data = page_data.is_some() || shared.is_some();
    let context = merge_context(page_data, shared)?;

    let mut html = engine.render_template(&text, &context).map_err(|e| {
        let mut message = e.to_string();
        if !had_data {
            message.push_str(" (no data file matched this page; missing data is the likely cause)");
        }
        Error::Render {
            page: name.to_string(),
            message,
        }
    })?;

    if let Some(result) = engine.post_build(name, &html) {
        html = result.map_err(|e| Error::PostBuild {
            page: name.to_string(),
            message: e.to_string(),
        })?;
    }

    if project.options.minify {
        html = minify(&html);
    }

    tracing::debug!(page = %name, bytes = html.len(), "rendered page");
    Ok(html)
}

/// Build the render context: shared data under the reserved key first, then
/// the page's own fields on top, so an explicit page-level field always
/// wins.
fn merge_context(
    page_data: Option<DataRecord>,
    shared: Option<&DataRecord>,
) -> Result<Value, Error> {
    let mut root = Map::new();

    if let Some(shared) = shared {
        root.insert(SHARED_KEY.to_string(), shared.value.clone());
    }

    if let Some(record) = page_data {
        match record.value {
            Value::Object(fields) => {
                for (key, value) in fields {
                    root.insert(key, value);
                }
            }
            _ => {
                return Err(Error::DataParse {
                    path: record.path,
                    message: "expected a map at the top level".into(),
                });
            }
        }
    }

    Ok(Value::Object(root))
}

fn minify(html: &str) -> String {
    let out = minify_html::minify(html.as_bytes(), &minify_html::Cfg::new());
    String::from_utf8_lossy(&out).into_owned()
}
