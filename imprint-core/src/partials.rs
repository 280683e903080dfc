use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use futures::future::BoxFuture;
use regex::Regex;

use crate::engine::Engine;
use crate::error::Error;

/// The two synonymous template extensions a partial may use. A name present
/// with both is ambiguous.
pub const PARTIAL_EXTENSIONS: [&str; 2] = ["hbs", "handlebars"];

// An optionally captured leading quote marks a partial name sitting inside a
// string-literal helper argument; those matches are skipped.
static PARTIAL_REF: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(["'])?\{\{>\s*([A-Za-z0-9_-]+)"#).unwrap());

/// Names of the partials referenced by `text`, excluding quoted occurrences.
pub fn referenced_partials(text: &str) -> Vec<String> {
    PARTIAL_REF
        .captures_iter(text)
        .filter(|cap| cap.get(1).is_none())
        .map(|cap| cap[2].to_string())
        .collect()
}

/// Recursively resolve and register every partial referenced by `text`.
///
/// Resolution is post-order: a partial's own references are registered
/// before the partial itself. Registration is idempotent per run, so a
/// diamond graph loads each partial once; a genuine inclusion cycle fails
/// with [`Error::CyclicPartial`].
pub async fn resolve_partials(engine: &mut Engine, dir: &Path, text: &str) -> Result<(), Error> {
    let mut in_flight = Vec::new();
    resolve_inner(engine, dir, text, &mut in_flight).await
}

fn resolve_inner<'a>(
    engine: &'a mut Engine,
    dir: &'a Path,
    text: &'a str,
    in_flight: &'a mut Vec<String>,
) -> BoxFuture<'a, Result<(), Error>> {
    Box::pin(async move {
        for name in referenced_partials(text) {
            if engine.has_partial(&name) {
                continue;
            }
            if in_flight.contains(&name) {
                return Err(Error::CyclicPartial(name));
            }

            let path = locate_partial(dir, &name).await?;
            let body = tokio::fs::read_to_string(&path)
                .await
                .map_err(|e| Error::io(&path, e))?;

            in_flight.push(name.clone());
            resolve_inner(engine, dir, &body, in_flight).await?;
            in_flight.pop();

            engine
                .register_partial(&name, &body)
                .map_err(|e| Error::Render {
                    page: name.clone(),
                    message: format!("invalid partial template: {e}"),
                })?;
            tracing::debug!(partial = %name, "registered partial");
        }
        Ok(())
    })
}

async fn locate_partial(dir: &Path, name: &str) -> Result<PathBuf, Error> {
    let mut found: Vec<PathBuf> = Vec::new();
    for ext in PARTIAL_EXTENSIONS {
        let candidate = dir.join(format!("{name}.{ext}"));
        match tokio::fs::metadata(&candidate).await {
            Ok(meta) if meta.is_file() => found.push(candidate),
            Ok(_) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => return Err(Error::io(&candidate, e)),
        }
    }

    match found.len() {
        0 => Err(Error::MissingPartial(name.to_string())),
        1 => Ok(found.remove(0)),
        _ => Err(Error::AmbiguousPartial(name.to_string())),
    }
}
