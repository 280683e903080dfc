use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use handlebars::HelperDef;

use crate::engine::Engine;
use crate::error::Error;

pub type DynError = Box<dyn std::error::Error + Send + Sync>;

/// Reserved stem of the single optional post-build transform, looked up
/// directly under the project root.
pub const POST_BUILD_STEM: &str = "_post-build";

const SCRIPT_EXTENSION: &str = "js";
const TYPED_SCRIPT_EXTENSION: &str = "ts";

/// Loads user-authored script files into callables. The core never executes
/// foreign code itself; an embedder that supports script helpers supplies an
/// implementation of this capability.
pub trait ScriptLoader {
    /// Load a helper source file into a callable registrable with the
    /// rendering engine.
    fn load_helper(&self, path: &Path) -> Result<Box<dyn HelperDef + Send + Sync>, DynError>;

    /// Load the post-build transform source file.
    fn load_transform(&self, path: &Path) -> Result<Box<dyn PostBuildTransform>, DynError>;
}

/// A transform applied to every rendered page before it is written.
pub trait PostBuildTransform: Send + Sync {
    fn apply(&self, page: &str, html: &str) -> Result<String, DynError>;
}

impl<F> PostBuildTransform for F
where
    F: Fn(&str, &str) -> Result<String, DynError> + Send + Sync,
{
    fn apply(&self, page: &str, html: &str) -> Result<String, DynError> {
        self(page, html)
    }
}

/// Discover and register every helper under `dir`.
///
/// Files whose stem starts with `_` are shared library code for other
/// helpers and are skipped. `.ts` sources are only accepted when type
/// checking is enabled; finding one without it is a hard failure, because a
/// silently skipped helper would resurface later as an unrelated render
/// error. Any load failure aborts the run — partial helper availability is
/// not tolerated.
pub async fn register_helpers(
    engine: &mut Engine,
    loader: Option<&dyn ScriptLoader>,
    dir: &Path,
    typecheck_enabled: bool,
) -> Result<(), Error> {
    let mut sources = helper_sources(dir).await?;
    sources.sort();

    for (name, path) in sources {
        if is_typed_script(&path) && !typecheck_enabled {
            return Err(Error::HelperLoad {
                name,
                message: "TypeScript helper sources require the type-checking config".into(),
            });
        }
        let loader = loader.ok_or_else(|| Error::HelperLoad {
            name: name.clone(),
            message: "script helpers found but no script loader is configured".into(),
        })?;
        let def = loader.load_helper(&path).map_err(|e| Error::HelperLoad {
            name: name.clone(),
            message: e.to_string(),
        })?;
        engine.register_helper(&name, def);
        tracing::debug!(helper = %name, "registered helper");
    }
    Ok(())
}

/// Discover the optional post-build transform at the project root and
/// register it with the engine. Absence is fine; two candidates are not.
pub async fn register_post_build(
    engine: &mut Engine,
    loader: Option<&dyn ScriptLoader>,
    root: &Path,
    typecheck_enabled: bool,
) -> Result<(), Error> {
    let mut candidates: Vec<PathBuf> = Vec::new();
    for ext in [SCRIPT_EXTENSION, TYPED_SCRIPT_EXTENSION] {
        let candidate = root.join(format!("{POST_BUILD_STEM}.{ext}"));
        match tokio::fs::metadata(&candidate).await {
            Ok(meta) if meta.is_file() => candidates.push(candidate),
            Ok(_) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => return Err(Error::io(&candidate, e)),
        }
    }

    let path = match candidates.as_slice() {
        [] => return Ok(()),
        [path] => path.clone(),
        _ => return Err(Error::AmbiguousPostBuildHelper),
    };

    if is_typed_script(&path) && !typecheck_enabled {
        return Err(Error::HelperLoad {
            name: POST_BUILD_STEM.into(),
            message: "TypeScript helper sources require the type-checking config".into(),
        });
    }
    let loader = loader.ok_or_else(|| Error::HelperLoad {
        name: POST_BUILD_STEM.into(),
        message: "script helpers found but no script loader is configured".into(),
    })?;
    let transform = loader.load_transform(&path).map_err(|e| Error::HelperLoad {
        name: POST_BUILD_STEM.into(),
        message: e.to_string(),
    })?;
    engine.set_transform(transform);
    tracing::debug!(path = %path.display(), "registered post-build transform");
    Ok(())
}

async fn helper_sources(dir: &Path) -> Result<Vec<(String, PathBuf)>, Error> {
    let mut sources = Vec::new();

    let mut entries = match tokio::fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(sources),
        Err(e) => return Err(Error::io(dir, e)),
    };

    while let Some(entry) = entries.next_entry().await.map_err(|e| Error::io(dir, e))? {
        let path = entry.path();
        let file_type = entry.file_type().await.map_err(|e| Error::io(&path, e))?;
        if !file_type.is_file() {
            continue;
        }
        let is_script = path.extension().is_some_and(|e| {
            e == SCRIPT_EXTENSION || e == TYPED_SCRIPT_EXTENSION
        });
        if !is_script {
            continue;
        }
        let Some(stem) = path.file_stem().map(|s| s.to_string_lossy().to_string()) else {
            continue;
        };
        // Shared utility modules, not helpers.
        if stem.starts_with('_') {
            continue;
        }
        sources.push((stem, path));
    }
    Ok(sources)
}

fn is_typed_script(path: &Path) -> bool {
    path.extension().is_some_and(|e| e == TYPED_SCRIPT_EXTENSION)
}

#[cfg(test)]
mod tests {
    use super::*;
    use handlebars::{Context, Handlebars, Helper, HelperResult, Output, RenderContext};
    use serde_json::json;
    use tempfile::TempDir;

    struct Shout;

    impl HelperDef for Shout {
        fn call<'reg: 'rc, 'rc>(
            &self,
            h: &Helper<'rc>,
            _: &'reg Handlebars<'reg>,
            _: &'rc Context,
            _: &mut RenderContext<'reg, 'rc>,
            out: &mut dyn Output,
        ) -> HelperResult {
            let value = h.param(0).and_then(|p| p.value().as_str()).unwrap_or("");
            out.write(&value.to_uppercase())?;
            Ok(())
        }
    }

    /// Stands in for a script runtime: every helper file loads as `Shout`,
    /// the transform appends a footer naming the page.
    struct FakeLoader;

    impl ScriptLoader for FakeLoader {
        fn load_helper(
            &self,
            _path: &Path,
        ) -> Result<Box<dyn HelperDef + Send + Sync>, DynError> {
            Ok(Box::new(Shout))
        }

        fn load_transform(&self, _path: &Path) -> Result<Box<dyn PostBuildTransform>, DynError> {
            Ok(Box::new(|page: &str, html: &str| {
                Ok(format!("{html}<!-- {page} -->"))
            }))
        }
    }

    struct FailingLoader;

    impl ScriptLoader for FailingLoader {
        fn load_helper(
            &self,
            _path: &Path,
        ) -> Result<Box<dyn HelperDef + Send + Sync>, DynError> {
            Err("syntax error".into())
        }

        fn load_transform(&self, _path: &Path) -> Result<Box<dyn PostBuildTransform>, DynError> {
            Err("syntax error".into())
        }
    }

    fn write(dir: &TempDir, name: &str) {
        std::fs::write(dir.path().join(name), "module.exports = () => {}").unwrap();
    }

    #[tokio::test]
    async fn registers_helper_by_stem() {
        let dir = TempDir::new().unwrap();
        write(&dir, "shout.js");
        let mut engine = Engine::new();
        register_helpers(&mut engine, Some(&FakeLoader), dir.path(), false)
            .await
            .unwrap();
        let out = engine
            .render_template(r#"{{shout "hey"}}"#, &json!({}))
            .unwrap();
        assert_eq!(out, "HEY");
    }

    #[tokio::test]
    async fn underscore_prefixed_files_are_skipped() {
        let dir = TempDir::new().unwrap();
        write(&dir, "_util.js");
        let mut engine = Engine::new();
        // A skipped file must not require a loader at all.
        register_helpers(&mut engine, None, dir.path(), false)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn missing_helpers_directory_is_fine() {
        let dir = TempDir::new().unwrap();
        let gone = dir.path().join("helpers");
        let mut engine = Engine::new();
        register_helpers(&mut engine, None, &gone, false).await.unwrap();
    }

    #[tokio::test]
    async fn typed_source_without_typecheck_fails() {
        let dir = TempDir::new().unwrap();
        write(&dir, "fancy.ts");
        let mut engine = Engine::new();
        let err = register_helpers(&mut engine, Some(&FakeLoader), dir.path(), false)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::HelperLoad { name, .. } if name == "fancy"));
    }

    #[tokio::test]
    async fn typed_source_with_typecheck_loads() {
        let dir = TempDir::new().unwrap();
        write(&dir, "fancy.ts");
        let mut engine = Engine::new();
        register_helpers(&mut engine, Some(&FakeLoader), dir.path(), true)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn load_failure_aborts_with_helper_name() {
        let dir = TempDir::new().unwrap();
        write(&dir, "broken.js");
        let mut engine = Engine::new();
        let err = register_helpers(&mut engine, Some(&FailingLoader), dir.path(), false)
            .await
            .unwrap_err();
        match err {
            Error::HelperLoad { name, message } => {
                assert_eq!(name, "broken");
                assert!(message.contains("syntax error"));
            }
            other => panic!("expected HelperLoad, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn post_build_absence_is_fine() {
        let dir = TempDir::new().unwrap();
        let mut engine = Engine::new();
        register_post_build(&mut engine, None, dir.path(), false)
            .await
            .unwrap();
        assert!(engine.post_build("index", "x").is_none());
    }

    #[tokio::test]
    async fn post_build_transform_is_applied() {
        let dir = TempDir::new().unwrap();
        write(&dir, "_post-build.js");
        let mut engine = Engine::new();
        register_post_build(&mut engine, Some(&FakeLoader), dir.path(), false)
            .await
            .unwrap();
        let out = engine.post_build("index", "<p>x</p>").unwrap().unwrap();
        assert_eq!(out, "<p>x</p><!-- index -->");
    }

    #[tokio::test]
    async fn two_post_build_candidates_are_ambiguous() {
        let dir = TempDir::new().unwrap();
        write(&dir, "_post-build.js");
        write(&dir, "_post-build.ts");
        let mut engine = Engine::new();
        let err = register_post_build(&mut engine, Some(&FakeLoader), dir.path(), true)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::AmbiguousPostBuildHelper));
    }
}
