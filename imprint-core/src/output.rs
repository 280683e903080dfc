use std::io::ErrorKind;
use std::path::Path;

use tokio::io::AsyncWriteExt;

use crate::compiler::CompiledPage;
use crate::error::Error;

/// Write every rendered page under `dest` as `<name>.html`.
///
/// The destination is created recursively if absent. Writes touch distinct
/// files and are issued concurrently; a failure in one does not roll back
/// files already flushed by the others.
pub async fn write_all(dest: &Path, pages: &[CompiledPage], overwrite: bool) -> Result<(), Error> {
    if let Err(e) = tokio::fs::create_dir_all(dest).await {
        // Racing another creator is fine; anything else (including a file
        // squatting on the destination path) is fatal.
        let usable = tokio::fs::metadata(dest)
            .await
            .map(|m| m.is_dir())
            .unwrap_or(false);
        if !usable {
            return Err(Error::Destination {
                path: dest.to_path_buf(),
                source: e,
            });
        }
    }

    let writes = pages.iter().map(|page| write_page(dest, page, overwrite));
    futures::future::try_join_all(writes).await?;

    tracing::info!(count = pages.len(), dest = %dest.display(), "wrote output files");
    Ok(())
}

async fn write_page(dest: &Path, page: &CompiledPage, overwrite: bool) -> Result<(), Error> {
    let path = dest.join(format!("{}.html", page.name));

    if overwrite {
        tokio::fs::write(&path, &page.html)
            .await
            .map_err(|e| Error::io(&path, e))?;
    } else {
        // Fail-closed collision policy: create-new semantics make the
        // existence check and the write one atomic operation.
        let mut file = tokio::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .await
            .map_err(|e| match e.kind() {
                ErrorKind::AlreadyExists => Error::FileExists(page.name.clone()),
                _ => Error::io(&path, e),
            })?;
        file.write_all(page.html.as_bytes())
            .await
            .map_err(|e| Error::io(&path, e))?;
        // Dropping a tokio File does not flush its buffer; flush explicitly
        // so the bytes are on disk when this future resolves.
        file.flush().await.map_err(|e| Error::io(&path, e))?;
    }

    tracing::debug!(page = %page.name, "wrote page");
    Ok(())
}
