//! Storage commands.

use super::CommandResult;
use hostlink_core::storage::public_url as object_public_url;
use hostlink_core::{BackendFacade, BackendService, FacadeConfig, UploadOptions};
use std::fs;
use std::io::Write;
use std::path::Path;
use tracing::info;

/// Uploads a local file and prints the stored key.
pub async fn upload<S: BackendService>(
    facade: &BackendFacade<S>,
    bucket: &str,
    path: &str,
    file: &Path,
    upsert: bool,
    content_type: Option<String>,
    out: &mut impl Write,
) -> CommandResult {
    let data = fs::read(file).map_err(|e| format!("cannot read {}: {e}", file.display()))?;
    let options = UploadOptions {
        upsert,
        content_type,
    };
    let stored = facade.upload_with(bucket, path, data, &options).await?;
    writeln!(out, "{}", stored.key)?;
    Ok(())
}

/// Downloads an object to `output`, or to `out` when no file is given.
pub async fn download<S: BackendService>(
    facade: &BackendFacade<S>,
    bucket: &str,
    path: &str,
    output: Option<&Path>,
    out: &mut impl Write,
) -> CommandResult {
    let data = facade.download(bucket, path).await?;
    match output {
        Some(file) => {
            fs::write(file, &data).map_err(|e| format!("cannot write {}: {e}", file.display()))?;
            info!(bytes = data.len(), file = %file.display(), "object saved");
        }
        None => out.write_all(&data)?,
    }
    Ok(())
}

/// Prints the public URL of an object.
pub fn public_url(
    config: &FacadeConfig,
    bucket: &str,
    path: &str,
    out: &mut impl Write,
) -> CommandResult {
    writeln!(out, "{}", object_public_url(&config.base_url, bucket, path))?;
    Ok(())
}
