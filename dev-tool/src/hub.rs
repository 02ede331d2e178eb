use std::path::PathBuf;

use anyhow::{Context, Error};
use hf_hub::api::sync::Api;
use log::debug;

/// Resolves a file of a pretrained model, either locally or from the hub.
///
/// A local path wins over the hub. Hub downloads are cached by `hf-hub`, repeated invocations
/// resolve from the cache without network access.
pub fn resolve_pretrained_file(
    local: Option<PathBuf>,
    model: &str,
    file: &str,
) -> Result<PathBuf, Error> {
    if let Some(path) = local {
        return Ok(path);
    }

    debug!("Fetching '{}' of '{}' from the hub.", file, model);
    Api::new()
        .context("Failed to initialize the hub api")?
        .model(model.to_string())
        .get(file)
        .with_context(|| format!("Failed to fetch '{}' of '{}' from the hub", file, model))
}
