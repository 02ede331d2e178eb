use std::{io::Result, path::PathBuf};

use crate::{resolve_path, DATA_DIR};

const ASSET: &str = "finbert_v0000";

/// Resolves the path to the Bert vocabulary.
pub fn vocab() -> Result<PathBuf> {
    resolve_path(&[DATA_DIR, ASSET, "vocab.txt"])
}
