//! Resource list input.
//!
//! The resource identifiers to fetch come from a newline-delimited UTF-8
//! file. Blank lines are preserved here and skipped (and counted) by the
//! queue layer.

use std::path::Path;

use crate::error::Result;

/// Read a newline-delimited resource list
pub async fn read_file_list(path: &Path) -> Result<Vec<String>> {
    let contents = tokio::fs::read_to_string(path).await?;
    Ok(contents.lines().map(str::to_string).collect())
}
