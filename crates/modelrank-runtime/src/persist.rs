//! Report file persistence.

use modelrank_core::report_block;
use std::io;
use std::path::Path;
use tokio::io::AsyncWriteExt;

/// Append `report` to `path` as one separated block, creating the file if missing.
pub async fn append_report(path: &Path, report: &str) -> io::Result<()> {
    let mut file = tokio::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .await?;
    file.write_all(report_block(report).as_bytes()).await?;
    file.flush().await?;
    tracing::info!(path = %path.display(), "Report appended");
    Ok(())
}
