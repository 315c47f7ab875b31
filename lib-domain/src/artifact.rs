use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use lib_core::{AppResult, ErrType};

const DOWNLOAD_PREFIX: &str = "comparison_result";

/// Save-as name of a downloaded diff, dated by the caller
pub fn download_file_name(date: NaiveDate) -> String {
    format!("{DOWNLOAD_PREFIX}_{}.png", date.format("%Y-%m-%d"))
}

pub fn today() -> NaiveDate {
    chrono::Utc::now().date_naive()
}

/// Write downloaded diff bytes into `dir`, creating it when missing
pub async fn save_download(dir: &Path, bytes: &[u8], date: NaiveDate) -> AppResult<PathBuf> {
    tokio::fs::create_dir_all(dir)
        .await
        .map_err(|err| ErrType::FsError.err(err, format!("Failed to create {}", dir.display())))?;

    let path = dir.join(download_file_name(date));
    tokio::fs::write(&path, bytes)
        .await
        .map_err(|err| ErrType::FsError.err(err, format!("Failed to save diff to {}", path.display())))?;

    tracing::info!(message = "Saved diff artifact", path = %path.display(), size = bytes.len());
    Ok(path)
}
