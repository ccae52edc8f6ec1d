//! Candidate photo download.

use crate::election::ElectionRow;
use crate::error::ScrapeError;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Wikimedia rejects requests without a browser-like agent.
pub const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
     AppleWebKit/537.36 (KHTML, like Gecko) Chrome/115.0.0.0 Safari/537.36";

pub fn photo_client() -> Result<reqwest::Client, ScrapeError> {
    Ok(reqwest::Client::builder()
        .user_agent(BROWSER_USER_AGENT)
        .build()?)
}

/// Extension of the URL's last path segment, dot included (`".jpg"`), or
/// empty when the segment has none.
pub fn url_extension(url: &str) -> &str {
    let last = url.rsplit('/').next().unwrap_or(url);
    match last.rfind('.') {
        Some(0) | None => "",
        Some(i) => &last[i..],
    }
}

/// Destination for one candidate's photo: `{dir}/{ID}{ext}`.
pub fn photo_path(dir: &Path, row: &ElectionRow) -> PathBuf {
    dir.join(format!("{}{}", row.id, url_extension(&row.photo)))
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DownloadSummary {
    pub saved: usize,
    pub failed: usize,
    pub not_downloadable: usize,
}

async fn fetch_one(client: &reqwest::Client, row: &ElectionRow, dest: &Path) -> Result<(), ScrapeError> {
    let response = client.get(&row.photo).send().await?;
    let status = response.status();
    if !status.is_success() {
        return Err(ScrapeError::Status {
            url: row.photo.clone(),
            status: status.as_u16(),
        });
    }
    let bytes = response.bytes().await?;
    tokio::fs::write(dest, &bytes).await.map_err(|source| ScrapeError::Io {
        path: dest.to_path_buf(),
        source,
    })
}

/// Download every downloadable photo in `rows` into `dir`, one request at a
/// time. Failures are logged and counted; they never abort the run.
pub async fn download_photos(
    client: &reqwest::Client,
    rows: &[ElectionRow],
    dir: &Path,
) -> Result<DownloadSummary, ScrapeError> {
    tokio::fs::create_dir_all(dir).await.map_err(|source| ScrapeError::Io {
        path: dir.to_path_buf(),
        source,
    })?;

    let mut summary = DownloadSummary::default();
    for row in rows {
        if !row.photo_downloadable {
            summary.not_downloadable += 1;
            continue;
        }
        let dest = photo_path(dir, row);
        match fetch_one(client, row, &dest).await {
            Ok(()) => summary.saved += 1,
            Err(e) => {
                warn!(id = %row.id, url = %row.photo, error = %e, "photo download failed");
                summary.failed += 1;
            }
        }
    }

    info!(
        dir = %dir.display(),
        saved = summary.saved,
        failed = summary.failed,
        skipped = summary.not_downloadable,
        "photo download complete"
    );
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(id: &str, photo: &str, downloadable: bool) -> ElectionRow {
        ElectionRow {
            year: 2018,
            state: "CA".into(),
            district: 1,
            name: "Jane Doe".into(),
            photo: photo.into(),
            photo_downloadable: downloadable,
            party: "Democratic".into(),
            votes: "1".into(),
            incumbent: 0,
            id: id.into(),
        }
    }

    #[test]
    fn test_url_extension() {
        assert_eq!(url_extension("https://x.org/a/ab/Jane_Doe.jpg"), ".jpg");
        assert_eq!(url_extension("https://x.org/a/ab/Jane.Doe.JPEG"), ".JPEG");
        assert_eq!(url_extension("https://x.org/a/ab/noext"), "");
        assert_eq!(url_extension("https://x.org/a/ab/.hidden"), "");
        assert_eq!(url_extension(""), "");
    }

    #[test]
    fn test_photo_path() {
        let r = row("CA_3_2", "https://x.org/a/Portrait.png", true);
        assert_eq!(photo_path(Path::new("out"), &r), PathBuf::from("out/CA_3_2.png"));
    }

    #[tokio::test]
    async fn test_non_downloadable_rows_make_no_requests() {
        let dir = tempfile::tempdir().unwrap();
        let client = photo_client().unwrap();
        let rows = vec![
            row("CA_1_1", "https://x.org/a/Seal.svg", false),
            row("CA_1_2", "https://x.org/a/Seal.svg", false),
        ];
        let summary = download_photos(&client, &rows, &dir.path().join("2018")).await.unwrap();
        assert_eq!(summary, DownloadSummary { saved: 0, failed: 0, not_downloadable: 2 });
        assert!(dir.path().join("2018").is_dir());
    }

    #[tokio::test]
    async fn test_unreachable_url_is_counted_not_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let client = photo_client().unwrap();
        let rows = vec![row("CA_1_1", "http://127.0.0.1:9/missing.jpg", true)];
        let summary = download_photos(&client, &rows, dir.path()).await.unwrap();
        assert_eq!(summary.failed, 1);
        assert!(!dir.path().join("CA_1_1.jpg").exists());
    }
}
