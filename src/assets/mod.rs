use crate::Overlay;
use indicatif::{ProgressBar, ProgressStyle};
use reqwest::blocking::Client;
use std::{fs, path::{Path, PathBuf}, time::Duration};
use thiserror::Error;
use tracing::{info, warn};

const REQUEST_TIMEOUT_SECONDS: u64 = 30;

#[derive(Debug, Error)]
pub enum AssetError {
    #[error("could not write {path}: {source}")]
    Io { path: PathBuf, source: std::io::Error },
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("bad progress template: {0}")]
    Template(#[from] indicatif::style::TemplateError),
}

/// What a collection run did with each overlay.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Collected {
    pub downloaded: Vec<String>,
    pub skipped: Vec<String>,
    pub failed: Vec<String>,
}

/// Overlays that share a file name are only fetched once.
fn unique_assets(overlays: &[Overlay]) -> Vec<&Overlay> {
    let mut seen = std::collections::HashSet::new();
    overlays.iter().filter(|overlay| seen.insert(overlay.name.as_str())).collect()
}

/// Download every overlay image into `dir`. Files that already exist are kept;
/// a failed download is logged and the rest still run.
pub fn collect(overlays: &[Overlay], dir: &Path) -> Result<Collected, AssetError> {
    fs::create_dir_all(dir).map_err(|source| AssetError::Io {
        path: dir.to_path_buf(),
        source,
    })?;

    let assets = unique_assets(overlays);
    let client = Client::builder()
        .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
        .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECONDS))
        .build()?;

    let bar = ProgressBar::new(assets.len() as u64);
    bar.set_style(ProgressStyle::with_template(
        " [{elapsed_precise}] {prefix:<22} {bar:30.cyan/red} {pos}/{len} {msg} {spinner}",
    )?);
    bar.set_prefix("Collecting overlays");

    let mut collected = Collected::default();
    for overlay in assets {
        let path = dir.join(&overlay.name);
        if path.exists() {
            bar.set_message(format!("Already have {}, skipping", overlay.name));
            collected.skipped.push(overlay.name.clone());
            bar.inc(1);
            continue;
        }

        bar.set_message(overlay.name.clone());
        match download(&client, &overlay.url) {
            Ok(bytes) => {
                fs::write(&path, bytes).map_err(|source| AssetError::Io {
                    path: path.clone(),
                    source,
                })?;
                collected.downloaded.push(overlay.name.clone());
            }
            Err(err) => {
                warn!(asset = %overlay.name, url = %overlay.url, %err, "download failed");
                collected.failed.push(overlay.name.clone());
            }
        }
        bar.inc(1);
    }
    bar.finish_and_clear();

    info!(
        downloaded = collected.downloaded.len(),
        skipped = collected.skipped.len(),
        failed = collected.failed.len(),
        "collected overlays"
    );
    Ok(collected)
}

fn download(client: &Client, url: &str) -> Result<Vec<u8>, AssetError> {
    let response = client.get(url).send()?.error_for_status()?;
    Ok(response.bytes()?.to_vec())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Config;

    #[test]
    fn test_existing_files_are_skipped() {
        let dir = tempfile::TempDir::new().unwrap();
        let overlays = Config::default().overlays;
        for overlay in &overlays {
            fs::write(dir.path().join(&overlay.name), b"cached").unwrap();
        }

        let collected = collect(&overlays, dir.path()).unwrap();
        assert_eq!(collected.skipped.len(), overlays.len());
        assert!(collected.downloaded.is_empty());
        assert!(collected.failed.is_empty());
        assert_eq!(fs::read(dir.path().join(&overlays[0].name)).unwrap(), b"cached");
    }

    #[test]
    fn test_unreachable_url_is_reported_not_fatal() {
        let dir = tempfile::TempDir::new().unwrap();
        let mut overlay = Config::default().overlays.remove(0);
        overlay.url = "http://127.0.0.1:9/unreachable.png".to_string();

        let collected = collect(&[overlay.clone(), overlay], dir.path()).unwrap();
        assert_eq!(collected.failed, vec!["seasons-background.jpg".to_string()]);
        assert!(!dir.path().join("seasons-background.jpg").exists());
    }
}
