use crate::error::InstallerError;
use log::{debug, info, warn};
use reqwest::{Client, Response};
use std::{
    fs::{self, File},
    io::{self, Write},
    path::Path,
};

/// A progress report, sent after every chunk of the response body is written.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Progress {
    /// The number of bytes written so far.
    pub downloaded: u64,
    /// The content length of the response, if the server sent a non-zero one.
    pub total: Option<u64>,
}

impl Progress {
    /// Returns the percentage downloaded, or `None` if the total size is unknown.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn percent(&self) -> Option<f64> {
        self.total
            .filter(|t| *t > 0)
            .map(|t| self.downloaded as f64 / t as f64 * 100.0)
    }
}

/// Downloads `url` to `destination`, calling `on_progress` after every chunk. Returns the number of
/// bytes written.
///
/// If a file already exists at `destination`, nothing is requested and this returns `Ok(0)`. The
/// existing file is not checked in any way.
///
/// # Errors
///
/// * [`InstallerError::Fetch`] if the request fails or the body cannot be read.
/// * [`InstallerError::DownloadStatus`] if the response status is not a success.
/// * [`InstallerError::Filesystem`] if the destination cannot be created or written.
///
/// If anything fails after the destination file was created, the partial file is deleted before
/// the error is returned.
pub async fn fetch<F>(
    url: &str,
    destination: &Path,
    client: &Client,
    on_progress: F,
) -> Result<u64, InstallerError>
where
    F: FnMut(Progress),
{
    fetch_with(url, destination, client, on_progress, |p: &Path| File::create(p)).await
}

async fn fetch_with<F, W, C>(
    url: &str,
    destination: &Path,
    client: &Client,
    on_progress: F,
    create: C,
) -> Result<u64, InstallerError>
where
    F: FnMut(Progress),
    W: Write,
    C: FnOnce(&Path) -> io::Result<W>,
{
    if destination.exists() {
        info!(
            "Artifact already exists at {}, skipping download",
            destination.display()
        );
        return Ok(0);
    }

    info!("Downloading from: {url}");
    let resp = client
        .get(url)
        .send()
        .await
        .map_err(|e| InstallerError::fetch(url, &e))?;
    if !resp.status().is_success() {
        return Err(InstallerError::DownloadStatus {
            url: url.to_string(),
            status: resp.status().to_string(),
        });
    }

    let total = resp.content_length().filter(|l| *l > 0);
    if let Some(total) = total {
        info!("File size: {}", megabytes(total));
    }

    let writer = create(destination)
        .map_err(|e| InstallerError::filesystem("failed to create", destination, e))?;
    debug!("created {}", destination.display());

    match copy_body(resp, writer, total, on_progress, url, destination).await {
        Ok(written) => {
            info!("Downloaded {} to {}", megabytes(written), destination.display());
            Ok(written)
        }
        Err(e) => {
            discard_partial(destination);
            Err(e)
        }
    }
}

// The writer is moved in so that it is closed by the time the caller may need to delete the file.
async fn copy_body<F, W>(
    mut resp: Response,
    mut writer: W,
    total: Option<u64>,
    mut on_progress: F,
    url: &str,
    destination: &Path,
) -> Result<u64, InstallerError>
where
    F: FnMut(Progress),
    W: Write,
{
    let write_err = |e: io::Error| InstallerError::filesystem("failed to write to", destination, e);

    let mut downloaded = 0u64;
    while let Some(chunk) = resp
        .chunk()
        .await
        .map_err(|e| InstallerError::fetch(url, &e))?
    {
        writer.write_all(&chunk).map_err(write_err)?;
        downloaded += chunk.len() as u64;
        on_progress(Progress { downloaded, total });
    }
    writer.flush().map_err(write_err)?;

    Ok(downloaded)
}

fn discard_partial(destination: &Path) {
    debug!("removing partial download at {}", destination.display());
    if let Err(e) = fs::remove_file(destination) {
        if e.kind() != io::ErrorKind::NotFound {
            warn!(
                "Could not remove partial download at {}: {e}",
                destination.display()
            );
        }
    }
}

#[allow(clippy::cast_precision_loss)]
fn megabytes(bytes: u64) -> String {
    format!("{:.2} MB", bytes as f64 / (1024.0 * 1024.0))
}
