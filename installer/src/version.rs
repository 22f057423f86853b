use crate::error::InstallerError;
use log::debug;
use quick_xml::{events::Event, Reader};
use reqwest::Client;
use serde::Deserialize;

/// The path, relative to the base URL, of the Maven metadata document.
pub(crate) const METADATA_FILE_NAME: &str = "maven-metadata.xml";

const METADATA_ROOT: &str = "metadata";

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct MavenMetadata {
    versioning: Versioning,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Versioning {
    latest: Option<String>,
    release: Option<String>,
}

impl MavenMetadata {
    // `<latest>` wins over `<release>`. Empty elements count as absent.
    fn version(self) -> Option<String> {
        let Versioning { latest, release } = self.versioning;
        [latest, release]
            .into_iter()
            .flatten()
            .map(|v| v.trim().to_string())
            .find(|v| !v.is_empty())
    }
}

/// Looks up the version to install from the `maven-metadata.xml` document under `base_url`.
///
/// # Errors
///
/// * [`InstallerError::Fetch`] if the request fails or the response status is not a success.
/// * [`InstallerError::Parse`] if the body is not a valid metadata document.
/// * [`InstallerError::NoVersionFound`] if neither `<latest>` nor `<release>` has a value.
pub async fn resolve_latest(base_url: &str, client: &Client) -> Result<String, InstallerError> {
    let url = format!("{base_url}/{METADATA_FILE_NAME}");
    debug!("Getting version metadata from `{url}`");

    let resp = client
        .get(&url)
        .send()
        .await
        .map_err(|e| InstallerError::fetch(&url, &e))?;
    if let Err(e) = resp.error_for_status_ref() {
        return Err(InstallerError::fetch(&url, &e));
    }

    let body = resp
        .text()
        .await
        .map_err(|e| InstallerError::fetch(&url, &e))?;
    let metadata = parse_metadata(&body).map_err(|message| InstallerError::Parse {
        url: url.clone(),
        message,
    })?;

    let version = metadata
        .version()
        .ok_or_else(|| InstallerError::NoVersionFound(url.clone()))?;
    debug!("metadata at `{url}` names version {version}");

    Ok(version)
}

// The serde layer ignores the name of the root element, so an HTML page served with a 200 status
// would otherwise parse as metadata with no versions in it.
fn parse_metadata(body: &str) -> Result<MavenMetadata, String> {
    match root_element(body).map_err(|e| e.to_string())? {
        Some(name) if name == METADATA_ROOT => {}
        Some(name) => {
            return Err(format!(
                "expected a <{METADATA_ROOT}> document but the root element is <{name}>"
            ));
        }
        None => return Err("the document has no root element".to_string()),
    }

    quick_xml::de::from_str::<MavenMetadata>(body).map_err(|e| e.to_string())
}

fn root_element(body: &str) -> Result<Option<String>, quick_xml::Error> {
    let mut reader = Reader::from_str(body);
    loop {
        let event = reader.read_event()?;
        if let Event::Start(e) | Event::Empty(e) = &event {
            return Ok(Some(
                String::from_utf8_lossy(e.local_name().as_ref()).into_owned(),
            ));
        }
        if matches!(event, Event::Eof) {
            return Ok(None);
        }
    }
}
