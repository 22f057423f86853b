use crate::{config::ProxyConfig, error::InstallerError};
use anyhow::Result;
use log::{debug, info};
use reqwest::{
    header::{HeaderMap, HeaderValue, USER_AGENT},
    Client, Proxy,
};
use url::Url;

/// Builds the client used for every request the installer makes. When `proxy` is given, requests
/// go through it unless the target host matches the proxy's no-proxy list.
///
/// # Errors
///
/// Returns [`InstallerError::InvalidProxyUrl`] if the proxy URL cannot be parsed or cannot carry
/// the configured credentials. This happens before any request is made.
pub fn http_client(proxy: Option<&ProxyConfig>) -> Result<Client> {
    let mut builder = Client::builder();

    let mut headers = HeaderMap::new();
    headers.insert(
        USER_AGENT,
        HeaderValue::from_str(&format!("moderne-cli-installer version {}", super::VERSION))?,
    );
    builder = builder.default_headers(headers);

    if let Some(proxy) = proxy {
        let proxy_url = proxy_url(proxy)?;
        info!("Using proxy: {}", redacted(&proxy_url));

        let no_proxy = proxy.no_proxy.clone();
        builder = builder.proxy(Proxy::custom(move |url| {
            let host = url.host_str().unwrap_or_default();
            let host = host.trim_start_matches('[').trim_end_matches(']');
            if bypasses_proxy(host, &no_proxy) {
                debug!("not using the proxy for {host}");
                None
            } else {
                Some(proxy_url.clone())
            }
        }));
    }

    Ok(builder.build()?)
}

/// Parses the proxy URL and puts the username and password, if a username was given, into its
/// user-info part.
pub(crate) fn proxy_url(proxy: &ProxyConfig) -> Result<Url, InstallerError> {
    let invalid = |message: String| InstallerError::InvalidProxyUrl {
        url: proxy.url.clone(),
        message,
    };

    let mut url = Url::parse(&proxy.url).map_err(|e| invalid(e.to_string()))?;
    if let Some(username) = proxy.username.as_deref().filter(|u| !u.is_empty()) {
        url.set_username(username)
            .map_err(|()| invalid("this URL cannot have a username".to_string()))?;
        url.set_password(proxy.password.as_deref())
            .map_err(|()| invalid("this URL cannot have a password".to_string()))?;
    }

    Ok(url)
}

fn redacted(url: &Url) -> Url {
    let mut url = url.clone();
    if url.password().is_some() {
        // This cannot fail, since the URL already has a password.
        let _ = url.set_password(Some("****"));
    }
    url
}

/// Returns true if `host` is equal to, or ends with, one of the entries in `no_proxy`. Entries are
/// trimmed and empty entries are ignored.
#[must_use]
pub fn bypasses_proxy(host: &str, no_proxy: &[String]) -> bool {
    no_proxy
        .iter()
        .map(|e| e.trim())
        .filter(|e| !e.is_empty())
        .any(|e| host == e || host.ends_with(e))
}
