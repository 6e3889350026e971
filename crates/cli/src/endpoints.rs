//! Mapping page references (URLs or bare titles) to wiki API endpoints.

use anyhow::{anyhow, bail, Context, Result};
use url::Url;

/// Where a page lives and where its translation goes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRef {
    pub source_endpoint: String,
    pub target_endpoint: String,
    pub title: String,
    pub source_lang: String,
}

/// Replace the language label (first host label) with `lang`.
///
/// `fr.dev.example.org` → `en.dev.example.org`; single-label hosts are kept.
#[must_use]
pub fn swap_lang_in_host(host: &str, lang: &str) -> String {
    match host.split_once('.') {
        Some((_, rest)) => format!("{lang}.{rest}"),
        None => host.to_string(),
    }
}

/// Endpoint of the `lang` edition sharing `endpoint`'s host layout
pub fn endpoint_for_lang(endpoint: &str, lang: &str) -> Result<String> {
    let mut url = Url::parse(endpoint).with_context(|| format!("Invalid endpoint: {endpoint}"))?;
    let host = url
        .host_str()
        .ok_or_else(|| anyhow!("Endpoint has no host: {endpoint}"))?;
    let swapped = swap_lang_in_host(host, lang);
    url.set_host(Some(&swapped))
        .with_context(|| format!("Invalid host '{swapped}'"))?;
    Ok(url.to_string())
}

/// Resolve one input line.
///
/// A URL yields `scheme://host/api.php` for the source, the same on the
/// swapped host for the target, the decoded title after `/wiki/` and the
/// first host label as source language. A bare title needs
/// `default_endpoint`.
pub fn derive_endpoints_and_title(
    line: &str,
    target_lang: &str,
    default_endpoint: Option<&str>,
) -> Result<PageRef> {
    let line = line.trim();
    if line.starts_with("http://") || line.starts_with("https://") {
        let url = Url::parse(line).with_context(|| format!("Invalid page URL: {line}"))?;
        let host = url
            .host_str()
            .ok_or_else(|| anyhow!("Page URL has no host: {line}"))?;
        let authority = match url.port() {
            Some(port) => format!("{host}:{port}"),
            None => host.to_string(),
        };
        let path = url.path();
        let raw_title = path
            .split_once("/wiki/")
            .map_or_else(|| path.trim_start_matches('/'), |(_, title)| title);

        return Ok(PageRef {
            source_endpoint: format!("{}://{authority}/api.php", url.scheme()),
            target_endpoint: format!(
                "{}://{}/api.php",
                url.scheme(),
                swap_lang_in_host(&authority, target_lang)
            ),
            title: decode_title(raw_title),
            source_lang: first_label(host).to_string(),
        });
    }

    let Some(endpoint) = default_endpoint else {
        bail!("MEDIAWIKI_API_ENDPOINT must be set to resolve bare titles such as '{line}'");
    };
    let url = Url::parse(endpoint).with_context(|| format!("Invalid endpoint: {endpoint}"))?;
    let host = url
        .host_str()
        .ok_or_else(|| anyhow!("Endpoint has no host: {endpoint}"))?;
    Ok(PageRef {
        source_endpoint: endpoint.to_string(),
        target_endpoint: endpoint_for_lang(endpoint, target_lang)?,
        title: line.to_string(),
        source_lang: first_label(host).to_string(),
    })
}

/// TLS verification stays on unless disabled or the endpoint is a dev host
#[must_use]
pub fn verify_tls(endpoint: &str, no_verify_ssl: bool) -> bool {
    !no_verify_ssl && !endpoint.contains(".dev.")
}

fn first_label(host: &str) -> &str {
    host.split('.').next().unwrap_or(host)
}

/// Percent-decode a title; `_` and `+` stay as they are
fn decode_title(raw: &str) -> String {
    urlencoding::decode(raw).map_or_else(|_| raw.to_string(), |t| t.into_owned())
}
