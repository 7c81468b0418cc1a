//! Docker Registry HTTP API v2 tag listing.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use std::time::Duration;

use async_trait::async_trait;
use log::{debug, warn};
use regex::Regex;
use reqwest::header::{ACCEPT, LINK, WWW_AUTHENTICATE};
use reqwest::{Certificate, Client, Response, StatusCode, Url};
use secrecy::ExposeSecret;
use serde::Deserialize;

use super::auth::{fetch_bearer_token, Challenge};
use super::error::RegistryError;
use super::TagLister;
use crate::context::ConnectionContext;
use crate::reference::{RegistryReference, DEFAULT_DOMAIN};

/// Default connect timeout for registry requests (10 seconds).
const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Default request timeout for registry requests (60 seconds).
const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Docker Hub serves its API from a different host than its image names.
const DOCKER_HUB_API_HOST: &str = "registry-1.docker.io";

/// Upper bound on tag list pages followed for one repository.
const MAX_TAG_PAGES: usize = 1000;

/// Per-host certificate directories consulted when no cert dir is configured.
const SYSTEM_CERT_DIRS: &[&str] = &["/etc/containers/certs.d", "/etc/docker/certs.d"];

static RE_LINK_NEXT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"<([^>]+)>\s*;\s*rel="?next"?"#).unwrap());

#[derive(Debug, Deserialize)]
struct TagList {
    #[serde(default)]
    tags: Option<Vec<String>>,
}

enum Authorization {
    Anonymous,
    Bearer(String),
    Basic,
}

/// Lists repository tags over HTTPS.
pub struct HttpTagLister {
    connect_timeout: Duration,
    request_timeout: Duration,
    plain_http: bool,
    system_cert_dirs: Vec<PathBuf>,
}

impl Default for HttpTagLister {
    fn default() -> Self {
        Self {
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            plain_http: false,
            system_cert_dirs: SYSTEM_CERT_DIRS.iter().map(PathBuf::from).collect(),
        }
    }
}

impl HttpTagLister {
    pub fn new() -> Self {
        Self::default()
    }

    /// A lister that talks plain HTTP, for registries without TLS.
    pub fn plain_http() -> Self {
        Self {
            plain_http: true,
            ..Self::default()
        }
    }

    pub fn with_timeouts(mut self, connect: Duration, request: Duration) -> Self {
        self.connect_timeout = connect;
        self.request_timeout = request;
        self
    }

    /// Overrides the directories searched for `<dir>/<registry host>/*.crt`.
    pub fn with_system_cert_dirs(mut self, dirs: Vec<PathBuf>) -> Self {
        self.system_cert_dirs = dirs;
        self
    }

    fn cert_dir_for(&self, ctx: &ConnectionContext, domain: &str) -> Option<PathBuf> {
        if let Some(dir) = &ctx.cert_dir {
            return Some(dir.clone());
        }
        self.system_cert_dirs
            .iter()
            .map(|base| base.join(domain))
            .find(|dir| dir.is_dir())
    }

    fn build_client(&self, ctx: &ConnectionContext, domain: &str) -> Result<Client, RegistryError> {
        let mut builder = Client::builder()
            .connect_timeout(self.connect_timeout)
            .timeout(self.request_timeout)
            .user_agent(concat!("regsync/", env!("CARGO_PKG_VERSION")));

        if ctx.skips_tls_verify() {
            builder = builder.danger_accept_invalid_certs(true);
        }

        if let Some(dir) = self.cert_dir_for(ctx, domain) {
            for cert in load_root_certificates(&dir)? {
                builder = builder.add_root_certificate(cert);
            }
        }

        builder
            .build()
            .map_err(|e| RegistryError::Tls(format!("Failed to create HTTP client: {}", e)))
    }

    async fn send(
        &self,
        client: &Client,
        url: &Url,
        ctx: &ConnectionContext,
        authorization: &Authorization,
    ) -> reqwest::Result<Response> {
        let mut request = client.get(url.clone()).header(ACCEPT, "application/json");
        match authorization {
            Authorization::Anonymous => {}
            Authorization::Bearer(token) => request = request.bearer_auth(token),
            Authorization::Basic => {
                if let Some(creds) = ctx.effective_credentials() {
                    request =
                        request.basic_auth(&creds.username, Some(creds.password.expose_secret()));
                }
            }
        }
        request.send().await
    }

    /// Sends a GET, answering at most one authentication challenge.
    async fn get_authorized(
        &self,
        client: &Client,
        url: &mut Url,
        ctx: &ConnectionContext,
        repository: &RegistryReference,
        authorization: &mut Authorization,
    ) -> Result<Response, RegistryError> {
        let mut challenged = false;

        loop {
            let response = match self.send(client, url, ctx, authorization).await {
                Ok(response) => response,
                Err(e)
                    if e.is_connect()
                        && url.scheme() == "https"
                        && ctx.insecure_skip_tls_verify.is_true() =>
                {
                    warn!(
                        "HTTPS connection to {} failed ({}), falling back to HTTP",
                        repository.domain(),
                        e
                    );
                    let _ = url.set_scheme("http");
                    continue;
                }
                Err(e) => return Err(e.into()),
            };

            match response.status() {
                status if status.is_success() => return Ok(response),
                StatusCode::UNAUTHORIZED if !challenged => {
                    challenged = true;
                    let header = response
                        .headers()
                        .get(WWW_AUTHENTICATE)
                        .and_then(|v| v.to_str().ok())
                        .ok_or_else(|| {
                            RegistryError::Unauthorized(format!(
                                "{} requires authentication",
                                repository.name()
                            ))
                        })?;

                    match Challenge::parse(header)? {
                        Challenge::Bearer {
                            realm,
                            service,
                            scope,
                        } => {
                            let token = fetch_bearer_token(
                                client,
                                &realm,
                                service.as_deref(),
                                scope.as_deref(),
                                repository.path(),
                                ctx.effective_credentials(),
                            )
                            .await?;
                            *authorization = Authorization::Bearer(token);
                        }
                        Challenge::Basic => {
                            if ctx.effective_credentials().is_none() {
                                return Err(RegistryError::Unauthorized(format!(
                                    "{} requires credentials",
                                    repository.name()
                                )));
                            }
                            *authorization = Authorization::Basic;
                        }
                    }
                }
                StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                    return Err(RegistryError::Unauthorized(format!(
                        "access to {} denied (HTTP {})",
                        repository.name(),
                        response.status().as_u16()
                    )));
                }
                StatusCode::NOT_FOUND => {
                    return Err(RegistryError::NotFound(repository.name()));
                }
                status => {
                    let message = response.text().await.unwrap_or_default();
                    return Err(RegistryError::Status {
                        status: status.as_u16(),
                        message: truncate(&message),
                    });
                }
            }
        }
    }
}

#[async_trait]
impl TagLister for HttpTagLister {
    async fn list_tags(
        &self,
        ctx: &ConnectionContext,
        repository: &RegistryReference,
    ) -> Result<Vec<String>, RegistryError> {
        let client = self.build_client(ctx, repository.domain())?;
        let scheme = if self.plain_http { "http" } else { "https" };
        let mut url = Url::parse(&format!(
            "{}://{}/v2/{}/tags/list",
            scheme,
            api_host(repository.domain()),
            repository.path()
        ))
        .map_err(|e| RegistryError::InvalidResponse(format!("invalid registry URL: {}", e)))?;

        let mut authorization = match &ctx.registry_token {
            Some(token) => Authorization::Bearer(token.expose().to_string()),
            None => Authorization::Anonymous,
        };

        let mut tags = Vec::new();
        let mut visited = HashSet::new();
        loop {
            if !visited.insert(url.clone()) {
                return Err(RegistryError::InvalidResponse(format!(
                    "tag list pagination for {} revisits {}",
                    repository.name(),
                    url.path()
                )));
            }
            if visited.len() > MAX_TAG_PAGES {
                return Err(RegistryError::InvalidResponse(format!(
                    "tag list for {} exceeds {} pages",
                    repository.name(),
                    MAX_TAG_PAGES
                )));
            }

            let response = self
                .get_authorized(&client, &mut url, ctx, repository, &mut authorization)
                .await?;

            let next = response
                .headers()
                .get(LINK)
                .and_then(|v| v.to_str().ok())
                .and_then(|link| parse_next_link(link, &url));

            let page: TagList = response.json().await?;
            tags.extend(page.tags.unwrap_or_default());

            match next {
                Some(next_url) => {
                    debug!("Following tag list pagination to {}", next_url.path());
                    url = next_url;
                }
                None => break,
            }
        }

        Ok(tags)
    }
}

fn api_host(domain: &str) -> &str {
    if domain == DEFAULT_DOMAIN {
        DOCKER_HUB_API_HOST
    } else {
        domain
    }
}

/// Extracts the `rel="next"` target of a `Link` header, resolved against `base`.
pub fn parse_next_link(header: &str, base: &Url) -> Option<Url> {
    let caps = RE_LINK_NEXT.captures(header)?;
    base.join(&caps[1]).ok()
}

const PEM_CERTIFICATE_HEADER: &str = "-----BEGIN CERTIFICATE-----";

/// Loads every `*.crt` in `dir` as an extra root certificate.
///
/// A missing directory is not an error.
fn load_root_certificates(dir: &Path) -> Result<Vec<Certificate>, RegistryError> {
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => {
            return Err(RegistryError::Tls(format!(
                "Failed to read certificate directory '{}': {}",
                dir.display(),
                e
            )))
        }
    };

    let mut paths: Vec<PathBuf> = entries
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| p.extension().and_then(|e| e.to_str()) == Some("crt"))
        .collect();
    paths.sort();

    paths
        .iter()
        .map(|path| {
            let pem = std::fs::read(path).map_err(|e| {
                RegistryError::Tls(format!("Failed to read '{}': {}", path.display(), e))
            })?;
            if !String::from_utf8_lossy(&pem).contains(PEM_CERTIFICATE_HEADER) {
                return Err(RegistryError::Tls(format!(
                    "'{}' holds no PEM certificate",
                    path.display()
                )));
            }
            debug!("Adding root certificate {}", path.display());
            Certificate::from_pem(&pem).map_err(|e| {
                RegistryError::Tls(format!("Invalid certificate '{}': {}", path.display(), e))
            })
        })
        .collect()
}

/// Maximum length for error bodies carried into error messages.
const MAX_ERROR_BODY_LENGTH: usize = 200;

fn truncate(body: &str) -> String {
    let body = body.trim();
    if body.len() > MAX_ERROR_BODY_LENGTH {
        let mut end = MAX_ERROR_BODY_LENGTH;
        while !body.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}... (truncated)", &body[..end])
    } else {
        body.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_docker_hub_api_host() {
        assert_eq!(api_host("docker.io"), "registry-1.docker.io");
        assert_eq!(api_host("quay.io"), "quay.io");
    }

    #[test]
    fn test_parse_next_link_relative() {
        let base = Url::parse("https://quay.io/v2/foo/bar/tags/list").unwrap();
        let next = parse_next_link(
            r#"</v2/foo/bar/tags/list?last=v2&n=100>; rel="next""#,
            &base,
        )
        .unwrap();
        assert_eq!(
            next.as_str(),
            "https://quay.io/v2/foo/bar/tags/list?last=v2&n=100"
        );
    }

    #[test]
    fn test_parse_next_link_absent() {
        let base = Url::parse("https://quay.io/v2/foo/tags/list").unwrap();
        assert!(parse_next_link(r#"</v2/foo/tags/list>; rel="prev""#, &base).is_none());
    }

    #[test]
    fn test_missing_cert_dir_is_empty() {
        let certs = load_root_certificates(Path::new("/nonexistent/regsync-certs")).unwrap();
        assert!(certs.is_empty());
    }

    #[test]
    fn test_invalid_certificate_rejected() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("ca.crt"), b"not a certificate").unwrap();
        std::fs::write(dir.path().join("README"), b"ignored").unwrap();

        assert!(matches!(
            load_root_certificates(dir.path()),
            Err(RegistryError::Tls(_))
        ));
    }

    #[test]
    fn test_system_cert_dir_lookup() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir(dir.path().join("registry.example.com")).unwrap();

        let lister = HttpTagLister::new().with_system_cert_dirs(vec![dir.path().to_path_buf()]);
        let ctx = ConnectionContext::default();
        assert_eq!(
            lister.cert_dir_for(&ctx, "registry.example.com"),
            Some(dir.path().join("registry.example.com"))
        );
        assert!(lister.cert_dir_for(&ctx, "quay.io").is_none());

        let explicit = ConnectionContext {
            cert_dir: Some(PathBuf::from("/explicit")),
            ..Default::default()
        };
        assert_eq!(
            lister.cert_dir_for(&explicit, "registry.example.com"),
            Some(PathBuf::from("/explicit"))
        );
    }

    #[test]
    fn test_truncate_long_body() {
        let body = "x".repeat(500);
        let truncated = truncate(&body);
        assert!(truncated.ends_with("... (truncated)"));
        assert!(truncated.len() < 250);
    }
}
