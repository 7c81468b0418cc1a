//! Registry authentication challenges and token retrieval.

use std::collections::HashMap;
use std::sync::LazyLock;

use log::debug;
use regex::Regex;
use reqwest::Client;
use secrecy::ExposeSecret;
use serde::Deserialize;

use super::error::RegistryError;
use crate::config::Credentials;
use crate::sanitize::redact_url;

static RE_CHALLENGE_PARAM: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(\w+)=(?:"([^"]*)"|([^,\s]*))"#).unwrap());

/// A parsed `WWW-Authenticate` header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Challenge {
    Bearer {
        realm: String,
        service: Option<String>,
        scope: Option<String>,
    },
    Basic,
}

impl Challenge {
    pub fn parse(header: &str) -> Result<Self, RegistryError> {
        let header = header.trim();
        let (scheme, rest) = header.split_once(' ').unwrap_or((header, ""));

        let params: HashMap<String, String> = RE_CHALLENGE_PARAM
            .captures_iter(rest)
            .map(|c| {
                let value = c.get(2).or_else(|| c.get(3)).map_or("", |m| m.as_str());
                (c[1].to_lowercase(), value.to_string())
            })
            .collect();

        match scheme.to_lowercase().as_str() {
            "bearer" => {
                let realm = params
                    .get("realm")
                    .filter(|r| !r.is_empty())
                    .cloned()
                    .ok_or_else(|| RegistryError::InvalidChallenge(header.to_string()))?;
                Ok(Challenge::Bearer {
                    realm,
                    service: params.get("service").cloned(),
                    scope: params.get("scope").cloned(),
                })
            }
            "basic" => Ok(Challenge::Basic),
            _ => Err(RegistryError::InvalidChallenge(header.to_string())),
        }
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    #[serde(default)]
    token: Option<String>,
    #[serde(default)]
    access_token: Option<String>,
}

/// Fetches a bearer token for pulling from `repository_path`.
///
/// Credentials are sent with HTTP basic auth when present; otherwise an
/// anonymous token is requested.
pub async fn fetch_bearer_token(
    client: &Client,
    realm: &str,
    service: Option<&str>,
    scope: Option<&str>,
    repository_path: &str,
    credentials: Option<&Credentials>,
) -> Result<String, RegistryError> {
    let default_scope = format!("repository:{}:pull", repository_path);
    let scope = scope.unwrap_or(&default_scope);

    let mut query: Vec<(&str, &str)> = vec![("scope", scope)];
    if let Some(service) = service {
        query.push(("service", service));
    }

    debug!("Requesting registry token from {}", redact_url(realm));

    let mut request = client.get(realm).query(&query);
    if let Some(creds) = credentials {
        request = request.basic_auth(&creds.username, Some(creds.password.expose_secret()));
    }

    let response = request.send().await?;
    let status = response.status();
    if status.as_u16() == 401 || status.as_u16() == 403 {
        return Err(RegistryError::Unauthorized(format!(
            "token request rejected with HTTP {}",
            status.as_u16()
        )));
    }
    if !status.is_success() {
        return Err(RegistryError::Status {
            status: status.as_u16(),
            message: "token request failed".to_string(),
        });
    }

    let body: TokenResponse = response.json().await?;
    body.token
        .or(body.access_token)
        .filter(|t| !t.is_empty())
        .ok_or_else(|| RegistryError::InvalidResponse("token response carried no token".into()))
}
