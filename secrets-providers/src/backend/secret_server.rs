//! Thycotic (Delinea) Secret Server.
//!
//! Tokens come from the OAuth2 password grant at `/oauth2/token`; secrets
//! are read from `/api/v1/secrets/{id}` with a bearer token.

use super::{
    GrantRequest, ReadError, VaultBackend, endpoint_url, field_text, grant_failure,
    grant_transport_error, parse_base_url, read_failure,
};
use crate::bundle::CredentialBundle;
use crate::error::{AuthError, AuthResult, ConfigError, ConfigResult};
use crate::secret::{SecretDocument, SecretField};
use crate::selector::AuthStrategy;
use crate::session::Session;
use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, instrument};
use url::Url;

/// Token lifetime assumed when the grant response omits `expires_in`.
const DEFAULT_TOKEN_LIFETIME: Duration = Duration::from_secs(20 * 60);

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<u64>,
}

#[derive(Deserialize)]
struct SecretResponse {
    #[serde(default)]
    items: Vec<SecretItem>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SecretItem {
    slug: String,
    #[serde(default)]
    field_name: Option<String>,
    #[serde(default)]
    item_value: serde_json::Value,
}

/// Secret Server, self-hosted or cloud.
#[derive(Debug, Clone)]
pub struct SecretServerBackend {
    base_url: Url,
    http: Client,
}

impl SecretServerBackend {
    /// Backend for an explicit base URL.
    #[must_use]
    pub const fn new(base_url: Url, http: Client) -> Self {
        Self { base_url, http }
    }

    /// Backend for the deployment described by a credential bundle.
    ///
    /// # Errors
    ///
    /// See [`SecretServerBackend::resolve_base_url`].
    pub fn from_bundle(bundle: &CredentialBundle, tld: &str, http: Client) -> ConfigResult<Self> {
        Ok(Self::new(Self::resolve_base_url(bundle, tld)?, http))
    }

    /// Cloud tenants live at `https://{tenant}.secretservercloud.{tld}`;
    /// self-hosted servers need `base_url`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingTenant`], [`ConfigError::MissingBaseUrl`]
    /// or [`ConfigError::InvalidBaseUrl`].
    pub fn resolve_base_url(bundle: &CredentialBundle, tld: &str) -> ConfigResult<Url> {
        if bundle.cloud_based() {
            let tenant = bundle.tenant().ok_or(ConfigError::MissingTenant)?;
            parse_base_url(&format!("https://{tenant}.secretservercloud.{tld}"))
        } else {
            parse_base_url(bundle.base_url().ok_or(ConfigError::MissingBaseUrl)?)
        }
    }
}

#[async_trait]
impl VaultBackend for SecretServerBackend {
    fn kind(&self) -> &'static str {
        "thycotic"
    }

    fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn supports(&self, _strategy: AuthStrategy) -> bool {
        true
    }

    #[instrument(
        skip(self, request),
        fields(username = %request.username, domain = ?request.domain)
    )]
    async fn password_grant(&self, request: GrantRequest<'_>) -> AuthResult<Session> {
        let mut form = vec![
            ("grant_type", "password"),
            ("username", request.username),
            ("password", request.password.expose_secret()),
        ];
        if let Some(domain) = request.domain {
            form.push(("domain", domain));
        }

        let response = self
            .http
            .post(endpoint_url(&self.base_url, ["oauth2", "token"]))
            .form(&form)
            .send()
            .await
            .map_err(|e| grant_transport_error(&e))?;

        if !response.status().is_success() {
            return Err(grant_failure(response).await);
        }

        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| AuthError::InvalidResponse(e.to_string()))?;

        let ttl = token
            .expires_in
            .map_or(DEFAULT_TOKEN_LIFETIME, Duration::from_secs);
        debug!(ttl_secs = ttl.as_secs(), "Obtained Secret Server token");

        Ok(Session::expiring(SecretString::from(token.access_token), ttl))
    }

    fn normalize_reference(&self, path_or_id: &str) -> Result<String, String> {
        match path_or_id.trim().parse::<u64>() {
            Ok(id) if id > 0 => Ok(id.to_string()),
            _ => Err(format!(
                "secret id must be a positive integer, got {path_or_id:?}"
            )),
        }
    }

    #[instrument(skip(self, session))]
    async fn read_secret(
        &self,
        session: &Session,
        path_or_id: &str,
    ) -> Result<SecretDocument, ReadError> {
        let url = endpoint_url(&self.base_url, ["api", "v1", "secrets", path_or_id]);
        let response = self
            .http
            .get(url)
            .bearer_auth(session.access_token().expose_secret())
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(read_failure(response).await);
        }

        let secret: SecretResponse = response.json().await?;
        let fields = secret
            .items
            .into_iter()
            .map(|item| {
                let field = SecretField::new(item.slug, field_text(&item.item_value));
                match item.field_name {
                    Some(name) => field.with_label(name),
                    None => field,
                }
            })
            .collect();

        Ok(SecretDocument::new(fields))
    }
}
