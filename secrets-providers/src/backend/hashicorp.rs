//! HashiCorp Vault.
//!
//! Tokens travel in `X-Vault-Token`. Password grants use the userpass auth
//! method; secrets are read from a KV engine (v1 or v2).

use super::{
    GrantRequest, ReadError, VaultBackend, endpoint_url, field_text, grant_failure,
    grant_transport_error, read_failure,
};
use crate::error::{AuthError, AuthResult, ConfigError};
use crate::secret::{SecretDocument, SecretField};
use crate::selector::AuthStrategy;
use crate::session::Session;
use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Deserializer};
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::{debug, instrument};
use url::Url;

const TOKEN_HEADER: &str = "X-Vault-Token";

/// Version of the KV secrets engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum KvVersion {
    /// Unversioned KV
    V1,
    /// Versioned KV, data under `data/`
    #[default]
    V2,
}

impl TryFrom<&str> for KvVersion {
    type Error = ConfigError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value.trim().trim_start_matches(['v', 'V']) {
            "1" => Ok(Self::V1),
            "2" => Ok(Self::V2),
            _ => Err(ConfigError::Invalid(format!("unknown kv_version {value:?}"))),
        }
    }
}

impl<'de> Deserialize<'de> for KvVersion {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Number(u64),
            Text(String),
        }

        let text = match Raw::deserialize(deserializer)? {
            Raw::Number(n) => n.to_string(),
            Raw::Text(s) => s,
        };
        Self::try_from(text.as_str()).map_err(serde::de::Error::custom)
    }
}

#[derive(Deserialize)]
struct LoginResponse {
    auth: LoginAuth,
}

#[derive(Deserialize)]
struct LoginAuth {
    client_token: String,
    #[serde(default)]
    lease_duration: u64,
}

#[derive(Deserialize)]
struct KvV1Response {
    data: BTreeMap<String, serde_json::Value>,
}

#[derive(Deserialize)]
struct KvV2Response {
    data: KvV2Data,
}

#[derive(Deserialize)]
struct KvV2Data {
    data: BTreeMap<String, serde_json::Value>,
}

/// HashiCorp Vault with a KV secrets engine.
#[derive(Debug, Clone)]
pub struct HashicorpBackend {
    base_url: Url,
    mount_point: String,
    kv_version: KvVersion,
    http: Client,
}

impl HashicorpBackend {
    /// Backend reading from the KV engine mounted at `mount_point`.
    #[must_use]
    pub fn new(
        base_url: Url,
        mount_point: impl Into<String>,
        kv_version: KvVersion,
        http: Client,
    ) -> Self {
        let mount_point: String = mount_point.into();
        Self {
            base_url,
            mount_point: mount_point.trim_matches('/').to_string(),
            kv_version,
            http,
        }
    }

    /// Read URL for a normalized path; every segment is percent-encoded.
    fn secret_endpoint(&self, path: &str) -> Url {
        let engine = match self.kv_version {
            KvVersion::V1 => None,
            KvVersion::V2 => Some("data"),
        };
        let segments = std::iter::once("v1")
            .chain(self.mount_point.split('/').filter(|s| !s.is_empty()))
            .chain(engine)
            .chain(path.split('/'));
        endpoint_url(&self.base_url, segments)
    }
}

#[async_trait]
impl VaultBackend for HashicorpBackend {
    fn kind(&self) -> &'static str {
        "hashicorp_vault"
    }

    fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn supports(&self, strategy: AuthStrategy) -> bool {
        matches!(strategy, AuthStrategy::PasswordGrant | AuthStrategy::AccessToken)
    }

    #[instrument(skip(self, request), fields(username = %request.username))]
    async fn password_grant(&self, request: GrantRequest<'_>) -> AuthResult<Session> {
        if request.domain.is_some() {
            return Err(AuthError::UnsupportedStrategy(AuthStrategy::DomainPasswordGrant));
        }

        let url = endpoint_url(
            &self.base_url,
            ["v1", "auth", "userpass", "login", request.username],
        );
        let body = serde_json::json!({ "password": request.password.expose_secret() });

        let response = self
            .http
            .post(url)
            .json(&body)
            .send()
            .await
            .map_err(|e| grant_transport_error(&e))?;

        if !response.status().is_success() {
            return Err(grant_failure(response).await);
        }

        let login: LoginResponse = response
            .json()
            .await
            .map_err(|e| AuthError::InvalidResponse(e.to_string()))?;

        let token = SecretString::from(login.auth.client_token);
        debug!(lease_secs = login.auth.lease_duration, "Authenticated with Vault userpass");

        Ok(match login.auth.lease_duration {
            0 => Session::non_expiring(token),
            secs => Session::expiring(token, Duration::from_secs(secs)),
        })
    }

    fn normalize_reference(&self, path_or_id: &str) -> Result<String, String> {
        let path = path_or_id.trim().trim_matches('/');
        if path.is_empty() {
            return Err("path must not be empty".to_string());
        }
        if path
            .split('/')
            .any(|segment| matches!(segment, "" | "." | ".."))
        {
            return Err(format!("malformed path {path_or_id:?}"));
        }
        Ok(path.to_string())
    }

    #[instrument(skip(self, session), fields(mount = %self.mount_point))]
    async fn read_secret(
        &self,
        session: &Session,
        path_or_id: &str,
    ) -> Result<SecretDocument, ReadError> {
        let response = self
            .http
            .get(self.secret_endpoint(path_or_id))
            .header(TOKEN_HEADER, session.access_token().expose_secret())
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(read_failure(response).await);
        }

        let data = match self.kv_version {
            KvVersion::V1 => response.json::<KvV1Response>().await?.data,
            KvVersion::V2 => response.json::<KvV2Response>().await?.data.data,
        };

        Ok(SecretDocument::new(
            data.iter()
                .map(|(key, value)| SecretField::new(key.clone(), field_text(value)))
                .collect(),
        ))
    }
}
