//! Fake vault servers for HTTP-level tests.
//!
//! Each fake wraps a [`wiremock::MockServer`] and mounts the endpoints of
//! one vault product. Request counts come from the server's journal.

use serde_json::{Value, json};
use std::time::Duration;
use wiremock::matchers::{bearer_token, body_string_contains, header, method, path};
use wiremock::{Mock, MockServer, Request, ResponseTemplate};

async fn count_matching(server: &MockServer, verb: &str, prefix: &str) -> usize {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .iter()
        .filter(|r: &&Request| {
            r.method.as_str() == verb && r.url.path().starts_with(prefix)
        })
        .count()
}

/// Fake Thycotic Secret Server.
pub struct FakeSecretServer {
    server: MockServer,
}

impl FakeSecretServer {
    /// Start a fake on a random local port.
    pub async fn start() -> Self {
        Self {
            server: MockServer::start().await,
        }
    }

    /// Base URL to configure providers with.
    #[must_use]
    pub fn uri(&self) -> String {
        self.server.uri()
    }

    /// The underlying server, for custom mocks.
    #[must_use]
    pub const fn server(&self) -> &MockServer {
        &self.server
    }

    /// Issue `token` to a password grant for `username`.
    pub async fn grant_token(&self, username: &str, token: &str, expires_in: u64) {
        Mock::given(method("POST"))
            .and(path("/oauth2/token"))
            .and(body_string_contains("grant_type=password"))
            .and(body_string_contains(format!("username={username}").as_str()))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "access_token": token,
                "token_type": "bearer",
                "expires_in": expires_in,
            })))
            .mount(&self.server)
            .await;
    }

    /// Issue `token` for the first grant only; later grants fall through
    /// to other mounted token mocks.
    pub async fn grant_token_once(&self, token: &str, expires_in: u64) {
        Mock::given(method("POST"))
            .and(path("/oauth2/token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "access_token": token,
                "expires_in": expires_in,
            })))
            .up_to_n_times(1)
            .with_priority(1)
            .mount(&self.server)
            .await;
    }

    /// Issue `token` to a grant that carries `domain`.
    pub async fn grant_domain_token(&self, domain: &str, token: &str) {
        Mock::given(method("POST"))
            .and(path("/oauth2/token"))
            .and(body_string_contains(format!("domain={domain}").as_str()))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "access_token": token,
                "expires_in": 1200,
            })))
            .with_priority(1)
            .mount(&self.server)
            .await;
    }

    /// Answer every grant with `status`.
    pub async fn reject_grants(&self, status: u16) {
        Mock::given(method("POST"))
            .and(path("/oauth2/token"))
            .respond_with(
                ResponseTemplate::new(status).set_body_json(json!({ "error": "invalid_grant" })),
            )
            .mount(&self.server)
            .await;
    }

    /// Answer every grant only after `delay`.
    pub async fn slow_grants(&self, delay: Duration) {
        Mock::given(method("POST"))
            .and(path("/oauth2/token"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({ "access_token": "late", "expires_in": 1200 }))
                    .set_delay(delay),
            )
            .mount(&self.server)
            .await;
    }

    /// Serve secret `id` to requests bearing `token`.
    ///
    /// `items` are `(slug, field name, value)` triples.
    pub async fn secret(&self, id: u64, token: &str, items: &[(&str, &str, &str)]) {
        self.secret_with_delay(id, token, items, Duration::ZERO).await;
    }

    /// Like [`FakeSecretServer::secret`] but answering after `delay`.
    pub async fn secret_with_delay(
        &self,
        id: u64,
        token: &str,
        items: &[(&str, &str, &str)],
        delay: Duration,
    ) {
        let items: Vec<Value> = items
            .iter()
            .map(|(slug, name, value)| {
                json!({ "slug": slug, "fieldName": name, "itemValue": value })
            })
            .collect();

        Mock::given(method("GET"))
            .and(path(format!("/api/v1/secrets/{id}")))
            .and(bearer_token(token))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({
                        "id": id,
                        "name": format!("secret-{id}"),
                        "items": items,
                    }))
                    .set_delay(delay),
            )
            .mount(&self.server)
            .await;
    }

    /// Answer reads of secret `id` with `status` regardless of token.
    pub async fn secret_status(&self, id: u64, status: u16) {
        Mock::given(method("GET"))
            .and(path(format!("/api/v1/secrets/{id}")))
            .respond_with(ResponseTemplate::new(status))
            .with_priority(10)
            .mount(&self.server)
            .await;
    }

    /// Number of token requests received.
    pub async fn grant_count(&self) -> usize {
        count_matching(&self.server, "POST", "/oauth2/token").await
    }

    /// Number of secret reads received.
    pub async fn read_count(&self) -> usize {
        count_matching(&self.server, "GET", "/api/v1/secrets/").await
    }
}

/// Fake HashiCorp Vault.
pub struct FakeHashicorpVault {
    server: MockServer,
}

impl FakeHashicorpVault {
    /// Start a fake on a random local port.
    pub async fn start() -> Self {
        Self {
            server: MockServer::start().await,
        }
    }

    /// Base URL to configure providers with.
    #[must_use]
    pub fn uri(&self) -> String {
        self.server.uri()
    }

    /// Issue `token` to a userpass login for `username`.
    ///
    /// A `lease_duration` of zero means the token never expires.
    pub async fn userpass_login(&self, username: &str, token: &str, lease_duration: u64) {
        Mock::given(method("POST"))
            .and(path(format!("/v1/auth/userpass/login/{username}")))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "auth": {
                    "client_token": token,
                    "lease_duration": lease_duration,
                    "renewable": lease_duration > 0,
                }
            })))
            .mount(&self.server)
            .await;
    }

    /// Serve a KV v2 secret to requests bearing `token`.
    pub async fn kv2_secret(&self, mount: &str, secret_path: &str, token: &str, data: Value) {
        Mock::given(method("GET"))
            .and(path(format!("/v1/{mount}/data/{secret_path}")))
            .and(header("X-Vault-Token", token))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": { "data": data, "metadata": { "version": 1 } }
            })))
            .mount(&self.server)
            .await;
    }

    /// Serve a KV v1 secret to requests bearing `token`.
    pub async fn kv1_secret(&self, mount: &str, secret_path: &str, token: &str, data: Value) {
        Mock::given(method("GET"))
            .and(path(format!("/v1/{mount}/{secret_path}")))
            .and(header("X-Vault-Token", token))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "data": data })))
            .mount(&self.server)
            .await;
    }

    /// Answer requests bearing an unknown token with 403, as Vault does.
    pub async fn deny_other_tokens(&self) {
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(403)
                    .set_body_json(json!({ "errors": ["permission denied"] })),
            )
            .with_priority(10)
            .mount(&self.server)
            .await;
    }

    /// Number of userpass logins received.
    pub async fn login_count(&self) -> usize {
        count_matching(&self.server, "POST", "/v1/auth/").await
    }

    /// Number of secret reads received.
    pub async fn read_count(&self) -> usize {
        count_matching(&self.server, "GET", "/v1/").await
    }
}
