//! HTTP backends for the hosted identity service and function gateway.

use async_trait::async_trait;
use campus_types::{AuthSession, ProfilePatch, SessionToken, UserIdentity};
use reqwest::{Client, RequestBuilder, StatusCode};
use serde_json::json;
use std::time::Duration;
use tokio::sync::watch;

use crate::{ClientError, FunctionRequest, FunctionResponse, IdentityProvider, RemoteFunctions, Result};

fn build_client(timeout: Duration) -> Result<Client> {
    Ok(Client::builder().timeout(timeout).build()?)
}

fn truncate_body(body: &str) -> String {
    body.chars().take(200).collect()
}

// ============================================================================
// FUNCTION GATEWAY
// ============================================================================

/// Calls `POST {base}/functions/v1/{function}` with a JSON body.
pub struct HttpRemoteFunctions {
    http: Client,
    endpoint: String,
    api_key: String,
}

impl HttpRemoteFunctions {
    pub fn new(
        base_url: &str,
        function_name: &str,
        api_key: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self> {
        Ok(Self {
            http: build_client(timeout)?,
            endpoint: format!(
                "{}/functions/v1/{}",
                base_url.trim_end_matches('/'),
                function_name
            ),
            api_key: api_key.into(),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl RemoteFunctions for HttpRemoteFunctions {
    async fn invoke(
        &self,
        request: &FunctionRequest,
        credential: Option<&SessionToken>,
    ) -> Result<FunctionResponse> {
        let bearer = credential.map(SessionToken::as_str).unwrap_or(&self.api_key);

        tracing::debug!(action = request.action(), "Invoking gateway function");

        let response = self
            .http
            .post(&self.endpoint)
            .bearer_auth(bearer)
            .header("apikey", &self.api_key)
            .json(request)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if status.is_success() {
            return Ok(serde_json::from_str(&body)?);
        }

        // Functions report business failures as 4xx with the usual envelope
        match serde_json::from_str::<FunctionResponse>(&body) {
            Ok(parsed) if !parsed.success && parsed.error.is_some() => {
                tracing::debug!(
                    action = request.action(),
                    status = status.as_u16(),
                    "Gateway returned negative response"
                );
                Ok(parsed)
            }
            _ => Err(ClientError::Status {
                status: status.as_u16(),
                body: truncate_body(&body),
            }),
        }
    }
}

// ============================================================================
// IDENTITY
// ============================================================================

/// Identity service client. The session itself is handed in by whatever
/// performed the sign-in (password, OAuth redirect) and is broadcast to
/// subscribers on every change.
pub struct HttpIdentityProvider {
    http: Client,
    base_url: String,
    api_key: String,
    session: watch::Sender<Option<AuthSession>>,
}

impl HttpIdentityProvider {
    pub fn new(base_url: &str, api_key: impl Into<String>, timeout: Duration) -> Result<Self> {
        let (session, _) = watch::channel(None);
        Ok(Self {
            http: build_client(timeout)?,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            session,
        })
    }

    /// Install a freshly established session and notify subscribers.
    pub fn set_session(&self, session: AuthSession) {
        tracing::info!(user_id = %session.user.id, "Session established");
        self.session.send_replace(Some(session));
    }

    /// Drop the local session and notify subscribers.
    pub fn sign_out(&self) {
        tracing::info!("Session cleared");
        self.session.send_replace(None);
    }

    fn authorized(&self, builder: RequestBuilder) -> Result<RequestBuilder> {
        let token = self
            .session
            .borrow()
            .as_ref()
            .map(|s| s.access_token.as_str().to_string())
            .ok_or(ClientError::NotAuthenticated)?;
        Ok(builder.bearer_auth(token).header("apikey", &self.api_key))
    }

    fn user_url(&self) -> String {
        format!("{}/auth/v1/user", self.base_url)
    }
}

#[async_trait]
impl IdentityProvider for HttpIdentityProvider {
    async fn current_user(&self) -> Result<Option<UserIdentity>> {
        if self.session.borrow().is_none() {
            return Ok(None);
        }

        let response = self.authorized(self.http.get(self.user_url()))?.send().await?;
        let status = response.status();

        if status == StatusCode::UNAUTHORIZED {
            tracing::warn!("Identity service rejected the session token");
            return Ok(None);
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ClientError::Status {
                status: status.as_u16(),
                body: truncate_body(&body),
            });
        }

        Ok(Some(response.json::<UserIdentity>().await?))
    }

    async fn current_session(&self) -> Result<Option<SessionToken>> {
        Ok(self
            .session
            .borrow()
            .as_ref()
            .map(|s| s.access_token.clone()))
    }

    async fn update_user_metadata(&self, patch: &ProfilePatch) -> Result<()> {
        let response = self
            .authorized(self.http.put(self.user_url()))?
            .json(&json!({ "data": patch }))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ClientError::Status {
                status: status.as_u16(),
                body: truncate_body(&body),
            });
        }
        Ok(())
    }

    fn subscribe(&self) -> watch::Receiver<Option<AuthSession>> {
        self.session.subscribe()
    }
}
