//! HTTP access to the PEGASUS REST backend.
//!
//! Every request except login carries the bearer token of the current
//! session. A 401 (or a missing session) schedules a forced logout after
//! `Config::logout_delay`; failures are normalized into [`ApiError`].

pub mod auth;
pub mod clientes;
pub mod cobros;
pub mod error;
pub mod reportes;
pub mod servicios;
pub mod settings;
pub mod usuarios;

#[cfg(test)]
pub(crate) mod stub;

use reqwest::{Client, Method};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::time::Duration;

use crate::config::Config;
use crate::session::SessionStore;

pub use cobros::CobroFiltro;
pub use error::{ApiError, ErrorKind};

#[derive(Clone)]
pub struct ApiClient {
    http: Client,
    base_url: String,
    timeout: Duration,
    logout_delay: Duration,
    sessions: SessionStore,
}

impl ApiClient {
    pub fn new(config: &Config, sessions: SessionStore) -> Result<Self, ApiError> {
        let http = Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| ApiError::network(format!("cannot build http client: {e}")))?;

        Ok(Self {
            http,
            base_url: config.base_url().to_string(),
            timeout: config.timeout(),
            logout_delay: config.logout_delay(),
            sessions,
        })
    }

    pub fn sessions(&self) -> &SessionStore {
        &self.sessions
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    /// Tears the session down after the configured delay. Only the session that
    /// received the 401 is ended; a newer login is left alone.
    fn schedule_logout(&self, session_id: uuid::Uuid) {
        let sessions = self.sessions.clone();
        let delay = self.logout_delay;
        tracing::warn!(%session_id, ?delay, "unauthorized response, forcing logout");
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if sessions.end_if(session_id) {
                tracing::info!(%session_id, "session closed");
            }
        });
    }

    pub(crate) async fn send_json<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, String)],
        body: Option<Value>,
        authenticated: bool,
    ) -> Result<T, ApiError> {
        let session = if authenticated {
            Some(self.sessions.current().ok_or_else(ApiError::missing_session)?)
        } else {
            None
        };

        let url = self.url(path);
        tracing::debug!(%method, %url, "api request");

        let mut req = self.http.request(method.clone(), &url);
        if !query.is_empty() {
            req = req.query(query);
        }
        if let Some(s) = session.as_ref() {
            req = req.bearer_auth(s.token());
        }
        if let Some(b) = body.as_ref() {
            req = req.json(b);
        }

        let resp = req.send().await.map_err(|e| {
            if e.is_timeout() {
                ApiError::timed_out(self.timeout.as_millis() as u64)
            } else {
                ApiError::from(e)
            }
        })?;

        let status = resp.status().as_u16();
        let text = resp.text().await.map_err(|e| {
            if e.is_timeout() {
                ApiError::timed_out(self.timeout.as_millis() as u64)
            } else {
                ApiError::from(e)
            }
        })?;

        if status == 401 {
            if let Some(s) = session.as_ref() {
                self.schedule_logout(s.id());
            }
            return Err(ApiError::from_response(status, &text));
        }
        if !(200..300).contains(&status) {
            let err = ApiError::from_response(status, &text);
            tracing::debug!(%method, %url, status, message = %err.message, "api error");
            return Err(err);
        }

        let payload = if text.trim().is_empty() { "null" } else { text.as_str() };
        serde_json::from_str::<T>(payload).map_err(ApiError::decode)
    }

    pub async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, ApiError> {
        self.send_json(Method::GET, path, query, None, true).await
    }

    pub async fn post<B: Serialize, T: DeserializeOwned>(&self, path: &str, body: &B) -> Result<T, ApiError> {
        let body = serde_json::to_value(body).map_err(|e| ApiError::validation(e.to_string()))?;
        self.send_json(Method::POST, path, &[], Some(body), true).await
    }

    pub async fn put<B: Serialize, T: DeserializeOwned>(&self, path: &str, body: &B) -> Result<T, ApiError> {
        let body = serde_json::to_value(body).map_err(|e| ApiError::validation(e.to_string()))?;
        self.send_json(Method::PUT, path, &[], Some(body), true).await
    }

    pub async fn patch<B: Serialize, T: DeserializeOwned>(&self, path: &str, body: &B) -> Result<T, ApiError> {
        let body = serde_json::to_value(body).map_err(|e| ApiError::validation(e.to_string()))?;
        self.send_json(Method::PATCH, path, &[], Some(body), true).await
    }

    pub async fn delete(&self, path: &str) -> Result<(), ApiError> {
        self.send_json::<Value>(Method::DELETE, path, &[], None, true)
            .await
            .map(|_| ())
    }
}
