use reqwest::Method;
use serde::Serialize;
use std::sync::Arc;

use super::{ApiClient, ApiError};
use crate::session::{LoginResponse, Session};

#[derive(Debug, Serialize)]
struct Credenciales<'a> {
    username: &'a str,
    password: &'a str,
}

impl ApiClient {
    /// Authenticates and installs the new session in the store.
    pub async fn login(&self, username: &str, password: &str) -> Result<Arc<Session>, ApiError> {
        if username.trim().is_empty() || password.is_empty() {
            return Err(ApiError::validation("Ingrese usuario y contraseña."));
        }

        let body = serde_json::to_value(Credenciales {
            username: username.trim(),
            password,
        })
        .map_err(|e| ApiError::validation(e.to_string()))?;

        let resp: LoginResponse = self
            .send_json(Method::POST, "/auth/login", &[], Some(body), false)
            .await?;
        let session = Session::from_login(resp).map_err(ApiError::decode)?;
        tracing::info!(user = session.username(), rol = session.rol().as_str(), "logged in");
        Ok(self.sessions().begin(session))
    }

    pub fn logout(&self) {
        self.sessions().end();
    }
}

#[cfg(test)]
mod tests {
    use super::super::stub::serve;
    use super::*;
    use crate::api::ErrorKind;
    use crate::session::SessionStore;

    #[tokio::test]
    async fn login_installs_session_without_sending_token() {
        let (base, log) = serve(|req| {
            assert_eq!(req.path, "/api/v1/auth/login");
            Some((
                200,
                r#"{"token":"nuevo","usuario":{"username":"ana","rol":"Usuario"}}"#.to_string(),
            ))
        })
        .await;
        let mut cfg = crate::config::default_config();
        cfg.api_url = base;
        let api = ApiClient::new(&cfg, SessionStore::new()).unwrap();

        let session = api.login("ana", "clave123").await.unwrap();
        assert_eq!(session.token(), "nuevo");
        assert!(api.sessions().is_active());

        let reqs = log.lock().unwrap();
        assert!(reqs[0].authorization.is_none());
        assert!(reqs[0].body.contains("\"username\":\"ana\""));
        drop(reqs);

        api.logout();
        assert!(!api.sessions().is_active());
    }

    #[tokio::test]
    async fn blank_credentials_are_rejected_locally() {
        let mut cfg = crate::config::default_config();
        cfg.api_url = "http://127.0.0.1:1/api/v1".to_string();
        let api = ApiClient::new(&cfg, SessionStore::new()).unwrap();
        let err = api.login(" ", "x").await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::Validation);
    }
}
