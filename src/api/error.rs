use serde::Serialize;
use serde_json::Value;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ErrorKind {
    /// 401 or no token; the session is torn down.
    Unauthorized,
    /// Rejected locally before any request was made.
    Validation,
    Network,
    TimedOut,
    /// 409: the backend refused because of existing references.
    Conflict,
    NotFound,
    Server,
    /// The response arrived but could not be decoded.
    Decode,
}

/// Every failure of the API layer, normalized to `{message, status, data}`.
#[derive(Debug, Clone, Serialize)]
pub struct ApiError {
    pub kind: ErrorKind,
    pub message: String,
    pub status: Option<u16>,
    pub data: Option<Value>,
}

impl ApiError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            status: None,
            data: None,
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Validation, message)
    }

    pub fn missing_session() -> Self {
        Self::new(ErrorKind::Unauthorized, "No hay una sesión activa.")
    }

    pub fn timed_out(after_ms: u64) -> Self {
        Self::new(
            ErrorKind::TimedOut,
            format!("La solicitud excedió el tiempo de espera ({after_ms} ms)."),
        )
    }

    pub fn network(detail: impl fmt::Display) -> Self {
        Self::new(
            ErrorKind::Network,
            format!("Error de conexión con el servidor: {detail}"),
        )
    }

    pub fn decode(detail: impl fmt::Display) -> Self {
        Self::new(
            ErrorKind::Decode,
            format!("Respuesta inválida del servidor: {detail}"),
        )
    }

    /// Builds the error for a non-2xx response. The backend message, when
    /// present in the JSON body, replaces the generic one.
    pub fn from_response(status: u16, body: &str) -> Self {
        let data = serde_json::from_str::<Value>(body).ok();
        let backend_message = data.as_ref().and_then(extract_message);

        let kind = match status {
            401 => ErrorKind::Unauthorized,
            404 => ErrorKind::NotFound,
            409 => ErrorKind::Conflict,
            400 | 422 => ErrorKind::Validation,
            _ => ErrorKind::Server,
        };
        let fallback = match kind {
            ErrorKind::Unauthorized => "Sesión expirada. Inicie sesión nuevamente.".to_string(),
            ErrorKind::NotFound => "El recurso solicitado no existe.".to_string(),
            ErrorKind::Conflict => "La operación entra en conflicto con otros registros.".to_string(),
            ErrorKind::Validation => "Los datos enviados no son válidos.".to_string(),
            _ => format!("Error del servidor (HTTP {status})."),
        };

        Self {
            kind,
            message: backend_message.unwrap_or(fallback),
            status: Some(status),
            data,
        }
    }

    /// Swaps in a resource-specific message for business-rule conflicts.
    pub fn with_conflict_message(mut self, message: &str) -> Self {
        if self.kind == ErrorKind::Conflict {
            self.message = message.to_string();
        }
        self
    }

    pub fn is_unauthorized(&self) -> bool {
        self.kind == ErrorKind::Unauthorized
    }
}

fn extract_message(v: &Value) -> Option<String> {
    ["message", "mensaje", "error"]
        .iter()
        .filter_map(|k| v.get(*k))
        .find_map(|m| m.as_str().map(str::trim).filter(|s| !s.is_empty()))
        .map(str::to_string)
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.status {
            Some(status) => write!(f, "{} (HTTP {})", self.message, status),
            None => f.write_str(&self.message),
        }
    }
}

impl std::error::Error for ApiError {}

impl From<reqwest::Error> for ApiError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            ApiError::new(ErrorKind::TimedOut, "La solicitud excedió el tiempo de espera.")
        } else if e.is_decode() {
            ApiError::decode(e)
        } else {
            ApiError::network(e)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backend_message_wins() {
        let e = ApiError::from_response(500, r#"{"message":"Base de datos caída"}"#);
        assert_eq!(e.kind, ErrorKind::Server);
        assert_eq!(e.message, "Base de datos caída");
        assert_eq!(e.status, Some(500));
        assert!(e.data.is_some());
    }

    #[test]
    fn non_json_body_uses_generic_message() {
        let e = ApiError::from_response(502, "<html>Bad gateway</html>");
        assert_eq!(e.message, "Error del servidor (HTTP 502).");
        assert!(e.data.is_none());
    }

    #[test]
    fn status_maps_to_kind() {
        assert_eq!(ApiError::from_response(401, "").kind, ErrorKind::Unauthorized);
        assert_eq!(ApiError::from_response(404, "").kind, ErrorKind::NotFound);
        assert_eq!(ApiError::from_response(409, "{}").kind, ErrorKind::Conflict);
        assert_eq!(ApiError::from_response(422, "{}").kind, ErrorKind::Validation);
    }

    #[test]
    fn conflict_message_is_substituted_only_for_conflicts() {
        let e = ApiError::from_response(409, r#"{"error":"FK violation"}"#)
            .with_conflict_message("El cliente tiene cobros asociados.");
        assert_eq!(e.message, "El cliente tiene cobros asociados.");

        let e = ApiError::from_response(500, r#"{"error":"boom"}"#)
            .with_conflict_message("no aplica");
        assert_eq!(e.message, "boom");
    }

    #[test]
    fn display_includes_status() {
        let e = ApiError::from_response(404, "");
        assert_eq!(e.to_string(), "El recurso solicitado no existe. (HTTP 404)");
        assert_eq!(ApiError::validation("Falta nombre").to_string(), "Falta nombre");
    }
}
