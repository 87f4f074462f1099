use serde::{Deserialize, Serialize};

use super::RecordId;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default, alias = "nombreEmpresa")]
    pub nombre_empresa: String,
    #[serde(default)]
    pub ruc: String,
    #[serde(default)]
    pub direccion: String,
    #[serde(default)]
    pub telefono: String,
    #[serde(default, alias = "correo")]
    pub correo_electronico: String,
    #[serde(default, alias = "monedaPredeterminada")]
    pub moneda: Option<String>,
    /// Keys this client does not model are sent back untouched on update.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum EstadoGateway {
    Connected,
    Connecting,
    Disconnected,
    Otro(String),
}

impl EstadoGateway {
    pub fn as_str(&self) -> &str {
        match self {
            EstadoGateway::Connected => "connected",
            EstadoGateway::Connecting => "connecting",
            EstadoGateway::Disconnected => "disconnected",
            EstadoGateway::Otro(s) => s.as_str(),
        }
    }
}

impl From<String> for EstadoGateway {
    fn from(v: String) -> Self {
        match v.trim().to_ascii_lowercase().as_str() {
            "connected" | "conectado" => EstadoGateway::Connected,
            "connecting" | "conectando" | "qr" => EstadoGateway::Connecting,
            "disconnected" | "desconectado" | "" => EstadoGateway::Disconnected,
            _ => EstadoGateway::Otro(v),
        }
    }
}

impl From<EstadoGateway> for String {
    fn from(v: EstadoGateway) -> Self {
        v.as_str().to_string()
    }
}

fn default_gateway_status() -> EstadoGateway {
    EstadoGateway::Disconnected
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WhatsappStatus {
    #[serde(default = "default_gateway_status", alias = "estado")]
    pub status: EstadoGateway,
    #[serde(default, alias = "telefono")]
    pub phone: Option<String>,
    #[serde(default)]
    pub qr: Option<String>,
}

impl WhatsappStatus {
    pub fn is_connected(&self) -> bool {
        self.status == EstadoGateway::Connected
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificacionWhatsapp {
    pub telefono: String,
    pub mensaje: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cobro_id: Option<RecordId>,
}
