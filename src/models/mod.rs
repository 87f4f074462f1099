pub mod cliente;
pub mod cobro;
pub mod servicio;
pub mod settings;
pub mod usuario;

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::format::parse_amount;

pub use cliente::{Cliente, ClientePatch, EstadoCliente, NuevoCliente};
pub use cobro::{Cobro, CobroPatch, EstadoCobro, NuevoCobro, RegistroPago};
pub use servicio::{NuevoServicio, Servicio, ServicioEstadisticas};
pub use settings::{EstadoGateway, NotificacionWhatsapp, Settings, WhatsappStatus};
pub use usuario::{CambioContrasena, NuevoUsuario, Rol, Usuario, UsuarioPatch};

/// Backend identifiers arrive either as numbers or as strings.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RecordId {
    Num(i64),
    Text(String),
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordId::Num(n) => write!(f, "{n}"),
            RecordId::Text(s) => f.write_str(s),
        }
    }
}

impl From<i64> for RecordId {
    fn from(v: i64) -> Self {
        RecordId::Num(v)
    }
}

impl From<&str> for RecordId {
    fn from(v: &str) -> Self {
        match v.trim().parse::<i64>() {
            Ok(n) => RecordId::Num(n),
            Err(_) => RecordId::Text(v.trim().to_string()),
        }
    }
}

/// Decimal amounts come back as JSON numbers or as strings (`"150.00"`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Monto {
    Num(f64),
    Text(String),
}

impl Monto {
    /// `None` when the amount is not a finite number.
    pub fn value(&self) -> Option<f64> {
        match self {
            Monto::Num(v) if v.is_finite() => Some(*v),
            Monto::Num(_) => None,
            Monto::Text(s) => parse_amount(s),
        }
    }
}

impl From<f64> for Monto {
    fn from(v: f64) -> Self {
        Monto::Num(v)
    }
}

/// List endpoints answer either with a bare array or wrapped in an object
/// (`{"cobros": [...]}`, `{"data": [...]}`).
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum ListEnvelope<T> {
    Bare(Vec<T>),
    Wrapped(std::collections::HashMap<String, serde_json::Value>),
}

impl<T: serde::de::DeserializeOwned> ListEnvelope<T> {
    pub fn into_vec(self, key: &str) -> Result<Vec<T>, String> {
        match self {
            ListEnvelope::Bare(items) => Ok(items),
            ListEnvelope::Wrapped(mut map) => {
                let value = map
                    .remove(key)
                    .or_else(|| map.remove("data"))
                    .or_else(|| map.remove("items"))
                    .unwrap_or(serde_json::Value::Array(Vec::new()));
                serde_json::from_value(value).map_err(|e| format!("invalid `{key}` list: {e}"))
            }
        }
    }
}

pub(crate) fn require(field: &str, value: &str) -> Result<(), String> {
    if value.trim().is_empty() {
        return Err(format!("El campo {field} es obligatorio."));
    }
    Ok(())
}
