use serde::{Deserialize, Serialize};

use super::{require, RecordId};
use crate::format::{badge_estado, Badge};

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum EstadoCliente {
    Activo,
    Inactivo,
    Pendiente,
    Atrasado,
    Otro(String),
}

impl EstadoCliente {
    pub fn as_str(&self) -> &str {
        match self {
            EstadoCliente::Activo => "Activo",
            EstadoCliente::Inactivo => "Inactivo",
            EstadoCliente::Pendiente => "Pendiente",
            EstadoCliente::Atrasado => "Atrasado",
            EstadoCliente::Otro(s) => s.as_str(),
        }
    }

    pub fn badge(&self) -> Badge {
        badge_estado(self.as_str())
    }
}

impl From<String> for EstadoCliente {
    fn from(v: String) -> Self {
        match v.trim().to_ascii_lowercase().as_str() {
            "activo" => EstadoCliente::Activo,
            "inactivo" => EstadoCliente::Inactivo,
            "pendiente" => EstadoCliente::Pendiente,
            "atrasado" => EstadoCliente::Atrasado,
            _ => EstadoCliente::Otro(v),
        }
    }
}

impl From<EstadoCliente> for String {
    fn from(v: EstadoCliente) -> Self {
        v.as_str().to_string()
    }
}

fn default_estado_cliente() -> EstadoCliente {
    EstadoCliente::Activo
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Cliente {
    pub id: RecordId,
    pub nombre_cliente: String,
    #[serde(default)]
    pub ruc_dni: String,
    #[serde(default)]
    pub telefono: Option<String>,
    #[serde(default)]
    pub correo_electronico: Option<String>,
    #[serde(default)]
    pub direccion: Option<String>,
    #[serde(default = "default_estado_cliente", alias = "estado")]
    pub estado_cliente: EstadoCliente,
    /// Account flag, independent from `estado_cliente`.
    #[serde(default = "default_true")]
    pub activo: bool,
}

impl Cliente {
    pub fn telefono_contacto(&self) -> Option<&str> {
        self.telefono.as_deref().map(str::trim).filter(|s| !s.is_empty())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NuevoCliente {
    pub nombre_cliente: String,
    pub ruc_dni: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub telefono: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub correo_electronico: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub direccion: Option<String>,
}

fn validate_ruc_dni(v: &str) -> Result<(), String> {
    let v = v.trim();
    // DNI has 8 digits, RUC 11
    if !(v.len() == 8 || v.len() == 11) || !v.chars().all(|c| c.is_ascii_digit()) {
        return Err("El RUC/DNI debe tener 8 u 11 dígitos.".to_string());
    }
    Ok(())
}

fn validate_correo(v: Option<&str>) -> Result<(), String> {
    if let Some(correo) = v.map(str::trim).filter(|s| !s.is_empty()) {
        let ok = correo
            .split_once('@')
            .map(|(user, domain)| !user.is_empty() && domain.contains('.'))
            .unwrap_or(false);
        if !ok {
            return Err("El correo electrónico no es válido.".to_string());
        }
    }
    Ok(())
}

impl NuevoCliente {
    pub fn validate(&self) -> Result<(), String> {
        require("nombre", &self.nombre_cliente)?;
        require("RUC/DNI", &self.ruc_dni)?;
        validate_ruc_dni(&self.ruc_dni)?;
        validate_correo(self.correo_electronico.as_deref())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClientePatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nombre_cliente: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ruc_dni: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub telefono: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub correo_electronico: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub direccion: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub estado_cliente: Option<EstadoCliente>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub activo: Option<bool>,
}

impl ClientePatch {
    pub fn validate(&self) -> Result<(), String> {
        if let Some(nombre) = self.nombre_cliente.as_deref() {
            require("nombre", nombre)?;
        }
        if let Some(doc) = self.ruc_dni.as_deref() {
            validate_ruc_dni(doc)?;
        }
        validate_correo(self.correo_electronico.as_deref())
    }
}
