use serde::{Deserialize, Serialize};

use super::{require, Monto, RecordId};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Servicio {
    pub id: RecordId,
    pub nombre_servicio: String,
    #[serde(default)]
    pub precio_base: Option<Monto>,
    #[serde(default)]
    pub descripcion: Option<String>,
}

impl Servicio {
    pub fn precio(&self) -> f64 {
        self.precio_base.as_ref().and_then(Monto::value).unwrap_or(0.0)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NuevoServicio {
    pub nombre_servicio: String,
    pub precio_base: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub descripcion: Option<String>,
}

impl NuevoServicio {
    pub fn validate(&self) -> Result<(), String> {
        require("nombre del servicio", &self.nombre_servicio)?;
        if !self.precio_base.is_finite() || self.precio_base < 0.0 {
            return Err("El precio base no puede ser negativo.".to_string());
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServicioEstadisticas {
    #[serde(default, alias = "totalClientes")]
    pub total_clientes: i64,
    #[serde(default, alias = "totalCobros")]
    pub total_cobros: i64,
    #[serde(default, alias = "montoTotal")]
    pub monto_total: Option<Monto>,
    #[serde(default, alias = "montoPendiente")]
    pub monto_pendiente: Option<Monto>,
}
