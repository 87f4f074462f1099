use serde::{Deserialize, Serialize};
use time::Date;

use super::{require, Monto, RecordId};
use crate::format::{badge_estado, parse_fecha, Badge};

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum EstadoCobro {
    Pendiente,
    Pagado,
    Atrasado,
    Anulado,
    Otro(String),
}

impl EstadoCobro {
    pub fn as_str(&self) -> &str {
        match self {
            EstadoCobro::Pendiente => "Pendiente",
            EstadoCobro::Pagado => "Pagado",
            EstadoCobro::Atrasado => "Atrasado",
            EstadoCobro::Anulado => "Anulado",
            EstadoCobro::Otro(s) => s.as_str(),
        }
    }

    pub fn badge(&self) -> Badge {
        badge_estado(self.as_str())
    }

    /// Still owed: pending or already overdue.
    pub fn is_open(&self) -> bool {
        matches!(self, EstadoCobro::Pendiente | EstadoCobro::Atrasado)
    }
}

impl From<String> for EstadoCobro {
    fn from(v: String) -> Self {
        match v.trim().to_ascii_lowercase().as_str() {
            "pendiente" => EstadoCobro::Pendiente,
            "pagado" => EstadoCobro::Pagado,
            "atrasado" => EstadoCobro::Atrasado,
            "anulado" => EstadoCobro::Anulado,
            _ => EstadoCobro::Otro(v),
        }
    }
}

impl From<EstadoCobro> for String {
    fn from(v: EstadoCobro) -> Self {
        v.as_str().to_string()
    }
}

fn default_estado_cobro() -> EstadoCobro {
    EstadoCobro::Pendiente
}

/// Client fields the backend may embed in a charge.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClienteEmbebido {
    #[serde(default)]
    pub nombre_cliente: Option<String>,
    #[serde(default)]
    pub telefono: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cobro {
    pub id: RecordId,
    #[serde(default, alias = "clienteId")]
    pub cliente_id: Option<RecordId>,
    #[serde(default, alias = "servicioId")]
    pub servicio_id: Option<RecordId>,
    #[serde(default)]
    pub descripcion: Option<String>,
    #[serde(default)]
    pub monto: Option<Monto>,
    #[serde(default)]
    pub moneda: Option<String>,
    #[serde(default, alias = "fechaEmision")]
    pub fecha_emision: Option<String>,
    #[serde(default, alias = "fechaVencimiento")]
    pub fecha_vencimiento: Option<String>,
    #[serde(default, alias = "fechaPago")]
    pub fecha_pago: Option<String>,
    #[serde(default = "default_estado_cobro", alias = "estado")]
    pub estado_cobro: EstadoCobro,
    #[serde(default, alias = "metodoPago")]
    pub metodo_pago: Option<String>,
    #[serde(default, alias = "numeroReferencia")]
    pub numero_referencia: Option<String>,
    #[serde(default)]
    pub notas: Option<String>,
    #[serde(default)]
    pub nombre_cliente: Option<String>,
    #[serde(default)]
    pub telefono: Option<String>,
    #[serde(default)]
    pub nombre_servicio: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cliente: Option<ClienteEmbebido>,
}

fn non_empty(v: Option<&str>) -> Option<&str> {
    v.map(str::trim).filter(|s| !s.is_empty())
}

impl Cobro {
    pub fn monto_value(&self) -> Option<f64> {
        self.monto.as_ref().and_then(Monto::value)
    }

    pub fn vencimiento(&self) -> Option<Date> {
        self.fecha_vencimiento.as_deref().and_then(parse_fecha)
    }

    pub fn pagado_el(&self) -> Option<Date> {
        self.fecha_pago.as_deref().and_then(parse_fecha)
    }

    pub fn moneda_or<'a>(&'a self, fallback: &'a str) -> &'a str {
        non_empty(self.moneda.as_deref()).unwrap_or(fallback)
    }

    pub fn nombre_cliente(&self) -> Option<&str> {
        non_empty(self.nombre_cliente.as_deref()).or_else(|| {
            self.cliente
                .as_ref()
                .and_then(|c| non_empty(c.nombre_cliente.as_deref()))
        })
    }

    pub fn telefono_contacto(&self) -> Option<&str> {
        non_empty(self.telefono.as_deref())
            .or_else(|| self.cliente.as_ref().and_then(|c| non_empty(c.telefono.as_deref())))
    }

    /// Service name when linked to the catalog, otherwise the free-text description.
    pub fn concepto(&self) -> Option<&str> {
        non_empty(self.nombre_servicio.as_deref()).or_else(|| non_empty(self.descripcion.as_deref()))
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NuevoCobro {
    pub cliente_id: Option<RecordId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub servicio_id: Option<RecordId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub descripcion: Option<String>,
    pub monto: f64,
    pub moneda: String,
    pub fecha_emision: String,
    pub fecha_vencimiento: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notas: Option<String>,
}

impl NuevoCobro {
    pub fn validate(&self) -> Result<(), String> {
        if self.cliente_id.is_none() {
            return Err("El campo cliente es obligatorio.".to_string());
        }
        if self.servicio_id.is_none() && non_empty(self.descripcion.as_deref()).is_none() {
            return Err("Seleccione un servicio o ingrese una descripción.".to_string());
        }
        if !self.monto.is_finite() || self.monto <= 0.0 {
            return Err("El monto debe ser mayor a 0.".to_string());
        }
        require("moneda", &self.moneda)?;
        let emision = parse_fecha(&self.fecha_emision)
            .ok_or_else(|| "La fecha de emisión no es válida.".to_string())?;
        let vencimiento = parse_fecha(&self.fecha_vencimiento)
            .ok_or_else(|| "La fecha de vencimiento no es válida.".to_string())?;
        if vencimiento < emision {
            return Err("La fecha de vencimiento no puede ser anterior a la emisión.".to_string());
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CobroPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub descripcion: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub monto: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fecha_vencimiento: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub estado_cobro: Option<EstadoCobro>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notas: Option<String>,
}

impl CobroPatch {
    pub fn validate(&self) -> Result<(), String> {
        if let Some(m) = self.monto {
            if !m.is_finite() || m <= 0.0 {
                return Err("El monto debe ser mayor a 0.".to_string());
            }
        }
        if let Some(f) = self.fecha_vencimiento.as_deref() {
            if parse_fecha(f).is_none() {
                return Err("La fecha de vencimiento no es válida.".to_string());
            }
        }
        Ok(())
    }
}

/// Body of a "mark as paid" request; the backend decides the resulting state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistroPago {
    pub estado_cobro: EstadoCobro,
    pub fecha_pago: String,
    pub metodo_pago: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub numero_referencia: Option<String>,
}

impl RegistroPago {
    pub fn new(fecha_pago: String, metodo_pago: String, numero_referencia: Option<String>) -> Self {
        Self {
            estado_cobro: EstadoCobro::Pagado,
            fecha_pago,
            metodo_pago,
            numero_referencia,
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        require("método de pago", &self.metodo_pago)?;
        if parse_fecha(&self.fecha_pago).is_none() {
            return Err("La fecha de pago no es válida.".to_string());
        }
        Ok(())
    }
}
