use serde::Serialize;

use crate::format::{format_porcentaje, format_variacion};

/// Period-over-period change in percent. `None` when there is no usable
/// baseline (previous value of zero or any non-finite input).
pub fn variacion(actual: f64, anterior: f64) -> Option<f64> {
    if !actual.is_finite() || !anterior.is_finite() || anterior == 0.0 {
        return None;
    }
    let v = (actual - anterior) / anterior * 100.0;
    v.is_finite().then_some(v)
}

/// Share of `parte` in `total`, in percent; `None` when `total` is zero.
pub fn porcentaje(parte: f64, total: f64) -> Option<f64> {
    if !parte.is_finite() || !total.is_finite() || total == 0.0 {
        return None;
    }
    Some(parte / total * 100.0)
}

pub fn porcentaje_str(parte: f64, total: f64) -> String {
    porcentaje(parte, total)
        .map(format_porcentaje)
        .unwrap_or_else(|| format_porcentaje(0.0))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Tendencia {
    Sube,
    Baja,
    Igual,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Comparacion {
    pub porcentaje: f64,
    pub texto: String,
    pub tendencia: Tendencia,
}

pub fn comparar(actual: f64, anterior: Option<f64>) -> Option<Comparacion> {
    let v = variacion(actual, anterior?)?;
    let texto = format_variacion(v);
    let tendencia = if texto == "0.00%" {
        Tendencia::Igual
    } else if v > 0.0 {
        Tendencia::Sube
    } else {
        Tendencia::Baja
    };
    Some(Comparacion {
        porcentaje: v,
        texto,
        tendencia,
    })
}

/// Overdue ranges. Lower bounds are inclusive: 15 days is `De15a30`,
/// 30 is `De30a60`, 60 is `Mas60`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum RangoAtraso {
    Menos15,
    De15a30,
    De30a60,
    Mas60,
}

impl RangoAtraso {
    pub const ALL: [RangoAtraso; 4] = [
        RangoAtraso::Menos15,
        RangoAtraso::De15a30,
        RangoAtraso::De30a60,
        RangoAtraso::Mas60,
    ];

    /// `None` for charges that are not late (zero or negative days).
    pub fn clasificar(dias: i64) -> Option<Self> {
        match dias {
            i64::MIN..=0 => None,
            1..=14 => Some(RangoAtraso::Menos15),
            15..=29 => Some(RangoAtraso::De15a30),
            30..=59 => Some(RangoAtraso::De30a60),
            _ => Some(RangoAtraso::Mas60),
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            RangoAtraso::Menos15 => "<15",
            RangoAtraso::De15a30 => "15–30",
            RangoAtraso::De30a60 => "30–60",
            RangoAtraso::Mas60 => ">60",
        }
    }
}
