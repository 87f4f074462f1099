use serde_json::Value;
use time::Date;

use super::metricas::{porcentaje_str, RangoAtraso};
use super::{decode_payload, Kpi, ReportContext, ReportView, Serie, SeriePunto, Tabla};
use crate::api::ApiError;
use crate::format::{dias_atraso, format_currency, format_fecha, format_fixed2};
use crate::models::{Cobro, EstadoCobro, ListEnvelope};

#[derive(Debug, Clone, PartialEq)]
pub struct RangoResumen {
    pub rango: RangoAtraso,
    pub cantidad: u64,
    pub monto: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CobroAtrasado {
    pub cobro_id: String,
    pub cliente: String,
    pub concepto: String,
    pub vencimiento: Date,
    pub dias: i64,
    pub monto: f64,
    pub rango: RangoAtraso,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ResumenAtrasos {
    /// Always the four ranges, in ascending order.
    pub rangos: Vec<RangoResumen>,
    /// Sorted by days late, longest first.
    pub detalle: Vec<CobroAtrasado>,
}

impl ResumenAtrasos {
    pub fn cantidad(&self) -> u64 {
        self.detalle.len() as u64
    }

    pub fn monto_total(&self) -> f64 {
        self.detalle.iter().map(|c| c.monto).sum()
    }

    pub fn promedio_dias(&self) -> f64 {
        if self.detalle.is_empty() {
            return 0.0;
        }
        self.detalle.iter().map(|c| c.dias as f64).sum::<f64>() / self.detalle.len() as f64
    }

    pub fn max_dias(&self) -> i64 {
        self.detalle.iter().map(|c| c.dias).max().unwrap_or(0)
    }
}

/// Classifies charges by how late they are. The reference date is the
/// payment date when the charge was paid, otherwise `hoy`. Voided charges,
/// charges without a due date and charges not yet late are skipped.
pub fn agrupar_atrasos(cobros: &[Cobro], hoy: Date) -> ResumenAtrasos {
    let mut rangos: Vec<RangoResumen> = RangoAtraso::ALL
        .iter()
        .map(|r| RangoResumen {
            rango: *r,
            cantidad: 0,
            monto: 0.0,
        })
        .collect();
    let mut detalle = Vec::new();

    for c in cobros {
        if c.estado_cobro == EstadoCobro::Anulado {
            continue;
        }
        let Some(vencimiento) = c.vencimiento() else {
            tracing::debug!(cobro = %c.id, "skipping charge without due date");
            continue;
        };
        let referencia = c.pagado_el().unwrap_or(hoy);
        let dias = dias_atraso(vencimiento, referencia);
        let Some(rango) = RangoAtraso::clasificar(dias) else {
            continue;
        };
        let monto = c.monto_value().unwrap_or_else(|| {
            tracing::warn!(cobro = %c.id, "invalid amount counted as 0");
            0.0
        });

        if let Some(r) = rangos.iter_mut().find(|r| r.rango == rango) {
            r.cantidad += 1;
            r.monto += monto;
        }
        detalle.push(CobroAtrasado {
            cobro_id: c.id.to_string(),
            cliente: c.nombre_cliente().unwrap_or("-").to_string(),
            concepto: c.concepto().unwrap_or("-").to_string(),
            vencimiento,
            dias,
            monto,
            rango,
        });
    }

    detalle.sort_by(|a, b| b.dias.cmp(&a.dias).then_with(|| a.vencimiento.cmp(&b.vencimiento)));
    ResumenAtrasos { rangos, detalle }
}

fn decode_cobros(v: Value) -> Result<Vec<Cobro>, ApiError> {
    let env: ListEnvelope<Cobro> = decode_payload(v)?;
    env.into_vec("cobros").map_err(ApiError::decode)
}

pub(crate) fn transformar(
    actual: Value,
    anterior: Option<Value>,
    ctx: &ReportContext,
) -> Result<ReportView, ApiError> {
    let actual = agrupar_atrasos(&decode_cobros(actual)?, ctx.hoy);
    // The previous window is evaluated as of its own last day.
    let previo = match (anterior, ctx.anterior) {
        (Some(v), Some(p)) => Some(agrupar_atrasos(&decode_cobros(v)?, p.fin)),
        (Some(v), None) => Some(agrupar_atrasos(&decode_cobros(v)?, ctx.hoy)),
        _ => None,
    };
    Ok(vista(&actual, previo.as_ref(), ctx))
}

fn vista(r: &ResumenAtrasos, previo: Option<&ResumenAtrasos>, ctx: &ReportContext) -> ReportView {
    let moneda = ctx.moneda.as_str();
    let total = r.monto_total();

    let kpis = vec![
        Kpi::comparado(
            "Cobros atrasados",
            r.cantidad().to_string(),
            r.cantidad() as f64,
            previo.map(|p| p.cantidad() as f64),
        ),
        Kpi::comparado(
            "Monto atrasado",
            format_currency(total, moneda),
            total,
            previo.map(ResumenAtrasos::monto_total),
        ),
        Kpi::new("Promedio de días", format_fixed2(r.promedio_dias())),
        Kpi::new("Máximo de días", r.max_dias().to_string()),
    ];

    let mut por_rango = Tabla::new("Atrasos por rango", &["Rango (días)", "Cantidad", "Monto", "% del monto"]);
    for rr in &r.rangos {
        por_rango.filas.push(vec![
            rr.rango.label().to_string(),
            rr.cantidad.to_string(),
            format_currency(rr.monto, moneda),
            porcentaje_str(rr.monto, total),
        ]);
    }

    let mut detalle = Tabla::new(
        "Detalle de cobros atrasados",
        &["Cobro", "Cliente", "Concepto", "Vencimiento", "Días", "Rango", "Monto"],
    );
    for c in &r.detalle {
        detalle.filas.push(vec![
            c.cobro_id.clone(),
            c.cliente.clone(),
            c.concepto.clone(),
            format_fecha(c.vencimiento),
            c.dias.to_string(),
            c.rango.label().to_string(),
            format_currency(c.monto, moneda),
        ]);
    }

    let series = vec![
        Serie {
            nombre: "Monto por rango".to_string(),
            puntos: r
                .rangos
                .iter()
                .map(|rr| SeriePunto {
                    label: rr.rango.label().to_string(),
                    valor: rr.monto,
                })
                .collect(),
        },
        Serie {
            nombre: "Cobros por rango".to_string(),
            puntos: r
                .rangos
                .iter()
                .map(|rr| SeriePunto {
                    label: rr.rango.label().to_string(),
                    valor: rr.cantidad as f64,
                })
                .collect(),
        },
    ];

    ctx.vista(kpis, vec![por_rango, detalle], series)
}
