use serde::Deserialize;
use serde_json::Value;

use super::metricas::porcentaje_str;
use super::{conteo, decode_payload, monto, Kpi, ReportContext, ReportView, Serie, SeriePunto, Tabla};
use crate::api::ApiError;
use crate::format::{format_currency, format_fecha_str};
use crate::models::Monto;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct MetodoPagoTotal {
    #[serde(default, alias = "metodoPago", alias = "metodo")]
    pub metodo_pago: Option<String>,
    #[serde(default)]
    pub cantidad: Option<Monto>,
    #[serde(default, alias = "total")]
    pub monto: Option<Monto>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CobroDiario {
    #[serde(default, alias = "dia")]
    pub fecha: String,
    #[serde(default, alias = "total")]
    pub monto: Option<Monto>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ResumenPagosData {
    #[serde(default, alias = "totalCobrado")]
    pub total_cobrado: Option<Monto>,
    #[serde(default, alias = "totalPendiente")]
    pub total_pendiente: Option<Monto>,
    #[serde(default, alias = "totalAtrasado")]
    pub total_atrasado: Option<Monto>,
    #[serde(default, alias = "cantidadPagados")]
    pub cantidad_pagados: Option<Monto>,
    #[serde(default, alias = "cantidadPendientes")]
    pub cantidad_pendientes: Option<Monto>,
    #[serde(default, alias = "cantidadAtrasados")]
    pub cantidad_atrasados: Option<Monto>,
    #[serde(default, alias = "porMetodo", alias = "metodos_pago")]
    pub por_metodo: Vec<MetodoPagoTotal>,
    #[serde(default, alias = "porDia", alias = "evolucion")]
    pub por_dia: Vec<CobroDiario>,
}

/// Numeric summary derived from the payload, before formatting.
#[derive(Debug, Clone, PartialEq)]
pub struct ResumenPagos {
    pub cobrado: f64,
    pub pendiente: f64,
    pub atrasado: f64,
    pub pagados: u64,
    pub pendientes: u64,
    pub atrasados: u64,
}

impl ResumenPagos {
    pub fn from_data(d: &ResumenPagosData) -> Self {
        Self {
            cobrado: monto(&d.total_cobrado),
            pendiente: monto(&d.total_pendiente),
            atrasado: monto(&d.total_atrasado),
            pagados: conteo(&d.cantidad_pagados),
            pendientes: conteo(&d.cantidad_pendientes),
            atrasados: conteo(&d.cantidad_atrasados),
        }
    }

    pub fn facturado(&self) -> f64 {
        self.cobrado + self.pendiente + self.atrasado
    }
}

pub(crate) fn transformar(
    actual: Value,
    anterior: Option<Value>,
    ctx: &ReportContext,
) -> Result<ReportView, ApiError> {
    let data: ResumenPagosData = decode_payload(actual)?;
    let previo = anterior
        .map(decode_payload::<ResumenPagosData>)
        .transpose()?
        .map(|d| ResumenPagos::from_data(&d));
    Ok(vista(&data, previo.as_ref(), ctx))
}

fn vista(data: &ResumenPagosData, previo: Option<&ResumenPagos>, ctx: &ReportContext) -> ReportView {
    let r = ResumenPagos::from_data(data);
    let moneda = ctx.moneda.as_str();

    let kpis = vec![
        Kpi::comparado(
            "Total cobrado",
            format_currency(r.cobrado, moneda),
            r.cobrado,
            previo.map(|p| p.cobrado),
        ),
        Kpi::comparado(
            "Total pendiente",
            format_currency(r.pendiente, moneda),
            r.pendiente,
            previo.map(|p| p.pendiente),
        ),
        Kpi::comparado(
            "Total atrasado",
            format_currency(r.atrasado, moneda),
            r.atrasado,
            previo.map(|p| p.atrasado),
        ),
        Kpi::comparado(
            "Cobros pagados",
            r.pagados.to_string(),
            r.pagados as f64,
            previo.map(|p| p.pagados as f64),
        ),
        Kpi::new("Tasa de cobranza", porcentaje_str(r.cobrado, r.facturado())),
    ];

    let mut estados = Tabla::new("Cobros por estado", &["Estado", "Cantidad", "Monto", "% del monto"]);
    for (label, cantidad, valor) in [
        ("Pagado", r.pagados, r.cobrado),
        ("Pendiente", r.pendientes, r.pendiente),
        ("Atrasado", r.atrasados, r.atrasado),
    ] {
        estados.filas.push(vec![
            label.to_string(),
            cantidad.to_string(),
            format_currency(valor, moneda),
            porcentaje_str(valor, r.facturado()),
        ]);
    }

    let mut metodos: Vec<(String, u64, f64)> = data
        .por_metodo
        .iter()
        .map(|m| {
            let nombre = m
                .metodo_pago
                .as_deref()
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .unwrap_or("Sin especificar")
                .to_string();
            (nombre, conteo(&m.cantidad), monto(&m.monto))
        })
        .collect();
    metodos.sort_by(|a, b| b.2.total_cmp(&a.2));
    let total_metodos: f64 = metodos.iter().map(|m| m.2).sum();

    let mut por_metodo = Tabla::new("Pagos por método", &["Método", "Cantidad", "Monto", "Participación"]);
    for (nombre, cantidad, valor) in &metodos {
        por_metodo.filas.push(vec![
            nombre.clone(),
            cantidad.to_string(),
            format_currency(*valor, moneda),
            porcentaje_str(*valor, total_metodos),
        ]);
    }

    let mut dias: Vec<&CobroDiario> = data.por_dia.iter().collect();
    dias.sort_by(|a, b| a.fecha.cmp(&b.fecha));
    let series = vec![
        Serie {
            nombre: "Cobrado por día".to_string(),
            puntos: dias
                .iter()
                .map(|d| SeriePunto {
                    label: format_fecha_str(&d.fecha),
                    valor: monto(&d.monto),
                })
                .collect(),
        },
        Serie {
            nombre: "Pagos por método".to_string(),
            puntos: metodos
                .iter()
                .map(|(nombre, _, valor)| SeriePunto {
                    label: nombre.clone(),
                    valor: *valor,
                })
                .collect(),
        },
    ];

    ctx.vista(kpis, vec![estados, por_metodo], series)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reportes::{Periodo, ReportKind};
    use serde_json::json;
    use time::macros::date;

    fn ctx(con_anterior: bool) -> ReportContext {
        let periodo = Periodo::mes_actual(date!(2026 - 10 - 19));
        ReportContext {
            kind: ReportKind::ResumenPagos,
            periodo,
            anterior: con_anterior.then(|| periodo.anterior()),
            moneda: "PEN".to_string(),
            hoy: date!(2026 - 10 - 19),
        }
    }

    #[test]
    fn totals_and_collection_rate() {
        let payload = json!({
            "totalCobrado": "750.00",
            "total_pendiente": 200,
            "total_atrasado": 50,
            "cantidad_pagados": "5",
            "por_metodo": [
                {"metodo_pago": "Yape", "cantidad": 2, "monto": 250},
                {"metodo_pago": "Transferencia", "cantidad": 3, "monto": 500}
            ],
            "por_dia": [
                {"fecha": "2026-10-03", "monto": 500},
                {"fecha": "2026-10-01T00:00:00.000Z", "monto": 250}
            ]
        });
        let view = transformar(payload, None, &ctx(false)).unwrap();
        assert_eq!(view.kpis[0].valor, "S/ 750.00");
        assert!(view.kpis[0].comparacion.is_none());
        assert_eq!(view.kpis[3].valor, "5");
        assert_eq!(view.kpis[4].valor, "75.00%");

        let metodos = &view.tablas[1];
        assert_eq!(metodos.filas[0][0], "Transferencia");
        assert_eq!(metodos.filas[0][3], "66.67%");

        let diario = &view.series[0];
        assert_eq!(diario.puntos[0].label, "01/10/2026");
        assert_eq!(diario.puntos[1].valor, 500.0);
    }

    #[test]
    fn zero_baseline_omits_variation() {
        let actual = json!({"total_cobrado": 100, "total_pendiente": 40});
        let anterior = json!({"total_cobrado": 0, "total_pendiente": 80});
        let view = transformar(actual, Some(anterior), &ctx(true)).unwrap();
        assert!(view.kpis[0].comparacion.is_none());
        assert_eq!(view.kpis[1].comparacion.as_ref().unwrap().texto, "-50.00%");
    }

    #[test]
    fn empty_payload_formats_zeroes() {
        let view = transformar(json!({}), None, &ctx(false)).unwrap();
        assert_eq!(view.kpis[0].valor, "S/ 0.00");
        assert_eq!(view.kpis[4].valor, "0.00%");
        assert!(view.tablas[1].filas.is_empty());
    }

    #[test]
    fn malformed_payload_is_a_decode_error() {
        let err = transformar(json!({"por_dia": "x"}), None, &ctx(false)).unwrap_err();
        assert_eq!(err.kind, crate::api::ErrorKind::Decode);
    }
}
