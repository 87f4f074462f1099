use serde::Deserialize;
use serde_json::Value;

use super::metricas::{porcentaje, porcentaje_str};
use super::{conteo, decode_payload, monto, Kpi, ReportContext, ReportView, Serie, SeriePunto, Tabla};
use crate::api::ApiError;
use crate::format::{format_currency, format_porcentaje};
use crate::models::{ListEnvelope, Monto};

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ServicioRentabilidad {
    #[serde(default, alias = "nombreServicio", alias = "servicio")]
    pub nombre_servicio: String,
    #[serde(default, alias = "total_ingresos", alias = "totalIngresos")]
    pub ingresos: Option<Monto>,
    #[serde(default, alias = "total_costos", alias = "totalCostos", alias = "costo")]
    pub costos: Option<Monto>,
    #[serde(default, alias = "cantidadCobros", alias = "total_cobros")]
    pub cantidad_cobros: Option<Monto>,
    #[serde(default, alias = "cantidadClientes", alias = "total_clientes")]
    pub cantidad_clientes: Option<Monto>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Margen {
    pub servicio: String,
    pub ingresos: f64,
    pub costos: f64,
    pub cobros: u64,
    pub clientes: u64,
}

impl Margen {
    pub fn margen(&self) -> f64 {
        self.ingresos - self.costos
    }

    /// `None` for services without revenue.
    pub fn margen_pct(&self) -> Option<f64> {
        porcentaje(self.margen(), self.ingresos)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Rentabilidad {
    /// Highest revenue first.
    pub servicios: Vec<Margen>,
}

impl Rentabilidad {
    pub fn from_items(items: &[ServicioRentabilidad]) -> Self {
        let mut servicios: Vec<Margen> = items
            .iter()
            .map(|s| Margen {
                servicio: if s.nombre_servicio.trim().is_empty() {
                    "Sin servicio".to_string()
                } else {
                    s.nombre_servicio.trim().to_string()
                },
                ingresos: monto(&s.ingresos),
                costos: monto(&s.costos),
                cobros: conteo(&s.cantidad_cobros),
                clientes: conteo(&s.cantidad_clientes),
            })
            .collect();
        servicios.sort_by(|a, b| b.ingresos.total_cmp(&a.ingresos).then_with(|| a.servicio.cmp(&b.servicio)));
        Self { servicios }
    }

    pub fn ingresos(&self) -> f64 {
        self.servicios.iter().map(|s| s.ingresos).sum()
    }

    pub fn costos(&self) -> f64 {
        self.servicios.iter().map(|s| s.costos).sum()
    }

    pub fn margen(&self) -> f64 {
        self.ingresos() - self.costos()
    }
}

fn decode(v: Value) -> Result<Rentabilidad, ApiError> {
    let env: ListEnvelope<ServicioRentabilidad> = decode_payload(v)?;
    let items = env.into_vec("servicios").map_err(ApiError::decode)?;
    Ok(Rentabilidad::from_items(&items))
}

pub(crate) fn transformar(
    actual: Value,
    anterior: Option<Value>,
    ctx: &ReportContext,
) -> Result<ReportView, ApiError> {
    let r = decode(actual)?;
    let previo = anterior.map(decode).transpose()?;
    Ok(vista(&r, previo.as_ref(), ctx))
}

fn pct_o_guion(v: Option<f64>) -> String {
    v.map(format_porcentaje).unwrap_or_else(|| "-".to_string())
}

fn vista(r: &Rentabilidad, previo: Option<&Rentabilidad>, ctx: &ReportContext) -> ReportView {
    let moneda = ctx.moneda.as_str();
    let ingresos = r.ingresos();

    let kpis = vec![
        Kpi::comparado(
            "Ingresos totales",
            format_currency(ingresos, moneda),
            ingresos,
            previo.map(Rentabilidad::ingresos),
        ),
        Kpi::comparado(
            "Costos totales",
            format_currency(r.costos(), moneda),
            r.costos(),
            previo.map(Rentabilidad::costos),
        ),
        Kpi::comparado(
            "Margen total",
            format_currency(r.margen(), moneda),
            r.margen(),
            previo.map(Rentabilidad::margen),
        ),
        Kpi::new("Margen promedio", pct_o_guion(porcentaje(r.margen(), ingresos))),
    ];

    let mut tabla = Tabla::new(
        "Rentabilidad por servicio",
        &["Servicio", "Cobros", "Clientes", "Ingresos", "Costos", "Margen", "Margen %", "Participación"],
    );
    for s in &r.servicios {
        tabla.filas.push(vec![
            s.servicio.clone(),
            s.cobros.to_string(),
            s.clientes.to_string(),
            format_currency(s.ingresos, moneda),
            format_currency(s.costos, moneda),
            format_currency(s.margen(), moneda),
            pct_o_guion(s.margen_pct()),
            porcentaje_str(s.ingresos, ingresos),
        ]);
    }

    let series = vec![
        Serie {
            nombre: "Ingresos por servicio".to_string(),
            puntos: r
                .servicios
                .iter()
                .map(|s| SeriePunto {
                    label: s.servicio.clone(),
                    valor: s.ingresos,
                })
                .collect(),
        },
        Serie {
            nombre: "Margen por servicio".to_string(),
            puntos: r
                .servicios
                .iter()
                .map(|s| SeriePunto {
                    label: s.servicio.clone(),
                    valor: s.margen(),
                })
                .collect(),
        },
    ];

    ctx.vista(kpis, vec![tabla], series)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reportes::{Periodo, ReportKind};
    use serde_json::json;
    use time::macros::date;

    fn ctx() -> ReportContext {
        let hoy = date!(2026 - 10 - 19);
        let periodo = Periodo::mes_actual(hoy);
        ReportContext {
            kind: ReportKind::AnalisisRentabilidad,
            periodo,
            anterior: Some(periodo.anterior()),
            moneda: "PEN".to_string(),
            hoy,
        }
    }

    #[test]
    fn margins_and_shares() {
        let payload = json!({"servicios": [
            {"nombre_servicio": "Hosting", "ingresos": 1000, "costos": 400, "cantidad_cobros": 10},
            {"nombre_servicio": "Dominio", "ingresos": "3000.00", "costos": "3300"},
            {"nombre_servicio": "Soporte", "ingresos": 0, "costos": 50}
        ]});
        let view = transformar(payload, None, &ctx()).unwrap();
        let filas = &view.tablas[0].filas;
        assert_eq!(filas[0][0], "Dominio");
        assert_eq!(filas[0][5], "S/ -300.00");
        assert_eq!(filas[0][6], "-10.00%");
        assert_eq!(filas[0][7], "75.00%");
        assert_eq!(filas[1][6], "60.00%");
        assert_eq!(filas[2][6], "-");
        assert_eq!(view.kpis[2].valor, "S/ 250.00");
    }

    #[test]
    fn comparison_against_previous_revenue() {
        let actual = json!([{"nombre_servicio": "Hosting", "ingresos": 1200, "costos": 200}]);
        let anterior = json!({"data": [{"nombre_servicio": "Hosting", "ingresos": 1000, "costos": 0}]});
        let view = transformar(actual, Some(anterior), &ctx()).unwrap();
        assert_eq!(view.kpis[0].comparacion.as_ref().unwrap().texto, "+20.00%");
        assert!(view.kpis[1].comparacion.is_none());
        assert_eq!(view.kpis[2].comparacion.as_ref().unwrap().texto, "0.00%");
    }
}
