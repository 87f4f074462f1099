use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeMap;
use time::Date;

use super::metricas::porcentaje_str;
use super::{decode_payload, monto, Kpi, ReportContext, ReportView, Serie, SeriePunto, Tabla};
use crate::api::ApiError;
use crate::format::format_currency;
use crate::models::{Cobro, Monto};

#[derive(Debug, Clone, Default, Deserialize)]
pub struct IngresoMensual {
    /// `YYYY-MM` or any date inside the month.
    #[serde(default, alias = "periodo")]
    pub mes: String,
    #[serde(default, alias = "total")]
    pub monto: Option<Monto>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProyeccionData {
    #[serde(default, alias = "cobros_pendientes", alias = "cobrosPendientes")]
    pub cobros: Vec<Cobro>,
    #[serde(default, alias = "ingresos_historicos", alias = "historicos")]
    pub historico: Vec<IngresoMensual>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Payload {
    Lista(Vec<Cobro>),
    Objeto(ProyeccionData),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Mes {
    pub anio: i32,
    pub mes: u8,
}

impl Mes {
    pub fn of(d: Date) -> Self {
        Self {
            anio: d.year(),
            mes: u8::from(d.month()),
        }
    }

    /// Parses `YYYY-MM`, `YYYY-MM-DD` or an ISO timestamp.
    pub fn parse(raw: &str) -> Option<Self> {
        let s = raw.trim();
        let anio = s.get(..4)?.parse::<i32>().ok()?;
        if s.as_bytes().get(4) != Some(&b'-') {
            return None;
        }
        let mes = s.get(5..7)?.parse::<u8>().ok()?;
        (1..=12).contains(&mes).then_some(Self { anio, mes })
    }

    pub fn label(&self) -> String {
        format!("{:02}/{}", self.mes, self.anio)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MesProyectado {
    pub mes: Mes,
    pub cantidad: u64,
    pub monto: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Proyeccion {
    /// Open charges due today or later, grouped by month, ascending.
    pub meses: Vec<MesProyectado>,
    /// Open charges already past due.
    pub en_riesgo: f64,
    pub cobros_en_riesgo: u64,
    pub historico: Vec<(Mes, f64)>,
}

impl Proyeccion {
    pub fn total(&self) -> f64 {
        self.meses.iter().map(|m| m.monto).sum()
    }

    pub fn promedio_historico(&self) -> Option<f64> {
        if self.historico.is_empty() {
            return None;
        }
        Some(self.historico.iter().map(|(_, v)| v).sum::<f64>() / self.historico.len() as f64)
    }

    pub fn mes(&self, mes: Mes) -> f64 {
        self.meses.iter().find(|m| m.mes == mes).map(|m| m.monto).unwrap_or(0.0)
    }
}

pub fn proyectar(data: &ProyeccionData, hoy: Date) -> Proyeccion {
    let mut meses: BTreeMap<Mes, (u64, f64)> = BTreeMap::new();
    let mut en_riesgo = 0.0;
    let mut cobros_en_riesgo = 0;

    for c in data.cobros.iter().filter(|c| c.estado_cobro.is_open()) {
        let Some(vencimiento) = c.vencimiento() else {
            continue;
        };
        let valor = c.monto_value().unwrap_or_else(|| {
            tracing::warn!(cobro = %c.id, "invalid amount counted as 0");
            0.0
        });
        if vencimiento < hoy {
            en_riesgo += valor;
            cobros_en_riesgo += 1;
        } else {
            let entry = meses.entry(Mes::of(vencimiento)).or_insert((0, 0.0));
            entry.0 += 1;
            entry.1 += valor;
        }
    }

    let mut historico: BTreeMap<Mes, f64> = BTreeMap::new();
    for h in &data.historico {
        match Mes::parse(&h.mes) {
            Some(m) => *historico.entry(m).or_insert(0.0) += monto(&h.monto),
            None => tracing::warn!(mes = %h.mes, "skipping historical entry with invalid month"),
        }
    }

    Proyeccion {
        meses: meses
            .into_iter()
            .map(|(mes, (cantidad, monto))| MesProyectado { mes, cantidad, monto })
            .collect(),
        en_riesgo,
        cobros_en_riesgo,
        historico: historico.into_iter().collect(),
    }
}

fn decode(v: Value) -> Result<ProyeccionData, ApiError> {
    Ok(match decode_payload::<Payload>(v)? {
        Payload::Lista(cobros) => ProyeccionData {
            cobros,
            historico: Vec::new(),
        },
        Payload::Objeto(data) => data,
    })
}

pub(crate) fn transformar(
    actual: Value,
    anterior: Option<Value>,
    ctx: &ReportContext,
) -> Result<ReportView, ApiError> {
    let p = proyectar(&decode(actual)?, ctx.hoy);
    let previo = match anterior {
        Some(v) => {
            let corte = ctx.anterior.map(|a| a.fin).unwrap_or(ctx.hoy);
            Some(proyectar(&decode(v)?, corte))
        }
        None => None,
    };
    Ok(vista(&p, previo.as_ref(), ctx))
}

fn vista(p: &Proyeccion, previo: Option<&Proyeccion>, ctx: &ReportContext) -> ReportView {
    let moneda = ctx.moneda.as_str();
    let total = p.total();
    let este_mes = p.mes(Mes::of(ctx.hoy));
    let promedio = p.promedio_historico();

    let mut kpis = vec![
        Kpi::comparado(
            "Ingresos proyectados",
            format_currency(total, moneda),
            total,
            previo.map(Proyeccion::total),
        ),
        Kpi::comparado(
            "Proyección del mes",
            format_currency(este_mes, moneda),
            este_mes,
            promedio,
        ),
        Kpi::new("Monto en riesgo", format_currency(p.en_riesgo, moneda)),
        Kpi::new("Cobros en riesgo", p.cobros_en_riesgo.to_string()),
    ];
    if let Some(avg) = promedio {
        kpis.push(Kpi::new("Promedio histórico mensual", format_currency(avg, moneda)));
    }

    let mut por_mes = Tabla::new("Proyección por mes", &["Mes", "Cobros", "Monto esperado", "Participación"]);
    for m in &p.meses {
        por_mes.filas.push(vec![
            m.mes.label(),
            m.cantidad.to_string(),
            format_currency(m.monto, moneda),
            porcentaje_str(m.monto, total),
        ]);
    }

    let mut historico = Tabla::new("Ingresos históricos", &["Mes", "Monto"]);
    for (mes, valor) in &p.historico {
        historico.filas.push(vec![mes.label(), format_currency(*valor, moneda)]);
    }

    let series = vec![
        Serie {
            nombre: "Proyectado".to_string(),
            puntos: p
                .meses
                .iter()
                .map(|m| SeriePunto {
                    label: m.mes.label(),
                    valor: m.monto,
                })
                .collect(),
        },
        Serie {
            nombre: "Histórico".to_string(),
            puntos: p
                .historico
                .iter()
                .map(|(mes, valor)| SeriePunto {
                    label: mes.label(),
                    valor: *valor,
                })
                .collect(),
        },
    ];

    ctx.vista(kpis, vec![por_mes, historico], series)
}
