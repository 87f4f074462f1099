use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeMap;

use super::metricas::porcentaje_str;
use super::{conteo, decode_payload, monto, Kpi, ReportContext, ReportView, Serie, SeriePunto, Tabla};
use crate::api::ApiError;
use crate::format::format_currency;
use crate::models::{EstadoCliente, Monto};

const TOP_DEUDORES: usize = 10;

#[derive(Debug, Clone, Deserialize)]
pub struct EstadoConteo {
    #[serde(alias = "estado_cliente")]
    pub estado: EstadoCliente,
    #[serde(default, alias = "total")]
    pub cantidad: Option<Monto>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ClienteDeuda {
    #[serde(default, alias = "nombreCliente", alias = "nombre")]
    pub nombre_cliente: String,
    #[serde(default, alias = "rucDni")]
    pub ruc_dni: String,
    #[serde(default, alias = "estado")]
    pub estado_cliente: Option<EstadoCliente>,
    #[serde(default, alias = "cobrosPendientes")]
    pub cobros_pendientes: Option<Monto>,
    #[serde(default, alias = "montoPendiente")]
    pub monto_pendiente: Option<Monto>,
    #[serde(default, alias = "montoAtrasado")]
    pub monto_atrasado: Option<Monto>,
}

impl ClienteDeuda {
    pub fn deuda(&self) -> f64 {
        monto(&self.monto_pendiente) + monto(&self.monto_atrasado)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct EstadoClientesData {
    #[serde(default, alias = "totalClientes")]
    pub total_clientes: Option<Monto>,
    #[serde(default, alias = "porEstado")]
    pub por_estado: Vec<EstadoConteo>,
    #[serde(default, alias = "deudores")]
    pub clientes: Vec<ClienteDeuda>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EstadoClientes {
    pub total: u64,
    /// Counts per state in first-seen order.
    pub por_estado: Vec<(String, u64)>,
    pub con_deuda: u64,
    pub deuda_total: f64,
}

impl EstadoClientes {
    pub fn from_data(d: &EstadoClientesData) -> Self {
        let mut por_estado: Vec<(String, u64)> = Vec::new();
        let mut add = |estado: &str, n: u64| match por_estado.iter_mut().find(|(e, _)| e == estado) {
            Some((_, c)) => *c += n,
            None => por_estado.push((estado.to_string(), n)),
        };
        if d.por_estado.is_empty() {
            for c in &d.clientes {
                let estado = c.estado_cliente.as_ref().map(|e| e.as_str()).unwrap_or("Sin estado");
                add(estado, 1);
            }
        } else {
            for e in &d.por_estado {
                add(e.estado.as_str(), conteo(&e.cantidad));
            }
        }

        let contados: u64 = por_estado.iter().map(|(_, n)| n).sum();
        let total = match d.total_clientes.as_ref() {
            Some(_) => conteo(&d.total_clientes),
            None => contados.max(d.clientes.len() as u64),
        };
        let con_deuda = d.clientes.iter().filter(|c| c.deuda() > 0.0).count() as u64;
        let deuda_total = d.clientes.iter().map(ClienteDeuda::deuda).sum();

        Self {
            total,
            por_estado,
            con_deuda,
            deuda_total,
        }
    }
}

pub(crate) fn transformar(
    actual: Value,
    anterior: Option<Value>,
    ctx: &ReportContext,
) -> Result<ReportView, ApiError> {
    let data: EstadoClientesData = decode_payload(actual)?;
    let previo = anterior
        .map(decode_payload::<EstadoClientesData>)
        .transpose()?
        .map(|d| EstadoClientes::from_data(&d));
    Ok(vista(&data, previo.as_ref(), ctx))
}

fn vista(data: &EstadoClientesData, previo: Option<&EstadoClientes>, ctx: &ReportContext) -> ReportView {
    let r = EstadoClientes::from_data(data);
    let moneda = ctx.moneda.as_str();

    let kpis = vec![
        Kpi::comparado(
            "Total clientes",
            r.total.to_string(),
            r.total as f64,
            previo.map(|p| p.total as f64),
        ),
        Kpi::comparado(
            "Clientes con deuda",
            r.con_deuda.to_string(),
            r.con_deuda as f64,
            previo.map(|p| p.con_deuda as f64),
        ),
        Kpi::comparado(
            "Deuda total",
            format_currency(r.deuda_total, moneda),
            r.deuda_total,
            previo.map(|p| p.deuda_total),
        ),
        Kpi::new("Clientes al día", porcentaje_str((r.total.saturating_sub(r.con_deuda)) as f64, r.total as f64)),
    ];

    let total_contado: u64 = r.por_estado.iter().map(|(_, n)| n).sum();
    let mut distribucion = Tabla::new("Clientes por estado", &["Estado", "Cantidad", "Porcentaje"]);
    for (estado, n) in &r.por_estado {
        distribucion
            .filas
            .push(vec![estado.clone(), n.to_string(), porcentaje_str(*n as f64, total_contado as f64)]);
    }

    let mut deudores: Vec<&ClienteDeuda> = data.clientes.iter().filter(|c| c.deuda() > 0.0).collect();
    deudores.sort_by(|a, b| {
        b.deuda()
            .total_cmp(&a.deuda())
            .then_with(|| a.nombre_cliente.cmp(&b.nombre_cliente))
    });
    let mut top = Tabla::new(
        "Principales deudores",
        &["Cliente", "RUC/DNI", "Cobros pendientes", "Pendiente", "Atrasado", "Deuda total"],
    );
    for c in deudores.iter().take(TOP_DEUDORES) {
        top.filas.push(vec![
            c.nombre_cliente.clone(),
            c.ruc_dni.clone(),
            conteo(&c.cobros_pendientes).to_string(),
            format_currency(monto(&c.monto_pendiente), moneda),
            format_currency(monto(&c.monto_atrasado), moneda),
            format_currency(c.deuda(), moneda),
        ]);
    }

    // BTreeMap keeps the chart legend stable regardless of payload order.
    let serie: BTreeMap<&str, u64> = r.por_estado.iter().map(|(e, n)| (e.as_str(), *n)).collect();
    let series = vec![Serie {
        nombre: "Clientes por estado".to_string(),
        puntos: serie
            .into_iter()
            .map(|(label, n)| SeriePunto {
                label: label.to_string(),
                valor: n as f64,
            })
            .collect(),
    }];

    ctx.vista(kpis, vec![distribucion, top], series)
}
