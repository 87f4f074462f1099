//! Report generation: period handling, the five report transforms and the
//! service that keeps the last successful report for export.

pub mod analisis_atrasos;
pub mod estado_clientes;
pub mod metricas;
pub mod proyeccion_ingresos;
pub mod rentabilidad;
pub mod resumen_pagos;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::fmt;
use std::future::Future;
use std::str::FromStr;
use std::sync::{Arc, RwLock};
use time::{Date, Month};

use crate::api::ApiError;
use crate::format::{add_days, dias_entre, format_fecha, iso_date};
use crate::models::Monto;
use crate::notify::Notifier;
use crate::render::{exportar_reporte, ExportArtifact, ExportFormat};

pub use metricas::{comparar, porcentaje, variacion, Comparacion, RangoAtraso, Tendencia};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ReportKind {
    ResumenPagos,
    EstadoClientes,
    AnalisisAtrasos,
    ProyeccionIngresos,
    AnalisisRentabilidad,
}

impl ReportKind {
    pub const ALL: [ReportKind; 5] = [
        ReportKind::ResumenPagos,
        ReportKind::EstadoClientes,
        ReportKind::AnalisisAtrasos,
        ReportKind::ProyeccionIngresos,
        ReportKind::AnalisisRentabilidad,
    ];

    pub fn slug(&self) -> &'static str {
        match self {
            ReportKind::ResumenPagos => "resumen-pagos",
            ReportKind::EstadoClientes => "estado-clientes",
            ReportKind::AnalisisAtrasos => "analisis-atrasos",
            ReportKind::ProyeccionIngresos => "proyeccion-ingresos",
            ReportKind::AnalisisRentabilidad => "analisis-rentabilidad",
        }
    }

    pub fn endpoint(&self) -> String {
        format!("/reportes/{}", self.slug())
    }

    pub fn titulo(&self) -> &'static str {
        match self {
            ReportKind::ResumenPagos => "Resumen de pagos",
            ReportKind::EstadoClientes => "Estado de clientes",
            ReportKind::AnalisisAtrasos => "Análisis de atrasos",
            ReportKind::ProyeccionIngresos => "Proyección de ingresos",
            ReportKind::AnalisisRentabilidad => "Análisis de rentabilidad",
        }
    }
}

impl fmt::Display for ReportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.slug())
    }
}

impl FromStr for ReportKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase().replace('_', "-");
        ReportKind::ALL
            .into_iter()
            .find(|k| k.slug() == wanted)
            .ok_or_else(|| {
                let known: Vec<&str> = ReportKind::ALL.iter().map(|k| k.slug()).collect();
                format!("unknown report `{s}` (expected one of: {})", known.join(", "))
            })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Periodo {
    pub inicio: Date,
    pub fin: Date,
}

fn primero_del_mes(d: Date) -> Date {
    d.replace_day(1).unwrap_or(d)
}

fn ultimo_del_mes(d: Date) -> Date {
    let (year, month) = if d.month() == Month::December {
        (d.year() + 1, Month::January)
    } else {
        (d.year(), d.month().next())
    };
    match Date::from_calendar_date(year, month, 1) {
        Ok(next) => add_days(next, -1),
        Err(_) => d,
    }
}

impl Periodo {
    pub fn new(inicio: Date, fin: Date) -> Result<Self, String> {
        if fin < inicio {
            return Err("La fecha final no puede ser anterior a la inicial.".to_string());
        }
        Ok(Self { inicio, fin })
    }

    pub fn mes_actual(hoy: Date) -> Self {
        Self {
            inicio: primero_del_mes(hoy),
            fin: ultimo_del_mes(hoy),
        }
    }

    pub fn mes_anterior(hoy: Date) -> Self {
        Self::mes_actual(add_days(primero_del_mes(hoy), -1))
    }

    /// Current month plus the two before it.
    pub fn trimestre(hoy: Date) -> Self {
        let mut inicio = primero_del_mes(hoy);
        for _ in 0..2 {
            inicio = primero_del_mes(add_days(inicio, -1));
        }
        Self {
            inicio,
            fin: ultimo_del_mes(hoy),
        }
    }

    pub fn anio(hoy: Date) -> Self {
        let inicio = Date::from_calendar_date(hoy.year(), Month::January, 1).unwrap_or(hoy);
        let fin = Date::from_calendar_date(hoy.year(), Month::December, 31).unwrap_or(hoy);
        Self { inicio, fin }
    }

    pub fn por_nombre(nombre: &str, hoy: Date) -> Option<Self> {
        match nombre.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "mes_actual" | "mes" => Some(Self::mes_actual(hoy)),
            "mes_anterior" => Some(Self::mes_anterior(hoy)),
            "trimestre" => Some(Self::trimestre(hoy)),
            "anio" | "año" => Some(Self::anio(hoy)),
            _ => None,
        }
    }

    pub fn dias(&self) -> i64 {
        dias_entre(self.inicio, self.fin) + 1
    }

    /// The window of equal length that ends the day before this one starts.
    pub fn anterior(&self) -> Self {
        let fin = add_days(self.inicio, -1);
        Self {
            inicio: add_days(fin, -(self.dias() - 1)),
            fin,
        }
    }

    pub fn contiene(&self, d: Date) -> bool {
        self.inicio <= d && d <= self.fin
    }

    pub fn to_query(&self) -> Vec<(&'static str, String)> {
        vec![
            ("fechaInicio", iso_date(self.inicio)),
            ("fechaFin", iso_date(self.fin)),
        ]
    }

    pub fn label(&self) -> String {
        format!("{} - {}", format_fecha(self.inicio), format_fecha(self.fin))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Kpi {
    pub label: String,
    pub valor: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comparacion: Option<Comparacion>,
}

impl Kpi {
    pub fn new(label: &str, valor: String) -> Self {
        Self {
            label: label.to_string(),
            valor,
            comparacion: None,
        }
    }

    pub fn comparado(label: &str, valor: String, actual: f64, anterior: Option<f64>) -> Self {
        Self {
            label: label.to_string(),
            valor,
            comparacion: comparar(actual, anterior),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Tabla {
    pub titulo: String,
    pub columnas: Vec<String>,
    pub filas: Vec<Vec<String>>,
}

impl Tabla {
    pub fn new(titulo: &str, columnas: &[&str]) -> Self {
        Self {
            titulo: titulo.to_string(),
            columnas: columnas.iter().map(|c| c.to_string()).collect(),
            filas: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeriePunto {
    pub label: String,
    pub valor: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Serie {
    pub nombre: String,
    pub puntos: Vec<SeriePunto>,
}

/// Fully formatted report, ready to render or export as is.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportView {
    pub kind: ReportKind,
    pub titulo: String,
    pub periodo: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comparado_con: Option<String>,
    pub generado: String,
    pub kpis: Vec<Kpi>,
    pub tablas: Vec<Tabla>,
    pub series: Vec<Serie>,
}

#[derive(Debug, Clone)]
pub struct ReportContext {
    pub kind: ReportKind,
    pub periodo: Periodo,
    pub anterior: Option<Periodo>,
    pub moneda: String,
    pub hoy: Date,
}

impl ReportContext {
    pub(crate) fn vista(&self, kpis: Vec<Kpi>, tablas: Vec<Tabla>, series: Vec<Serie>) -> ReportView {
        ReportView {
            kind: self.kind,
            titulo: self.kind.titulo().to_string(),
            periodo: self.periodo.label(),
            comparado_con: self.anterior.map(|p| p.label()),
            generado: format_fecha(self.hoy),
            kpis,
            tablas,
            series,
        }
    }
}

pub(crate) fn monto(m: &Option<Monto>) -> f64 {
    m.as_ref().and_then(Monto::value).unwrap_or(0.0)
}

pub(crate) fn conteo(m: &Option<Monto>) -> u64 {
    monto(m).max(0.0).round() as u64
}

/// Backend payloads may come bare or wrapped in `{"data": ...}`.
pub(crate) fn decode_payload<T: DeserializeOwned>(v: Value) -> Result<T, ApiError> {
    let inner = match v {
        Value::Object(mut map) if map.len() == 1 && map.contains_key("data") => {
            map.remove("data").unwrap_or(Value::Null)
        }
        other => other,
    };
    serde_json::from_value(inner).map_err(ApiError::decode)
}

/// Dispatches to the transform of `ctx.kind`.
pub fn transformar(actual: Value, anterior: Option<Value>, ctx: &ReportContext) -> Result<ReportView, ApiError> {
    match ctx.kind {
        ReportKind::ResumenPagos => resumen_pagos::transformar(actual, anterior, ctx),
        ReportKind::EstadoClientes => estado_clientes::transformar(actual, anterior, ctx),
        ReportKind::AnalisisAtrasos => analisis_atrasos::transformar(actual, anterior, ctx),
        ReportKind::ProyeccionIngresos => proyeccion_ingresos::transformar(actual, anterior, ctx),
        ReportKind::AnalisisRentabilidad => rentabilidad::transformar(actual, anterior, ctx),
    }
}

pub trait ReportSource: Send + Sync {
    fn fetch_report(
        &self,
        kind: ReportKind,
        periodo: &Periodo,
    ) -> impl Future<Output = Result<Value, ApiError>> + Send;
}

pub struct ReportService<S, N> {
    source: S,
    notifier: N,
    moneda: String,
    ultimo: RwLock<Option<Arc<ReportView>>>,
}

impl<S: ReportSource, N: Notifier> ReportService<S, N> {
    pub fn new(source: S, notifier: N, moneda: &str) -> Self {
        Self {
            source,
            notifier,
            moneda: moneda.to_string(),
            ultimo: RwLock::new(None),
        }
    }

    /// Fetches and transforms a report. On failure the previously generated
    /// report is kept, an error notice is emitted and the error is returned.
    pub async fn generar(
        &self,
        kind: ReportKind,
        periodo: Periodo,
        con_comparacion: bool,
        hoy: Date,
    ) -> Result<Arc<ReportView>, ApiError> {
        let ctx = ReportContext {
            kind,
            periodo,
            anterior: con_comparacion.then(|| periodo.anterior()),
            moneda: self.moneda.clone(),
            hoy,
        };

        match self.generar_con(&ctx).await {
            Ok(view) => {
                let view = Arc::new(view);
                if let Ok(mut guard) = self.ultimo.write() {
                    *guard = Some(view.clone());
                }
                tracing::info!(report = %kind, periodo = %periodo.label(), "report generated");
                self.notifier.success(&format!("{} generado.", kind.titulo()));
                Ok(view)
            }
            Err(e) => {
                tracing::error!(report = %kind, error = %e, "report generation failed");
                self.notifier
                    .error(&format!("No se pudo generar el reporte: {}", e.message));
                Err(e)
            }
        }
    }

    async fn generar_con(&self, ctx: &ReportContext) -> Result<ReportView, ApiError> {
        let actual = self.source.fetch_report(ctx.kind, &ctx.periodo).await?;
        let anterior = match ctx.anterior.as_ref() {
            Some(p) => Some(self.source.fetch_report(ctx.kind, p).await?),
            None => None,
        };
        transformar(actual, anterior, ctx)
    }

    pub fn ultimo(&self) -> Option<Arc<ReportView>> {
        self.ultimo.read().ok().and_then(|g| g.clone())
    }

    /// Export stays disabled until a report has been generated successfully.
    pub fn puede_exportar(&self) -> bool {
        self.ultimo().is_some()
    }

    /// Exports the last generated report without refetching it.
    pub fn exportar(&self, formato: ExportFormat) -> Result<ExportArtifact, String> {
        let view = self
            .ultimo()
            .ok_or_else(|| "No hay un reporte generado para exportar.".to_string())?;
        let artifact = exportar_reporte(&view, formato);
        self.notifier
            .success(&format!("Reporte exportado como {}.", formato.extension().to_uppercase()));
        Ok(artifact)
    }
}
