//! Dashboard cards: backend totals and the upcoming-dues aggregation.

pub mod vencimientos;

use serde::{Deserialize, Serialize};
use time::Date;

use crate::api::{ApiClient, CobroFiltro};
use crate::models::Monto;
use crate::notify::Notifier;
use crate::reportes::{conteo, monto};

pub use vencimientos::{agrupar_vencimientos, BucketVencimiento, Vencimientos, VENTANA_DIAS};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DashboardTotales {
    #[serde(default, alias = "totalClientes")]
    pub total_clientes: Option<Monto>,
    #[serde(default, alias = "clientesActivos")]
    pub clientes_activos: Option<Monto>,
    #[serde(default, alias = "cobrosPendientes")]
    pub cobros_pendientes: Option<Monto>,
    #[serde(default, alias = "cobrosAtrasados")]
    pub cobros_atrasados: Option<Monto>,
    #[serde(default, alias = "montoPendiente")]
    pub monto_pendiente: Option<Monto>,
    #[serde(default, alias = "montoAtrasado")]
    pub monto_atrasado: Option<Monto>,
    #[serde(default, alias = "cobradoMes", alias = "ingresos_mes")]
    pub cobrado_mes: Option<Monto>,
}

/// Counts arrive as numbers or numeric strings, like the amounts.
impl DashboardTotales {
    pub fn total_clientes(&self) -> u64 {
        conteo(&self.total_clientes)
    }

    pub fn clientes_activos(&self) -> u64 {
        conteo(&self.clientes_activos)
    }

    pub fn cobros_pendientes(&self) -> u64 {
        conteo(&self.cobros_pendientes)
    }

    pub fn cobros_atrasados(&self) -> u64 {
        conteo(&self.cobros_atrasados)
    }

    pub fn monto_pendiente(&self) -> f64 {
        monto(&self.monto_pendiente)
    }

    pub fn monto_atrasado(&self) -> f64 {
        monto(&self.monto_atrasado)
    }

    pub fn cobrado_mes(&self) -> f64 {
        monto(&self.cobrado_mes)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct DashboardResumen {
    /// `None` when the totals could not be loaded.
    pub totales: Option<DashboardTotales>,
    pub vencimientos: Vencimientos,
}

pub struct Dashboard<N> {
    api: ApiClient,
    notifier: N,
}

impl<N: Notifier> Dashboard<N> {
    pub fn new(api: ApiClient, notifier: N) -> Self {
        Self { api, notifier }
    }

    /// Never fails: a fetch error yields the empty aggregation and a warning notice.
    pub async fn load_vencimientos(&self, hoy: Date) -> Vencimientos {
        match self.api.list_cobros(&CobroFiltro::pendientes()).await {
            Ok(cobros) => agrupar_vencimientos(&cobros, hoy),
            Err(e) => {
                tracing::warn!(error = %e, "could not load upcoming dues");
                self.notifier
                    .warning(&format!("No se pudieron cargar los próximos vencimientos: {}", e.message));
                Vencimientos::default()
            }
        }
    }

    pub async fn load_totales(&self) -> Option<DashboardTotales> {
        match self.api.dashboard_totales().await {
            Ok(t) => Some(t),
            Err(e) => {
                tracing::warn!(error = %e, "could not load dashboard totals");
                self.notifier
                    .warning(&format!("No se pudieron cargar los indicadores: {}", e.message));
                None
            }
        }
    }

    pub async fn load(&self, hoy: Date) -> DashboardResumen {
        let (totales, vencimientos) = tokio::join!(self.load_totales(), self.load_vencimientos(hoy));
        DashboardResumen { totales, vencimientos }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::stub::{serve, test_client};
    use crate::notify::{MemoryNotifier, NoticeLevel};
    use time::macros::date;

    #[test]
    fn totals_tolerate_string_counts() {
        let t: DashboardTotales = serde_json::from_str(
            r#"{"totalClientes":"12","clientes_activos":9,"cobrosAtrasados":"x","montoAtrasado":"310.40"}"#,
        )
        .unwrap();
        assert_eq!(t.total_clientes(), 12);
        assert_eq!(t.clientes_activos(), 9);
        assert_eq!(t.cobros_pendientes(), 0);
        assert_eq!(t.cobros_atrasados(), 0);
        assert_eq!(t.monto_atrasado(), 310.4);
    }

    #[tokio::test]
    async fn failed_fetch_degrades_to_zero_with_warning() {
        let (base, _log) = serve(|_| Some((503, "{}".to_string()))).await;
        let notifier = MemoryNotifier::new();
        let dash = Dashboard::new(test_client(&base, 5_000), notifier.clone());
        let v = dash.load_vencimientos(date!(2026 - 10 - 19)).await;
        assert_eq!(v, Vencimientos::default());
        let notices = notifier.take();
        assert_eq!(notices.len(), 1);
        assert_eq!(notices[0].level, NoticeLevel::Warning);
    }

    #[tokio::test]
    async fn sub_fetches_degrade_independently() {
        let (base, log) = serve(|req| {
            if req.path.ends_with("/reportes/dashboard") {
                Some((500, r#"{"message":"fallo"}"#.to_string()))
            } else {
                Some((
                    200,
                    r#"{"cobros":[{"id":1,"monto":"40","fecha_vencimiento":"2026-10-20","estado_cobro":"Pendiente"}]}"#
                        .to_string(),
                ))
            }
        })
        .await;
        let notifier = MemoryNotifier::new();
        let dash = Dashboard::new(test_client(&base, 5_000), notifier.clone());
        let r = dash.load(date!(2026 - 10 - 19)).await;
        assert!(r.totales.is_none());
        assert_eq!(r.vencimientos.total_count, 1);
        assert_eq!(r.vencimientos.total_amount, "40.00");
        assert_eq!(notifier.take().len(), 1);
        let reqs = log.lock().unwrap();
        let cobros = reqs.iter().find(|r| r.path.ends_with("/cobros")).unwrap();
        assert_eq!(cobros.query, "estado=Pendiente");
    }
}
