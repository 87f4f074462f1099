use serde_json::Value;

use super::{ApiClient, ApiError};
use crate::dashboard::DashboardTotales;
use crate::reportes::{Periodo, ReportKind, ReportSource};

impl ApiClient {
    pub async fn dashboard_totales(&self) -> Result<DashboardTotales, ApiError> {
        let raw: Value = self.get("/reportes/dashboard", &[]).await?;
        crate::reportes::decode_payload(raw)
    }

    pub async fn reporte(&self, kind: ReportKind, periodo: &Periodo) -> Result<Value, ApiError> {
        self.get(&kind.endpoint(), &periodo.to_query()).await
    }
}

impl ReportSource for ApiClient {
    async fn fetch_report(&self, kind: ReportKind, periodo: &Periodo) -> Result<Value, ApiError> {
        self.reporte(kind, periodo).await
    }
}
