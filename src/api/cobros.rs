use super::{ApiClient, ApiError};
use crate::models::{Cobro, CobroPatch, EstadoCobro, ListEnvelope, NuevoCobro, RecordId, RegistroPago};

#[derive(Debug, Clone, Default)]
pub struct CobroFiltro {
    pub estado: Option<EstadoCobro>,
    pub cliente_id: Option<RecordId>,
    pub fecha_inicio: Option<String>,
    pub fecha_fin: Option<String>,
    pub periodo: Option<String>,
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

impl CobroFiltro {
    pub fn pendientes() -> Self {
        Self {
            estado: Some(EstadoCobro::Pendiente),
            ..Self::default()
        }
    }

    pub fn to_query(&self) -> Vec<(&'static str, String)> {
        let mut q = Vec::new();
        if let Some(e) = &self.estado {
            q.push(("estado", e.as_str().to_string()));
        }
        if let Some(id) = &self.cliente_id {
            q.push(("clienteId", id.to_string()));
        }
        if let Some(f) = self.fecha_inicio.as_deref().filter(|s| !s.trim().is_empty()) {
            q.push(("fechaInicio", f.trim().to_string()));
        }
        if let Some(f) = self.fecha_fin.as_deref().filter(|s| !s.trim().is_empty()) {
            q.push(("fechaFin", f.trim().to_string()));
        }
        if let Some(p) = self.periodo.as_deref().filter(|s| !s.trim().is_empty()) {
            q.push(("periodo", p.trim().to_string()));
        }
        if let Some(p) = self.page {
            q.push(("page", p.to_string()));
        }
        if let Some(l) = self.limit {
            q.push(("limit", l.to_string()));
        }
        q
    }
}

impl ApiClient {
    pub async fn list_cobros(&self, filtro: &CobroFiltro) -> Result<Vec<Cobro>, ApiError> {
        let env: ListEnvelope<Cobro> = self.get("/cobros", &filtro.to_query()).await?;
        env.into_vec("cobros").map_err(ApiError::decode)
    }

    pub async fn get_cobro(&self, id: &RecordId) -> Result<Cobro, ApiError> {
        self.get(&format!("/cobros/{id}"), &[]).await
    }

    pub async fn create_cobro(&self, input: &NuevoCobro) -> Result<Cobro, ApiError> {
        input.validate().map_err(ApiError::validation)?;
        self.post("/cobros", input).await
    }

    pub async fn update_cobro(&self, id: &RecordId, patch: &CobroPatch) -> Result<Cobro, ApiError> {
        patch.validate().map_err(ApiError::validation)?;
        self.put(&format!("/cobros/{id}"), patch).await
    }

    /// Requests the transition to paid; the returned record carries the state
    /// the backend actually applied.
    pub async fn registrar_pago(&self, id: &RecordId, pago: &RegistroPago) -> Result<Cobro, ApiError> {
        pago.validate().map_err(ApiError::validation)?;
        self.put(&format!("/cobros/{id}"), pago).await
    }

    pub async fn anular_cobro(&self, id: &RecordId) -> Result<Cobro, ApiError> {
        let patch = CobroPatch {
            estado_cobro: Some(EstadoCobro::Anulado),
            ..CobroPatch::default()
        };
        self.put::<_, Cobro>(&format!("/cobros/{id}"), &patch).await
    }

    pub async fn delete_cobro(&self, id: &RecordId) -> Result<(), ApiError> {
        self.delete(&format!("/cobros/{id}")).await.map_err(|e| {
            e.with_conflict_message("No se puede eliminar el cobro porque ya tiene pagos registrados.")
        })
    }
}
