use super::{ApiClient, ApiError};
use crate::models::{ListEnvelope, NuevoServicio, RecordId, Servicio, ServicioEstadisticas};

impl ApiClient {
    pub async fn list_servicios(&self) -> Result<Vec<Servicio>, ApiError> {
        let env: ListEnvelope<Servicio> = self.get("/servicios", &[]).await?;
        env.into_vec("servicios").map_err(ApiError::decode)
    }

    pub async fn get_servicio(&self, id: &RecordId) -> Result<Servicio, ApiError> {
        self.get(&format!("/servicios/{id}"), &[]).await
    }

    pub async fn estadisticas_servicio(&self, id: &RecordId) -> Result<ServicioEstadisticas, ApiError> {
        self.get(&format!("/servicios/{id}/estadisticas"), &[]).await
    }

    pub async fn create_servicio(&self, input: &NuevoServicio) -> Result<Servicio, ApiError> {
        input.validate().map_err(ApiError::validation)?;
        self.post("/servicios", input).await
    }

    pub async fn update_servicio(&self, id: &RecordId, input: &NuevoServicio) -> Result<Servicio, ApiError> {
        input.validate().map_err(ApiError::validation)?;
        self.put(&format!("/servicios/{id}"), input).await
    }

    pub async fn delete_servicio(&self, id: &RecordId) -> Result<(), ApiError> {
        self.delete(&format!("/servicios/{id}")).await.map_err(|e| {
            e.with_conflict_message(
                "No se puede eliminar el servicio porque está asignado a clientes o cobros.",
            )
        })
    }
}

#[cfg(test)]
mod tests {
    use super::super::stub::{serve, test_client};
    use super::*;
    use crate::api::ErrorKind;

    #[tokio::test]
    async fn statistics_decode_loose_amounts() {
        let (base, _log) = serve(|req| {
            assert!(req.path.ends_with("/servicios/5/estadisticas"));
            Some((200, r#"{"totalClientes":4,"totalCobros":12,"montoTotal":"1200.00"}"#.to_string()))
        })
        .await;
        let api = test_client(&base, 5_000);
        let stats = api.estadisticas_servicio(&RecordId::Num(5)).await.unwrap();
        assert_eq!(stats.total_clientes, 4);
        assert_eq!(stats.monto_total.and_then(|m| m.value()), Some(1200.0));
    }

    #[tokio::test]
    async fn list_accepts_bare_array() {
        let (base, log) = serve(|_| {
            Some((200, r#"[{"id":1,"nombre_servicio":"Internet","precio_base":"80.00"}]"#.to_string()))
        })
        .await;
        let api = test_client(&base, 5_000);
        let servicios = api.list_servicios().await.unwrap();
        assert_eq!(servicios.len(), 1);
        assert_eq!(servicios[0].precio(), 80.0);
        assert_eq!(log.lock().unwrap()[0].path, "/api/v1/servicios");
    }

    #[tokio::test]
    async fn create_and_update_send_the_service() {
        let (base, log) = serve(|_| {
            Some((200, r#"{"id":9,"nombre_servicio":"Hosting","precio_base":45.9}"#.to_string()))
        })
        .await;
        let api = test_client(&base, 5_000);
        let input = NuevoServicio {
            nombre_servicio: "Hosting".into(),
            precio_base: 45.9,
            descripcion: None,
        };
        api.create_servicio(&input).await.unwrap();
        api.update_servicio(&RecordId::Num(9), &input).await.unwrap();

        let reqs = log.lock().unwrap();
        assert_eq!((reqs[0].method.as_str(), reqs[0].path.as_str()), ("POST", "/api/v1/servicios"));
        assert_eq!((reqs[1].method.as_str(), reqs[1].path.as_str()), ("PUT", "/api/v1/servicios/9"));
        let body: serde_json::Value = serde_json::from_str(&reqs[1].body).unwrap();
        assert_eq!(body, serde_json::json!({"nombre_servicio": "Hosting", "precio_base": 45.9}));
    }

    #[tokio::test]
    async fn unnamed_service_is_not_sent() {
        let (base, log) = serve(|_| Some((201, "{}".to_string()))).await;
        let api = test_client(&base, 5_000);
        let err = api.create_servicio(&NuevoServicio::default()).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::Validation);
        assert!(log.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn delete_in_use_service_explains_why() {
        let (base, log) = serve(|_| Some((409, r#"{"error":"FK"}"#.to_string()))).await;
        let api = test_client(&base, 5_000);
        let err = api.delete_servicio(&RecordId::Num(5)).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::Conflict);
        assert_eq!(
            err.message,
            "No se puede eliminar el servicio porque está asignado a clientes o cobros."
        );
        let reqs = log.lock().unwrap();
        assert_eq!((reqs[0].method.as_str(), reqs[0].path.as_str()), ("DELETE", "/api/v1/servicios/5"));
    }
}
