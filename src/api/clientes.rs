use super::{ApiClient, ApiError};
use crate::models::{Cliente, ClientePatch, ListEnvelope, NuevoCliente, RecordId, Servicio};

impl ApiClient {
    pub async fn list_clientes(&self) -> Result<Vec<Cliente>, ApiError> {
        let env: ListEnvelope<Cliente> = self.get("/clientes", &[]).await?;
        env.into_vec("clientes").map_err(ApiError::decode)
    }

    pub async fn get_cliente(&self, id: &RecordId) -> Result<Cliente, ApiError> {
        self.get(&format!("/clientes/{id}"), &[]).await
    }

    pub async fn servicios_de_cliente(&self, id: &RecordId) -> Result<Vec<Servicio>, ApiError> {
        let env: ListEnvelope<Servicio> = self.get(&format!("/clientes/{id}/servicios"), &[]).await?;
        env.into_vec("servicios").map_err(ApiError::decode)
    }

    pub async fn create_cliente(&self, input: &NuevoCliente) -> Result<Cliente, ApiError> {
        input.validate().map_err(ApiError::validation)?;
        self.post("/clientes", input)
            .await
            .map_err(|e| e.with_conflict_message("Ya existe un cliente registrado con ese RUC/DNI."))
    }

    pub async fn update_cliente(&self, id: &RecordId, patch: &ClientePatch) -> Result<Cliente, ApiError> {
        patch.validate().map_err(ApiError::validation)?;
        self.put(&format!("/clientes/{id}"), patch)
            .await
            .map_err(|e| e.with_conflict_message("Ya existe un cliente registrado con ese RUC/DNI."))
    }

    pub async fn delete_cliente(&self, id: &RecordId) -> Result<(), ApiError> {
        self.delete(&format!("/clientes/{id}")).await.map_err(|e| {
            e.with_conflict_message(
                "No se puede eliminar el cliente porque tiene cobros o servicios asociados.",
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
    async fn invalid_client_never_reaches_backend() {
        let (base, log) = serve(|_| Some((201, "{}".to_string()))).await;
        let api = test_client(&base, 5_000);
        let err = api.create_cliente(&NuevoCliente::default()).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::Validation);
        assert!(log.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn delete_blocked_by_references() {
        let (base, log) = serve(|_| Some((409, "{}".to_string()))).await;
        let api = test_client(&base, 5_000);
        let err = api.delete_cliente(&RecordId::Num(3)).await.unwrap_err();
        assert!(err.message.starts_with("No se puede eliminar el cliente"));
        let reqs = log.lock().unwrap();
        assert_eq!(reqs[0].method, "DELETE");
        assert_eq!(reqs[0].path, "/api/v1/clientes/3");
    }

    #[tokio::test]
    async fn client_services_are_listed() {
        let (base, log) = serve(|_| {
            Some((
                200,
                r#"{"servicios":[{"id":1,"nombre_servicio":"Internet"},{"id":2,"nombre_servicio":"Cable"}]}"#
                    .to_string(),
            ))
        })
        .await;
        let api = test_client(&base, 5_000);
        let servicios = api.servicios_de_cliente(&RecordId::Num(3)).await.unwrap();
        let nombres: Vec<&str> = servicios.iter().map(|s| s.nombre_servicio.as_str()).collect();
        assert_eq!(nombres, vec!["Internet", "Cable"]);
        assert_eq!(log.lock().unwrap()[0].path, "/api/v1/clientes/3/servicios");
    }
}
