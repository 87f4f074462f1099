use serde::Serialize;

use super::{ApiClient, ApiError};
use crate::models::{CambioContrasena, ListEnvelope, NuevoUsuario, RecordId, Usuario, UsuarioPatch};

#[derive(Debug, Serialize)]
struct CambioEstado {
    activo: bool,
}

#[derive(Debug, Serialize)]
struct NuevaContrasena<'a> {
    contrasena: &'a str,
}

impl ApiClient {
    fn require_admin(&self) -> Result<(), ApiError> {
        let session = self.sessions().current().ok_or_else(ApiError::missing_session)?;
        if !session.rol().is_admin() {
            return Err(ApiError::validation(
                "Solo un administrador puede gestionar usuarios.",
            ));
        }
        Ok(())
    }

    pub async fn list_usuarios(&self) -> Result<Vec<Usuario>, ApiError> {
        self.require_admin()?;
        let env: ListEnvelope<Usuario> = self.get("/usuarios", &[]).await?;
        env.into_vec("usuarios").map_err(ApiError::decode)
    }

    pub async fn get_usuario(&self, id: &RecordId) -> Result<Usuario, ApiError> {
        self.require_admin()?;
        self.get(&format!("/usuarios/{id}"), &[]).await
    }

    pub async fn create_usuario(&self, input: &NuevoUsuario) -> Result<Usuario, ApiError> {
        self.require_admin()?;
        input.validate().map_err(ApiError::validation)?;
        self.post("/usuarios", input)
            .await
            .map_err(|e| e.with_conflict_message("El nombre de usuario o correo ya está en uso."))
    }

    pub async fn update_usuario(&self, id: &RecordId, patch: &UsuarioPatch) -> Result<Usuario, ApiError> {
        self.require_admin()?;
        self.put(&format!("/usuarios/{id}"), patch)
            .await
            .map_err(|e| e.with_conflict_message("El correo ya está en uso por otro usuario."))
    }

    pub async fn cambiar_contrasena(&self, id: &RecordId, cambio: &CambioContrasena) -> Result<(), ApiError> {
        self.require_admin()?;
        cambio.validate().map_err(ApiError::validation)?;
        self.patch::<_, serde_json::Value>(
            &format!("/usuarios/{id}/contrasena"),
            &NuevaContrasena {
                contrasena: &cambio.contrasena_nueva,
            },
        )
        .await
        .map(|_| ())
    }

    pub async fn cambiar_estado_usuario(&self, id: &RecordId, activo: bool) -> Result<Usuario, ApiError> {
        self.require_admin()?;
        self.patch(&format!("/usuarios/{id}/estado"), &CambioEstado { activo }).await
    }

    pub async fn delete_usuario(&self, id: &RecordId) -> Result<(), ApiError> {
        self.require_admin()?;
        self.delete(&format!("/usuarios/{id}")).await.map_err(|e| {
            e.with_conflict_message("No se puede eliminar el usuario porque tiene registros asociados.")
        })
    }
}
