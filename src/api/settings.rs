use serde_json::Value;

use super::{ApiClient, ApiError};
use crate::models::{NotificacionWhatsapp, Settings, WhatsappStatus};

impl ApiClient {
    pub async fn get_settings(&self) -> Result<Settings, ApiError> {
        self.get("/settings", &[]).await
    }

    pub async fn update_settings(&self, settings: &Settings) -> Result<Settings, ApiError> {
        if settings.nombre_empresa.trim().is_empty() {
            return Err(ApiError::validation("El nombre de la empresa es obligatorio."));
        }
        self.put("/settings", settings).await
    }

    pub async fn whatsapp_status(&self) -> Result<WhatsappStatus, ApiError> {
        self.get("/settings/whatsapp/status", &[]).await
    }

    /// Starts the pairing flow; the returned status may carry a QR code.
    pub async fn whatsapp_connect(&self) -> Result<WhatsappStatus, ApiError> {
        self.post("/settings/whatsapp/connect", &Value::Object(Default::default()))
            .await
    }

    pub async fn whatsapp_disconnect(&self) -> Result<WhatsappStatus, ApiError> {
        self.post("/settings/whatsapp/disconnect", &Value::Object(Default::default()))
            .await
    }

    pub async fn whatsapp_notify(&self, notificacion: &NotificacionWhatsapp) -> Result<(), ApiError> {
        if notificacion.telefono.trim().is_empty() {
            return Err(ApiError::validation("El cliente no tiene teléfono registrado."));
        }
        if notificacion.mensaje.trim().is_empty() {
            return Err(ApiError::validation("El mensaje no puede estar vacío."));
        }
        self.post::<_, Value>("/settings/whatsapp/notify", notificacion)
            .await
            .map(|_| ())
    }
}
