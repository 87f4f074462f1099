//! Payment reminders over the WhatsApp gateway.

use futures_util::stream::{self, StreamExt};
use serde::Serialize;
use std::future::Future;
use time::Date;

use crate::api::{ApiClient, ApiError};
use crate::models::{Cliente, Cobro, NotificacionWhatsapp, RecordId, WhatsappStatus};
use crate::notify::{Notice, NoticeLevel, Notifier};
use crate::plantillas::{interpolar, DatosPlantilla, TemplateKind};

/// Backend operations the dispatcher depends on.
pub trait ReminderGateway: Send + Sync {
    fn estado(&self) -> impl Future<Output = Result<WhatsappStatus, ApiError>> + Send;
    fn cobro(&self, id: &RecordId) -> impl Future<Output = Result<Cobro, ApiError>> + Send;
    fn cliente(&self, id: &RecordId) -> impl Future<Output = Result<Cliente, ApiError>> + Send;
    fn enviar(&self, notificacion: &NotificacionWhatsapp) -> impl Future<Output = Result<(), ApiError>> + Send;
}

impl ReminderGateway for ApiClient {
    async fn estado(&self) -> Result<WhatsappStatus, ApiError> {
        self.whatsapp_status().await
    }

    async fn cobro(&self, id: &RecordId) -> Result<Cobro, ApiError> {
        self.get_cobro(id).await
    }

    async fn cliente(&self, id: &RecordId) -> Result<Cliente, ApiError> {
        self.get_cliente(id).await
    }

    async fn enviar(&self, notificacion: &NotificacionWhatsapp) -> Result<(), ApiError> {
        self.whatsapp_notify(notificacion).await
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ResumenEnvio {
    /// Every item processed, including those skipped for lack of a phone.
    pub attempted: usize,
    pub succeeded: usize,
    pub failed: usize,
}

impl ResumenEnvio {
    pub fn nivel(&self) -> NoticeLevel {
        if self.attempted == 0 {
            NoticeLevel::Info
        } else if self.failed == 0 {
            NoticeLevel::Success
        } else if self.succeeded == 0 {
            NoticeLevel::Error
        } else {
            NoticeLevel::Warning
        }
    }

    pub fn notice(&self) -> Notice {
        let message = if self.attempted == 0 {
            "No se seleccionaron cobros.".to_string()
        } else {
            format!(
                "Recordatorios enviados: {} de {}. Fallidos: {}.",
                self.succeeded, self.attempted, self.failed
            )
        };
        Notice::new(self.nivel(), message)
    }
}

pub struct Dispatcher<G, N> {
    gateway: G,
    notifier: N,
    moneda: String,
    empresa: Option<String>,
    concurrency: usize,
}

impl<G: ReminderGateway, N: Notifier> Dispatcher<G, N> {
    pub fn new(gateway: G, notifier: N, moneda: &str) -> Self {
        Self {
            gateway,
            notifier,
            moneda: moneda.to_string(),
            empresa: None,
            concurrency: 1,
        }
    }

    pub fn with_empresa(mut self, empresa: Option<String>) -> Self {
        self.empresa = empresa;
        self
    }

    /// Number of reminders in flight; values below 1 are treated as 1.
    pub fn with_concurrency(mut self, n: usize) -> Self {
        self.concurrency = n.max(1);
        self
    }

    async fn conectado(&self) -> bool {
        match self.gateway.estado().await {
            Ok(s) if s.is_connected() => true,
            Ok(s) => {
                tracing::warn!(status = s.status.as_str(), "whatsapp gateway not connected");
                self.notifier
                    .error("WhatsApp no está conectado. Conéctelo desde Configuración antes de enviar recordatorios.");
                false
            }
            Err(e) => {
                tracing::warn!(error = %e, "could not check whatsapp gateway");
                self.notifier
                    .error(&format!("No se pudo verificar el estado de WhatsApp: {}", e.message));
                false
            }
        }
    }

    /// Builds the reminder for a single charge without sending it.
    pub async fn preparar(&self, id: &RecordId, kind: Option<TemplateKind>, hoy: Date) -> Result<NotificacionWhatsapp, ApiError> {
        let cobro = self.gateway.cobro(id).await?;

        let mut telefono = cobro.telefono_contacto().map(str::to_string);
        let mut nombre = None;
        if telefono.is_none() || cobro.nombre_cliente().is_none() {
            if let Some(cliente_id) = cobro.cliente_id.as_ref() {
                match self.gateway.cliente(cliente_id).await {
                    Ok(cliente) => {
                        if telefono.is_none() {
                            telefono = cliente.telefono_contacto().map(str::to_string);
                        }
                        nombre = Some(cliente.nombre_cliente);
                    }
                    // The name alone is optional; the template keeps its placeholder.
                    Err(e) if telefono.is_some() => {
                        tracing::warn!(cobro = %id, error = %e, "client lookup failed, sending without name");
                    }
                    Err(e) => return Err(e),
                }
            }
        }
        let Some(telefono) = telefono else {
            return Err(ApiError::validation("El cliente no tiene teléfono registrado."));
        };

        let kind = kind.unwrap_or_else(|| TemplateKind::para_cobro(&cobro, hoy));
        let datos = DatosPlantilla::from_cobro(&cobro, &self.moneda)
            .with_nombre_cliente(nombre.as_deref())
            .with_empresa(self.empresa.as_deref());

        Ok(NotificacionWhatsapp {
            telefono,
            mensaje: interpolar(kind, &datos, hoy),
            cobro_id: Some(id.clone()),
        })
    }

    async fn procesar(&self, id: &RecordId, kind: Option<TemplateKind>, hoy: Date) -> Result<(), ApiError> {
        let notificacion = self.preparar(id, kind, hoy).await?;
        self.gateway.enviar(&notificacion).await
    }

    /// Sends one reminder per charge. Nothing is attempted unless the gateway
    /// reports itself connected; per-item failures are counted, never propagated.
    /// `kind` forces one template for every item instead of picking per charge.
    pub async fn enviar_lote(&self, ids: &[RecordId], kind: Option<TemplateKind>, hoy: Date) -> ResumenEnvio {
        if ids.is_empty() {
            let resumen = ResumenEnvio::default();
            self.notifier.notify(resumen.notice());
            return resumen;
        }
        if !self.conectado().await {
            return ResumenEnvio::default();
        }

        let resultados: Vec<bool> = stream::iter(ids)
            .map(|id| async move {
                match self.procesar(id, kind, hoy).await {
                    Ok(()) => true,
                    Err(e) => {
                        tracing::warn!(cobro = %id, error = %e, "reminder failed");
                        false
                    }
                }
            })
            .buffer_unordered(self.concurrency)
            .collect()
            .await;

        let succeeded = resultados.iter().filter(|ok| **ok).count();
        let resumen = ResumenEnvio {
            attempted: resultados.len(),
            succeeded,
            failed: resultados.len() - succeeded,
        };
        tracing::info!(
            attempted = resumen.attempted,
            succeeded = resumen.succeeded,
            failed = resumen.failed,
            "reminder batch finished"
        );
        self.notifier.notify(resumen.notice());
        resumen
    }

    /// Sends a single reminder, optionally forcing the template.
    pub async fn enviar_uno(&self, id: &RecordId, kind: Option<TemplateKind>, hoy: Date) -> Result<(), ApiError> {
        if !self.conectado().await {
            return Err(ApiError::validation("WhatsApp no está conectado."));
        }
        let result = match self.preparar(id, kind, hoy).await {
            Ok(n) => self.gateway.enviar(&n).await,
            Err(e) => Err(e),
        };
        match &result {
            Ok(()) => self.notifier.success("Recordatorio enviado correctamente."),
            Err(e) => self
                .notifier
                .error(&format!("No se pudo enviar el recordatorio: {}", e.message)),
        }
        result
    }
}
