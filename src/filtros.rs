//! Client-side filtering for charge lists and the bookkeeping that keeps a
//! view from being overwritten by a response to an older request.

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};
use std::time::Duration;

use time::Date;

use crate::api::{ApiClient, ApiError, CobroFiltro};
use crate::format::iso_date;
use crate::models::{Cobro, EstadoCobro, RecordId};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct FiltroLocal {
    pub estado: Option<EstadoCobro>,
    pub cliente_id: Option<RecordId>,
    pub texto: Option<String>,
    pub desde: Option<Date>,
    pub hasta: Option<Date>,
}

impl FiltroLocal {
    pub fn validate(&self) -> Result<(), String> {
        match (self.desde, self.hasta) {
            (Some(d), Some(h)) if h < d => {
                Err("La fecha final no puede ser anterior a la inicial.".to_string())
            }
            _ => Ok(()),
        }
    }

    fn texto_normalizado(&self) -> Option<String> {
        self.texto
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_lowercase)
    }

    /// Date range is checked against the due date; charges without one only
    /// pass when no range is set.
    pub fn coincide(&self, cobro: &Cobro) -> bool {
        if let Some(e) = &self.estado {
            if &cobro.estado_cobro != e {
                return false;
            }
        }
        if let Some(id) = &self.cliente_id {
            if cobro.cliente_id.as_ref() != Some(id) {
                return false;
            }
        }
        if self.desde.is_some() || self.hasta.is_some() {
            let Some(v) = cobro.vencimiento() else {
                return false;
            };
            if self.desde.is_some_and(|d| v < d) || self.hasta.is_some_and(|h| v > h) {
                return false;
            }
        }
        match self.texto_normalizado() {
            None => true,
            Some(needle) => {
                let id = cobro.id.to_string();
                let hit = [
                    cobro.nombre_cliente(),
                    cobro.concepto(),
                    cobro.numero_referencia.as_deref(),
                    Some(id.as_str()),
                ]
                .into_iter()
                .flatten()
                .any(|campo| campo.to_lowercase().contains(&needle));
                hit
            }
        }
    }

    pub fn aplicar<'a>(&self, cobros: &'a [Cobro]) -> Vec<&'a Cobro> {
        cobros.iter().filter(|c| self.coincide(c)).collect()
    }

    /// The part of the filter the backend can apply. Text search stays local.
    pub fn consulta(&self) -> CobroFiltro {
        CobroFiltro {
            estado: self.estado.clone(),
            cliente_id: self.cliente_id.clone(),
            fecha_inicio: self.desde.map(iso_date),
            fecha_fin: self.hasta.map(iso_date),
            ..CobroFiltro::default()
        }
    }
}

/// Monotonic request counter for one view.
#[derive(Debug, Default)]
pub struct Generation(AtomicU64);

impl Generation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next(&self) -> u64 {
        self.0.fetch_add(1, Ordering::SeqCst) + 1
    }

    pub fn current(&self) -> u64 {
        self.0.load(Ordering::SeqCst)
    }

    pub fn is_current(&self, ticket: u64) -> bool {
        self.current() == ticket
    }
}

/// Last accepted data for a view. Only the most recently started load may
/// replace it.
#[derive(Debug)]
pub struct ViewState<T> {
    generation: Generation,
    data: RwLock<Option<Arc<T>>>,
}

impl<T> Default for ViewState<T> {
    fn default() -> Self {
        Self {
            generation: Generation::new(),
            data: RwLock::new(None),
        }
    }
}

impl<T> ViewState<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn begin(&self) -> u64 {
        self.generation.next()
    }

    /// Stores `value` if `ticket` is still the latest; returns whether it was kept.
    pub fn commit(&self, ticket: u64, value: T) -> bool {
        if !self.generation.is_current(ticket) {
            tracing::debug!(ticket, current = self.generation.current(), "stale response discarded");
            return false;
        }
        match self.data.write() {
            Ok(mut guard) => {
                *guard = Some(Arc::new(value));
                true
            }
            Err(_) => false,
        }
    }

    pub fn get(&self) -> Option<Arc<T>> {
        self.data.read().ok().and_then(|g| g.clone())
    }

    /// Runs `fut` as a new load. Errors never touch the stored data; a stale
    /// success yields `Ok(None)`.
    pub async fn cargar<E, F>(&self, fut: F) -> Result<Option<Arc<T>>, E>
    where
        F: Future<Output = Result<T, E>>,
    {
        let ticket = self.begin();
        let value = fut.await?;
        if self.commit(ticket, value) {
            Ok(self.get())
        } else {
            Ok(None)
        }
    }
}

/// Collapses bursts of input (search typing) into one action.
#[derive(Debug)]
pub struct Debouncer {
    delay: Duration,
    generation: Generation,
}

impl Debouncer {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            generation: Generation::new(),
        }
    }

    /// Waits out the delay; true only for the last caller of the burst.
    pub async fn esperar(&self) -> bool {
        let ticket = self.generation.next();
        tokio::time::sleep(self.delay).await;
        self.generation.is_current(ticket)
    }
}

/// Where a charge list view gets its rows from.
pub trait CobroSource: Send + Sync {
    fn listar(&self, filtro: &CobroFiltro) -> impl Future<Output = Result<Vec<Cobro>, ApiError>> + Send;
}

impl CobroSource for ApiClient {
    async fn listar(&self, filtro: &CobroFiltro) -> Result<Vec<Cobro>, ApiError> {
        self.list_cobros(filtro).await
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Listado {
    /// Rows the backend returned before local narrowing.
    pub total: usize,
    pub visibles: Vec<Cobro>,
}

/// A filterable charge list. Each reload is a new generation, so a slow
/// response to an older filter never replaces the rows of a newer one.
pub struct CobrosView<S> {
    source: S,
    estado: ViewState<Listado>,
    debouncer: Debouncer,
}

impl<S: CobroSource> CobrosView<S> {
    pub fn new(source: S, debounce: Duration) -> Self {
        Self {
            source,
            estado: ViewState::new(),
            debouncer: Debouncer::new(debounce),
        }
    }

    /// `Ok(None)` means a newer reload started while this one was in flight.
    pub async fn recargar(&self, filtro: &FiltroLocal) -> Result<Option<Arc<Listado>>, ApiError> {
        filtro.validate().map_err(ApiError::validation)?;
        let consulta = filtro.consulta();
        self.estado
            .cargar(async {
                let cobros = self.source.listar(&consulta).await?;
                let visibles = filtro.aplicar(&cobros).into_iter().cloned().collect();
                Ok::<_, ApiError>(Listado {
                    total: cobros.len(),
                    visibles,
                })
            })
            .await
    }

    /// Search-as-you-type: only the last call of a burst reaches the backend.
    pub async fn buscar(&self, filtro: &FiltroLocal) -> Result<Option<Arc<Listado>>, ApiError> {
        if !self.debouncer.esperar().await {
            return Ok(None);
        }
        self.recargar(filtro).await
    }

    pub fn actual(&self) -> Option<Arc<Listado>> {
        self.estado.get()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::date;

    fn cobros() -> Vec<Cobro> {
        serde_json::from_value(serde_json::json!([
            {"id": 1, "cliente_id": 7, "estado_cobro": "Pendiente", "fecha_vencimiento": "2026-10-20",
             "nombre_cliente": "Ferretería Lima", "descripcion": "Internet 50MB"},
            {"id": 2, "cliente_id": 8, "estado_cobro": "Pagado", "fecha_vencimiento": "2026-10-05",
             "nombre_cliente": "Bodega Sol", "numero_referencia": "OP-9981"},
            {"id": 3, "cliente_id": 7, "estado_cobro": "Atrasado",
             "nombre_cliente": "Ferretería Lima"}
        ]))
        .unwrap()
    }

    fn ids(v: Vec<&Cobro>) -> Vec<String> {
        v.into_iter().map(|c| c.id.to_string()).collect()
    }

    #[test]
    fn empty_filter_keeps_everything() {
        let all = cobros();
        assert_eq!(FiltroLocal::default().aplicar(&all).len(), 3);
    }

    #[test]
    fn filters_compose() {
        let all = cobros();
        let f = FiltroLocal {
            cliente_id: Some(RecordId::Num(7)),
            texto: Some("  LIMA ".into()),
            ..FiltroLocal::default()
        };
        assert_eq!(ids(f.aplicar(&all)), vec!["1", "3"]);

        let f = FiltroLocal {
            texto: Some("op-99".into()),
            ..FiltroLocal::default()
        };
        assert_eq!(ids(f.aplicar(&all)), vec!["2"]);

        let f = FiltroLocal {
            estado: Some(EstadoCobro::Pendiente),
            texto: Some("bodega".into()),
            ..FiltroLocal::default()
        };
        assert!(f.aplicar(&all).is_empty());
    }

    #[test]
    fn date_range_excludes_undated_charges() {
        let all = cobros();
        let f = FiltroLocal {
            desde: Some(date!(2026 - 10 - 01)),
            hasta: Some(date!(2026 - 10 - 20)),
            ..FiltroLocal::default()
        };
        assert_eq!(ids(f.aplicar(&all)), vec!["1", "2"]);
        let f = FiltroLocal {
            desde: Some(date!(2026 - 10 - 06)),
            ..FiltroLocal::default()
        };
        assert_eq!(ids(f.aplicar(&all)), vec!["1"]);
        let bad = FiltroLocal {
            desde: Some(date!(2026 - 10 - 06)),
            hasta: Some(date!(2026 - 10 - 05)),
            ..FiltroLocal::default()
        };
        assert!(bad.validate().is_err());
    }

    #[test]
    fn stale_commit_is_rejected() {
        let view = ViewState::new();
        let first = view.begin();
        let second = view.begin();
        assert!(view.commit(second, "nuevo"));
        assert!(!view.commit(first, "viejo"));
        assert_eq!(*view.get().unwrap(), "nuevo");
    }

    #[tokio::test]
    async fn slow_older_load_does_not_overwrite_newer() {
        let view = ViewState::<&'static str>::new();
        let slow = view.cargar(async {
            tokio::time::sleep(Duration::from_millis(60)).await;
            Ok::<_, String>("lento")
        });
        let fast = async {
            tokio::time::sleep(Duration::from_millis(10)).await;
            view.cargar(async { Ok::<_, String>("rápido") }).await
        };
        let (slow, fast) = tokio::join!(slow, fast);
        assert_eq!(slow, Ok(None));
        assert_eq!(fast.unwrap().as_deref(), Some(&"rápido"));
        assert_eq!(*view.get().unwrap(), "rápido");
    }

    #[tokio::test]
    async fn failed_load_keeps_previous_data() {
        let view = ViewState::new();
        view.cargar(async { Ok::<_, String>(1) }).await.unwrap();
        assert!(view.cargar(async { Err::<i32, _>("caído".to_string()) }).await.is_err());
        assert_eq!(*view.get().unwrap(), 1);
    }

    #[test]
    fn search_matches_charge_id() {
        let all = cobros();
        let f = FiltroLocal {
            texto: Some("3".into()),
            ..FiltroLocal::default()
        };
        assert_eq!(ids(f.aplicar(&all)), vec!["3"]);
    }

    #[test]
    fn remote_query_leaves_text_out() {
        let f = FiltroLocal {
            estado: Some(EstadoCobro::Pendiente),
            texto: Some("lima".into()),
            desde: Some(date!(2026 - 10 - 01)),
            ..FiltroLocal::default()
        };
        assert_eq!(
            f.consulta().to_query(),
            vec![("estado", "Pendiente".to_string()), ("fechaInicio", "2026-10-01".to_string())]
        );
    }

    /// Answers pending-only queries slowly.
    struct FakeSource {
        cobros: Vec<Cobro>,
        llamadas: std::sync::atomic::AtomicUsize,
    }

    impl CobroSource for FakeSource {
        async fn listar(&self, filtro: &CobroFiltro) -> Result<Vec<Cobro>, ApiError> {
            self.llamadas.fetch_add(1, Ordering::SeqCst);
            if filtro.estado == Some(EstadoCobro::Pendiente) {
                tokio::time::sleep(Duration::from_millis(60)).await;
            }
            Ok(self
                .cobros
                .iter()
                .filter(|c| filtro.estado.as_ref().map_or(true, |e| &c.estado_cobro == e))
                .cloned()
                .collect())
        }
    }

    fn view() -> CobrosView<FakeSource> {
        let source = FakeSource {
            cobros: cobros(),
            llamadas: Default::default(),
        };
        CobrosView::new(source, Duration::from_millis(30))
    }

    #[tokio::test]
    async fn older_filter_response_is_discarded_by_view() {
        let view = view();
        let pendientes = FiltroLocal {
            estado: Some(EstadoCobro::Pendiente),
            ..FiltroLocal::default()
        };
        let lima = FiltroLocal {
            texto: Some("lima".into()),
            ..FiltroLocal::default()
        };
        let slow = view.recargar(&pendientes);
        let fast = async {
            tokio::time::sleep(Duration::from_millis(10)).await;
            view.recargar(&lima).await
        };
        let (slow, fast) = tokio::join!(slow, fast);
        assert_eq!(slow.unwrap(), None);
        assert_eq!(fast.unwrap().unwrap().visibles.len(), 2);

        let actual = view.actual().unwrap();
        assert_eq!(actual.total, 3);
        assert_eq!(ids(actual.visibles.iter().collect()), vec!["1", "3"]);
    }

    #[tokio::test]
    async fn invalid_range_is_rejected_before_loading() {
        let view = view();
        let bad = FiltroLocal {
            desde: Some(date!(2026 - 10 - 06)),
            hasta: Some(date!(2026 - 10 - 05)),
            ..FiltroLocal::default()
        };
        let err = view.recargar(&bad).await.unwrap_err();
        assert_eq!(err.kind, crate::api::ErrorKind::Validation);
        assert_eq!(view.source.llamadas.load(Ordering::SeqCst), 0);
        assert!(view.actual().is_none());
    }

    #[tokio::test]
    async fn typing_burst_loads_once() {
        let view = view();
        let first = FiltroLocal {
            texto: Some("fe".into()),
            ..FiltroLocal::default()
        };
        let second = FiltroLocal {
            texto: Some("bodega".into()),
            ..FiltroLocal::default()
        };
        let a = view.buscar(&first);
        let b = async {
            tokio::time::sleep(Duration::from_millis(10)).await;
            view.buscar(&second).await
        };
        let (a, b) = tokio::join!(a, b);
        assert_eq!(a.unwrap(), None);
        assert_eq!(ids(b.unwrap().unwrap().visibles.iter().collect()), vec!["2"]);
        assert_eq!(view.source.llamadas.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn debouncer_lets_only_last_call_through() {
        let d = Debouncer::new(Duration::from_millis(40));
        let first = d.esperar();
        let second = async {
            tokio::time::sleep(Duration::from_millis(10)).await;
            d.esperar().await
        };
        let (a, b) = tokio::join!(first, second);
        assert!(!a);
        assert!(b);
    }
}
