//! Client core of the PEGASUS billing and collections back office.

pub mod api;
pub mod config;
pub mod dashboard;
pub mod filtros;
pub mod format;
pub mod models;
pub mod notify;
pub mod plantillas;
pub mod recordatorios;
pub mod render;
pub mod reportes;
pub mod session;

pub use api::{ApiClient, ApiError, ErrorKind};
pub use config::{default_config, Config};
pub use notify::{MemoryNotifier, Notice, NoticeLevel, Notifier};
pub use session::{Session, SessionStore};
