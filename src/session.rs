use serde::{Deserialize, Serialize};
use std::sync::{Arc, RwLock};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::models::Rol;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UsuarioSesion {
    #[serde(alias = "nombre_usuario")]
    pub username: String,
    pub rol: Rol,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoginResponse {
    pub token: String,
    pub usuario: UsuarioSesion,
}

/// Authenticated session. Created at login, dropped at logout; the token never
/// changes for the lifetime of a session.
#[derive(Debug)]
pub struct Session {
    id: Uuid,
    token: String,
    usuario: UsuarioSesion,
    started_at: OffsetDateTime,
}

impl Session {
    pub fn new(token: String, usuario: UsuarioSesion) -> Self {
        Self {
            id: Uuid::new_v4(),
            token,
            usuario,
            started_at: OffsetDateTime::now_utc(),
        }
    }

    pub fn from_login(resp: LoginResponse) -> Result<Self, String> {
        if resp.token.trim().is_empty() {
            return Err("login response did not include a token".to_string());
        }
        Ok(Self::new(resp.token, resp.usuario))
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    pub fn username(&self) -> &str {
        &self.usuario.username
    }

    pub fn rol(&self) -> &Rol {
        &self.usuario.rol
    }

    pub fn started_at(&self) -> OffsetDateTime {
        self.started_at
    }

    pub fn puede_ver(&self, seccion: Seccion) -> bool {
        !seccion.solo_admin() || self.usuario.rol.is_admin()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Seccion {
    Dashboard,
    Clientes,
    Cobros,
    Servicios,
    Reportes,
    Whatsapp,
    Usuarios,
    Configuracion,
}

impl Seccion {
    pub const ALL: [Seccion; 8] = [
        Seccion::Dashboard,
        Seccion::Clientes,
        Seccion::Cobros,
        Seccion::Servicios,
        Seccion::Reportes,
        Seccion::Whatsapp,
        Seccion::Usuarios,
        Seccion::Configuracion,
    ];

    pub fn solo_admin(&self) -> bool {
        matches!(self, Seccion::Usuarios | Seccion::Configuracion)
    }

    pub fn label(&self) -> &'static str {
        match self {
            Seccion::Dashboard => "Dashboard",
            Seccion::Clientes => "Clientes",
            Seccion::Cobros => "Cobros",
            Seccion::Servicios => "Servicios",
            Seccion::Reportes => "Reportes",
            Seccion::Whatsapp => "WhatsApp",
            Seccion::Usuarios => "Usuarios",
            Seccion::Configuracion => "Configuración",
        }
    }
}

/// Holder for the current session. Single writer (login/logout), many readers.
#[derive(Debug, Clone, Default)]
pub struct SessionStore {
    inner: Arc<RwLock<Option<Arc<Session>>>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_session(session: Session) -> Self {
        let store = Self::new();
        store.begin(session);
        store
    }

    pub fn begin(&self, session: Session) -> Arc<Session> {
        let session = Arc::new(session);
        if let Ok(mut guard) = self.inner.write() {
            *guard = Some(session.clone());
        }
        session
    }

    pub fn current(&self) -> Option<Arc<Session>> {
        self.inner.read().ok().and_then(|g| g.clone())
    }

    /// Ends the session only if it is still the one identified by `id`, so a
    /// delayed logout cannot tear down a newer login.
    pub fn end_if(&self, id: Uuid) -> bool {
        match self.inner.write() {
            Ok(mut guard) => {
                if guard.as_ref().map(|s| s.id()) == Some(id) {
                    *guard = None;
                    true
                } else {
                    false
                }
            }
            Err(_) => false,
        }
    }

    pub fn end(&self) {
        if let Ok(mut guard) = self.inner.write() {
            *guard = None;
        }
    }

    pub fn is_active(&self) -> bool {
        self.current().is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn usuario(rol: Rol) -> UsuarioSesion {
        UsuarioSesion {
            username: "caja1".to_string(),
            rol,
        }
    }

    #[test]
    fn login_response_builds_session() {
        let resp: LoginResponse = serde_json::from_str(
            r#"{"token":"abc","usuario":{"username":"admin","rol":"Administrador"}}"#,
        )
        .unwrap();
        let s = Session::from_login(resp).unwrap();
        assert_eq!(s.token(), "abc");
        assert!(s.rol().is_admin());
    }

    #[test]
    fn empty_token_is_rejected() {
        let resp = LoginResponse {
            token: " ".to_string(),
            usuario: usuario(Rol::Usuario),
        };
        assert!(Session::from_login(resp).is_err());
    }

    #[test]
    fn admin_only_sections_are_hidden_from_regular_users() {
        let s = Session::new("t".into(), usuario(Rol::Usuario));
        assert!(s.puede_ver(Seccion::Cobros));
        assert!(!s.puede_ver(Seccion::Usuarios));
        assert!(!s.puede_ver(Seccion::Configuracion));

        let admin = Session::new("t".into(), usuario(Rol::Administrador));
        assert!(Seccion::ALL.iter().all(|s| admin.puede_ver(*s)));
    }

    #[test]
    fn stale_logout_does_not_end_newer_session() {
        let store = SessionStore::new();
        let first = store.begin(Session::new("a".into(), usuario(Rol::Usuario)));
        let second = store.begin(Session::new("b".into(), usuario(Rol::Usuario)));
        assert!(!store.end_if(first.id()));
        assert_eq!(store.current().unwrap().token(), "b");
        assert!(store.end_if(second.id()));
        assert!(!store.is_active());
    }
}
