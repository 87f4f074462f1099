use serde::{Deserialize, Serialize};

use super::{require, RecordId};

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Rol {
    Administrador,
    Usuario,
    Otro(String),
}

impl Rol {
    pub fn as_str(&self) -> &str {
        match self {
            Rol::Administrador => "Administrador",
            Rol::Usuario => "Usuario",
            Rol::Otro(s) => s.as_str(),
        }
    }

    pub fn is_admin(&self) -> bool {
        matches!(self, Rol::Administrador)
    }
}

impl From<String> for Rol {
    fn from(v: String) -> Self {
        match v.trim().to_ascii_lowercase().as_str() {
            "administrador" | "admin" => Rol::Administrador,
            "usuario" | "user" => Rol::Usuario,
            _ => Rol::Otro(v),
        }
    }
}

impl From<Rol> for String {
    fn from(v: Rol) -> Self {
        v.as_str().to_string()
    }
}

fn default_rol() -> Rol {
    Rol::Usuario
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Usuario {
    pub id: RecordId,
    pub nombre_usuario: String,
    #[serde(default)]
    pub correo_electronico: Option<String>,
    #[serde(default)]
    pub nombre_completo: Option<String>,
    #[serde(default = "default_rol")]
    pub rol: Rol,
    #[serde(default = "default_true")]
    pub activo: bool,
}

const MIN_PASSWORD_LEN: usize = 6;

fn validate_password(p: &str) -> Result<(), String> {
    if p.chars().count() < MIN_PASSWORD_LEN {
        return Err(format!(
            "La contraseña debe tener al menos {MIN_PASSWORD_LEN} caracteres."
        ));
    }
    Ok(())
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NuevoUsuario {
    pub nombre_usuario: String,
    pub correo_electronico: String,
    pub nombre_completo: String,
    pub rol: Rol,
    pub contrasena: String,
}

impl NuevoUsuario {
    pub fn validate(&self) -> Result<(), String> {
        require("usuario", &self.nombre_usuario)?;
        require("correo electrónico", &self.correo_electronico)?;
        require("nombre completo", &self.nombre_completo)?;
        validate_password(&self.contrasena)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UsuarioPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub correo_electronico: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nombre_completo: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rol: Option<Rol>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CambioContrasena {
    pub contrasena_nueva: String,
    pub confirmacion: String,
}

impl CambioContrasena {
    pub fn validate(&self) -> Result<(), String> {
        validate_password(&self.contrasena_nueva)?;
        if self.contrasena_nueva != self.confirmacion {
            return Err("Las contraseñas no coinciden.".to_string());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_parsing_is_case_insensitive() {
        assert_eq!(Rol::from("ADMINISTRADOR".to_string()), Rol::Administrador);
        assert_eq!(Rol::from("usuario".to_string()), Rol::Usuario);
        assert!(!Rol::from("Auditor".to_string()).is_admin());
    }

    #[test]
    fn password_change_must_match() {
        let cambio = CambioContrasena {
            contrasena_nueva: "secreta1".into(),
            confirmacion: "secreta2".into(),
        };
        assert_eq!(cambio.validate().unwrap_err(), "Las contraseñas no coinciden.");
        let corta = CambioContrasena {
            contrasena_nueva: "abc".into(),
            confirmacion: "abc".into(),
        };
        assert!(corta.validate().is_err());
    }
}
