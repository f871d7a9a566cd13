use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::lenient::DocId;
use super::{require, ValidationError};
use crate::utils::is_plausible_email;

/// Minimum length for a new or changed password.
pub const MIN_PASSWORD_LENGTH: usize = 6;

/// Coarse permission class of an authenticated user.
///
/// The backend's upper-case spelling is the only accepted form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    #[serde(rename = "ADMINISTRADOR")]
    Administrator,
    #[serde(rename = "DOCENTE")]
    Teacher,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Administrator => "ADMINISTRADOR",
            Role::Teacher => "DOCENTE",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Role::Administrator => "Administrator",
            Role::Teacher => "Teacher",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownRole(pub String);

impl fmt::Display for UnknownRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown role: {}", self.0)
    }
}

impl std::error::Error for UnknownRole {}

impl FromStr for Role {
    type Err = UnknownRole;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ADMINISTRADOR" => Ok(Role::Administrator),
            "DOCENTE" => Ok(Role::Teacher),
            other => Err(UnknownRole(other.to_string())),
        }
    }
}

/// Role as the backend embeds it: a bare name or a `{id, nombre}` object.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum RoleRef {
    Name(String),
    Object {
        #[serde(flatten)]
        key: DocId,
        #[serde(default, alias = "name")]
        nombre: Option<String>,
    },
}

impl RoleRef {
    pub fn name(&self) -> Option<&str> {
        match self {
            RoleRef::Name(name) => Some(name.as_str()),
            RoleRef::Object { nombre, .. } => nombre.as_deref(),
        }
    }

    pub fn id(&self) -> Option<&str> {
        match self {
            RoleRef::Name(_) => None,
            RoleRef::Object { key, .. } => key.get(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct User {
    #[serde(flatten)]
    pub key: DocId,
    #[serde(default)]
    pub nombre: String,
    #[serde(default)]
    pub apellido: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub rol: Option<RoleRef>,
    /// Older documents spell the field in English.
    #[serde(default, rename = "role")]
    pub legacy_role: Option<RoleRef>,
}

impl User {
    pub fn id(&self) -> &str {
        self.key.as_str()
    }

    pub fn full_name(&self) -> String {
        format!("{} {}", self.nombre, self.apellido).trim().to_string()
    }

    pub fn role_ref(&self) -> Option<&RoleRef> {
        self.rol.as_ref().or(self.legacy_role.as_ref())
    }

    pub fn role(&self) -> Option<Role> {
        self.role_ref().and_then(|r| r.name()).and_then(|n| n.parse().ok())
    }

    pub fn role_id(&self) -> Option<&str> {
        self.role_ref().and_then(|r| r.id())
    }

    /// Administrator accounts cannot be removed from the management view.
    pub fn is_deletable(&self) -> bool {
        self.role() != Some(Role::Administrator)
    }
}

/// Body for creating a teacher account or updating one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserPayload {
    pub nombre: String,
    pub apellido: String,
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    pub rol: String,
}

impl UserPayload {
    pub fn new_teacher(
        nombre: &str,
        apellido: &str,
        email: &str,
        password: &str,
        teacher_role_id: &str,
    ) -> Self {
        Self {
            nombre: nombre.trim().to_string(),
            apellido: apellido.trim().to_string(),
            email: email.trim().to_string(),
            password: non_blank(password),
            rol: teacher_role_id.to_string(),
        }
    }

    /// Edit an existing account. Email and role stay as they are; a blank
    /// password leaves the current one untouched.
    pub fn for_update(
        user: &User,
        nombre: &str,
        apellido: &str,
        password: &str,
        fallback_role_id: &str,
    ) -> Self {
        Self {
            nombre: nombre.trim().to_string(),
            apellido: apellido.trim().to_string(),
            email: user.email.clone(),
            password: non_blank(password),
            rol: user.role_id().unwrap_or(fallback_role_id).to_string(),
        }
    }

    pub fn validate(&self, creating: bool) -> Result<(), ValidationError> {
        require(&self.nombre, "First name")?;
        require(&self.apellido, "Last name")?;
        require(&self.email, "Email")?;
        if !is_plausible_email(&self.email) {
            return Err(ValidationError::InvalidEmail);
        }
        match self.password {
            None if creating => Err(ValidationError::Missing("Password")),
            Some(ref p) if p.chars().count() < MIN_PASSWORD_LENGTH => {
                Err(ValidationError::PasswordTooShort(MIN_PASSWORD_LENGTH))
            }
            _ => Ok(()),
        }
    }
}

/// Body for a user editing their own profile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProfilePayload {
    pub nombre: String,
    pub apellido: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
}

impl ProfilePayload {
    pub fn new(nombre: &str, apellido: &str, password: &str) -> Self {
        Self {
            nombre: nombre.trim().to_string(),
            apellido: apellido.trim().to_string(),
            password: non_blank(password),
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        require(&self.nombre, "First name")?;
        require(&self.apellido, "Last name")?;
        match self.password {
            Some(ref p) if p.chars().count() < MIN_PASSWORD_LENGTH => {
                Err(ValidationError::PasswordTooShort(MIN_PASSWORD_LENGTH))
            }
            _ => Ok(()),
        }
    }
}

fn non_blank(value: &str) -> Option<String> {
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}
