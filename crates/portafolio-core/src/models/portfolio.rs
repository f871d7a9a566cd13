use serde::{Deserialize, Serialize};

use super::lenient::{opt_string, DocId, IdRef};
use super::{require, Role, ValidationError};
use crate::utils::contains_ignore_case;

/// Status value of portfolios that have not been soft-deleted.
const ACTIVE_STATUS: &str = "activo";

/// Owner reference embedded under `usuario`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PortfolioOwner {
    #[serde(flatten)]
    pub key: DocId,
    #[serde(default)]
    pub email: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Portfolio {
    #[serde(flatten)]
    pub key: DocId,
    #[serde(default)]
    pub nombre: String,
    #[serde(default)]
    pub descripcion: Option<String>,
    /// Academic period, e.g. "2025-I".
    #[serde(default, deserialize_with = "opt_string")]
    pub anio: Option<String>,
    #[serde(default, rename = "creadoPor")]
    pub creado_por: Option<IdRef>,
    #[serde(default)]
    pub usuario: Option<PortfolioOwner>,
    #[serde(default)]
    pub estado: Option<String>,
}

impl Portfolio {
    pub fn id(&self) -> &str {
        self.key.as_str()
    }

    /// Portfolios without a status predate soft deletion and count as active.
    pub fn is_active(&self) -> bool {
        self.estado.as_deref().map_or(true, |s| s == ACTIVE_STATUS)
    }

    pub fn is_owned_by(&self, user_id: &str) -> bool {
        let by_creator = self
            .creado_por
            .as_ref()
            .and_then(|c| c.id())
            .is_some_and(|id| id == user_id);
        let by_owner = self
            .usuario
            .as_ref()
            .and_then(|u| u.key.get())
            .is_some_and(|id| id == user_id);
        by_creator || by_owner
    }

    pub fn owner_email(&self) -> Option<&str> {
        self.usuario.as_ref().and_then(|u| u.email.as_deref())
    }

    /// Heading for the detail view: the description when present.
    pub fn heading(&self) -> &str {
        match self.descripcion.as_deref() {
            Some(d) if !d.trim().is_empty() => d,
            _ => &self.nombre,
        }
    }

    pub fn year(&self) -> &str {
        self.anio.as_deref().unwrap_or("")
    }
}

/// Active portfolios the given user may see: all of them for
/// administrators, only their own for everyone else.
pub fn visible_portfolios(
    portfolios: Vec<Portfolio>,
    role: Option<Role>,
    user_id: Option<&str>,
) -> Vec<Portfolio> {
    portfolios
        .into_iter()
        .filter(Portfolio::is_active)
        .filter(|p| match role {
            Some(Role::Administrator) => true,
            _ => user_id.is_some_and(|id| p.is_owned_by(id)),
        })
        .collect()
}

/// Name substring (case-insensitive) and exact year filters; blank means
/// no filtering on that field.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PortfolioFilter {
    pub name: String,
    pub year: String,
}

impl PortfolioFilter {
    pub fn matches(&self, portfolio: &Portfolio) -> bool {
        let year = self.year.trim();
        let name = self.name.trim();
        (year.is_empty() || portfolio.year() == year)
            && (name.is_empty() || contains_ignore_case(&portfolio.nombre, name))
    }

    pub fn is_active(&self) -> bool {
        !self.name.trim().is_empty() || !self.year.trim().is_empty()
    }

    pub fn apply<'a>(&self, portfolios: &'a [Portfolio]) -> Vec<&'a Portfolio> {
        portfolios.iter().filter(|p| self.matches(p)).collect()
    }
}

/// Body for creating or editing a portfolio.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PortfolioPayload {
    pub nombre: String,
    pub descripcion: String,
    pub anio: String,
    #[serde(rename = "creadoPor", skip_serializing_if = "Option::is_none")]
    pub creado_por: Option<String>,
}

impl PortfolioPayload {
    pub fn new(nombre: &str, descripcion: &str, anio: &str) -> Self {
        Self {
            nombre: nombre.trim().to_string(),
            descripcion: descripcion.trim().to_string(),
            anio: anio.trim().to_string(),
            creado_por: None,
        }
    }

    pub fn created_by(mut self, user_id: &str) -> Self {
        self.creado_por = Some(user_id.to_string());
        self
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        require(&self.nombre, "Name")?;
        require(&self.descripcion, "Description")?;
        require(&self.anio, "Year")
    }
}
