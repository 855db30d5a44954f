// src/models/role.rs
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

/// Rol académico de un usuario. Cada usuario tiene exactamente uno.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Role {
    Director,
    Coordinador,
    Docente,
    Estudiante,
}

impl Role {
    pub const ALL: [Role; 4] = [
        Role::Director,
        Role::Coordinador,
        Role::Docente,
        Role::Estudiante,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Director => "DIRECTOR",
            Role::Coordinador => "COORDINADOR",
            Role::Docente => "DOCENTE",
            Role::Estudiante => "ESTUDIANTE",
        }
    }

    /// Interpreta una lista separada por comas (`?roles=DOCENTE,COORDINADOR`).
    /// Los elementos vacíos se ignoran.
    pub fn parse_list(raw: &str) -> Result<Vec<Role>, UnknownRole> {
        raw.split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(Role::from_str)
            .collect()
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
        write!(f, "Rol desconocido: {}", self.0)
    }
}

impl std::error::Error for UnknownRole {}

impl FromStr for Role {
    type Err = UnknownRole;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Role::ALL
            .into_iter()
            .find(|role| role.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| UnknownRole(s.to_string()))
    }
}

// Para `#[sqlx(try_from = "String")]` en las filas de `users`
impl TryFrom<String> for Role {
    type Error = UnknownRole;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}
