// src/models/syllabus.rs
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Proyección publicada de un curso, usada sólo para búsqueda.
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Syllabus {
    pub id: i64,
    pub course_id: Option<i64>,
    pub codigo: String,
    pub nombre: String,
    pub plan_estudios: String,
    pub ciclo: Option<String>,
    pub creditos: Option<i64>,
    pub pdf_url: Option<String>,
}

/// Filtros de `GET /syllabus`, combinados con AND. Los ausentes o en blanco no filtran.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SyllabusFilter {
    pub codigo: Option<String>,
    pub nombre: Option<String>,
    pub plan: Option<String>,
    pub ciclo: Option<String>,
}

impl SyllabusFilter {
    fn clean(value: &Option<String>) -> Option<&str> {
        value.as_deref().map(str::trim).filter(|s| !s.is_empty())
    }

    pub fn codigo(&self) -> Option<&str> {
        Self::clean(&self.codigo)
    }

    pub fn nombre(&self) -> Option<&str> {
        Self::clean(&self.nombre)
    }

    pub fn plan(&self) -> Option<&str> {
        Self::clean(&self.plan)
    }

    pub fn ciclo(&self) -> Option<&str> {
        Self::clean(&self.ciclo)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublishSyllabusPayload {
    pub plan: String,
    #[serde(default)]
    pub pdf_url: Option<String>,
}
