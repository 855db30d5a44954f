// src/models/course.rs
use crate::{
    error::{AppError, AppResult},
    models::user::UserSummary,
};
use serde::{Deserialize, Deserializer, Serialize};
use sqlx::FromRow;

/// Columnas de `courses` en el orden que espera `Course`.
pub const COURSE_COLUMNS: &str = "id, name, code, type, area, weeks, semester, cycle, credits, \
     modality, theory_hours, practice_hours, lab_hours, group_label, sumilla, coordinador_id";

// --- Estructuras que reflejan las tablas ---

#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Course {
    pub id: i64,
    pub name: Option<String>,
    pub code: Option<String>,
    #[sqlx(rename = "type")]
    #[serde(rename = "type")]
    pub course_type: Option<String>,
    pub area: Option<String>,
    pub weeks: Option<i64>,
    pub semester: Option<String>,
    pub cycle: Option<String>,
    pub credits: Option<i64>,
    pub modality: Option<String>,
    pub theory_hours: Option<i64>,
    pub practice_hours: Option<i64>,
    pub lab_hours: Option<i64>,
    #[sqlx(rename = "group_label")]
    pub group: Option<String>,
    pub sumilla: Option<String>,
    pub coordinador_id: Option<i64>,
}

/// Arista `course_id -> prerequisite_id` con el curso requerido adjunto.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PrerequisiteEdge {
    pub course_id: i64,
    pub prerequisite_id: i64,
    pub prerequisite: Course,
}

/// Respuesta de `GET /courses/{id}`: el curso más sus relaciones.
#[derive(Debug, Clone, Serialize)]
pub struct CourseDetail {
    #[serde(flatten)]
    pub course: Course,
    pub coordinador: Option<UserSummary>,
    pub docentes: Vec<UserSummary>,
    pub prerequisites: Vec<PrerequisiteEdge>,
}

// --- Payloads ---

/// Identificador que puede llegar como número o como texto (`5` o `"5"`).
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum IdValue {
    Int(i64),
    Text(String),
}

impl IdValue {
    pub fn to_id(&self) -> AppResult<i64> {
        let parsed = match self {
            IdValue::Int(n) => Some(*n),
            IdValue::Text(s) => s.trim().parse::<i64>().ok(),
        };
        match parsed {
            Some(n) if n > 0 => Ok(n),
            _ => Err(AppError::InvalidArgument(format!(
                "Identificador inválido: {}",
                self
            ))),
        }
    }

    /// `null`, `""` y `0` significan "sin valor", como en los formularios del cliente.
    fn is_blank(&self) -> bool {
        match self {
            IdValue::Int(n) => *n == 0,
            IdValue::Text(s) => s.trim().is_empty(),
        }
    }
}

impl std::fmt::Display for IdValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IdValue::Int(n) => write!(f, "{n}"),
            IdValue::Text(s) => write!(f, "{s:?}"),
        }
    }
}

/// Acepta texto o número para campos textuales como `cycle` o `semester`.
fn text_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Text(String),
        Int(i64),
    }

    Ok(Option::<Raw>::deserialize(deserializer)?.map(|raw| match raw {
        Raw::Text(s) => s,
        Raw::Int(n) => n.to_string(),
    }))
}

/// Cuerpo de `POST /courses` y `PUT /courses/{id}`.
///
/// Es un reemplazo completo: cualquier campo omitido se guarda como `NULL`,
/// y `docentes` / `prerrequisitos` sustituyen por completo a las relaciones anteriores.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CoursePayload {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default, rename = "type")]
    pub course_type: Option<String>,
    #[serde(default)]
    pub area: Option<String>,
    #[serde(default)]
    pub weeks: Option<i64>,
    #[serde(default, deserialize_with = "text_or_number")]
    pub semester: Option<String>,
    #[serde(default, deserialize_with = "text_or_number")]
    pub cycle: Option<String>,
    #[serde(default)]
    pub credits: Option<i64>,
    #[serde(default)]
    pub modality: Option<String>,
    #[serde(default)]
    pub theory_hours: Option<i64>,
    #[serde(default)]
    pub practice_hours: Option<i64>,
    #[serde(default)]
    pub lab_hours: Option<i64>,
    #[serde(default)]
    pub group: Option<String>,
    #[serde(default)]
    pub sumilla: Option<String>,
    #[serde(default)]
    pub coordinador_id: Option<IdValue>,
    #[serde(default, alias = "teacherIds")]
    pub docentes: Vec<IdValue>,
    #[serde(default, alias = "prerequisiteIds")]
    pub prerrequisitos: Vec<IdValue>,
}

/// Payload ya validado: todos los identificadores convertidos a enteros positivos.
#[derive(Debug, Clone)]
pub struct NormalizedCourse {
    pub coordinador_id: Option<i64>,
    pub teacher_ids: Vec<i64>,
    pub prerequisite_ids: Vec<i64>,
}

impl CoursePayload {
    /// Convierte los identificadores antes de tocar la base de datos.
    /// Las listas se deduplican conservando el orden de llegada.
    pub fn normalize(&self) -> AppResult<NormalizedCourse> {
        let coordinador_id = match &self.coordinador_id {
            Some(value) if !value.is_blank() => Some(value.to_id()?),
            _ => None,
        };

        Ok(NormalizedCourse {
            coordinador_id,
            teacher_ids: dedup_ids(&self.docentes)?,
            prerequisite_ids: dedup_ids(&self.prerrequisitos)?,
        })
    }
}

fn dedup_ids(values: &[IdValue]) -> AppResult<Vec<i64>> {
    let mut ids: Vec<i64> = Vec::with_capacity(values.len());
    for value in values {
        let id = value.to_id()?;
        if !ids.contains(&id) {
            ids.push(id);
        }
    }
    Ok(ids)
}

/// Interpreta el segmento `{id}` de la ruta; sólo enteros positivos.
pub fn parse_course_id(raw: &str) -> AppResult<i64> {
    match raw.trim().parse::<i64>() {
        Ok(id) if id > 0 => Ok(id),
        _ => Err(AppError::InvalidArgument("ID inválido".to_string())),
    }
}
