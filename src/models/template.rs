use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use super::session::{SetDraft, Stroke};

/// One prescribed set inside a template
#[derive(Debug, Clone, Serialize, Deserialize, Validate, PartialEq)]
pub struct TemplateSet {
    #[validate(range(min = 1, max = 50))]
    pub repeat_count: i32,
    #[validate(range(min = 1, max = 1500))]
    pub distance_m: i32,
    pub stroke: Stroke,
    #[validate(range(min = 10, max = 3600))]
    pub interval_sec: Option<i32>,
    #[validate(length(max = 2000))]
    pub notes: Option<String>,
}

impl TemplateSet {
    /// Instantiated sets start without reps
    pub fn to_draft(&self) -> SetDraft {
        SetDraft {
            repeat_count: self.repeat_count,
            distance_m: self.distance_m,
            stroke: self.stroke,
            interval_sec: self.interval_sec,
            notes: self.notes.clone(),
            reps: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Template {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub sets: Vec<TemplateSet>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Row shape of the `templates` table, sets stored as JSONB
#[derive(Debug, sqlx::FromRow)]
pub struct TemplateRow {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub sets: sqlx::types::Json<Vec<TemplateSet>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<TemplateRow> for Template {
    fn from(row: TemplateRow) -> Self {
        Self {
            id: row.id,
            owner_id: row.owner_id,
            name: row.name,
            description: row.description,
            sets: row.sets.0,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Debug, Clone)]
pub struct NewTemplate {
    pub owner_id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub sets: Vec<TemplateSet>,
}

#[derive(Debug, Clone, Default)]
pub struct TemplateChanges {
    pub name: Option<String>,
    pub description: Option<Option<String>>,
    pub sets: Option<Vec<TemplateSet>>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateTemplateRequest {
    #[validate(length(min = 1, max = 120))]
    pub name: String,
    #[validate(length(max = 2000))]
    pub description: Option<String>,
    #[validate(length(min = 1, max = 50))]
    pub sets: Vec<TemplateSet>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct UpdateTemplateRequest {
    #[validate(length(min = 1, max = 120))]
    pub name: Option<String>,
    #[validate(length(max = 2000))]
    pub description: Option<String>,
    #[validate(length(min = 1, max = 50))]
    pub sets: Option<Vec<TemplateSet>>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct InstantiateTemplateRequest {
    pub date: NaiveDate,
    #[validate(length(max = 2000))]
    pub notes: Option<String>,
}
