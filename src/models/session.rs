use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use sqlx::{FromRow, Type};
use std::str::FromStr;
use uuid::Uuid;
use validator::Validate;

pub const ALLOWED_STROKES: &str = "back, breast, fly, free, im";

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq, PartialOrd, Ord, Hash, Type)]
#[sqlx(type_name = "stroke", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Stroke {
    Free,
    Fly,
    Back,
    Breast,
    Im,
}

impl Stroke {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stroke::Free => "free",
            Stroke::Fly => "fly",
            Stroke::Back => "back",
            Stroke::Breast => "breast",
            Stroke::Im => "im",
        }
    }
}

impl std::fmt::Display for Stroke {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Stroke {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "free" => Ok(Stroke::Free),
            "fly" => Ok(Stroke::Fly),
            "back" => Ok(Stroke::Back),
            "breast" => Ok(Stroke::Breast),
            "im" => Ok(Stroke::Im),
            other => Err(format!(
                "stroke must be one of: {} (got '{}')",
                ALLOWED_STROKES, other
            )),
        }
    }
}

// Accepts " Free ", "FLY" and so on.
impl<'de> Deserialize<'de> for Stroke {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, PartialEq)]
pub struct SwimSession {
    pub id: Uuid,
    pub swimmer_id: Uuid,
    pub date: NaiveDate,
    pub notes: Option<String>,
    pub template_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, PartialEq)]
pub struct SwimSet {
    pub id: Uuid,
    pub session_id: Uuid,
    pub position: i32,
    pub repeat_count: i32,
    pub distance_m: i32,
    pub stroke: Stroke,
    pub interval_sec: Option<i32>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl SwimSet {
    /// Prescribed volume of the set in meters
    pub fn prescribed_distance_m(&self) -> f64 {
        f64::from(self.distance_m) * f64::from(self.repeat_count)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, PartialEq)]
pub struct Rep {
    pub id: Uuid,
    pub set_id: Uuid,
    pub rep_index: i32,
    pub time_sec: f64,
    pub rpe: Option<i16>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewSession {
    pub swimmer_id: Uuid,
    pub date: NaiveDate,
    pub notes: Option<String>,
    pub template_id: Option<Uuid>,
}

/// A set to be written, with the reps logged so far
#[derive(Debug, Clone, PartialEq)]
pub struct SetDraft {
    pub repeat_count: i32,
    pub distance_m: i32,
    pub stroke: Stroke,
    pub interval_sec: Option<i32>,
    pub notes: Option<String>,
    pub reps: Vec<RepDraft>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RepDraft {
    pub time_sec: f64,
    pub rpe: Option<i16>,
    pub notes: Option<String>,
}

/// `None` leaves a column untouched; `Some(None)` clears a nullable column.
#[derive(Debug, Clone, Default)]
pub struct SessionChanges {
    pub date: Option<NaiveDate>,
    pub notes: Option<Option<String>>,
}

#[derive(Debug, Clone, Default)]
pub struct SetChanges {
    pub repeat_count: Option<i32>,
    pub distance_m: Option<i32>,
    pub stroke: Option<Stroke>,
    pub interval_sec: Option<Option<i32>>,
    pub notes: Option<Option<String>>,
}

#[derive(Debug, Clone, Default)]
pub struct RepChanges {
    pub time_sec: Option<f64>,
    pub rpe: Option<Option<i16>>,
    pub notes: Option<Option<String>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SetDetail {
    #[serde(flatten)]
    pub set: SwimSet,
    pub reps: Vec<Rep>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SessionDetail {
    #[serde(flatten)]
    pub session: SwimSession,
    pub sets: Vec<SetDetail>,
}

impl SessionDetail {
    /// Assemble a session graph from flat rows, keeping set and rep order
    pub fn assemble(session: SwimSession, mut sets: Vec<SwimSet>, mut reps: Vec<Rep>) -> Self {
        sets.sort_by_key(|set| set.position);
        reps.sort_by_key(|rep| rep.rep_index);

        let sets = sets
            .into_iter()
            .map(|set| {
                let set_reps = reps
                    .iter()
                    .filter(|rep| rep.set_id == set.id)
                    .cloned()
                    .collect();
                SetDetail { set, reps: set_reps }
            })
            .collect();

        Self { session, sets }
    }
}

// Request bodies

/// Keeps an explicit `null` apart from an absent key: absent is `None`, `null` is `Some(None)`
fn nullable<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateSessionRequest {
    pub date: NaiveDate,
    #[validate(length(max = 2000))]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct UpdateSessionRequest {
    pub date: Option<NaiveDate>,
    /// An empty string clears the notes
    #[validate(length(max = 2000))]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateRepRequest {
    #[validate(range(min = 10.0, max = 3600.0))]
    pub time_sec: f64,
    #[validate(range(min = 1, max = 10))]
    pub rpe: Option<i16>,
    #[validate(length(max = 2000))]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct UpdateRepRequest {
    #[validate(range(min = 10.0, max = 3600.0))]
    pub time_sec: Option<f64>,
    /// `null` clears the effort rating
    #[serde(default, deserialize_with = "nullable")]
    #[validate(range(min = 1, max = 10))]
    pub rpe: Option<Option<i16>>,
    #[validate(length(max = 2000))]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateSetRequest {
    #[validate(range(min = 1, max = 50))]
    pub repeat_count: i32,
    #[validate(range(min = 1, max = 1500))]
    pub distance_m: i32,
    pub stroke: Stroke,
    #[validate(range(min = 10, max = 3600))]
    pub interval_sec: Option<i32>,
    #[validate(length(max = 2000))]
    pub notes: Option<String>,
    #[serde(default)]
    pub reps: Vec<CreateRepRequest>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct UpdateSetRequest {
    #[validate(range(min = 1, max = 50))]
    pub repeat_count: Option<i32>,
    #[validate(range(min = 1, max = 1500))]
    pub distance_m: Option<i32>,
    pub stroke: Option<Stroke>,
    #[serde(default, deserialize_with = "nullable")]
    #[validate(range(min = 10, max = 3600))]
    pub interval_sec: Option<Option<i32>>,
    #[validate(length(max = 2000))]
    pub notes: Option<String>,
}
