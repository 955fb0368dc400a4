// Query strings shared by the routers

use chrono::NaiveDate;
use serde::Deserialize;
use uuid::Uuid;

#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    /// Maximum number of sessions (1..=500)
    pub limit: Option<i64>,
    /// Pace split distance in meters (default 100)
    pub pace_per_m: Option<i32>,
}

#[derive(Debug, Default, Deserialize)]
pub struct PaceQuery {
    pub pace_per_m: Option<i32>,
}

#[derive(Debug, Deserialize)]
pub struct RangeQuery {
    /// Inclusive start date
    pub start: NaiveDate,
    /// Inclusive end date
    pub end: NaiveDate,
    pub pace_per_m: Option<i32>,
}

#[derive(Debug, Deserialize)]
pub struct ExportRangeQuery {
    pub start: NaiveDate,
    pub end: NaiveDate,
    /// Coaches only: restrict to one supervised swimmer
    pub swimmer_id: Option<Uuid>,
}
