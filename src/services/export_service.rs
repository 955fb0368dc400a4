//! CSV export of logged reps.
//!
//! One row per rep. A set without reps still gets a row with empty rep
//! columns, and a session without sets a row with empty set and rep columns,
//! so every logged entity survives a round trip through [`read_csv`].

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

use crate::auth::AccountSession;
use crate::error::{AppError, AppResult};
use crate::models::{SessionDetail, Stroke};
use crate::services::session_service::{date_range, SessionService};
use crate::store::SwimStore;

pub const CSV_HEADERS: [&str; 16] = [
    "session_id",
    "date",
    "session_notes",
    "swimmer_id",
    "set_id",
    "set_position",
    "repeat_count",
    "distance_m",
    "stroke",
    "interval_sec",
    "set_notes",
    "rep_id",
    "rep_index",
    "time_sec",
    "rpe",
    "rep_notes",
];

#[derive(Error, Debug)]
pub enum ExportError {
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("CSV output is not UTF-8: {0}")]
    Encoding(#[from] std::string::FromUtf8Error),
    #[error("CSV row {row}: {message}")]
    Malformed { row: usize, message: String },
}

impl From<ExportError> for AppError {
    fn from(err: ExportError) -> Self {
        AppError::Internal(anyhow::Error::new(err))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
struct CsvRow {
    session_id: Uuid,
    date: NaiveDate,
    session_notes: Option<String>,
    swimmer_id: Uuid,
    set_id: Option<Uuid>,
    set_position: Option<i32>,
    repeat_count: Option<i32>,
    distance_m: Option<i32>,
    stroke: Option<Stroke>,
    interval_sec: Option<i32>,
    set_notes: Option<String>,
    rep_id: Option<Uuid>,
    rep_index: Option<i32>,
    time_sec: Option<f64>,
    rpe: Option<i16>,
    rep_notes: Option<String>,
}

/// What a CSV export carries of a session, without timestamps
#[derive(Debug, Clone, PartialEq)]
pub struct ExportedSession {
    pub id: Uuid,
    pub swimmer_id: Uuid,
    pub date: NaiveDate,
    pub notes: Option<String>,
    pub sets: Vec<ExportedSet>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExportedSet {
    pub id: Uuid,
    pub position: i32,
    pub repeat_count: i32,
    pub distance_m: i32,
    pub stroke: Stroke,
    pub interval_sec: Option<i32>,
    pub notes: Option<String>,
    pub reps: Vec<ExportedRep>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExportedRep {
    pub id: Uuid,
    pub rep_index: i32,
    pub time_sec: f64,
    pub rpe: Option<i16>,
    pub notes: Option<String>,
}

/// Sessions in export order, projected onto the exported columns
pub fn project(details: &[SessionDetail]) -> Vec<ExportedSession> {
    let mut ordered: Vec<&SessionDetail> = details.iter().collect();
    ordered.sort_by(|a, b| {
        a.session
            .date
            .cmp(&b.session.date)
            .then_with(|| a.session.created_at.cmp(&b.session.created_at))
            .then_with(|| a.session.id.cmp(&b.session.id))
    });

    ordered
        .into_iter()
        .map(|detail| {
            let mut sets: Vec<ExportedSet> = detail
                .sets
                .iter()
                .map(|set| {
                    let mut reps: Vec<ExportedRep> = set
                        .reps
                        .iter()
                        .map(|rep| ExportedRep {
                            id: rep.id,
                            rep_index: rep.rep_index,
                            time_sec: rep.time_sec,
                            rpe: rep.rpe,
                            notes: rep.notes.clone(),
                        })
                        .collect();
                    reps.sort_by_key(|rep| rep.rep_index);

                    ExportedSet {
                        id: set.set.id,
                        position: set.set.position,
                        repeat_count: set.set.repeat_count,
                        distance_m: set.set.distance_m,
                        stroke: set.set.stroke,
                        interval_sec: set.set.interval_sec,
                        notes: set.set.notes.clone(),
                        reps,
                    }
                })
                .collect();
            sets.sort_by_key(|set| set.position);

            ExportedSession {
                id: detail.session.id,
                swimmer_id: detail.session.swimmer_id,
                date: detail.session.date,
                notes: detail.session.notes.clone(),
                sets,
            }
        })
        .collect()
}

fn rows_for(session: &ExportedSession) -> Vec<CsvRow> {
    let base = CsvRow {
        session_id: session.id,
        date: session.date,
        session_notes: session.notes.clone(),
        swimmer_id: session.swimmer_id,
        set_id: None,
        set_position: None,
        repeat_count: None,
        distance_m: None,
        stroke: None,
        interval_sec: None,
        set_notes: None,
        rep_id: None,
        rep_index: None,
        time_sec: None,
        rpe: None,
        rep_notes: None,
    };

    if session.sets.is_empty() {
        return vec![base];
    }

    let mut rows = Vec::new();
    for set in &session.sets {
        let set_row = CsvRow {
            set_id: Some(set.id),
            set_position: Some(set.position),
            repeat_count: Some(set.repeat_count),
            distance_m: Some(set.distance_m),
            stroke: Some(set.stroke),
            interval_sec: set.interval_sec,
            set_notes: set.notes.clone(),
            ..base.clone()
        };

        if set.reps.is_empty() {
            rows.push(set_row);
            continue;
        }

        for rep in &set.reps {
            rows.push(CsvRow {
                rep_id: Some(rep.id),
                rep_index: Some(rep.rep_index),
                time_sec: Some(rep.time_sec),
                rpe: rep.rpe,
                rep_notes: rep.notes.clone(),
                ..set_row.clone()
            });
        }
    }
    rows
}

/// Render sessions as CSV text, header included even when empty
pub fn write_csv(details: &[SessionDetail]) -> Result<String, ExportError> {
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(Vec::new());

    writer.write_record(CSV_HEADERS)?;
    for session in project(details) {
        for row in rows_for(&session) {
            writer.serialize(row)?;
        }
    }

    writer.flush()?;
    let bytes = writer.into_inner().map_err(|err| err.into_error())?;
    Ok(String::from_utf8(bytes)?)
}

fn required<T>(value: Option<T>, column: &str, row: usize) -> Result<T, ExportError> {
    value.ok_or_else(|| ExportError::Malformed {
        row,
        message: format!("{} is required when set_id is present", column),
    })
}

/// Parse text produced by [`write_csv`] back into sessions
pub fn read_csv(text: &str) -> Result<Vec<ExportedSession>, ExportError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .from_reader(text.as_bytes());

    let mut sessions: Vec<ExportedSession> = Vec::new();

    for (index, record) in reader.deserialize::<CsvRow>().enumerate() {
        let row = record?;
        let line = index + 2;

        let starts_session = sessions
            .last()
            .map(|session| session.id != row.session_id)
            .unwrap_or(true);
        if starts_session {
            sessions.push(ExportedSession {
                id: row.session_id,
                swimmer_id: row.swimmer_id,
                date: row.date,
                notes: row.session_notes.clone(),
                sets: Vec::new(),
            });
        }

        let Some(set_id) = row.set_id else {
            continue;
        };
        let Some(session) = sessions.last_mut() else {
            continue;
        };

        let starts_set = session
            .sets
            .last()
            .map(|set| set.id != set_id)
            .unwrap_or(true);
        if starts_set {
            session.sets.push(ExportedSet {
                id: set_id,
                position: required(row.set_position, "set_position", line)?,
                repeat_count: required(row.repeat_count, "repeat_count", line)?,
                distance_m: required(row.distance_m, "distance_m", line)?,
                stroke: required(row.stroke, "stroke", line)?,
                interval_sec: row.interval_sec,
                notes: row.set_notes.clone(),
                reps: Vec::new(),
            });
        }

        if let (Some(rep_id), Some(set)) = (row.rep_id, session.sets.last_mut()) {
            set.reps.push(ExportedRep {
                id: rep_id,
                rep_index: required(row.rep_index, "rep_index", line)?,
                time_sec: required(row.time_sec, "time_sec", line)?,
                rpe: row.rpe,
                notes: row.rep_notes,
            });
        }
    }

    Ok(sessions)
}

/// A rendered CSV document and its download name
#[derive(Debug, Clone)]
pub struct CsvExport {
    pub filename: String,
    pub body: String,
}

#[derive(Clone)]
pub struct ExportService {
    store: Arc<dyn SwimStore>,
    sessions: SessionService,
}

impl ExportService {
    pub fn new(store: Arc<dyn SwimStore>) -> Self {
        Self {
            sessions: SessionService::new(store.clone()),
            store,
        }
    }

    /// One session, for its owner or a supervising coach
    #[tracing::instrument(skip(self, actor), fields(account_id = %actor.account_id))]
    pub async fn session_csv(&self, actor: &AccountSession, session_id: Uuid) -> AppResult<CsvExport> {
        let view = self.sessions.get_session(actor, session_id).await?;

        Ok(CsvExport {
            filename: format!("session_{}.csv", session_id),
            body: write_csv(&[view.detail])?,
        })
    }

    /// A swimmer's own range, or a coach's supervised swimmers (optionally one)
    #[tracing::instrument(skip(self, actor), fields(account_id = %actor.account_id))]
    pub async fn range_csv(
        &self,
        actor: &AccountSession,
        start: NaiveDate,
        end: NaiveDate,
        swimmer_id: Option<Uuid>,
    ) -> AppResult<CsvExport> {
        let range = date_range(start, end)?;

        let swimmer_ids: Vec<Uuid> = if actor.is_coach() {
            match swimmer_id {
                Some(id) => {
                    if !self.store.is_supervising(actor.account_id, id).await? {
                        return Err(AppError::Forbidden(
                            "You do not supervise this swimmer".to_string(),
                        ));
                    }
                    vec![id]
                }
                None => self
                    .store
                    .list_swimmers_of_coach(actor.account_id)
                    .await?
                    .into_iter()
                    .map(|swimmer| swimmer.id)
                    .collect(),
            }
        } else {
            if swimmer_id.is_some_and(|id| id != actor.account_id) {
                return Err(AppError::Forbidden(
                    "You can only export your own sessions".to_string(),
                ));
            }
            vec![actor.account_id]
        };

        let mut details = Vec::new();
        for id in swimmer_ids {
            details.extend(self.sessions.sessions_in_range(id, range).await?);
        }

        tracing::debug!(sessions = details.len(), "range export");
        Ok(CsvExport {
            filename: format!("sessions_{}_{}.csv", start, end),
            body: write_csv(&details)?,
        })
    }
}
