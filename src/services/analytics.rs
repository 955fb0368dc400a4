//! Pace and volume arithmetic over loaded session graphs.
//!
//! Everything here is pure: callers load `SessionDetail`s from the store and
//! pass them in. Averages are rounded to two decimals; pace is computed over
//! the distance actually covered by logged reps.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::models::{AccountInfo, SessionDetail, SetDetail, Stroke};

pub const DEFAULT_PACE_BASIS_M: i32 = 100;
pub const MAX_PACE_BASIS_M: i32 = 1500;

/// Resolve the `pace_per_m` query parameter
pub fn pace_basis(requested: Option<i32>) -> AppResult<i32> {
    let basis = requested.unwrap_or(DEFAULT_PACE_BASIS_M);
    if !(1..=MAX_PACE_BASIS_M).contains(&basis) {
        return Err(AppError::BadRequest(format!(
            "pace_per_m must be between 1 and {}",
            MAX_PACE_BASIS_M
        )));
    }
    Ok(basis)
}

/// Seconds per `basis_m` meters; absent when any input is zero
pub fn pace_per(distance_m: f64, time_sec: f64, basis_m: f64) -> Option<f64> {
    if distance_m <= 0.0 || time_sec <= 0.0 || basis_m <= 0.0 {
        return None;
    }
    Some(time_sec / distance_m * basis_m)
}

/// `m:ss.hh`, rounded to hundredths before splitting (59.995 -> `1:00.00`)
pub fn format_seconds(seconds: f64) -> String {
    let total_hundredths = (seconds.max(0.0) * 100.0).round() as u64;
    let minutes = total_hundredths / 6000;
    let remainder = total_hundredths % 6000;
    format!("{}:{:02}.{:02}", minutes, remainder / 100, remainder % 100)
}

pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

fn average(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(round2(values.iter().sum::<f64>() / values.len() as f64))
    }
}

fn rounded_pace(distance_m: f64, time_sec: f64, basis_m: i32) -> Option<f64> {
    pace_per(distance_m, time_sec, f64::from(basis_m)).map(round2)
}

/// Running totals shared by every roll-up
#[derive(Debug, Default, Clone)]
struct Totals {
    prescribed_distance_m: f64,
    logged_distance_m: f64,
    time_sec: f64,
    rpes: Vec<f64>,
    rep_times: Vec<f64>,
}

impl Totals {
    fn add_set(&mut self, set: &SetDetail) {
        self.prescribed_distance_m += set.set.prescribed_distance_m();
        self.logged_distance_m += f64::from(set.set.distance_m) * set.reps.len() as f64;
        for rep in &set.reps {
            self.time_sec += rep.time_sec;
            self.rep_times.push(rep.time_sec);
            if let Some(rpe) = rep.rpe {
                self.rpes.push(f64::from(rpe));
            }
        }
    }

    fn add_session(&mut self, detail: &SessionDetail) {
        for set in &detail.sets {
            self.add_set(set);
        }
    }

    fn pace(&self, basis_m: i32) -> Option<f64> {
        rounded_pace(self.logged_distance_m, self.time_sec, basis_m)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SessionStats {
    pub total_sets: usize,
    pub total_reps: i64,
    pub logged_reps: usize,
    pub total_distance_m: f64,
    pub avg_rpe: Option<f64>,
    pub avg_rep_time_sec: Option<f64>,
}

pub fn session_stats(detail: &SessionDetail) -> SessionStats {
    let mut totals = Totals::default();
    totals.add_session(detail);

    SessionStats {
        total_sets: detail.sets.len(),
        total_reps: detail
            .sets
            .iter()
            .map(|set| i64::from(set.set.repeat_count))
            .sum(),
        logged_reps: totals.rep_times.len(),
        total_distance_m: totals.prescribed_distance_m,
        avg_rpe: average(&totals.rpes),
        avg_rep_time_sec: average(&totals.rep_times),
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SessionSummary {
    pub total_distance_m: f64,
    pub logged_distance_m: f64,
    pub total_time_sec: f64,
    pub avg_rpe: Option<f64>,
    pub avg_pace_sec_per: Option<f64>,
    pub pace_basis_m: i32,
    pub avg_pace_formatted: Option<String>,
}

pub fn session_summary(detail: &SessionDetail, basis_m: i32) -> SessionSummary {
    let mut totals = Totals::default();
    totals.add_session(detail);
    let pace = totals.pace(basis_m);

    SessionSummary {
        total_distance_m: totals.prescribed_distance_m,
        logged_distance_m: totals.logged_distance_m,
        total_time_sec: round2(totals.time_sec),
        avg_rpe: average(&totals.rpes),
        avg_pace_sec_per: pace,
        pace_basis_m: basis_m,
        avg_pace_formatted: pace.map(format_seconds),
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StrokeBreakdown {
    pub total_distance_m: f64,
    pub logged_distance_m: f64,
    pub total_time_sec: f64,
    pub avg_pace_sec_per: Option<f64>,
    pub avg_pace_formatted: Option<String>,
}

pub fn stroke_breakdown(detail: &SessionDetail, basis_m: i32) -> BTreeMap<Stroke, StrokeBreakdown> {
    let mut per_stroke: BTreeMap<Stroke, Totals> = BTreeMap::new();
    for set in &detail.sets {
        per_stroke.entry(set.set.stroke).or_default().add_set(set);
    }

    per_stroke
        .into_iter()
        .map(|(stroke, totals)| {
            let pace = totals.pace(basis_m);
            (
                stroke,
                StrokeBreakdown {
                    total_distance_m: totals.prescribed_distance_m,
                    logged_distance_m: totals.logged_distance_m,
                    total_time_sec: round2(totals.time_sec),
                    avg_pace_sec_per: pace,
                    avg_pace_formatted: pace.map(format_seconds),
                },
            )
        })
        .collect()
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BestSet {
    pub set_id: Uuid,
    pub position: i32,
    pub stroke: Stroke,
    pub distance_m: i32,
    pub repeat_count: i32,
    pub logged_reps: usize,
    pub pace_sec_per: f64,
    pub pace_basis_m: i32,
    pub pace_formatted: String,
}

/// Fastest set by pace; sets without logged reps never qualify
pub fn best_set(detail: &SessionDetail, basis_m: i32) -> Option<BestSet> {
    let mut best: Option<BestSet> = None;

    for set in &detail.sets {
        let mut totals = Totals::default();
        totals.add_set(set);
        let Some(pace) = totals.pace(basis_m) else {
            continue;
        };

        let faster = best
            .as_ref()
            .map(|current| pace < current.pace_sec_per)
            .unwrap_or(true);
        if faster {
            best = Some(BestSet {
                set_id: set.set.id,
                position: set.set.position,
                stroke: set.set.stroke,
                distance_m: set.set.distance_m,
                repeat_count: set.set.repeat_count,
                logged_reps: set.reps.len(),
                pace_sec_per: pace,
                pace_basis_m: basis_m,
                pace_formatted: format_seconds(pace),
            });
        }
    }

    best
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RangeSummary {
    pub sessions: usize,
    pub total_distance_m: f64,
    pub avg_rpe: Option<f64>,
    pub avg_pace_sec_per: Option<f64>,
    pub pace_basis_m: i32,
    pub avg_pace_formatted: Option<String>,
}

/// Roll-up across several sessions
pub fn sessions_summary(details: &[SessionDetail], basis_m: i32) -> RangeSummary {
    let mut totals = Totals::default();
    for detail in details {
        totals.add_session(detail);
    }
    let pace = totals.pace(basis_m);

    RangeSummary {
        sessions: details.len(),
        total_distance_m: totals.prescribed_distance_m,
        avg_rpe: average(&totals.rpes),
        avg_pace_sec_per: pace,
        pace_basis_m: basis_m,
        avg_pace_formatted: pace.map(format_seconds),
    }
}

/// One line of a dashboard listing
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DashboardRow {
    pub id: Uuid,
    pub date: NaiveDate,
    pub notes: Option<String>,
    pub template_id: Option<Uuid>,
    pub total_sets: usize,
    pub total_distance_m: f64,
    pub avg_rpe: Option<f64>,
    pub avg_pace_sec_per: Option<f64>,
    pub pace_basis_m: i32,
    pub avg_pace_formatted: Option<String>,
}

pub fn dashboard_row(detail: &SessionDetail, basis_m: i32) -> DashboardRow {
    let summary = session_summary(detail, basis_m);

    DashboardRow {
        id: detail.session.id,
        date: detail.session.date,
        notes: detail.session.notes.clone(),
        template_id: detail.session.template_id,
        total_sets: detail.sets.len(),
        total_distance_m: summary.total_distance_m,
        avg_rpe: summary.avg_rpe,
        avg_pace_sec_per: summary.avg_pace_sec_per,
        pace_basis_m: basis_m,
        avg_pace_formatted: summary.avg_pace_formatted,
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LeaderboardRow {
    pub rank: usize,
    pub swimmer_id: Uuid,
    pub email: String,
    pub username: Option<String>,
    pub sessions: usize,
    pub total_distance_m: f64,
    pub avg_rpe: Option<f64>,
    pub avg_pace_sec_per: Option<f64>,
    pub avg_pace_formatted: Option<String>,
}

/// Rank swimmers by distance (descending), ties broken by email
pub fn leaderboard(entries: &[(AccountInfo, Vec<SessionDetail>)], basis_m: i32) -> Vec<LeaderboardRow> {
    let mut rows: Vec<LeaderboardRow> = entries
        .iter()
        .map(|(swimmer, details)| {
            let summary = sessions_summary(details, basis_m);
            LeaderboardRow {
                rank: 0,
                swimmer_id: swimmer.id,
                email: swimmer.email.clone(),
                username: swimmer.username.clone(),
                sessions: summary.sessions,
                total_distance_m: summary.total_distance_m,
                avg_rpe: summary.avg_rpe,
                avg_pace_sec_per: summary.avg_pace_sec_per,
                avg_pace_formatted: summary.avg_pace_formatted,
            }
        })
        .collect();

    rows.sort_by(|a, b| {
        b.total_distance_m
            .total_cmp(&a.total_distance_m)
            .then_with(|| a.email.cmp(&b.email))
    });
    for (index, row) in rows.iter_mut().enumerate() {
        row.rank = index + 1;
    }

    rows
}
