use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{DateRange, StoreError, StoreResult, SwimStore};
use crate::models::{
    Account, CoachLink, NewAccount, NewSession, NewTemplate, Rep, RepChanges, RepDraft,
    SessionChanges, SessionDetail, SetChanges, SetDetail, SetDraft, SwimSession, SwimSet,
    Template, TemplateChanges,
};

#[derive(Debug, Default)]
struct MemoryState {
    accounts: HashMap<Uuid, Account>,
    links: Vec<CoachLink>,
    sessions: HashMap<Uuid, SwimSession>,
    sets: HashMap<Uuid, SwimSet>,
    reps: HashMap<Uuid, Rep>,
    templates: HashMap<Uuid, Template>,
}

impl MemoryState {
    fn next_position(&self, session_id: Uuid) -> i32 {
        self.sets
            .values()
            .filter(|set| set.session_id == session_id)
            .map(|set| set.position)
            .max()
            .unwrap_or(0)
            + 1
    }

    fn reps_of(&self, set_id: Uuid) -> impl Iterator<Item = &Rep> {
        self.reps.values().filter(move |rep| rep.set_id == set_id)
    }

    fn insert_set(&mut self, session_id: Uuid, draft: SetDraft) -> StoreResult<SetDetail> {
        if draft.reps.len() as i64 > i64::from(draft.repeat_count) {
            return Err(full_set(draft.reps.len() as i64, draft.repeat_count));
        }

        let now = Utc::now();
        let set = SwimSet {
            id: Uuid::new_v4(),
            session_id,
            position: self.next_position(session_id),
            repeat_count: draft.repeat_count,
            distance_m: draft.distance_m,
            stroke: draft.stroke,
            interval_sec: draft.interval_sec,
            notes: draft.notes,
            created_at: now,
        };

        let reps: Vec<Rep> = draft
            .reps
            .into_iter()
            .enumerate()
            .map(|(index, rep)| Rep {
                id: Uuid::new_v4(),
                set_id: set.id,
                rep_index: index as i32 + 1,
                time_sec: rep.time_sec,
                rpe: rep.rpe,
                notes: rep.notes,
                created_at: now,
            })
            .collect();

        self.sets.insert(set.id, set.clone());
        for rep in &reps {
            self.reps.insert(rep.id, rep.clone());
        }

        Ok(SetDetail { set, reps })
    }

    fn remove_set(&mut self, set_id: Uuid) {
        self.sets.remove(&set_id);
        self.reps.retain(|_, rep| rep.set_id != set_id);
    }
}

fn full_set(logged: i64, repeat_count: i32) -> StoreError {
    StoreError::Conflict(format!(
        "Set already has {} of {} reps logged",
        logged, repeat_count
    ))
}

/// Map-backed store with the same semantics as the PostgreSQL store
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    state: Arc<RwLock<MemoryState>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SwimStore for MemoryStore {
    async fn insert_account(&self, account: NewAccount) -> StoreResult<Account> {
        let mut state = self.state.write().await;

        if state
            .accounts
            .values()
            .any(|existing| existing.email.eq_ignore_ascii_case(&account.email))
        {
            return Err(StoreError::Conflict("Email already registered".to_string()));
        }
        if let Some(username) = &account.username {
            if state.accounts.values().any(|existing| {
                existing
                    .username
                    .as_deref()
                    .map(|taken| taken.eq_ignore_ascii_case(username))
                    .unwrap_or(false)
            }) {
                return Err(StoreError::Conflict("Username already taken".to_string()));
            }
        }

        let now = Utc::now();
        let created = Account {
            id: Uuid::new_v4(),
            email: account.email.to_lowercase(),
            username: account.username,
            password_hash: account.password_hash,
            role: account.role,
            created_at: now,
            updated_at: now,
        };
        state.accounts.insert(created.id, created.clone());

        Ok(created)
    }

    async fn find_account(&self, id: Uuid) -> StoreResult<Option<Account>> {
        Ok(self.state.read().await.accounts.get(&id).cloned())
    }

    async fn find_account_by_email(&self, email: &str) -> StoreResult<Option<Account>> {
        let state = self.state.read().await;
        Ok(state
            .accounts
            .values()
            .find(|account| account.email.eq_ignore_ascii_case(email))
            .cloned())
    }

    async fn find_account_by_username(&self, username: &str) -> StoreResult<Option<Account>> {
        let state = self.state.read().await;
        Ok(state
            .accounts
            .values()
            .find(|account| {
                account
                    .username
                    .as_deref()
                    .map(|name| name.eq_ignore_ascii_case(username))
                    .unwrap_or(false)
            })
            .cloned())
    }

    async fn link_coach(&self, coach_id: Uuid, swimmer_id: Uuid) -> StoreResult<CoachLink> {
        let mut state = self.state.write().await;

        if !state.accounts.contains_key(&coach_id) {
            return Err(StoreError::NotFound("Coach"));
        }
        if !state.accounts.contains_key(&swimmer_id) {
            return Err(StoreError::NotFound("Swimmer"));
        }
        if state
            .links
            .iter()
            .any(|link| link.coach_id == coach_id && link.swimmer_id == swimmer_id)
        {
            return Err(StoreError::Conflict("Coach already linked".to_string()));
        }

        let link = CoachLink {
            coach_id,
            swimmer_id,
            created_at: Utc::now(),
        };
        state.links.push(link.clone());

        Ok(link)
    }

    async fn unlink_coach(&self, coach_id: Uuid, swimmer_id: Uuid) -> StoreResult<bool> {
        let mut state = self.state.write().await;
        let before = state.links.len();
        state
            .links
            .retain(|link| !(link.coach_id == coach_id && link.swimmer_id == swimmer_id));
        Ok(state.links.len() != before)
    }

    async fn is_supervising(&self, coach_id: Uuid, swimmer_id: Uuid) -> StoreResult<bool> {
        let state = self.state.read().await;
        Ok(state
            .links
            .iter()
            .any(|link| link.coach_id == coach_id && link.swimmer_id == swimmer_id))
    }

    async fn list_swimmers_of_coach(&self, coach_id: Uuid) -> StoreResult<Vec<Account>> {
        let state = self.state.read().await;
        let mut swimmers: Vec<Account> = state
            .links
            .iter()
            .filter(|link| link.coach_id == coach_id)
            .filter_map(|link| state.accounts.get(&link.swimmer_id).cloned())
            .collect();
        swimmers.sort_by(|a, b| a.email.cmp(&b.email));
        Ok(swimmers)
    }

    async fn list_coaches_of_swimmer(&self, swimmer_id: Uuid) -> StoreResult<Vec<Account>> {
        let state = self.state.read().await;
        let mut coaches: Vec<Account> = state
            .links
            .iter()
            .filter(|link| link.swimmer_id == swimmer_id)
            .filter_map(|link| state.accounts.get(&link.coach_id).cloned())
            .collect();
        coaches.sort_by(|a, b| a.email.cmp(&b.email));
        Ok(coaches)
    }

    async fn create_session(
        &self,
        session: NewSession,
        sets: Vec<SetDraft>,
    ) -> StoreResult<SessionDetail> {
        let mut state = self.state.write().await;

        if sets
            .iter()
            .any(|set| set.reps.len() as i64 > i64::from(set.repeat_count))
        {
            return Err(StoreError::Conflict(
                "A set cannot hold more reps than its repeat count".to_string(),
            ));
        }

        let now = Utc::now();
        let created = SwimSession {
            id: Uuid::new_v4(),
            swimmer_id: session.swimmer_id,
            date: session.date,
            notes: session.notes,
            template_id: session.template_id,
            created_at: now,
            updated_at: now,
        };
        state.sessions.insert(created.id, created.clone());

        let mut set_details = Vec::with_capacity(sets.len());
        for draft in sets {
            set_details.push(state.insert_set(created.id, draft)?);
        }

        Ok(SessionDetail {
            session: created,
            sets: set_details,
        })
    }

    async fn get_session(&self, id: Uuid) -> StoreResult<Option<SwimSession>> {
        Ok(self.state.read().await.sessions.get(&id).cloned())
    }

    async fn update_session(
        &self,
        id: Uuid,
        changes: SessionChanges,
    ) -> StoreResult<Option<SwimSession>> {
        let mut state = self.state.write().await;
        let Some(session) = state.sessions.get_mut(&id) else {
            return Ok(None);
        };

        if let Some(date) = changes.date {
            session.date = date;
        }
        if let Some(notes) = changes.notes {
            session.notes = notes;
        }
        session.updated_at = Utc::now();

        Ok(Some(session.clone()))
    }

    async fn delete_session(&self, id: Uuid) -> StoreResult<bool> {
        let mut state = self.state.write().await;
        if state.sessions.remove(&id).is_none() {
            return Ok(false);
        }

        let set_ids: Vec<Uuid> = state
            .sets
            .values()
            .filter(|set| set.session_id == id)
            .map(|set| set.id)
            .collect();
        for set_id in set_ids {
            state.remove_set(set_id);
        }

        Ok(true)
    }

    async fn list_sessions(
        &self,
        swimmer_id: Uuid,
        range: Option<DateRange>,
        limit: Option<i64>,
    ) -> StoreResult<Vec<SwimSession>> {
        let state = self.state.read().await;
        let mut sessions: Vec<SwimSession> = state
            .sessions
            .values()
            .filter(|session| session.swimmer_id == swimmer_id)
            .filter(|session| range.map(|r| r.contains(session.date)).unwrap_or(true))
            .cloned()
            .collect();

        sessions.sort_by(|a, b| {
            b.date
                .cmp(&a.date)
                .then_with(|| b.created_at.cmp(&a.created_at))
                .then_with(|| a.id.cmp(&b.id))
        });
        if let Some(limit) = limit {
            sessions.truncate(limit.max(0) as usize);
        }

        Ok(sessions)
    }

    async fn create_set(&self, session_id: Uuid, set: SetDraft) -> StoreResult<SetDetail> {
        let mut state = self.state.write().await;
        if !state.sessions.contains_key(&session_id) {
            return Err(StoreError::NotFound("Session"));
        }
        state.insert_set(session_id, set)
    }

    async fn get_set(&self, id: Uuid) -> StoreResult<Option<SwimSet>> {
        Ok(self.state.read().await.sets.get(&id).cloned())
    }

    async fn update_set(&self, id: Uuid, changes: SetChanges) -> StoreResult<Option<SwimSet>> {
        let mut state = self.state.write().await;
        let logged = state.reps_of(id).count() as i64;
        let Some(set) = state.sets.get_mut(&id) else {
            return Ok(None);
        };

        if let Some(repeat_count) = changes.repeat_count {
            if i64::from(repeat_count) < logged {
                return Err(StoreError::Conflict(format!(
                    "Set already has {} reps logged",
                    logged
                )));
            }
            set.repeat_count = repeat_count;
        }
        if let Some(distance_m) = changes.distance_m {
            set.distance_m = distance_m;
        }
        if let Some(stroke) = changes.stroke {
            set.stroke = stroke;
        }
        if let Some(interval_sec) = changes.interval_sec {
            set.interval_sec = interval_sec;
        }
        if let Some(notes) = changes.notes {
            set.notes = notes;
        }

        Ok(Some(set.clone()))
    }

    async fn delete_set(&self, id: Uuid) -> StoreResult<bool> {
        let mut state = self.state.write().await;
        if !state.sets.contains_key(&id) {
            return Ok(false);
        }
        state.remove_set(id);
        Ok(true)
    }

    async fn list_sets(&self, session_ids: &[Uuid]) -> StoreResult<Vec<SwimSet>> {
        let state = self.state.read().await;
        let mut sets: Vec<SwimSet> = state
            .sets
            .values()
            .filter(|set| session_ids.contains(&set.session_id))
            .cloned()
            .collect();
        sets.sort_by_key(|set| (set.session_id, set.position));
        Ok(sets)
    }

    async fn create_rep(&self, set_id: Uuid, rep: RepDraft) -> StoreResult<Rep> {
        let mut state = self.state.write().await;
        let Some(set) = state.sets.get(&set_id) else {
            return Err(StoreError::NotFound("Set"));
        };

        let logged = state.reps_of(set_id).count() as i64;
        if logged >= i64::from(set.repeat_count) {
            return Err(full_set(logged, set.repeat_count));
        }
        let next_index = state
            .reps_of(set_id)
            .map(|existing| existing.rep_index)
            .max()
            .unwrap_or(0)
            + 1;

        let created = Rep {
            id: Uuid::new_v4(),
            set_id,
            rep_index: next_index,
            time_sec: rep.time_sec,
            rpe: rep.rpe,
            notes: rep.notes,
            created_at: Utc::now(),
        };
        state.reps.insert(created.id, created.clone());

        Ok(created)
    }

    async fn get_rep(&self, id: Uuid) -> StoreResult<Option<Rep>> {
        Ok(self.state.read().await.reps.get(&id).cloned())
    }

    async fn update_rep(&self, id: Uuid, changes: RepChanges) -> StoreResult<Option<Rep>> {
        let mut state = self.state.write().await;
        let Some(rep) = state.reps.get_mut(&id) else {
            return Ok(None);
        };

        if let Some(time_sec) = changes.time_sec {
            rep.time_sec = time_sec;
        }
        if let Some(rpe) = changes.rpe {
            rep.rpe = rpe;
        }
        if let Some(notes) = changes.notes {
            rep.notes = notes;
        }

        Ok(Some(rep.clone()))
    }

    async fn delete_rep(&self, id: Uuid) -> StoreResult<bool> {
        Ok(self.state.write().await.reps.remove(&id).is_some())
    }

    async fn list_reps(&self, set_ids: &[Uuid]) -> StoreResult<Vec<Rep>> {
        let state = self.state.read().await;
        let mut reps: Vec<Rep> = state
            .reps
            .values()
            .filter(|rep| set_ids.contains(&rep.set_id))
            .cloned()
            .collect();
        reps.sort_by_key(|rep| (rep.set_id, rep.rep_index));
        Ok(reps)
    }

    async fn create_template(&self, template: NewTemplate) -> StoreResult<Template> {
        let now = Utc::now();
        let created = Template {
            id: Uuid::new_v4(),
            owner_id: template.owner_id,
            name: template.name,
            description: template.description,
            sets: template.sets,
            created_at: now,
            updated_at: now,
        };
        self.state
            .write()
            .await
            .templates
            .insert(created.id, created.clone());
        Ok(created)
    }

    async fn get_template(&self, id: Uuid) -> StoreResult<Option<Template>> {
        Ok(self.state.read().await.templates.get(&id).cloned())
    }

    async fn update_template(
        &self,
        id: Uuid,
        changes: TemplateChanges,
    ) -> StoreResult<Option<Template>> {
        let mut state = self.state.write().await;
        let Some(template) = state.templates.get_mut(&id) else {
            return Ok(None);
        };

        if let Some(name) = changes.name {
            template.name = name;
        }
        if let Some(description) = changes.description {
            template.description = description;
        }
        if let Some(sets) = changes.sets {
            template.sets = sets;
        }
        template.updated_at = Utc::now();

        Ok(Some(template.clone()))
    }

    async fn delete_template(&self, id: Uuid) -> StoreResult<bool> {
        let mut state = self.state.write().await;
        if state.templates.remove(&id).is_none() {
            return Ok(false);
        }

        for session in state.sessions.values_mut() {
            if session.template_id == Some(id) {
                session.template_id = None;
            }
        }

        Ok(true)
    }

    async fn list_templates(&self, owner_ids: &[Uuid]) -> StoreResult<Vec<Template>> {
        let state = self.state.read().await;
        let mut templates: Vec<Template> = state
            .templates
            .values()
            .filter(|template| owner_ids.contains(&template.owner_id))
            .cloned()
            .collect();
        templates.sort_by(|a, b| {
            a.name
                .cmp(&b.name)
                .then_with(|| a.created_at.cmp(&b.created_at))
        });
        Ok(templates)
    }
}
