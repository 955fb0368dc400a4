use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

use crate::auth::AccountSession;
use crate::error::{field_errors, AppError, AppResult, FieldError};
use crate::models::{
    normalize_notes, notes_change, CreateTemplateRequest, InstantiateTemplateRequest, NewSession,
    NewTemplate, Template, TemplateChanges, TemplateSet, UpdateTemplateRequest,
};
use crate::services::access::{check_template_read, check_template_write};
use crate::services::session_service::SessionView;
use crate::store::SwimStore;

fn template_errors(
    top_level: Result<(), validator::ValidationErrors>,
    name: Option<&str>,
    sets: Option<&[TemplateSet]>,
) -> AppResult<()> {
    let mut errors: Vec<FieldError> = match top_level {
        Ok(()) => Vec::new(),
        Err(errors) => field_errors(&errors, None),
    };

    if let Some(name) = name {
        if name.trim().is_empty() && !errors.iter().any(|e| e.field == "name") {
            errors.push(FieldError::new("name", "blank", "name must not be blank"));
        }
    }

    for (index, set) in sets.unwrap_or_default().iter().enumerate() {
        if let Err(set_errors) = set.validate() {
            errors.extend(field_errors(&set_errors, Some(&format!("sets[{}]", index))));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        errors.sort_by(|a, b| a.field.cmp(&b.field).then_with(|| a.code.cmp(&b.code)));
        Err(AppError::Validation(errors))
    }
}

fn normalize_sets(sets: Vec<TemplateSet>) -> Vec<TemplateSet> {
    sets.into_iter()
        .map(|set| TemplateSet {
            notes: normalize_notes(set.notes),
            ..set
        })
        .collect()
}

#[derive(Clone)]
pub struct TemplateService {
    store: Arc<dyn SwimStore>,
}

impl TemplateService {
    pub fn new(store: Arc<dyn SwimStore>) -> Self {
        Self { store }
    }

    async fn readable(&self, actor: &AccountSession, template_id: Uuid) -> AppResult<Template> {
        let template = self
            .store
            .get_template(template_id)
            .await?
            .ok_or(AppError::NotFound("Template"))?;

        let owner_supervises_actor = actor.is_swimmer()
            && self
                .store
                .is_supervising(template.owner_id, actor.account_id)
                .await?;
        check_template_read(actor, &template, owner_supervises_actor)?;

        Ok(template)
    }

    async fn writable(&self, actor: &AccountSession, template_id: Uuid) -> AppResult<Template> {
        let template = self
            .store
            .get_template(template_id)
            .await?
            .ok_or(AppError::NotFound("Template"))?;
        check_template_write(actor, &template)?;
        Ok(template)
    }

    #[tracing::instrument(skip(self, actor, request), fields(account_id = %actor.account_id))]
    pub async fn create(
        &self,
        actor: &AccountSession,
        request: CreateTemplateRequest,
    ) -> AppResult<Template> {
        template_errors(request.validate(), Some(&request.name), Some(&request.sets))?;

        let template = self
            .store
            .create_template(NewTemplate {
                owner_id: actor.account_id,
                name: request.name.trim().to_string(),
                description: normalize_notes(request.description),
                sets: normalize_sets(request.sets),
            })
            .await?;

        tracing::info!(template_id = %template.id, "template created");
        Ok(template)
    }

    /// Own templates, plus those of the caller's coaches for a swimmer
    #[tracing::instrument(skip(self, actor), fields(account_id = %actor.account_id))]
    pub async fn list(&self, actor: &AccountSession) -> AppResult<Vec<Template>> {
        let mut owner_ids = vec![actor.account_id];
        if actor.is_swimmer() {
            let coaches = self.store.list_coaches_of_swimmer(actor.account_id).await?;
            owner_ids.extend(coaches.into_iter().map(|coach| coach.id));
        }

        Ok(self.store.list_templates(&owner_ids).await?)
    }

    #[tracing::instrument(skip(self, actor), fields(account_id = %actor.account_id))]
    pub async fn get(&self, actor: &AccountSession, template_id: Uuid) -> AppResult<Template> {
        self.readable(actor, template_id).await
    }

    #[tracing::instrument(skip(self, actor, request), fields(account_id = %actor.account_id))]
    pub async fn update(
        &self,
        actor: &AccountSession,
        template_id: Uuid,
        request: UpdateTemplateRequest,
    ) -> AppResult<Template> {
        template_errors(
            request.validate(),
            request.name.as_deref(),
            request.sets.as_deref(),
        )?;
        self.writable(actor, template_id).await?;

        let changes = TemplateChanges {
            name: request.name.map(|name| name.trim().to_string()),
            description: notes_change(request.description),
            sets: request.sets.map(normalize_sets),
        };

        self.store
            .update_template(template_id, changes)
            .await?
            .ok_or(AppError::NotFound("Template"))
    }

    #[tracing::instrument(skip(self, actor), fields(account_id = %actor.account_id))]
    pub async fn delete(&self, actor: &AccountSession, template_id: Uuid) -> AppResult<()> {
        self.writable(actor, template_id).await?;

        if !self.store.delete_template(template_id).await? {
            return Err(AppError::NotFound("Template"));
        }
        Ok(())
    }

    /// New session for the calling swimmer with one empty set per template set
    #[tracing::instrument(skip(self, actor, request), fields(account_id = %actor.account_id))]
    pub async fn instantiate(
        &self,
        actor: &AccountSession,
        template_id: Uuid,
        request: InstantiateTemplateRequest,
    ) -> AppResult<SessionView> {
        request.validate()?;
        if !actor.is_swimmer() {
            return Err(AppError::Forbidden(
                "Only swimmers can log sessions".to_string(),
            ));
        }

        let template = self.readable(actor, template_id).await?;
        let drafts = template.sets.iter().map(TemplateSet::to_draft).collect();

        let detail = self
            .store
            .create_session(
                NewSession {
                    swimmer_id: actor.account_id,
                    date: request.date,
                    notes: normalize_notes(request.notes),
                    template_id: Some(template.id),
                },
                drafts,
            )
            .await?;

        tracing::info!(
            template_id = %template.id,
            session_id = %detail.session.id,
            "template instantiated"
        );
        Ok(SessionView::new(detail))
    }
}
