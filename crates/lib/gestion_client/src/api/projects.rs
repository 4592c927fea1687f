use gestion_core::authz::{ProjectAction, RoleFilter, check_project};
use gestion_core::models::auth::ErrorDetail;
use gestion_core::models::project::{OwnershipTransfer, Project, ProjectDraft, ProjectPatch};
use tracing::info;

use crate::error::ClientResult;
use crate::gateway::ApiRequest;
use crate::session::Session;

fn project_path(id: i64) -> String {
    format!("/projects/{id}/")
}

pub struct ProjectsApi<'a> {
    session: &'a Session,
}

impl<'a> ProjectsApi<'a> {
    pub(crate) fn new(session: &'a Session) -> Self {
        Self { session }
    }

    /// Projects visible to the actor, as the server scopes them.
    pub async fn list(&self) -> ClientResult<Vec<Project>> {
        self.session
            .gateway()
            .send_json(ApiRequest::get("/projects/"))
            .await
    }

    /// Visible projects narrowed by the actor's role in each.
    pub async fn list_for(&self, filter: RoleFilter) -> ClientResult<Vec<Project>> {
        let actor = self.session.require_actor()?;
        let projects = self.list().await?;
        Ok(projects
            .into_iter()
            .filter(|project| filter.matches(&actor, project))
            .collect())
    }

    pub async fn get(&self, id: i64) -> ClientResult<Project> {
        self.session
            .gateway()
            .send_json(ApiRequest::get(project_path(id)))
            .await
    }

    pub async fn create(&self, draft: &ProjectDraft) -> ClientResult<Project> {
        draft.validate()?;
        let project: Project = self
            .session
            .gateway()
            .send_json(ApiRequest::post("/projects/").with_json(draft)?)
            .await?;
        info!(id = project.id, name = %project.name, "project created");
        Ok(project)
    }

    /// Owner only.
    pub async fn update(&self, project: &Project, patch: &ProjectPatch) -> ClientResult<Project> {
        let actor = self.session.require_actor()?;
        check_project(&actor, project, ProjectAction::Edit)?;
        patch.validate()?;
        self.session
            .gateway()
            .send_json(ApiRequest::patch(project_path(project.id)).with_json(patch)?)
            .await
    }

    /// Owner only.
    pub async fn delete(&self, project: &Project) -> ClientResult<()> {
        let actor = self.session.require_actor()?;
        check_project(&actor, project, ProjectAction::Delete)?;
        self.session
            .gateway()
            .send_empty(ApiRequest::delete(project_path(project.id)))
            .await?;
        info!(id = project.id, "project deleted");
        Ok(())
    }

    /// Owner only. Returns the server's confirmation message.
    pub async fn transfer_ownership(&self, project: &Project, new_owner_id: i64) -> ClientResult<String> {
        let actor = self.session.require_actor()?;
        check_project(&actor, project, ProjectAction::TransferOwnership)?;
        let request = ApiRequest::post(format!("/projects/{}/transfer_ownership/", project.id))
            .with_json(&OwnershipTransfer { new_owner_id })?;
        let body: ErrorDetail = self.session.gateway().send_json(request).await?;
        let message = body
            .detail
            .unwrap_or_else(|| format!("Ownership of '{}' transferred.", project.name));
        info!(id = project.id, new_owner_id, "project ownership transferred");
        Ok(message)
    }
}
