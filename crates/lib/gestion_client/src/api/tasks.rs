use gestion_core::authz::{TaskAction, check_task};
use gestion_core::board::Board;
use gestion_core::models::project::Project;
use gestion_core::models::task::{Task, TaskDraft, TaskFilter, TaskPatch, TaskStatus};
use tracing::info;

use crate::error::ClientResult;
use crate::gateway::ApiRequest;
use crate::session::Session;

fn task_path(id: i64) -> String {
    format!("/tasks/{id}/")
}

pub struct TasksApi<'a> {
    session: &'a Session,
}

impl<'a> TasksApi<'a> {
    pub(crate) fn new(session: &'a Session) -> Self {
        Self { session }
    }

    pub async fn list(&self, filter: &TaskFilter) -> ClientResult<Vec<Task>> {
        self.session
            .gateway()
            .send_json(ApiRequest::get("/tasks/").with_query(filter.query_pairs()))
            .await
    }

    pub async fn get(&self, id: i64) -> ClientResult<Task> {
        self.session
            .gateway()
            .send_json(ApiRequest::get(task_path(id)))
            .await
    }

    pub async fn create(&self, draft: &TaskDraft) -> ClientResult<Task> {
        draft.validate()?;
        let task: Task = self
            .session
            .gateway()
            .send_json(ApiRequest::post("/tasks/").with_json(draft)?)
            .await?;
        info!(id = task.id, project = task.project, "task created");
        Ok(task)
    }

    /// Project owner or task creator only.
    pub async fn update(&self, project: &Project, task: &Task, patch: &TaskPatch) -> ClientResult<Task> {
        let actor = self.session.require_actor()?;
        check_task(&actor, project, task, TaskAction::Edit)?;
        patch.validate()?;
        self.session
            .gateway()
            .send_json(ApiRequest::patch(task_path(task.id)).with_json(patch)?)
            .await
    }

    /// Move a task to another board column.
    pub async fn set_status(&self, project: &Project, task: &Task, status: TaskStatus) -> ClientResult<Task> {
        self.update(project, task, &TaskPatch::status(status)).await
    }

    /// Project owner or task creator only.
    pub async fn delete(&self, project: &Project, task: &Task) -> ClientResult<()> {
        let actor = self.session.require_actor()?;
        check_task(&actor, project, task, TaskAction::Delete)?;
        self.session
            .gateway()
            .send_empty(ApiRequest::delete(task_path(task.id)))
            .await?;
        info!(id = task.id, "task deleted");
        Ok(())
    }

    /// Load a project's tasks grouped into status columns.
    pub async fn board(&self, project_id: i64) -> ClientResult<Board> {
        Ok(Board::new(self.list(&TaskFilter::project(project_id)).await?))
    }
}
