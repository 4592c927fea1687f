// @zen-component: AUTH-AuthorizationGate
//
//! Local, advisory authorization checks.
//!
//! These decide which controls to offer and stop obviously unauthorized calls
//! before they are sent. They read only the cached project/task snapshots, so
//! they can be stale; the server's 403 stays authoritative.

use std::str::FromStr;

use thiserror::Error;

use crate::CoreError;
use crate::models::auth::Actor;
use crate::models::project::{Project, ProjectRole};
use crate::models::task::Task;

/// Mutating project actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProjectAction {
    Edit,
    Delete,
    TransferOwnership,
}

/// Mutating task actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskAction {
    Edit,
    Delete,
}

/// A local authorization denial.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct Denied {
    pub message: String,
}

/// Is the actor the owner of the project?
fn is_owner(actor: &Actor, project: &Project) -> bool {
    actor.username == project.owner
}

pub fn can_edit_project(actor: &Actor, project: &Project) -> bool {
    is_owner(actor, project)
}

pub fn can_delete_project(actor: &Actor, project: &Project) -> bool {
    is_owner(actor, project)
}

pub fn can_transfer_ownership(actor: &Actor, project: &Project) -> bool {
    is_owner(actor, project)
}

/// Project owner or task creator. A task whose creator is gone only
/// matches the owner.
pub fn can_edit_or_delete_task(actor: &Actor, project: &Project, task: &Task) -> bool {
    is_owner(actor, project) || task.created_by == Some(actor.id)
}

/// Check a project action, returning a user-facing denial.
pub fn check_project(actor: &Actor, project: &Project, action: ProjectAction) -> Result<(), Denied> {
    let allowed = match action {
        ProjectAction::Edit => can_edit_project(actor, project),
        ProjectAction::Delete => can_delete_project(actor, project),
        ProjectAction::TransferOwnership => can_transfer_ownership(actor, project),
    };
    if allowed {
        return Ok(());
    }
    let verb = match action {
        ProjectAction::Edit => "edit",
        ProjectAction::Delete => "delete",
        ProjectAction::TransferOwnership => "transfer ownership of",
    };
    Err(Denied {
        message: format!(
            "{} is not allowed to {verb} project '{}'",
            actor.username, project.name
        ),
    })
}

/// Check a task action, returning a user-facing denial.
pub fn check_task(
    actor: &Actor,
    project: &Project,
    task: &Task,
    action: TaskAction,
) -> Result<(), Denied> {
    if can_edit_or_delete_task(actor, project, task) {
        return Ok(());
    }
    let verb = match action {
        TaskAction::Edit => "edit",
        TaskAction::Delete => "delete",
    };
    Err(Denied {
        message: format!(
            "{} is not allowed to {verb} task '{}'",
            actor.username, task.title
        ),
    })
}

// =============================================================================
// "My projects" role filter
// =============================================================================

/// Which of the actor's projects to show. Derived from cached membership
/// data; never used for enforcement.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RoleFilter {
    #[default]
    All,
    Owner,
    Manager,
    Member,
}

impl RoleFilter {
    pub fn matches(&self, actor: &Actor, project: &Project) -> bool {
        let role = project.membership_role(&actor.username);
        match self {
            RoleFilter::All => is_owner(actor, project) || role.is_some(),
            RoleFilter::Owner => is_owner(actor, project),
            RoleFilter::Manager => role == Some(ProjectRole::Manager),
            RoleFilter::Member => role == Some(ProjectRole::Member),
        }
    }

    /// Keep the projects matching this filter, preserving order.
    pub fn apply<'a>(&self, actor: &Actor, projects: &'a [Project]) -> Vec<&'a Project> {
        projects
            .iter()
            .filter(|project| self.matches(actor, project))
            .collect()
    }
}

impl FromStr for RoleFilter {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "all" => Ok(RoleFilter::All),
            "owner" => Ok(RoleFilter::Owner),
            "manager" => Ok(RoleFilter::Manager),
            "member" => Ok(RoleFilter::Member),
            other => Err(CoreError::Validation(format!("unknown role filter: {other}"))),
        }
    }
}
