//! Command handlers. Each one prints its result to stdout.

use chrono::Utc;
use gestion_client::Session;
use gestion_core::auth::jwt::inspect_access_token;
use gestion_core::authz::RoleFilter;
use gestion_core::models::project::Project;
use gestion_core::models::task::{Task, TaskFilter, TaskStatus};
use tracing::warn;

use crate::Result;

pub async fn login(session: &Session, username: &str, password: &str) -> Result<()> {
    let actor = session.login(username, password).await?;
    println!("Logged in as {} (id {}).", actor.username, actor.id);
    Ok(())
}

pub fn logout(session: &Session) {
    session.logout();
    println!("Logged out.");
}

pub async fn whoami(session: &Session) -> Result<()> {
    let Some(actor) = session.init().await? else {
        println!("Not logged in.");
        return Ok(());
    };
    println!("{} (id {})", actor.username, actor.id);

    let Some(token) = session.credentials()?.access_token else {
        return Ok(());
    };
    match inspect_access_token(&token) {
        Ok(claims) => match claims.expires_at() {
            Some(at) if claims.is_expired_at(Utc::now()) => {
                println!("Access token expired at {at}; it will be refreshed on next use.")
            }
            Some(at) => println!("Access token valid until {at}."),
            None => {}
        },
        Err(e) => warn!(error = %e, "access token is not an inspectable JWT"),
    }
    Ok(())
}

pub async fn register(session: &Session, username: &str, password: &str) -> Result<()> {
    session.register(username, password).await?;
    println!("Account '{username}' created. Log in with `gestion login {username}`.");
    Ok(())
}

pub async fn users(session: &Session) -> Result<()> {
    for user in session.users().list().await? {
        println!("{:>5}  {}", user.id, user.username);
    }
    Ok(())
}

pub async fn projects(session: &Session, filter: RoleFilter) -> Result<()> {
    require_login(session).await?;
    let projects = session.projects().list_for(filter).await?;
    if projects.is_empty() {
        println!("No projects.");
    }
    for project in &projects {
        print_project(project);
    }
    Ok(())
}

pub async fn project_delete(session: &Session, id: i64) -> Result<()> {
    require_login(session).await?;
    let project = session.projects().get(id).await?;
    session.projects().delete(&project).await?;
    println!("Deleted project '{}'.", project.name);
    Ok(())
}

pub async fn project_transfer(session: &Session, id: i64, new_owner_id: i64) -> Result<()> {
    require_login(session).await?;
    let project = session.projects().get(id).await?;
    let message = session
        .projects()
        .transfer_ownership(&project, new_owner_id)
        .await?;
    println!("{message}");
    Ok(())
}

pub async fn tasks(session: &Session, filter: TaskFilter) -> Result<()> {
    let tasks = session.tasks().list(&filter).await?;
    if tasks.is_empty() {
        println!("No tasks.");
    }
    for task in &tasks {
        print_task(task);
    }
    Ok(())
}

pub async fn board(session: &Session, project_id: i64) -> Result<()> {
    let project = session.projects().get(project_id).await?;
    let board = session.tasks().board(project_id).await?;
    println!("{} ({} tasks)", project.name, board.len());
    for (status, count) in board.counts() {
        println!();
        println!("{status} [{count}]");
        for task in board.column(status) {
            print_task(task);
        }
    }
    Ok(())
}

pub async fn task_status(session: &Session, task_id: i64, status: TaskStatus) -> Result<()> {
    require_login(session).await?;
    let (project, task) = task_with_project(session, task_id).await?;
    let task = session.tasks().set_status(&project, &task, status).await?;
    println!("Task '{}' is now {}.", task.title, task.status);
    Ok(())
}

pub async fn task_delete(session: &Session, task_id: i64) -> Result<()> {
    require_login(session).await?;
    let (project, task) = task_with_project(session, task_id).await?;
    session.tasks().delete(&project, &task).await?;
    println!("Deleted task '{}'.", task.title);
    Ok(())
}

/// Resolve the actor from stored credentials; gate checks need it.
async fn require_login(session: &Session) -> Result<()> {
    session.init().await?;
    session.require_actor()?;
    Ok(())
}

async fn task_with_project(session: &Session, task_id: i64) -> Result<(Project, Task)> {
    let task = session.tasks().get(task_id).await?;
    let project = session.projects().get(task.project).await?;
    Ok((project, task))
}

fn print_project(project: &Project) {
    println!(
        "{:>5}  {:<30}  owner: {:<12}  members: {}",
        project.id,
        project.name,
        project.owner,
        project.members_info.len()
    );
}

fn print_task(task: &Task) {
    let assignees: Vec<&str> = task
        .assignees_info
        .iter()
        .map(|a| a.username.as_str())
        .collect();
    let due = task
        .due_date
        .map(|d| d.to_string())
        .unwrap_or_else(|| "-".into());
    println!(
        "{:>5}  {:<11}  {:<8}  {:<30}  due: {:<10}  {}",
        task.id,
        task.status,
        task.priority,
        task.title,
        due,
        assignees.join(", ")
    );
}
