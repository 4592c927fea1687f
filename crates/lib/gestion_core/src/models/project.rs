//! Project domain models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{HasId, require_text};
use crate::{CoreError, CoreResult};

/// Role a user holds within a project.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProjectRole {
    Owner,
    Manager,
    Member,
}

impl ProjectRole {
    /// Wire representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            ProjectRole::Owner => "owner",
            ProjectRole::Manager => "manager",
            ProjectRole::Member => "member",
        }
    }
}

impl std::fmt::Display for ProjectRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.pad(self.as_str())
    }
}

/// A role assignment as reported in `members_info`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectMember {
    /// Membership row id (not the user id).
    pub id: i64,
    /// Username of the member.
    pub user: String,
    pub role: ProjectRole,
}

/// Read-only project snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Project {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// Username of the project owner.
    pub owner: String,
    #[serde(default)]
    pub members_info: Vec<ProjectMember>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Project {
    /// Role held by `username` according to the membership list.
    pub fn membership_role(&self, username: &str) -> Option<ProjectRole> {
        self.members_info
            .iter()
            .find(|m| m.user == username)
            .map(|m| m.role)
    }
}

impl HasId for Project {
    fn id(&self) -> i64 {
        self.id
    }
}

/// Member entry sent when creating or updating a project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MemberInput {
    /// User id of the member.
    pub id: i64,
    pub role: ProjectRole,
}

impl MemberInput {
    fn validate(&self) -> CoreResult<()> {
        if self.role == ProjectRole::Owner {
            return Err(CoreError::Validation(
                "owner role can only be assigned by ownership transfer".into(),
            ));
        }
        Ok(())
    }
}

/// Body of `POST /projects/`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ProjectDraft {
    pub name: String,
    pub description: String,
    pub members: Vec<MemberInput>,
}

impl ProjectDraft {
    pub fn validate(&self) -> CoreResult<()> {
        require_text("name", &self.name)?;
        self.members.iter().try_for_each(MemberInput::validate)
    }
}

/// Body of `PATCH /projects/{id}/`; absent fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ProjectPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub members: Option<Vec<MemberInput>>,
}

impl ProjectPatch {
    pub fn validate(&self) -> CoreResult<()> {
        if let Some(name) = &self.name {
            require_text("name", name)?;
        }
        match &self.members {
            Some(members) => members.iter().try_for_each(MemberInput::validate),
            None => Ok(()),
        }
    }
}

/// Body of `POST /projects/{id}/transfer_ownership/`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct OwnershipTransfer {
    pub new_owner_id: i64,
}
