use gestion_core::models::auth::{Actor, User};

use crate::error::ClientResult;
use crate::gateway::ApiRequest;
use crate::session::Session;

pub struct UsersApi<'a> {
    session: &'a Session,
}

impl<'a> UsersApi<'a> {
    pub(crate) fn new(session: &'a Session) -> Self {
        Self { session }
    }

    /// All users, for picking members and assignees.
    pub async fn list(&self) -> ClientResult<Vec<User>> {
        self.session
            .gateway()
            .send_json(ApiRequest::get("/users/"))
            .await
    }

    /// Identity behind the current access token. Does not update the session.
    pub async fn me(&self) -> ClientResult<Actor> {
        self.session
            .gateway()
            .send_json(ApiRequest::get("/users/me/"))
            .await
    }
}
