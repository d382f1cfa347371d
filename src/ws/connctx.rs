use uuid::Uuid;

use crate::models::{ActiveUser, UserId};

/// Who is behind one websocket connection.
///
/// Built once by the authentication step and never rederived; every later
/// authorization check reads it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ConnCtx {
    pub conn_id: Uuid,
    pub user_id: UserId,
    pub email: String,
    pub role: String,
}

impl ConnCtx {
    pub fn new(user_id: UserId, email: impl Into<String>, role: impl Into<String>) -> Self {
        Self {
            conn_id: Uuid::new_v4(),
            user_id,
            email: email.into(),
            role: role.into(),
        }
    }

    pub fn as_active_user(&self) -> ActiveUser {
        ActiveUser {
            id: self.user_id,
            email: self.email.clone(),
            role: self.role.clone(),
            session_id: self.conn_id,
        }
    }
}
