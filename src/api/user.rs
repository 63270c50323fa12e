use serde::{Deserialize, Serialize};

pub use crate::db::user::{Id, Role};

/// An account as rendered to clients. The password hash never leaves the
/// `db` layer.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub user_id: Id,
    pub name: String,
    pub role: Role,
}
