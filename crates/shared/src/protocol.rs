use serde::{Deserialize, Serialize};

use crate::domain::SessionUser;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginResponse {
    pub user: SessionUser,
}

/// Body of a create/update response: either the authoritative record or a
/// bare acknowledgement the client cannot merge.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MutationResponse<R> {
    Record(R),
    Ack(serde_json::Value),
}

impl<R> MutationResponse<R> {
    pub fn into_record(self) -> Option<R> {
        match self {
            Self::Record(record) => Some(record),
            Self::Ack(_) => None,
        }
    }
}
