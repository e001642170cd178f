use serde::{Deserialize, Serialize};

use crate::models::user::Role;
use crate::utils::pagination::PageRequest;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChangeRolePayload {
    pub role: Role,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct UserListQuery {
    pub q: Option<String>,
    pub role: Option<String>,
    pub is_active: Option<bool>,
    pub page: Option<i64>,
    pub page_size: Option<i64>,
    pub skip: Option<i64>,
    pub limit: Option<i64>,
}

impl UserListQuery {
    pub fn page_request(&self) -> PageRequest {
        PageRequest::resolve(self.page, self.page_size, self.skip, self.limit)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct RoleCount {
    pub role: String,
    pub count: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct PlatformCounts {
    pub total_users: i64,
    pub active_users: i64,
    pub total_companies: i64,
    pub verified_companies: i64,
    pub open_jobs: i64,
    pub total_jobs: i64,
    pub total_applications: i64,
    pub hires: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlatformStats {
    #[serde(flatten)]
    pub counts: PlatformCounts,
    pub users_by_role: Vec<RoleCount>,
}
