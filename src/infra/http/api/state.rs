use std::sync::Arc;

use uuid::Uuid;

use crate::application::articles::ArticleService;
use crate::application::auth::AuthService;
use crate::domain::entities::UserRecord;
use crate::infra::db::PostgresRepositories;

use super::rate_limit::ApiRateLimiter;

#[derive(Clone)]
pub struct ApiState {
    pub articles: Arc<ArticleService>,
    pub auth: Arc<AuthService>,
    pub rate_limiter: Arc<ApiRateLimiter>,
    /// Absent when serving from the in-memory store.
    pub db: Option<Arc<PostgresRepositories>>,
}

/// The account resolved from the bearer token of the current request.
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub id: Uuid,
    pub email: String,
}

impl From<UserRecord> for CurrentUser {
    fn from(user: UserRecord) -> Self {
        Self {
            id: user.id,
            email: user.email,
        }
    }
}
