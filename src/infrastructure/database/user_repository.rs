//! User persistence

use sqlx::PgPool;
use tracing::{info, instrument};

use super::db_error;
use crate::business::domain::{NewUser, User};
use crate::shared::types::UserId;
use crate::shared::{AppError, AppResult};

const USER_COLUMNS: &str = "id, username, firstname, lastname, middlename, email, sub, iss, idp_userid, \
     login_source, creation_date";

#[derive(Debug, Clone)]
pub struct UserRepository {
    pool: PgPool,
}

impl UserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    #[instrument(skip(self))]
    pub async fn find_by_id(&self, id: UserId) -> AppResult<Option<User>> {
        sqlx::query_as::<_, User>(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error)
    }

    #[instrument(skip(self))]
    pub async fn find_by_idp_userid(&self, idp_userid: &str) -> AppResult<Option<User>> {
        sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE idp_userid = $1 ORDER BY id LIMIT 1"
        ))
        .bind(idp_userid)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error)
    }

    /// Looks the user up by identity-provider id, creating the row on first sight
    #[instrument(skip(self, new_user), fields(idp_userid = %new_user.idp_userid))]
    pub async fn get_or_create(&self, new_user: &NewUser) -> AppResult<User> {
        if let Some(user) = self.find_by_idp_userid(&new_user.idp_userid).await? {
            return Ok(user);
        }

        let user = sqlx::query_as::<_, User>(&format!(
            r#"
            INSERT INTO users (username, firstname, lastname, email, sub, iss, idp_userid, login_source)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            ON CONFLICT (sub) DO UPDATE SET idp_userid = EXCLUDED.idp_userid
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(&new_user.username)
        .bind(&new_user.firstname)
        .bind(&new_user.lastname)
        .bind(&new_user.email)
        .bind(&new_user.sub)
        .bind(&new_user.iss)
        .bind(&new_user.idp_userid)
        .bind(&new_user.login_source)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("unable to get or create user: {}", e);
            AppError::Internal("unable_to_get_or_create_user".to_string())
        })?;

        info!("👤 user {} created", user.id);
        Ok(user)
    }
}
