use std::sync::Arc;

use sqlx::{PgPool, Postgres, Transaction};
use tracing::{debug, info, warn};

use crate::auth::password::SecretHasher;
use crate::error::{StoreContext, StoreError};
use crate::users::repo_types::{NewUser, User};
use crate::users::services::validate_new_user;

#[derive(Clone)]
pub struct UserRepo {
    db: PgPool,
    hasher: Arc<dyn SecretHasher>,
}

impl UserRepo {
    pub fn new(db: PgPool, hasher: Arc<dyn SecretHasher>) -> Self {
        Self { db, hasher }
    }

    pub async fn list(&self) -> Result<Vec<User>, StoreError> {
        sqlx::query_as::<_, User>(
            r#"
            SELECT id, first_name, last_name, username, password_digest
              FROM users
             ORDER BY id ASC
            "#,
        )
        .fetch_all(&self.db)
        .await
        .store_context(|| "list users")
    }

    pub async fn get(&self, id: i64) -> Result<User, StoreError> {
        sqlx::query_as::<_, User>(
            r#"
            SELECT id, first_name, last_name, username, password_digest
              FROM users
             WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_one(&self.db)
        .await
        .store_context(|| format!("get user {id}"))
    }

    pub async fn create(&self, user: &NewUser) -> Result<User, StoreError> {
        let created = self.create_many(std::slice::from_ref(user)).await?;
        created
            .into_iter()
            .next()
            .ok_or_else(|| StoreError::not_found(format!("create user {:?}", user.username)))
    }

    /// Creates every user or none: all are validated and hashed first, then
    /// inserted in one transaction. The error names the first failing user.
    pub async fn create_many(&self, users: &[NewUser]) -> Result<Vec<User>, StoreError> {
        if users.is_empty() {
            return Ok(Vec::new());
        }
        let total = users.len();
        let context = |idx: usize| {
            format!(
                "create user {:?} ({} of {total})",
                users[idx].username,
                idx + 1
            )
        };

        let passwords = users
            .iter()
            .enumerate()
            .map(|(idx, user)| validate_new_user(context(idx), user))
            .collect::<Result<Vec<_>, _>>()?;

        let mut digests = Vec::with_capacity(total);
        for (idx, password) in passwords.into_iter().enumerate() {
            let digest = self
                .hasher
                .hash(password)
                .map_err(|e| StoreError::infrastructure(context(idx), e))?;
            digests.push(digest);
        }

        let mut tx = self
            .db
            .begin()
            .await
            .store_context(|| format!("create {total} users"))?;

        let mut created = Vec::with_capacity(total);
        for (idx, (user, digest)) in users.iter().zip(&digests).enumerate() {
            let row = insert_user(&mut tx, user, digest)
                .await
                .store_context(|| context(idx))?;
            created.push(row);
        }

        tx.commit()
            .await
            .store_context(|| format!("create {total} users"))?;

        for user in &created {
            info!(user_id = user.id, username = %user.username, "user created");
        }
        Ok(created)
    }

    /// Returns the deleted row, or `None` if no user had this id.
    pub async fn delete(&self, id: i64) -> Result<Option<User>, StoreError> {
        let deleted = sqlx::query_as::<_, User>(
            r#"
            DELETE FROM users
             WHERE id = $1
            RETURNING id, first_name, last_name, username, password_digest
            "#,
        )
        .bind(id)
        .fetch_optional(&self.db)
        .await
        .store_context(|| format!("delete user {id}"))?;

        if deleted.is_some() {
            info!(user_id = id, "user deleted");
        }
        Ok(deleted)
    }

    /// `Ok(None)` for an unknown username or a wrong password.
    pub async fn authenticate(&self, username: &str, secret: &str) -> Result<Option<User>, StoreError> {
        let context = || format!("authenticate {username:?}");
        let found = sqlx::query_as::<_, User>(
            r#"
            SELECT id, first_name, last_name, username, password_digest
              FROM users
             WHERE username = $1
            "#,
        )
        .bind(username)
        .fetch_optional(&self.db)
        .await
        .store_context(context)?;

        let Some(user) = found else {
            debug!(username, "login for unknown username");
            return Ok(None);
        };

        let ok = self
            .hasher
            .verify(secret, &user.password_digest)
            .map_err(|e| StoreError::infrastructure(context(), e))?;
        if !ok {
            warn!(user_id = user.id, "login with wrong password");
            return Ok(None);
        }
        Ok(Some(user))
    }
}

async fn insert_user(
    tx: &mut Transaction<'_, Postgres>,
    user: &NewUser,
    digest: &str,
) -> Result<User, sqlx::Error> {
    sqlx::query_as::<_, User>(
        r#"
        INSERT INTO users (first_name, last_name, username, password_digest)
        VALUES ($1, $2, $3, $4)
        RETURNING id, first_name, last_name, username, password_digest
        "#,
    )
    .bind(&user.first_name)
    .bind(&user.last_name)
    .bind(&user.username)
    .bind(digest)
    .fetch_one(&mut **tx)
    .await
}
