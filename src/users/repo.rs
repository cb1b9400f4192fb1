use sqlx::PgPool;

use crate::users::repo_types::{Role, User};

const USER_COLUMNS: &str = "id, username, email, password_hash, role, created_at, updated_at";

impl User {
    pub async fn list(db: &PgPool) -> Result<Vec<User>, sqlx::Error> {
        sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users ORDER BY id"
        ))
        .fetch_all(db)
        .await
    }

    pub async fn find_by_id(db: &PgPool, id: i32) -> Result<Option<User>, sqlx::Error> {
        sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(db)
        .await
    }

    pub async fn find_by_username(db: &PgPool, username: &str) -> Result<Option<User>, sqlx::Error> {
        sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE username = $1"
        ))
        .bind(username)
        .fetch_optional(db)
        .await
    }

    pub async fn find_by_email(db: &PgPool, email: &str) -> Result<Option<User>, sqlx::Error> {
        sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE email = $1"
        ))
        .bind(email)
        .fetch_optional(db)
        .await
    }

    /// Insert a new record with an already-hashed password. The unique
    /// indexes on username/email settle concurrent-registration races;
    /// the violation surfaces as a Conflict upstream.
    pub async fn insert(
        db: &PgPool,
        username: &str,
        email: &str,
        password_hash: &str,
        role: Role,
    ) -> Result<User, sqlx::Error> {
        sqlx::query_as::<_, User>(&format!(
            "INSERT INTO users (username, email, password_hash, role)
             VALUES ($1, $2, $3, $4)
             RETURNING {USER_COLUMNS}"
        ))
        .bind(username)
        .bind(email)
        .bind(password_hash)
        .bind(role)
        .fetch_one(db)
        .await
    }

    /// Overwrite the three mutable fields and stamp updated_at.
    /// The password hash is not reachable through this path.
    pub async fn update(
        db: &PgPool,
        id: i32,
        username: &str,
        email: &str,
        role: Role,
    ) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE users
             SET username = $1, email = $2, role = $3, updated_at = now()
             WHERE id = $4",
        )
        .bind(username)
        .bind(email)
        .bind(role)
        .bind(id)
        .execute(db)
        .await?;
        Ok(result.rows_affected())
    }

    pub async fn delete(db: &PgPool, id: i32) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(db)
            .await?;
        Ok(result.rows_affected())
    }

    /// Startup bootstrap: create the admin account if the username is
    /// free, otherwise leave whatever is there untouched.
    pub async fn ensure_admin(
        db: &PgPool,
        username: &str,
        email: &str,
        password_hash: &str,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "INSERT INTO users (username, email, password_hash, role)
             VALUES ($1, $2, $3, 'Admin')
             ON CONFLICT DO NOTHING",
        )
        .bind(username)
        .bind(email)
        .bind(password_hash)
        .execute(db)
        .await?;
        Ok(result.rows_affected() > 0)
    }
}
