use anyhow::Result;
use sqlx::{PgPool, Row};
use uuid::Uuid;

#[derive(Clone)]
pub struct UsersRepo {
    pub pool: PgPool,
}

impl UsersRepo {
    pub async fn exists(&self, id: Uuid) -> Result<bool> {
        let row = sqlx::query("SELECT EXISTS (SELECT 1 FROM users WHERE id = $1) AS found")
            .bind(id)
            .fetch_one(&self.pool)
            .await?;

        Ok(row.get("found"))
    }
}
