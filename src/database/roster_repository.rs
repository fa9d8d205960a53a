//! Roster tables
//!
//! ```sql
//! institutions(id uuid PK, name text)
//! membership_groups(id uuid PK, institution_id uuid FK, name text, created_at timestamptz)
//! group_members(user_id uuid, group_id uuid FK, role text, joined_at timestamptz,
//!               UNIQUE (user_id, group_id))
//! ```
//!
//! SQL `lower()` does not fold the dotted/dotless i, so name matching loads
//! the institution list and folds in Rust. The list is small (one row per
//! university).

use async_trait::async_trait;
use campus_client::{ClientError, Result, RosterStore};
use campus_types::{fold_locale, Institution, MembershipGroup, MembershipRecord};
use sqlx::PgPool;
use tracing::debug;
use uuid::Uuid;

#[derive(Clone)]
pub struct PgRosterStore {
    pool: PgPool,
}

impl PgRosterStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// All institutions ordered by name
    async fn institutions(&self) -> Result<Vec<Institution>> {
        let rows: Vec<(Uuid, String)> =
            sqlx::query_as("SELECT id, name FROM institutions ORDER BY name")
                .fetch_all(&self.pool)
                .await
                .map_err(store_error)?;
        Ok(rows
            .into_iter()
            .map(|(id, name)| Institution { id, name })
            .collect())
    }
}

fn store_error(e: sqlx::Error) -> ClientError {
    ClientError::Store(e.to_string())
}

#[async_trait]
impl RosterStore for PgRosterStore {
    async fn find_institution_exact(&self, name: &str) -> Result<Option<Institution>> {
        let wanted = fold_locale(name.trim());
        Ok(self
            .institutions()
            .await?
            .into_iter()
            .find(|i| fold_locale(&i.name) == wanted))
    }

    async fn find_institution_containing(&self, fragment: &str) -> Result<Option<Institution>> {
        let wanted = fold_locale(fragment.trim());
        if wanted.is_empty() {
            return Ok(None);
        }
        Ok(self
            .institutions()
            .await?
            .into_iter()
            .find(|i| fold_locale(&i.name).contains(&wanted)))
    }

    async fn first_group(&self, institution_id: Uuid) -> Result<Option<MembershipGroup>> {
        let row: Option<(Uuid, Uuid, String)> = sqlx::query_as(
            r#"
            SELECT id, institution_id, name
            FROM membership_groups
            WHERE institution_id = $1
            ORDER BY created_at, id
            LIMIT 1
            "#,
        )
        .bind(institution_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(store_error)?;

        Ok(row.map(|(id, institution_id, name)| MembershipGroup {
            id,
            institution_id,
            name,
        }))
    }

    async fn insert_membership(&self, record: &MembershipRecord) -> Result<()> {
        let result = sqlx::query(
            r#"
            INSERT INTO group_members (user_id, group_id, role, joined_at)
            VALUES ($1, $2, $3, NOW())
            "#,
        )
        .bind(record.user_id)
        .bind(record.group_id)
        .bind(record.role.as_str())
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => {
                debug!(user_id = %record.user_id, group_id = %record.group_id, "Membership inserted");
                Ok(())
            }
            Err(sqlx::Error::Database(db)) if db.is_unique_violation() => {
                Err(ClientError::UniqueViolation(db.message().to_string()))
            }
            Err(e) => Err(store_error(e)),
        }
    }
}
