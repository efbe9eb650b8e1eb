use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use time::OffsetDateTime;

use crate::error::AppError;

pub const DEFAULT_CATEGORY: &str = "General";

/// Portfolio entry in the database.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Project {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub link: String,
    pub category: String,
    pub created_at: OffsetDateTime,
}

/// Optional listing filters; both compose with AND.
#[derive(Debug, Default)]
pub struct ProjectFilter {
    pub search: Option<String>,
    pub category: Option<String>,
}

#[derive(Debug)]
pub struct NewProject {
    pub title: String,
    pub description: String,
    pub link: String,
    pub category: Option<String>,
}

/// The three editable fields; category is preserved on update.
#[derive(Debug)]
pub struct ProjectEdit {
    pub title: String,
    pub description: String,
    pub link: String,
}

/// `%needle%` with LIKE metacharacters escaped, so the filter is a
/// plain case-insensitive substring match.
pub fn like_pattern(needle: &str) -> String {
    let escaped = needle
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{escaped}%")
}

impl Project {
    /// All entries matching the filter, in insertion order.
    pub async fn list(db: &PgPool, filter: &ProjectFilter) -> Result<Vec<Project>, AppError> {
        let pattern = filter.search.as_deref().map(like_pattern);
        let rows = sqlx::query_as::<_, Project>(
            r#"
            SELECT id, title, description, link, category, created_at
            FROM projects
            WHERE ($1::text IS NULL OR title ILIKE $1 OR description ILIKE $1)
              AND ($2::text IS NULL OR category = $2)
            ORDER BY id
            "#,
        )
        .bind(pattern)
        .bind(&filter.category)
        .fetch_all(db)
        .await?;
        Ok(rows)
    }

    pub async fn get(db: &PgPool, id: i64) -> Result<Project, AppError> {
        let project = sqlx::query_as::<_, Project>(
            r#"
            SELECT id, title, description, link, category, created_at
            FROM projects
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(db)
        .await?;
        project.ok_or(AppError::NotFound)
    }

    pub async fn create(db: &PgPool, new: &NewProject) -> Result<Project, AppError> {
        let mut tx = db.begin().await?;
        let project = sqlx::query_as::<_, Project>(
            r#"
            INSERT INTO projects (title, description, link, category)
            VALUES ($1, $2, $3, $4)
            RETURNING id, title, description, link, category, created_at
            "#,
        )
        .bind(&new.title)
        .bind(&new.description)
        .bind(&new.link)
        .bind(new.category.as_deref().unwrap_or(DEFAULT_CATEGORY))
        .fetch_one(&mut *tx)
        .await?;
        tx.commit().await?;
        Ok(project)
    }

    /// Loads the row first so untouched fields (category) survive, then
    /// overwrites the editable three. Both steps share one transaction.
    pub async fn update(db: &PgPool, id: i64, edit: &ProjectEdit) -> Result<Project, AppError> {
        let mut tx = db.begin().await?;
        let existing = sqlx::query_as::<_, Project>(
            r#"
            SELECT id, title, description, link, category, created_at
            FROM projects
            WHERE id = $1
            FOR UPDATE
            "#,
        )
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?;
        if existing.is_none() {
            return Err(AppError::NotFound);
        }

        let project = sqlx::query_as::<_, Project>(
            r#"
            UPDATE projects
            SET title = $2, description = $3, link = $4
            WHERE id = $1
            RETURNING id, title, description, link, category, created_at
            "#,
        )
        .bind(id)
        .bind(&edit.title)
        .bind(&edit.description)
        .bind(&edit.link)
        .fetch_one(&mut *tx)
        .await?;
        tx.commit().await?;
        Ok(project)
    }

    pub async fn delete(db: &PgPool, id: i64) -> Result<(), AppError> {
        let mut tx = db.begin().await?;
        let result = sqlx::query("DELETE FROM projects WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        if result.rows_affected() == 0 {
            return Err(AppError::NotFound);
        }
        tx.commit().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn like_pattern_wraps_and_escapes() {
        assert_eq!(like_pattern("calc"), "%calc%");
        assert_eq!(like_pattern("100%"), "%100\\%%");
        assert_eq!(like_pattern("snake_case"), "%snake\\_case%");
        assert_eq!(like_pattern(r"back\slash"), "%back\\\\slash%");
    }

    #[test]
    fn empty_filter_binds_nothing() {
        let filter = ProjectFilter::default();
        assert!(filter.search.is_none());
        assert!(filter.category.is_none());
    }
}
