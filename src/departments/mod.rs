/// Department registry
///
/// Departments are named units with a member set and at most one admin.
/// Resolvers act on issues assigned to departments they are members of.
use crate::{
    db::models::{Department, User},
    error::{CivicError, CivicResult},
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqlitePool};

/// Department with its admin and tallies, for listings
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct DepartmentSummary {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub created_at: chrono::DateTime<Utc>,
    pub admin_id: Option<i64>,
    pub admin_username: Option<String>,
    pub member_count: i64,
    pub issue_count: i64,
}

/// Fields to change on a department
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DepartmentUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
}

/// Department registry
#[derive(Clone)]
pub struct DepartmentRegistry {
    db: SqlitePool,
}

impl DepartmentRegistry {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    /// Create a department
    pub async fn create(&self, name: &str, description: Option<&str>) -> CivicResult<Department> {
        let name = Self::clean_name(name)?;
        let description = description.map(str::trim).filter(|d| !d.is_empty());

        let result = sqlx::query(
            "INSERT INTO department (name, description, created_at) VALUES (?1, ?2, ?3)",
        )
        .bind(&name)
        .bind(description)
        .bind(Utc::now())
        .execute(&self.db)
        .await
        .map_err(|e| CivicError::conflict_on_unique(e, "Department already exists."))?;

        tracing::info!(department = %name, "Department created");

        self.get(result.last_insert_rowid()).await
    }

    /// Departments ordered by name, with admin and tallies
    pub async fn list(&self) -> CivicResult<Vec<DepartmentSummary>> {
        let departments = sqlx::query_as::<_, DepartmentSummary>(
            r#"
            SELECT d.id, d.name, d.description, d.created_at, d.admin_id,
                   a.username AS admin_username,
                   (SELECT COUNT(*) FROM department_member m WHERE m.department_id = d.id) AS member_count,
                   (SELECT COUNT(*) FROM issue i WHERE i.department_id = d.id) AS issue_count
            FROM department d
            LEFT JOIN account a ON a.id = d.admin_id
            ORDER BY d.name ASC
            "#,
        )
        .fetch_all(&self.db)
        .await?;

        Ok(departments)
    }

    /// Get a department by id
    pub async fn get(&self, id: i64) -> CivicResult<Department> {
        sqlx::query_as::<_, Department>(
            "SELECT id, name, description, created_at, admin_id FROM department WHERE id = ?1",
        )
        .bind(id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| CivicError::NotFound(format!("Department {} not found", id)))
    }

    /// Members of a department, by username
    pub async fn members(&self, department_id: i64) -> CivicResult<Vec<User>> {
        let users = sqlx::query_as::<_, User>(
            r#"
            SELECT a.*
            FROM account a
            JOIN department_member m ON m.user_id = a.id
            WHERE m.department_id = ?1
            ORDER BY a.username ASC
            "#,
        )
        .bind(department_id)
        .fetch_all(&self.db)
        .await?;

        Ok(users)
    }

    /// Add a user to a department; adding an existing member is a no-op
    pub async fn add_member(&self, department_id: i64, user_id: i64) -> CivicResult<()> {
        self.get(department_id).await?;
        self.ensure_user(user_id).await?;

        sqlx::query(
            "INSERT OR IGNORE INTO department_member (department_id, user_id) VALUES (?1, ?2)",
        )
        .bind(department_id)
        .bind(user_id)
        .execute(&self.db)
        .await?;

        Ok(())
    }

    /// Remove a user from a department
    pub async fn remove_member(&self, department_id: i64, user_id: i64) -> CivicResult<()> {
        self.get(department_id).await?;

        let result = sqlx::query(
            "DELETE FROM department_member WHERE department_id = ?1 AND user_id = ?2",
        )
        .bind(department_id)
        .bind(user_id)
        .execute(&self.db)
        .await?;

        if result.rows_affected() == 0 {
            return Err(CivicError::NotFound(format!(
                "User {} is not a member of department {}",
                user_id, department_id
            )));
        }

        Ok(())
    }

    /// Make a user the department admin, replacing any previous admin
    pub async fn assign_admin(&self, department_id: i64, user_id: i64) -> CivicResult<User> {
        self.get(department_id).await?;
        let user = self.ensure_user(user_id).await?;

        sqlx::query("UPDATE department SET admin_id = ?1 WHERE id = ?2")
            .bind(user_id)
            .bind(department_id)
            .execute(&self.db)
            .await
            .map_err(|e| {
                CivicError::conflict_on_unique(e, "User already administers another department.")
            })?;

        Ok(user)
    }

    /// Clear the department admin
    pub async fn remove_admin(&self, department_id: i64) -> CivicResult<()> {
        self.get(department_id).await?;

        sqlx::query("UPDATE department SET admin_id = NULL WHERE id = ?1")
            .bind(department_id)
            .execute(&self.db)
            .await?;

        Ok(())
    }

    /// Rename or re-describe a department
    pub async fn update(&self, department_id: i64, update: DepartmentUpdate) -> CivicResult<Department> {
        let current = self.get(department_id).await?;

        let name = match update.name {
            Some(name) => Self::clean_name(&name)?,
            None => current.name,
        };
        let description = match update.description {
            Some(d) if d.trim().is_empty() => None,
            Some(d) => Some(d.trim().to_string()),
            None => current.description,
        };

        sqlx::query("UPDATE department SET name = ?1, description = ?2 WHERE id = ?3")
            .bind(&name)
            .bind(&description)
            .bind(department_id)
            .execute(&self.db)
            .await
            .map_err(|e| CivicError::conflict_on_unique(e, "Department already exists."))?;

        self.get(department_id).await
    }

    /// Delete a department; its issues become unassigned
    pub async fn delete(&self, department_id: i64) -> CivicResult<()> {
        let result = sqlx::query("DELETE FROM department WHERE id = ?1")
            .bind(department_id)
            .execute(&self.db)
            .await?;

        if result.rows_affected() == 0 {
            return Err(CivicError::NotFound(format!(
                "Department {} not found",
                department_id
            )));
        }

        tracing::info!(department_id, "Department deleted");
        Ok(())
    }

    /// Ids of the departments a user is a member of
    pub async fn department_ids_for_user(&self, user_id: i64) -> CivicResult<Vec<i64>> {
        let ids = sqlx::query_scalar::<_, i64>(
            "SELECT department_id FROM department_member WHERE user_id = ?1 ORDER BY department_id",
        )
        .bind(user_id)
        .fetch_all(&self.db)
        .await?;

        Ok(ids)
    }

    /// Departments a user is a member of, by name
    pub async fn departments_for_user(&self, user_id: i64) -> CivicResult<Vec<Department>> {
        let departments = sqlx::query_as::<_, Department>(
            r#"
            SELECT d.id, d.name, d.description, d.created_at, d.admin_id
            FROM department d
            JOIN department_member m ON m.department_id = d.id
            WHERE m.user_id = ?1
            ORDER BY d.name ASC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.db)
        .await?;

        Ok(departments)
    }

    /// Number of departments
    pub async fn count(&self) -> CivicResult<i64> {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM department")
            .fetch_one(&self.db)
            .await?;

        Ok(count)
    }

    async fn ensure_user(&self, user_id: i64) -> CivicResult<User> {
        sqlx::query_as::<_, User>("SELECT * FROM account WHERE id = ?1")
            .bind(user_id)
            .fetch_optional(&self.db)
            .await?
            .ok_or_else(|| CivicError::NotFound(format!("User {} not found", user_id)))
    }

    fn clean_name(name: &str) -> CivicResult<String> {
        let name = name.trim();
        if name.is_empty() {
            return Err(CivicError::Validation("Department name is required".to_string()));
        }
        if name.chars().count() > 100 {
            return Err(CivicError::Validation("Department name too long".to_string()));
        }
        Ok(name.to_string())
    }
}
