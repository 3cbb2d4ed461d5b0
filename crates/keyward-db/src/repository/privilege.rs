//! SurrealDB implementation of [`PrivilegeRepository`].

use chrono::{DateTime, Utc};
use keyward_core::error::KeywardResult;
use keyward_core::models::group::Group;
use keyward_core::models::privilege::{CreatePrivilege, Privilege, UpdatePrivilege};
use keyward_core::repository::{PaginatedResult, Pagination, PrivilegeRepository};
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use tracing::info;
use uuid::Uuid;

use super::group::GroupRowWithId;
use super::{CountRow, parse_uuid};
use crate::error::DbError;

#[derive(Debug, SurrealValue)]
struct PrivilegeRow {
    name: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl PrivilegeRow {
    fn into_privilege(self, id: Uuid) -> Privilege {
        Privilege {
            id,
            name: self.name,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

#[derive(Debug, SurrealValue)]
pub(super) struct PrivilegeRowWithId {
    record_id: String,
    name: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl PrivilegeRowWithId {
    pub(super) fn try_into_privilege(self) -> Result<Privilege, DbError> {
        Ok(Privilege {
            id: parse_uuid(&self.record_id, "privilege")?,
            name: self.name,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

/// SurrealDB implementation of the Privilege repository.
#[derive(Clone)]
pub struct SurrealPrivilegeRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealPrivilegeRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }
}

impl<C: Connection> PrivilegeRepository for SurrealPrivilegeRepository<C> {
    async fn create(&self, input: CreatePrivilege) -> KeywardResult<Privilege> {
        input.validate()?;

        let id = Uuid::new_v4();
        let id_str = id.to_string();

        let result = self
            .db
            .query("CREATE type::record('privilege', $id) SET name = $name")
            .bind(("id", id_str.clone()))
            .bind(("name", input.name))
            .await
            .map_err(DbError::from)?;

        let mut result = result
            .check()
            .map_err(|e| DbError::from_statement(e, "privilege"))?;

        let rows: Vec<PrivilegeRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "privilege".into(),
            id: id_str,
        })?;

        Ok(row.into_privilege(id))
    }

    async fn get_by_id(&self, id: Uuid) -> KeywardResult<Privilege> {
        let id_str = id.to_string();

        let mut result = self
            .db
            .query("SELECT * FROM type::record('privilege', $id)")
            .bind(("id", id_str.clone()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<PrivilegeRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "privilege".into(),
            id: id_str,
        })?;

        Ok(row.into_privilege(id))
    }

    async fn get_by_name(&self, name: &str) -> KeywardResult<Privilege> {
        let mut result = self
            .db
            .query("SELECT meta::id(id) AS record_id, * FROM privilege WHERE name = $name")
            .bind(("name", name.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<PrivilegeRowWithId> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "privilege".into(),
            id: format!("name={name}"),
        })?;

        Ok(row.try_into_privilege()?)
    }

    async fn update(&self, id: Uuid, input: UpdatePrivilege) -> KeywardResult<Privilege> {
        input.validate()?;

        let id_str = id.to_string();

        let mut sets = Vec::new();
        if input.name.is_some() {
            sets.push("name = $name");
        }
        sets.push("updated_at = time::now()");

        let query = format!(
            "UPDATE type::record('privilege', $id) SET {}",
            sets.join(", ")
        );

        let mut builder = self.db.query(&query).bind(("id", id_str.clone()));
        if let Some(name) = input.name {
            builder = builder.bind(("name", name));
        }

        let result = builder.await.map_err(DbError::from)?;
        let mut result = result
            .check()
            .map_err(|e| DbError::from_statement(e, "privilege"))?;

        let rows: Vec<PrivilegeRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "privilege".into(),
            id: id_str,
        })?;

        Ok(row.into_privilege(id))
    }

    async fn delete(&self, id: Uuid) -> KeywardResult<()> {
        self.db
            .query(
                "DELETE group_privilege WHERE out = type::record('privilege', $id); \
                 DELETE type::record('privilege', $id);",
            )
            .bind(("id", id.to_string()))
            .await
            .map_err(DbError::from)?
            .check()
            .map_err(|e| DbError::from_statement(e, "privilege"))?;

        info!(privilege_id = %id, "Privilege deleted");
        Ok(())
    }

    async fn list(&self, pagination: Pagination) -> KeywardResult<PaginatedResult<Privilege>> {
        let mut count_result = self
            .db
            .query("SELECT count() AS total FROM privilege GROUP ALL")
            .await
            .map_err(DbError::from)?;
        let count_rows: Vec<CountRow> = count_result.take(0).map_err(DbError::from)?;
        let total = count_rows.first().map(|r| r.total).unwrap_or(0);

        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM privilege \
                 ORDER BY name ASC \
                 LIMIT $limit START $offset",
            )
            .bind(("limit", pagination.limit))
            .bind(("offset", pagination.offset))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<PrivilegeRowWithId> = result.take(0).map_err(DbError::from)?;

        let items = rows
            .into_iter()
            .map(|row| row.try_into_privilege())
            .collect::<Result<Vec<_>, DbError>>()?;

        Ok(PaginatedResult {
            items,
            total,
            offset: pagination.offset,
            limit: pagination.limit,
        })
    }

    async fn get_groups(&self, privilege_id: Uuid) -> KeywardResult<Vec<Group>> {
        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM group \
                 WHERE id IN (\
                     SELECT VALUE in FROM group_privilege \
                     WHERE out = type::record('privilege', $privilege_id)\
                 ) \
                 ORDER BY name ASC",
            )
            .bind(("privilege_id", privilege_id.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<GroupRowWithId> = result.take(0).map_err(DbError::from)?;

        let groups = rows
            .into_iter()
            .map(|row| row.try_into_group())
            .collect::<Result<Vec<_>, DbError>>()?;

        Ok(groups)
    }
}
