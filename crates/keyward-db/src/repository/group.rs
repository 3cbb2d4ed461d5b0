//! SurrealDB implementation of [`GroupRepository`].

use chrono::{DateTime, Utc};
use keyward_core::error::KeywardResult;
use keyward_core::models::group::{CreateGroup, Group, UpdateGroup};
use keyward_core::models::privilege::Privilege;
use keyward_core::models::user::User;
use keyward_core::repository::{GroupRepository, PaginatedResult, Pagination};
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use tracing::info;
use uuid::Uuid;

use super::privilege::PrivilegeRowWithId;
use super::user::UserRowWithId;
use super::{CountRow, parse_uuid};
use crate::error::DbError;

/// DB-side row struct for queries where the UUID is already known.
#[derive(Debug, SurrealValue)]
struct GroupRow {
    name: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl GroupRow {
    fn into_group(self, id: Uuid) -> Group {
        Group {
            id,
            name: self.name,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

/// DB-side row struct that includes the record ID via `meta::id(id)`.
#[derive(Debug, SurrealValue)]
pub(super) struct GroupRowWithId {
    record_id: String,
    name: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl GroupRowWithId {
    pub(super) fn try_into_group(self) -> Result<Group, DbError> {
        Ok(Group {
            id: parse_uuid(&self.record_id, "group")?,
            name: self.name,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

/// SurrealDB implementation of the Group repository.
#[derive(Clone)]
pub struct SurrealGroupRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealGroupRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }

    async fn count(&self, table: &str, id: &str) -> Result<u64, DbError> {
        let mut result = self
            .db
            .query(
                "SELECT count() AS total FROM type::table($table) \
                 WHERE id = type::record($table, $id) GROUP ALL",
            )
            .bind(("table", table.to_string()))
            .bind(("id", id.to_string()))
            .await?;
        let rows: Vec<CountRow> = result.take(0)?;
        Ok(rows.first().map(|r| r.total).unwrap_or(0))
    }
}

impl<C: Connection> GroupRepository for SurrealGroupRepository<C> {
    async fn create(&self, input: CreateGroup) -> KeywardResult<Group> {
        input.validate()?;

        let id = Uuid::new_v4();
        let id_str = id.to_string();

        let result = self
            .db
            .query("CREATE type::record('group', $id) SET name = $name")
            .bind(("id", id_str.clone()))
            .bind(("name", input.name))
            .await
            .map_err(DbError::from)?;

        let mut result = result
            .check()
            .map_err(|e| DbError::from_statement(e, "group"))?;

        let rows: Vec<GroupRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "group".into(),
            id: id_str,
        })?;

        Ok(row.into_group(id))
    }

    async fn get_by_id(&self, id: Uuid) -> KeywardResult<Group> {
        let id_str = id.to_string();

        let mut result = self
            .db
            .query("SELECT * FROM type::record('group', $id)")
            .bind(("id", id_str.clone()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<GroupRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "group".into(),
            id: id_str,
        })?;

        Ok(row.into_group(id))
    }

    async fn update(&self, id: Uuid, input: UpdateGroup) -> KeywardResult<Group> {
        input.validate()?;

        let id_str = id.to_string();

        let mut sets = Vec::new();
        if input.name.is_some() {
            sets.push("name = $name");
        }
        sets.push("updated_at = time::now()");

        // UPDATE never creates; an unknown id comes back with no rows.
        let query = format!(
            "UPDATE type::record('group', $id) SET {}",
            sets.join(", ")
        );

        let mut builder = self.db.query(&query).bind(("id", id_str.clone()));
        if let Some(name) = input.name {
            builder = builder.bind(("name", name));
        }

        let result = builder.await.map_err(DbError::from)?;
        let mut result = result
            .check()
            .map_err(|e| DbError::from_statement(e, "group"))?;

        let rows: Vec<GroupRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "group".into(),
            id: id_str,
        })?;

        Ok(row.into_group(id))
    }

    async fn delete(&self, id: Uuid) -> KeywardResult<()> {
        // Privilege links go with the group; member users keep their
        // (now dangling) group_id and simply resolve to no group.
        self.db
            .query(
                "DELETE group_privilege WHERE in = type::record('group', $id); \
                 DELETE type::record('group', $id);",
            )
            .bind(("id", id.to_string()))
            .await
            .map_err(DbError::from)?
            .check()
            .map_err(|e| DbError::from_statement(e, "group"))?;

        info!(group_id = %id, "Group deleted");
        Ok(())
    }

    async fn list(&self, pagination: Pagination) -> KeywardResult<PaginatedResult<Group>> {
        let mut count_result = self
            .db
            .query("SELECT count() AS total FROM group GROUP ALL")
            .await
            .map_err(DbError::from)?;
        let count_rows: Vec<CountRow> = count_result.take(0).map_err(DbError::from)?;
        let total = count_rows.first().map(|r| r.total).unwrap_or(0);

        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM group \
                 ORDER BY created_at ASC \
                 LIMIT $limit START $offset",
            )
            .bind(("limit", pagination.limit))
            .bind(("offset", pagination.offset))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<GroupRowWithId> = result.take(0).map_err(DbError::from)?;

        let items = rows
            .into_iter()
            .map(|row| row.try_into_group())
            .collect::<Result<Vec<_>, DbError>>()?;

        Ok(PaginatedResult {
            items,
            total,
            offset: pagination.offset,
            limit: pagination.limit,
        })
    }

    async fn grant_privilege(&self, group_id: Uuid, privilege_id: Uuid) -> KeywardResult<()> {
        let group_id_str = group_id.to_string();
        let privilege_id_str = privilege_id.to_string();

        if self.count("group", &group_id_str).await? == 0 {
            return Err(DbError::NotFound {
                entity: "group".into(),
                id: group_id_str,
            }
            .into());
        }
        if self.count("privilege", &privilege_id_str).await? == 0 {
            return Err(DbError::NotFound {
                entity: "privilege".into(),
                id: privilege_id_str,
            }
            .into());
        }

        let mut existing = self
            .db
            .query(
                "SELECT count() AS total FROM group_privilege \
                 WHERE in = type::record('group', $group_id) \
                 AND out = type::record('privilege', $privilege_id) GROUP ALL",
            )
            .bind(("group_id", group_id_str.clone()))
            .bind(("privilege_id", privilege_id_str.clone()))
            .await
            .map_err(DbError::from)?;
        let existing: Vec<CountRow> = existing.take(0).map_err(DbError::from)?;
        if existing.first().map(|r| r.total).unwrap_or(0) > 0 {
            return Ok(());
        }

        let query = format!(
            "RELATE group:`{group_id_str}` -> group_privilege -> privilege:`{privilege_id_str}`;"
        );
        self.db
            .query(query)
            .await
            .map_err(DbError::from)?
            .check()
            .map_err(|e| DbError::from_statement(e, "group_privilege"))?;

        Ok(())
    }

    async fn revoke_privilege(&self, group_id: Uuid, privilege_id: Uuid) -> KeywardResult<()> {
        self.db
            .query(
                "DELETE group_privilege WHERE \
                 in = type::record('group', $group_id) AND \
                 out = type::record('privilege', $privilege_id)",
            )
            .bind(("group_id", group_id.to_string()))
            .bind(("privilege_id", privilege_id.to_string()))
            .await
            .map_err(DbError::from)?;

        Ok(())
    }

    async fn get_privileges(&self, group_id: Uuid) -> KeywardResult<Vec<Privilege>> {
        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM privilege \
                 WHERE id IN (\
                     SELECT VALUE out FROM group_privilege \
                     WHERE in = type::record('group', $group_id)\
                 ) \
                 ORDER BY name ASC",
            )
            .bind(("group_id", group_id.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<PrivilegeRowWithId> = result.take(0).map_err(DbError::from)?;

        let privileges = rows
            .into_iter()
            .map(|row| row.try_into_privilege())
            .collect::<Result<Vec<_>, DbError>>()?;

        Ok(privileges)
    }

    async fn get_members(
        &self,
        group_id: Uuid,
        pagination: Pagination,
    ) -> KeywardResult<PaginatedResult<User>> {
        let group_id_str = group_id.to_string();

        let mut count_result = self
            .db
            .query(
                "SELECT count() AS total FROM user \
                 WHERE group_id = $group_id GROUP ALL",
            )
            .bind(("group_id", group_id_str.clone()))
            .await
            .map_err(DbError::from)?;
        let count_rows: Vec<CountRow> = count_result.take(0).map_err(DbError::from)?;
        let total = count_rows.first().map(|r| r.total).unwrap_or(0);

        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM user \
                 WHERE group_id = $group_id \
                 ORDER BY created_at ASC \
                 LIMIT $limit START $offset",
            )
            .bind(("group_id", group_id_str))
            .bind(("limit", pagination.limit))
            .bind(("offset", pagination.offset))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<UserRowWithId> = result.take(0).map_err(DbError::from)?;

        let items = rows
            .into_iter()
            .map(|row| row.try_into_user())
            .collect::<Result<Vec<_>, DbError>>()?;

        Ok(PaginatedResult {
            items,
            total,
            offset: pagination.offset,
            limit: pagination.limit,
        })
    }
}
