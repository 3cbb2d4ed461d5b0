//! SurrealDB implementation of [`UserRepository`].
//!
//! Users reference their group through a plain `group_id` field. A
//! principal lookup fetches the user, its group and the group's
//! privileges with a single multi-statement query.

use chrono::{DateTime, Utc};
use keyward_core::error::{KeywardError, KeywardResult};
use keyward_core::models::principal::{GroupWithPrivileges, Principal};
use keyward_core::models::user::{User, UserFilter};
use keyward_core::repository::{PaginatedResult, Pagination, UserRepository};
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use tracing::warn;
use uuid::Uuid;

use super::group::GroupRowWithId;
use super::privilege::PrivilegeRowWithId;
use super::{CountRow, parse_uuid};
use crate::error::DbError;

/// DB-side row struct for queries where the UUID is already known.
#[derive(Debug, SurrealValue)]
struct UserRow {
    username: String,
    password_hash: Option<String>,
    salt: Option<String>,
    group_id: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

/// DB-side row struct that includes the record ID via `meta::id(id)`.
#[derive(Debug, SurrealValue)]
pub(super) struct UserRowWithId {
    record_id: String,
    username: String,
    password_hash: Option<String>,
    salt: Option<String>,
    group_id: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

fn parse_group_id(raw: Option<String>) -> Result<Option<Uuid>, DbError> {
    raw.as_deref()
        .map(|gid| parse_uuid(gid, "group"))
        .transpose()
}

impl UserRow {
    fn into_user(self, id: Uuid) -> Result<User, DbError> {
        Ok(User {
            id,
            username: self.username,
            password_hash: self.password_hash,
            salt: self.salt,
            group_id: parse_group_id(self.group_id)?,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

impl UserRowWithId {
    pub(super) fn try_into_user(self) -> Result<User, DbError> {
        Ok(User {
            id: parse_uuid(&self.record_id, "user")?,
            username: self.username,
            password_hash: self.password_hash,
            salt: self.salt,
            group_id: parse_group_id(self.group_id)?,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

/// WHERE clause for `filter`, with the bindings it references.
fn filter_clause(filter: &UserFilter) -> (String, Vec<(&'static str, String)>) {
    let mut conditions = Vec::new();
    let mut bindings = Vec::new();

    if let Some(id) = filter.id {
        conditions.push("id = type::record('user', $id)");
        bindings.push(("id", id.to_string()));
    }
    if let Some(username) = &filter.username {
        conditions.push("username = $username");
        bindings.push(("username", username.clone()));
    }
    if let Some(group_id) = filter.group_id {
        conditions.push("group_id = $group_id");
        bindings.push(("group_id", group_id.to_string()));
    }

    let clause = if conditions.is_empty() {
        String::new()
    } else {
        format!("WHERE {}", conditions.join(" AND "))
    };
    (clause, bindings)
}

/// SurrealDB implementation of the User repository.
#[derive(Clone)]
pub struct SurrealUserRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealUserRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }
}

impl<C: Connection> UserRepository for SurrealUserRepository<C> {
    async fn find_one(&self, filter: &UserFilter) -> KeywardResult<Option<Principal>> {
        let (clause, bindings) = filter_clause(filter);

        // 0: matching users, 1: their groups, 2: those groups' privileges.
        let query = format!(
            "SELECT meta::id(id) AS record_id, * FROM user {clause}; \
             SELECT meta::id(id) AS record_id, * FROM group \
             WHERE meta::id(id) IN (SELECT VALUE group_id FROM user {clause}); \
             SELECT meta::id(id) AS record_id, * FROM privilege \
             WHERE id IN (\
                 SELECT VALUE out FROM group_privilege \
                 WHERE meta::id(in) IN (SELECT VALUE group_id FROM user {clause})\
             ) \
             ORDER BY name ASC;"
        );

        let mut builder = self.db.query(query);
        for binding in bindings {
            builder = builder.bind(binding);
        }

        let mut result = builder.await.map_err(DbError::from)?;

        let users: Vec<UserRowWithId> = result.take(0).map_err(DbError::from)?;
        if users.len() > 1 {
            warn!(matches = users.len(), ?filter, "user criteria are not unique");
            return Err(KeywardError::AmbiguousCriteria {
                entity: "user".into(),
                matches: users.len(),
            });
        }
        let Some(row) = users.into_iter().next() else {
            return Ok(None);
        };
        let user = row.try_into_user()?;

        let groups: Vec<GroupRowWithId> = result.take(1).map_err(DbError::from)?;
        let privileges: Vec<PrivilegeRowWithId> = result.take(2).map_err(DbError::from)?;

        let group = match groups.into_iter().next() {
            Some(row) => Some(GroupWithPrivileges {
                group: row.try_into_group()?,
                privileges: privileges
                    .into_iter()
                    .map(|row| row.try_into_privilege())
                    .collect::<Result<Vec<_>, DbError>>()?,
            }),
            None => None,
        };

        Ok(Some(Principal::new(user, group)))
    }

    async fn get_by_id(&self, id: Uuid) -> KeywardResult<User> {
        let id_str = id.to_string();

        let mut result = self
            .db
            .query("SELECT * FROM type::record('user', $id)")
            .bind(("id", id_str.clone()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<UserRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "user".into(),
            id: id_str,
        })?;

        Ok(row.into_user(id)?)
    }

    async fn username_taken(&self, username: &str, except: Option<Uuid>) -> KeywardResult<bool> {
        let query = if except.is_some() {
            "SELECT count() AS total FROM user \
             WHERE username = $username AND id != type::record('user', $except) \
             GROUP ALL"
        } else {
            "SELECT count() AS total FROM user WHERE username = $username GROUP ALL"
        };

        let mut builder = self
            .db
            .query(query)
            .bind(("username", username.to_string()));
        if let Some(except) = except {
            builder = builder.bind(("except", except.to_string()));
        }

        let mut result = builder.await.map_err(DbError::from)?;
        let rows: Vec<CountRow> = result.take(0).map_err(DbError::from)?;
        Ok(rows.first().map(|r| r.total).unwrap_or(0) > 0)
    }

    async fn save(&self, user: &User) -> KeywardResult<User> {
        let id_str = user.id.to_string();

        let result = self
            .db
            .query(
                "UPSERT type::record('user', $id) SET \
                 username = $username, \
                 password_hash = $password_hash, \
                 salt = $salt, \
                 group_id = $group_id, \
                 updated_at = time::now()",
            )
            .bind(("id", id_str.clone()))
            .bind(("username", user.username.clone()))
            .bind(("password_hash", user.password_hash.clone()))
            .bind(("salt", user.salt.clone()))
            .bind(("group_id", user.group_id.map(|gid| gid.to_string())))
            .await
            .map_err(DbError::from)?;

        let mut result = result
            .check()
            .map_err(|e| DbError::from_statement(e, "user"))?;

        let rows: Vec<UserRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "user".into(),
            id: id_str,
        })?;

        Ok(row.into_user(user.id)?)
    }

    async fn delete(&self, id: Uuid) -> KeywardResult<()> {
        self.db
            .query("DELETE type::record('user', $id)")
            .bind(("id", id.to_string()))
            .await
            .map_err(DbError::from)?;

        Ok(())
    }

    async fn list(&self, pagination: Pagination) -> KeywardResult<PaginatedResult<User>> {
        let mut count_result = self
            .db
            .query("SELECT count() AS total FROM user GROUP ALL")
            .await
            .map_err(DbError::from)?;
        let count_rows: Vec<CountRow> = count_result.take(0).map_err(DbError::from)?;
        let total = count_rows.first().map(|r| r.total).unwrap_or(0);

        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM user \
                 ORDER BY created_at ASC \
                 LIMIT $limit START $offset",
            )
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_filter_has_no_where_clause() {
        let (clause, bindings) = filter_clause(&UserFilter::default());
        assert!(clause.is_empty());
        assert!(bindings.is_empty());
    }

    #[test]
    fn every_populated_field_is_a_condition() {
        let group = Uuid::new_v4();
        let (clause, bindings) = filter_clause(&UserFilter::by_username("alice").and_group(group));
        assert_eq!(clause, "WHERE username = $username AND group_id = $group_id");
        assert_eq!(
            bindings,
            vec![("username", "alice".to_string()), ("group_id", group.to_string())]
        );
    }
}
