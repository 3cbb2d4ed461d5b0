//! Repository trait definitions for data access abstraction.
//!
//! All repository operations are async. Implementations live in the
//! storage crate; the auth layer only depends on these traits.

use uuid::Uuid;

use crate::error::KeywardResult;
use crate::models::{
    group::{CreateGroup, Group, UpdateGroup},
    principal::Principal,
    privilege::{CreatePrivilege, Privilege, UpdatePrivilege},
    user::{User, UserFilter},
};

/// Pagination parameters for list queries.
#[derive(Debug, Clone)]
pub struct Pagination {
    pub offset: u64,
    pub limit: u64,
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            offset: 0,
            limit: 50,
        }
    }
}

/// A paginated result set.
#[derive(Debug, Clone)]
pub struct PaginatedResult<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub offset: u64,
    pub limit: u64,
}

// ---------------------------------------------------------------------------
// Users
// ---------------------------------------------------------------------------

pub trait UserRepository: Send + Sync {
    /// Find the single user matching every populated field of `filter`,
    /// with its group and the group's privileges loaded in the same
    /// round trip.
    ///
    /// Returns `Ok(None)` when nothing matches and
    /// `KeywardError::AmbiguousCriteria` when more than one record does.
    fn find_one(
        &self,
        filter: &UserFilter,
    ) -> impl Future<Output = KeywardResult<Option<Principal>>> + Send;

    fn get_by_id(&self, id: Uuid) -> impl Future<Output = KeywardResult<User>> + Send;

    /// Whether a user other than `except` already holds `username`.
    fn username_taken(
        &self,
        username: &str,
        except: Option<Uuid>,
    ) -> impl Future<Output = KeywardResult<bool>> + Send;

    /// Insert or update `user` by id. Callers validate first; the store
    /// still rejects duplicate usernames through its unique index.
    fn save(&self, user: &User) -> impl Future<Output = KeywardResult<User>> + Send;

    fn delete(&self, id: Uuid) -> impl Future<Output = KeywardResult<()>> + Send;

    fn list(
        &self,
        pagination: Pagination,
    ) -> impl Future<Output = KeywardResult<PaginatedResult<User>>> + Send;
}

// ---------------------------------------------------------------------------
// Groups
// ---------------------------------------------------------------------------

pub trait GroupRepository: Send + Sync {
    fn create(&self, input: CreateGroup) -> impl Future<Output = KeywardResult<Group>> + Send;
    fn get_by_id(&self, id: Uuid) -> impl Future<Output = KeywardResult<Group>> + Send;
    fn update(
        &self,
        id: Uuid,
        input: UpdateGroup,
    ) -> impl Future<Output = KeywardResult<Group>> + Send;
    /// Deletes the group and its privilege links. Member users and the
    /// privileges themselves are left in place.
    fn delete(&self, id: Uuid) -> impl Future<Output = KeywardResult<()>> + Send;
    fn list(
        &self,
        pagination: Pagination,
    ) -> impl Future<Output = KeywardResult<PaginatedResult<Group>>> + Send;

    /// Link a privilege to a group. Linking an existing pair is a no-op.
    fn grant_privilege(
        &self,
        group_id: Uuid,
        privilege_id: Uuid,
    ) -> impl Future<Output = KeywardResult<()>> + Send;

    fn revoke_privilege(
        &self,
        group_id: Uuid,
        privilege_id: Uuid,
    ) -> impl Future<Output = KeywardResult<()>> + Send;

    fn get_privileges(
        &self,
        group_id: Uuid,
    ) -> impl Future<Output = KeywardResult<Vec<Privilege>>> + Send;

    /// Users whose `group_id` points at this group.
    fn get_members(
        &self,
        group_id: Uuid,
        pagination: Pagination,
    ) -> impl Future<Output = KeywardResult<PaginatedResult<User>>> + Send;
}

// ---------------------------------------------------------------------------
// Privileges
// ---------------------------------------------------------------------------

pub trait PrivilegeRepository: Send + Sync {
    fn create(
        &self,
        input: CreatePrivilege,
    ) -> impl Future<Output = KeywardResult<Privilege>> + Send;
    fn get_by_id(&self, id: Uuid) -> impl Future<Output = KeywardResult<Privilege>> + Send;
    fn get_by_name(&self, name: &str) -> impl Future<Output = KeywardResult<Privilege>> + Send;
    fn update(
        &self,
        id: Uuid,
        input: UpdatePrivilege,
    ) -> impl Future<Output = KeywardResult<Privilege>> + Send;
    /// Deletes the privilege and its group links.
    fn delete(&self, id: Uuid) -> impl Future<Output = KeywardResult<()>> + Send;
    fn list(
        &self,
        pagination: Pagination,
    ) -> impl Future<Output = KeywardResult<PaginatedResult<Privilege>>> + Send;

    /// Groups holding this privilege.
    fn get_groups(
        &self,
        privilege_id: Uuid,
    ) -> impl Future<Output = KeywardResult<Vec<Group>>> + Send;
}
