use crate::error::StoreError;
use crate::model::{
    Action, GroupMembership, NewGroupMembership, NewPermission, NewRole, NewUser, Permission,
    Role, User,
};
use crate::types::{GroupName, PermissionId, RoleId, UserId};
use async_trait::async_trait;
use std::collections::HashMap;

/// Store interface for permission records.
///
/// Lookups return `Ok(None)` for absent records; only backend failures
/// are errors.
#[async_trait]
pub trait PermissionRepo {
    /// Creates a permission, or returns the existing record when the
    /// (resource, action) pair already exists.
    async fn create_permission(
        &self,
        permission: NewPermission,
    ) -> std::result::Result<Permission, StoreError>;

    /// Deletes a permission by id. Membership relations referencing it
    /// are not cleaned up.
    async fn delete_permission(&self, id: PermissionId) -> std::result::Result<(), StoreError>;

    /// Returns a permission by id, or `None` when absent.
    async fn permission_by_id(
        &self,
        id: PermissionId,
    ) -> std::result::Result<Option<Permission>, StoreError>;

    /// Returns the permission for an exact (resource, action) pair.
    async fn permission_by_resource(
        &self,
        resource: String,
        action: Action,
    ) -> std::result::Result<Option<Permission>, StoreError>;
}

/// Store interface for role records.
#[async_trait]
pub trait RoleRepo {
    /// Creates a role. Duplicate names raise [`StoreError::Conflict`].
    async fn create_role(&self, role: NewRole) -> std::result::Result<Role, StoreError>;

    /// Deletes a role by id.
    async fn delete_role(&self, id: RoleId) -> std::result::Result<(), StoreError>;

    /// Returns a role by id, or `None` when absent.
    async fn role_by_id(&self, id: RoleId) -> std::result::Result<Option<Role>, StoreError>;

    /// Returns a role by its unique name, or `None` when absent.
    async fn role_by_name(&self, name: String) -> std::result::Result<Option<Role>, StoreError>;

    /// Returns every stored role.
    async fn list_roles(&self) -> std::result::Result<Vec<Role>, StoreError>;
}

/// Store interface for user records.
#[async_trait]
pub trait UserRepo {
    /// Creates a user. Duplicate usernames or emails raise
    /// [`StoreError::Conflict`].
    async fn create_user(&self, user: NewUser) -> std::result::Result<User, StoreError>;

    /// Deletes a user by id.
    async fn delete_user(&self, id: UserId) -> std::result::Result<(), StoreError>;

    /// Returns a user by id, or `None` when absent.
    async fn user_by_id(&self, id: UserId) -> std::result::Result<Option<User>, StoreError>;

    /// Returns the first user whose meta bag contains every filter pair.
    async fn user_by_meta(
        &self,
        filter: HashMap<String, String>,
    ) -> std::result::Result<Option<User>, StoreError>;
}

/// Join store for role→permission grants.
///
/// Adds are idempotent; removing an absent pair is a no-op.
#[async_trait]
pub trait RolePermissionRepo {
    async fn add_role_permission(
        &self,
        role: RoleId,
        permission: PermissionId,
    ) -> std::result::Result<(), StoreError>;

    async fn remove_role_permission(
        &self,
        role: RoleId,
        permission: PermissionId,
    ) -> std::result::Result<(), StoreError>;

    /// Returns the permission ids granted to a role.
    async fn role_permission_ids(
        &self,
        role: RoleId,
    ) -> std::result::Result<Vec<PermissionId>, StoreError>;
}

/// Join store for user→role direct grants.
#[async_trait]
pub trait UserRoleRepo {
    async fn add_user_role(
        &self,
        user: UserId,
        role: RoleId,
    ) -> std::result::Result<(), StoreError>;

    async fn remove_user_role(
        &self,
        user: UserId,
        role: RoleId,
    ) -> std::result::Result<(), StoreError>;

    /// Returns the role ids directly assigned to a user.
    async fn user_role_ids(&self, user: UserId) -> std::result::Result<Vec<RoleId>, StoreError>;
}

/// Join store for user→group memberships.
#[async_trait]
pub trait UserGroupRepo {
    /// Records a membership; the record id is assigned by the store.
    async fn add_group_member(
        &self,
        membership: NewGroupMembership,
    ) -> std::result::Result<GroupMembership, StoreError>;

    /// Removes a user's membership in a group; absent pairs are a no-op.
    async fn remove_group_member(
        &self,
        group: GroupName,
        user: UserId,
    ) -> std::result::Result<(), StoreError>;

    /// Returns the memberships held by a user.
    async fn groups_for_user(
        &self,
        user: UserId,
    ) -> std::result::Result<Vec<GroupMembership>, StoreError>;

    /// Returns the memberships recorded under a group.
    async fn users_in_group(
        &self,
        group: GroupName,
    ) -> std::result::Result<Vec<GroupMembership>, StoreError>;
}

/// Join store for group→role grants, keyed by group name.
#[async_trait]
pub trait GroupRoleRepo {
    async fn add_group_role(
        &self,
        group: GroupName,
        role: RoleId,
    ) -> std::result::Result<(), StoreError>;

    async fn remove_group_role(
        &self,
        group: GroupName,
        role: RoleId,
    ) -> std::result::Result<(), StoreError>;

    /// Returns the role ids granted to a group.
    async fn group_role_ids(&self, group: GroupName)
        -> std::result::Result<Vec<RoleId>, StoreError>;
}

/// Composite repository trait.
pub trait Repo:
    PermissionRepo
    + RoleRepo
    + UserRepo
    + RolePermissionRepo
    + UserRoleRepo
    + UserGroupRepo
    + GroupRoleRepo
    + Send
    + Sync
{
}

impl<T> Repo for T where
    T: PermissionRepo
        + RoleRepo
        + UserRepo
        + RolePermissionRepo
        + UserRoleRepo
        + UserGroupRepo
        + GroupRoleRepo
        + Send
        + Sync
{
}
