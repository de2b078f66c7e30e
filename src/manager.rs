use crate::error::{Error, Result};
use crate::matcher::ResourcePattern;
use crate::model::{
    Action, GroupMembership, NewGroupMembership, NewPermission, NewRole, NewUser, Permission,
    Role, User,
};
use crate::recorder::{NoRecorder, Recorder};
use crate::repo::Repo;
use crate::types::{GroupName, PermissionId, ResourceName, RoleId, UserId};
use std::collections::{HashMap, HashSet};
use std::time::Instant;
use tracing::{debug, trace};

/// RBAC manager: CRUD passthroughs plus the authorization resolution
/// engine, over a pluggable repository.
#[derive(Debug)]
pub struct Manager<S, R = NoRecorder> {
    repo: S,
    recorder: R,
    default_role_name: Option<String>,
}

/// Builder for [`Manager`].
pub struct ManagerBuilder<S, R = NoRecorder> {
    repo: S,
    recorder: R,
    default_role_name: Option<String>,
}

impl<S> ManagerBuilder<S, NoRecorder> {
    /// Creates a new builder with default configuration.
    pub fn new(repo: S) -> Self {
        Self {
            repo,
            recorder: NoRecorder,
            default_role_name: None,
        }
    }
}

impl<S, R> ManagerBuilder<S, R> {
    /// Sets a role name every principal implicitly holds, used for
    /// baseline or guest permissions. Unset by default.
    pub fn default_role_name(mut self, name: impl Into<String>) -> Self {
        self.default_role_name = Some(name.into());
        self
    }

    /// Sets the operation recorder.
    pub fn recorder<R2: Recorder>(self, recorder: R2) -> ManagerBuilder<S, R2> {
        ManagerBuilder {
            repo: self.repo,
            recorder,
            default_role_name: self.default_role_name,
        }
    }

    /// Builds the manager.
    pub fn build(self) -> Manager<S, R> {
        Manager {
            repo: self.repo,
            recorder: self.recorder,
            default_role_name: self.default_role_name,
        }
    }
}

impl<S, R> Manager<S, R>
where
    S: Repo,
    R: Recorder,
{
    fn observe<T>(&self, method: &'static str, start: Instant, result: Result<T>) -> Result<T> {
        self.recorder.record(method, start.elapsed(), result.is_ok());
        result
    }

    /// Creates a permission after validating its resource pattern.
    ///
    /// Creation is idempotent on the (resource, action) pair: a duplicate
    /// returns the existing record.
    pub async fn create_permission(&self, permission: NewPermission) -> Result<Permission> {
        let start = Instant::now();
        let result = match ResourcePattern::parse(&permission.resource) {
            Ok(_) => self
                .repo
                .create_permission(permission)
                .await
                .map_err(Error::from),
            Err(err) => Err(err),
        };
        self.observe("create_permission", start, result)
    }

    /// Deletes a permission. Join entries referencing it are left behind
    /// and skipped during evaluation.
    pub async fn delete_permission(&self, id: PermissionId) -> Result<()> {
        let start = Instant::now();
        let result = self.repo.delete_permission(id).await.map_err(Error::from);
        self.observe("delete_permission", start, result)
    }

    /// Returns a permission by id.
    pub async fn permission(&self, id: PermissionId) -> Result<Permission> {
        let start = Instant::now();
        let result = self
            .repo
            .permission_by_id(id.clone())
            .await
            .map_err(Error::from)
            .and_then(|found| found.ok_or_else(|| Error::not_found("permission", id.as_str())));
        self.observe("get_permission", start, result)
    }

    /// Returns the permission for an exact (resource, action) pair.
    pub async fn permission_by_resource(
        &self,
        resource: impl Into<String>,
        action: Action,
    ) -> Result<Permission> {
        let start = Instant::now();
        let resource = resource.into();
        let result = self
            .repo
            .permission_by_resource(resource.clone(), action)
            .await
            .map_err(Error::from)
            .and_then(|found| {
                found.ok_or_else(|| {
                    Error::not_found("permission", format!("{resource}:{action}"))
                })
            });
        self.observe("get_permission_by_resource", start, result)
    }

    /// Creates a role. Duplicate names are a conflict.
    pub async fn create_role(&self, role: NewRole) -> Result<Role> {
        let start = Instant::now();
        let result = self.repo.create_role(role).await.map_err(Error::from);
        self.observe("create_role", start, result)
    }

    /// Deletes a role.
    pub async fn delete_role(&self, id: RoleId) -> Result<()> {
        let start = Instant::now();
        let result = self.repo.delete_role(id).await.map_err(Error::from);
        self.observe("delete_role", start, result)
    }

    /// Returns a role by id.
    pub async fn role(&self, id: RoleId) -> Result<Role> {
        let start = Instant::now();
        let result = self
            .repo
            .role_by_id(id.clone())
            .await
            .map_err(Error::from)
            .and_then(|found| found.ok_or_else(|| Error::not_found("role", id.as_str())));
        self.observe("get_role", start, result)
    }

    /// Returns a role by its unique name.
    pub async fn role_by_name(&self, name: impl Into<String>) -> Result<Role> {
        let start = Instant::now();
        let name = name.into();
        let result = self
            .repo
            .role_by_name(name.clone())
            .await
            .map_err(Error::from)
            .and_then(|found| found.ok_or_else(|| Error::not_found("role", name)));
        self.observe("get_role_by_name", start, result)
    }

    /// Returns every stored role.
    pub async fn roles(&self) -> Result<Vec<Role>> {
        let start = Instant::now();
        let result = self.repo.list_roles().await.map_err(Error::from);
        self.observe("list_roles", start, result)
    }

    /// Creates a user. Duplicate usernames or emails are a conflict.
    pub async fn create_user(&self, user: NewUser) -> Result<User> {
        let start = Instant::now();
        let result = self.repo.create_user(user).await.map_err(Error::from);
        self.observe("create_user", start, result)
    }

    /// Deletes a user.
    pub async fn delete_user(&self, id: UserId) -> Result<()> {
        let start = Instant::now();
        let result = self.repo.delete_user(id).await.map_err(Error::from);
        self.observe("delete_user", start, result)
    }

    /// Returns a user by id.
    pub async fn user(&self, id: UserId) -> Result<User> {
        let start = Instant::now();
        let result = self
            .repo
            .user_by_id(id.clone())
            .await
            .map_err(Error::from)
            .and_then(|found| found.ok_or_else(|| Error::not_found("user", id.as_str())));
        self.observe("get_user", start, result)
    }

    /// Returns the first user whose meta bag contains every filter pair.
    pub async fn user_by_meta(&self, filter: HashMap<String, String>) -> Result<User> {
        let start = Instant::now();
        let result = self
            .repo
            .user_by_meta(filter)
            .await
            .map_err(Error::from)
            .and_then(|found| found.ok_or_else(|| Error::not_found("user", "<meta filter>")));
        self.observe("get_user_by_meta", start, result)
    }

    /// Grants a permission to a role. Idempotent.
    pub async fn assign_permission_to_role(
        &self,
        role: RoleId,
        permission: PermissionId,
    ) -> Result<()> {
        let start = Instant::now();
        let result = self
            .repo
            .add_role_permission(role, permission)
            .await
            .map_err(Error::from);
        self.observe("assign_permission_to_role", start, result)
    }

    /// Revokes a permission from a role. No-op when absent.
    pub async fn remove_permission_from_role(
        &self,
        role: RoleId,
        permission: PermissionId,
    ) -> Result<()> {
        let start = Instant::now();
        let result = self
            .repo
            .remove_role_permission(role, permission)
            .await
            .map_err(Error::from);
        self.observe("remove_permission_from_role", start, result)
    }

    /// Lists the permission ids granted to a role.
    pub async fn permissions_for_role(&self, role: RoleId) -> Result<Vec<PermissionId>> {
        let start = Instant::now();
        let result = self
            .repo
            .role_permission_ids(role)
            .await
            .map_err(Error::from);
        self.observe("list_permissions_for_role", start, result)
    }

    /// Assigns a role directly to a user. Idempotent.
    pub async fn assign_role_to_user(&self, user: UserId, role: RoleId) -> Result<()> {
        let start = Instant::now();
        let result = self
            .repo
            .add_user_role(user, role)
            .await
            .map_err(Error::from);
        self.observe("assign_role_to_user", start, result)
    }

    /// Removes a direct role grant from a user. No-op when absent.
    pub async fn unassign_role_from_user(&self, user: UserId, role: RoleId) -> Result<()> {
        let start = Instant::now();
        let result = self
            .repo
            .remove_user_role(user, role)
            .await
            .map_err(Error::from);
        self.observe("unassign_role_from_user", start, result)
    }

    /// Lists the role ids directly assigned to a user.
    pub async fn roles_for_user(&self, user: UserId) -> Result<Vec<RoleId>> {
        let start = Instant::now();
        let result = self.repo.user_role_ids(user).await.map_err(Error::from);
        self.observe("list_roles_for_user", start, result)
    }

    /// Adds a user to a named group.
    pub async fn add_user_to_group(
        &self,
        membership: NewGroupMembership,
    ) -> Result<GroupMembership> {
        let start = Instant::now();
        let result = self
            .repo
            .add_group_member(membership)
            .await
            .map_err(Error::from);
        self.observe("add_user_to_group", start, result)
    }

    /// Removes a user from a group. No-op when absent.
    pub async fn remove_user_from_group(&self, group: GroupName, user: UserId) -> Result<()> {
        let start = Instant::now();
        let result = self
            .repo
            .remove_group_member(group, user)
            .await
            .map_err(Error::from);
        self.observe("remove_user_from_group", start, result)
    }

    /// Lists the group memberships held by a user.
    pub async fn groups_for_user(&self, user: UserId) -> Result<Vec<GroupMembership>> {
        let start = Instant::now();
        let result = self.repo.groups_for_user(user).await.map_err(Error::from);
        self.observe("list_groups_for_user", start, result)
    }

    /// Lists the memberships recorded under a group.
    pub async fn users_in_group(&self, group: GroupName) -> Result<Vec<GroupMembership>> {
        let start = Instant::now();
        let result = self.repo.users_in_group(group).await.map_err(Error::from);
        self.observe("list_users_in_group", start, result)
    }

    /// Grants a role to a group. Idempotent.
    pub async fn assign_role_to_group(&self, group: GroupName, role: RoleId) -> Result<()> {
        let start = Instant::now();
        let result = self
            .repo
            .add_group_role(group, role)
            .await
            .map_err(Error::from);
        self.observe("assign_role_to_group", start, result)
    }

    /// Revokes a role from a group. No-op when absent.
    pub async fn unassign_role_from_group(&self, group: GroupName, role: RoleId) -> Result<()> {
        let start = Instant::now();
        let result = self
            .repo
            .remove_group_role(group, role)
            .await
            .map_err(Error::from);
        self.observe("unassign_role_from_group", start, result)
    }

    /// Lists the role ids granted to a group.
    pub async fn roles_for_group(&self, group: GroupName) -> Result<Vec<RoleId>> {
        let start = Instant::now();
        let result = self.repo.group_role_ids(group).await.map_err(Error::from);
        self.observe("list_roles_for_group", start, result)
    }

    /// Decides whether a user may perform `action` on `resource`.
    ///
    /// The effective role set is the user's direct roles, roles granted
    /// via group membership, and the configured default role. The first
    /// permission whose resource pattern and action both cover the
    /// request grants access. Lookup failures and malformed stored
    /// patterns propagate as errors; they are never collapsed into a
    /// deny decision.
    pub async fn can(&self, user: UserId, resource: ResourceName, action: Action) -> Result<bool> {
        let start = Instant::now();
        let result = self.resolve(&user, &resource, action).await;
        if let Ok(allowed) = &result {
            debug!(
                user = %user,
                resource = %resource,
                action = %action,
                allowed = *allowed,
                "authorization decision"
            );
        }
        self.observe("can", start, result)
    }

    /// Checks whether any of the user's direct or group-derived roles
    /// grants exactly `permission`. Identity comparison, no pattern
    /// matching, no default role.
    pub async fn has_permission(&self, user: UserId, permission: PermissionId) -> Result<bool> {
        let start = Instant::now();
        let result = self.holds(&user, &permission).await;
        self.observe("has_permission", start, result)
    }

    async fn resolve(&self, user: &UserId, resource: &ResourceName, action: Action) -> Result<bool> {
        let mut roles = self.direct_and_group_roles(user).await?;

        if let Some(name) = &self.default_role_name {
            match self
                .repo
                .role_by_name(name.clone())
                .await
                .map_err(Error::from)?
            {
                Some(role) => roles.push(role.id),
                None => trace!(role = %name, "default role not found, skipping"),
            }
        }

        let mut seen = HashSet::new();
        for role in roles {
            if !seen.insert(role.clone()) {
                continue;
            }
            let permission_ids = self
                .repo
                .role_permission_ids(role.clone())
                .await
                .map_err(Error::from)?;
            for id in permission_ids {
                let Some(permission) = self
                    .repo
                    .permission_by_id(id.clone())
                    .await
                    .map_err(Error::from)?
                else {
                    trace!(permission = %id, role = %role, "skipping dangling permission reference");
                    continue;
                };
                let pattern = ResourcePattern::parse(&permission.resource)?;
                if pattern.matches(resource.as_str()) && permission.action.covers(action) {
                    return Ok(true);
                }
            }
        }

        Ok(false)
    }

    async fn holds(&self, user: &UserId, permission: &PermissionId) -> Result<bool> {
        let roles = self.direct_and_group_roles(user).await?;
        let mut seen = HashSet::new();
        for role in roles {
            if !seen.insert(role.clone()) {
                continue;
            }
            let granted = self
                .repo
                .role_permission_ids(role)
                .await
                .map_err(Error::from)?;
            if granted.contains(permission) {
                return Ok(true);
            }
        }
        Ok(false)
    }

    async fn direct_and_group_roles(&self, user: &UserId) -> Result<Vec<RoleId>> {
        let mut roles = self
            .repo
            .user_role_ids(user.clone())
            .await
            .map_err(Error::from)?;
        let memberships = self
            .repo
            .groups_for_user(user.clone())
            .await
            .map_err(Error::from)?;
        for membership in memberships {
            let group_roles = self
                .repo
                .group_role_ids(membership.group_name)
                .await
                .map_err(Error::from)?;
            roles.extend(group_roles);
        }
        Ok(roles)
    }
}
