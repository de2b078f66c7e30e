use crate::error::StoreError;
use crate::model::{
    Action, GroupMembership, NewGroupMembership, NewPermission, NewRole, NewUser, Permission,
    Role, User,
};
use crate::repo::{
    GroupRoleRepo, PermissionRepo, RolePermissionRepo, RoleRepo, UserGroupRepo, UserRepo,
    UserRoleRepo,
};
use crate::types::{GroupName, MembershipId, PermissionId, RoleId, UserId};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, RwLock};
use std::time::{SystemTime, UNIX_EPOCH};
use uuid::Uuid;

/// In-memory repository implementation for tests and demos.
///
/// Enforces the same uniqueness rules a persistent adapter would enforce
/// with unique indexes: (resource, action) pairs are idempotent on
/// creation, role names and user usernames/emails conflict on duplicates.
#[derive(Debug, Default, Clone)]
pub struct MemoryRepo {
    inner: Arc<Inner>,
}

#[derive(Debug, Default)]
struct Inner {
    permissions: RwLock<HashMap<PermissionId, Permission>>,
    roles: RwLock<HashMap<RoleId, Role>>,
    users: RwLock<HashMap<UserId, User>>,
    role_permissions: RwLock<HashMap<RoleId, HashSet<PermissionId>>>,
    user_roles: RwLock<HashMap<UserId, HashSet<RoleId>>>,
    memberships: RwLock<HashMap<(GroupName, UserId), GroupMembership>>,
    group_roles: RwLock<HashMap<GroupName, HashSet<RoleId>>>,
}

fn new_id() -> String {
    Uuid::new_v4().simple().to_string()
}

fn now_unix() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_secs() as i64)
        .unwrap_or(0)
}

impl MemoryRepo {
    /// Creates an empty repository.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PermissionRepo for MemoryRepo {
    async fn create_permission(
        &self,
        permission: NewPermission,
    ) -> std::result::Result<Permission, StoreError> {
        let mut guard = self.inner.permissions.write().expect("poisoned lock");
        if let Some(existing) = guard
            .values()
            .find(|p| p.resource == permission.resource && p.action == permission.action)
        {
            return Ok(existing.clone());
        }
        let record = Permission {
            id: PermissionId::from_string(new_id()),
            resource: permission.resource,
            action: permission.action,
            created_at: now_unix(),
        };
        guard.insert(record.id.clone(), record.clone());
        Ok(record)
    }

    async fn delete_permission(&self, id: PermissionId) -> std::result::Result<(), StoreError> {
        let mut guard = self.inner.permissions.write().expect("poisoned lock");
        guard.remove(&id);
        Ok(())
    }

    async fn permission_by_id(
        &self,
        id: PermissionId,
    ) -> std::result::Result<Option<Permission>, StoreError> {
        let guard = self.inner.permissions.read().expect("poisoned lock");
        Ok(guard.get(&id).cloned())
    }

    async fn permission_by_resource(
        &self,
        resource: String,
        action: Action,
    ) -> std::result::Result<Option<Permission>, StoreError> {
        let guard = self.inner.permissions.read().expect("poisoned lock");
        Ok(guard
            .values()
            .find(|p| p.resource == resource && p.action == action)
            .cloned())
    }
}

#[async_trait]
impl RoleRepo for MemoryRepo {
    async fn create_role(&self, role: NewRole) -> std::result::Result<Role, StoreError> {
        let mut guard = self.inner.roles.write().expect("poisoned lock");
        if guard.values().any(|r| r.name == role.name) {
            return Err(StoreError::Conflict(format!(
                "role name already exists: {}",
                role.name
            )));
        }
        let record = Role {
            id: RoleId::from_string(new_id()),
            name: role.name,
            description: role.description,
            created_at: now_unix(),
        };
        guard.insert(record.id.clone(), record.clone());
        Ok(record)
    }

    async fn delete_role(&self, id: RoleId) -> std::result::Result<(), StoreError> {
        let mut guard = self.inner.roles.write().expect("poisoned lock");
        guard.remove(&id);
        Ok(())
    }

    async fn role_by_id(&self, id: RoleId) -> std::result::Result<Option<Role>, StoreError> {
        let guard = self.inner.roles.read().expect("poisoned lock");
        Ok(guard.get(&id).cloned())
    }

    async fn role_by_name(&self, name: String) -> std::result::Result<Option<Role>, StoreError> {
        let guard = self.inner.roles.read().expect("poisoned lock");
        Ok(guard.values().find(|r| r.name == name).cloned())
    }

    async fn list_roles(&self) -> std::result::Result<Vec<Role>, StoreError> {
        let guard = self.inner.roles.read().expect("poisoned lock");
        Ok(guard.values().cloned().collect())
    }
}

#[async_trait]
impl UserRepo for MemoryRepo {
    async fn create_user(&self, user: NewUser) -> std::result::Result<User, StoreError> {
        let mut guard = self.inner.users.write().expect("poisoned lock");
        if guard.values().any(|u| u.username == user.username) {
            return Err(StoreError::Conflict(format!(
                "username already exists: {}",
                user.username
            )));
        }
        if guard.values().any(|u| u.email == user.email) {
            return Err(StoreError::Conflict(format!(
                "email already exists: {}",
                user.email
            )));
        }
        let record = User {
            id: UserId::from_string(new_id()),
            username: user.username,
            email: user.email,
            meta: user.meta,
            created_at: now_unix(),
        };
        guard.insert(record.id.clone(), record.clone());
        Ok(record)
    }

    async fn delete_user(&self, id: UserId) -> std::result::Result<(), StoreError> {
        let mut guard = self.inner.users.write().expect("poisoned lock");
        guard.remove(&id);
        Ok(())
    }

    async fn user_by_id(&self, id: UserId) -> std::result::Result<Option<User>, StoreError> {
        let guard = self.inner.users.read().expect("poisoned lock");
        Ok(guard.get(&id).cloned())
    }

    async fn user_by_meta(
        &self,
        filter: HashMap<String, String>,
    ) -> std::result::Result<Option<User>, StoreError> {
        let guard = self.inner.users.read().expect("poisoned lock");
        Ok(guard
            .values()
            .find(|u| filter.iter().all(|(key, value)| u.meta.get(key) == Some(value)))
            .cloned())
    }
}

#[async_trait]
impl RolePermissionRepo for MemoryRepo {
    async fn add_role_permission(
        &self,
        role: RoleId,
        permission: PermissionId,
    ) -> std::result::Result<(), StoreError> {
        let mut guard = self.inner.role_permissions.write().expect("poisoned lock");
        guard.entry(role).or_default().insert(permission);
        Ok(())
    }

    async fn remove_role_permission(
        &self,
        role: RoleId,
        permission: PermissionId,
    ) -> std::result::Result<(), StoreError> {
        let mut guard = self.inner.role_permissions.write().expect("poisoned lock");
        if let Some(set) = guard.get_mut(&role) {
            set.remove(&permission);
        }
        Ok(())
    }

    async fn role_permission_ids(
        &self,
        role: RoleId,
    ) -> std::result::Result<Vec<PermissionId>, StoreError> {
        let guard = self.inner.role_permissions.read().expect("poisoned lock");
        Ok(guard
            .get(&role)
            .map(|set| set.iter().cloned().collect())
            .unwrap_or_default())
    }
}

#[async_trait]
impl UserRoleRepo for MemoryRepo {
    async fn add_user_role(
        &self,
        user: UserId,
        role: RoleId,
    ) -> std::result::Result<(), StoreError> {
        let mut guard = self.inner.user_roles.write().expect("poisoned lock");
        guard.entry(user).or_default().insert(role);
        Ok(())
    }

    async fn remove_user_role(
        &self,
        user: UserId,
        role: RoleId,
    ) -> std::result::Result<(), StoreError> {
        let mut guard = self.inner.user_roles.write().expect("poisoned lock");
        if let Some(set) = guard.get_mut(&user) {
            set.remove(&role);
        }
        Ok(())
    }

    async fn user_role_ids(&self, user: UserId) -> std::result::Result<Vec<RoleId>, StoreError> {
        let guard = self.inner.user_roles.read().expect("poisoned lock");
        Ok(guard
            .get(&user)
            .map(|set| set.iter().cloned().collect())
            .unwrap_or_default())
    }
}

#[async_trait]
impl UserGroupRepo for MemoryRepo {
    async fn add_group_member(
        &self,
        membership: NewGroupMembership,
    ) -> std::result::Result<GroupMembership, StoreError> {
        let mut guard = self.inner.memberships.write().expect("poisoned lock");
        let key = (membership.group_name.clone(), membership.user_id.clone());
        if let Some(existing) = guard.get(&key) {
            return Ok(existing.clone());
        }
        let record = GroupMembership {
            id: MembershipId::from_string(new_id()),
            group_name: membership.group_name,
            user_id: membership.user_id,
            created_at: now_unix(),
        };
        guard.insert(key, record.clone());
        Ok(record)
    }

    async fn remove_group_member(
        &self,
        group: GroupName,
        user: UserId,
    ) -> std::result::Result<(), StoreError> {
        let mut guard = self.inner.memberships.write().expect("poisoned lock");
        guard.remove(&(group, user));
        Ok(())
    }

    async fn groups_for_user(
        &self,
        user: UserId,
    ) -> std::result::Result<Vec<GroupMembership>, StoreError> {
        let guard = self.inner.memberships.read().expect("poisoned lock");
        Ok(guard
            .values()
            .filter(|m| m.user_id == user)
            .cloned()
            .collect())
    }

    async fn users_in_group(
        &self,
        group: GroupName,
    ) -> std::result::Result<Vec<GroupMembership>, StoreError> {
        let guard = self.inner.memberships.read().expect("poisoned lock");
        Ok(guard
            .values()
            .filter(|m| m.group_name == group)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl GroupRoleRepo for MemoryRepo {
    async fn add_group_role(
        &self,
        group: GroupName,
        role: RoleId,
    ) -> std::result::Result<(), StoreError> {
        let mut guard = self.inner.group_roles.write().expect("poisoned lock");
        guard.entry(group).or_default().insert(role);
        Ok(())
    }

    async fn remove_group_role(
        &self,
        group: GroupName,
        role: RoleId,
    ) -> std::result::Result<(), StoreError> {
        let mut guard = self.inner.group_roles.write().expect("poisoned lock");
        if let Some(set) = guard.get_mut(&group) {
            set.remove(&role);
        }
        Ok(())
    }

    async fn group_role_ids(
        &self,
        group: GroupName,
    ) -> std::result::Result<Vec<RoleId>, StoreError> {
        let guard = self.inner.group_roles.read().expect("poisoned lock");
        Ok(guard
            .get(&group)
            .map(|set| set.iter().cloned().collect())
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manager::ManagerBuilder;
    use crate::types::ResourceName;
    use futures::executor::block_on;

    fn membership(group: &str, user: &UserId) -> NewGroupMembership {
        NewGroupMembership {
            group_name: GroupName::try_from(group).unwrap(),
            user_id: user.clone(),
        }
    }

    #[test]
    fn memory_repo_should_support_basic_authorization_flow() {
        let repo = MemoryRepo::new();
        let manager = ManagerBuilder::new(repo).build();

        let user = block_on(manager.create_user(NewUser {
            username: "alice".into(),
            email: "alice@example.com".into(),
            meta: HashMap::new(),
        }))
        .unwrap();
        let role = block_on(manager.create_role(NewRole {
            name: "editor".into(),
            description: String::new(),
        }))
        .unwrap();
        let permission = block_on(manager.create_permission(NewPermission {
            resource: "survey".into(),
            action: Action::All,
        }))
        .unwrap();

        block_on(manager.assign_permission_to_role(role.id.clone(), permission.id)).unwrap();
        block_on(manager.assign_role_to_user(user.id.clone(), role.id)).unwrap();

        let resource = ResourceName::try_from("survey").unwrap();
        assert!(block_on(manager.can(user.id.clone(), resource.clone(), Action::Delete)).unwrap());
        assert!(block_on(manager.can(user.id, resource, Action::Update)).unwrap());
    }

    #[test]
    fn create_permission_should_be_idempotent_on_resource_action_pair() {
        let repo = MemoryRepo::new();
        let draft = NewPermission {
            resource: "survey".into(),
            action: Action::Read,
        };
        let first = block_on(repo.create_permission(draft.clone())).unwrap();
        let second = block_on(repo.create_permission(draft)).unwrap();
        assert_eq!(first, second);
        assert_eq!(repo.inner.permissions.read().unwrap().len(), 1);
    }

    #[test]
    fn create_user_should_conflict_on_duplicate_username_or_email() {
        let repo = MemoryRepo::new();
        block_on(repo.create_user(NewUser {
            username: "alice".into(),
            email: "alice@example.com".into(),
            meta: HashMap::new(),
        }))
        .unwrap();

        let same_name = block_on(repo.create_user(NewUser {
            username: "alice".into(),
            email: "other@example.com".into(),
            meta: HashMap::new(),
        }));
        assert!(matches!(same_name, Err(StoreError::Conflict(_))));

        let same_email = block_on(repo.create_user(NewUser {
            username: "bob".into(),
            email: "alice@example.com".into(),
            meta: HashMap::new(),
        }));
        assert!(matches!(same_email, Err(StoreError::Conflict(_))));
    }

    #[test]
    fn role_permission_add_should_be_idempotent() {
        let repo = MemoryRepo::new();
        let role = RoleId::from_string("role_a".into());
        let permission = PermissionId::from_string("perm_a".into());

        block_on(repo.add_role_permission(role.clone(), permission.clone())).unwrap();
        block_on(repo.add_role_permission(role.clone(), permission.clone())).unwrap();
        assert_eq!(
            block_on(repo.role_permission_ids(role.clone())).unwrap(),
            vec![permission.clone()]
        );

        block_on(repo.remove_role_permission(role.clone(), permission.clone())).unwrap();
        // Removing again is a no-op, not an error.
        block_on(repo.remove_role_permission(role.clone(), permission)).unwrap();
        assert!(block_on(repo.role_permission_ids(role)).unwrap().is_empty());
    }

    #[test]
    fn group_membership_should_be_idempotent_and_visible_both_ways() {
        let repo = MemoryRepo::new();
        let user = UserId::from_string("user_a".into());

        let first = block_on(repo.add_group_member(membership("auditors", &user))).unwrap();
        let second = block_on(repo.add_group_member(membership("auditors", &user))).unwrap();
        assert_eq!(first.id, second.id);

        let groups = block_on(repo.groups_for_user(user.clone())).unwrap();
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].group_name.as_str(), "auditors");

        let members =
            block_on(repo.users_in_group(GroupName::try_from("auditors").unwrap())).unwrap();
        assert_eq!(members.len(), 1);
        assert_eq!(members[0].user_id, user);

        block_on(repo.remove_group_member(GroupName::try_from("auditors").unwrap(), user.clone()))
            .unwrap();
        assert!(block_on(repo.groups_for_user(user)).unwrap().is_empty());
    }

    #[test]
    fn deleting_entities_should_leave_join_entries_behind() {
        let repo = MemoryRepo::new();
        let role = RoleId::from_string("role_a".into());
        let permission = block_on(repo.create_permission(NewPermission {
            resource: "survey".into(),
            action: Action::Read,
        }))
        .unwrap();
        block_on(repo.add_role_permission(role.clone(), permission.id.clone())).unwrap();

        block_on(repo.delete_permission(permission.id.clone())).unwrap();

        // The join still lists the id; resolution is responsible for
        // skipping references that no longer resolve.
        assert_eq!(
            block_on(repo.role_permission_ids(role)).unwrap(),
            vec![permission.id.clone()]
        );
        assert!(block_on(repo.permission_by_id(permission.id))
            .unwrap()
            .is_none());
    }
}
