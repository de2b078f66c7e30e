//! Storage-agnostic RBAC authorization engine.
//!
//! This crate provides the domain model for permissions, roles, users, and
//! groups, async repository contracts any storage adapter can satisfy, a
//! glob-style resource/action matcher, and a [`Manager`] that resolves a
//! principal's effective role set (direct roles, group-derived roles, and an
//! optional default role) to an allow/deny decision. The model is purely
//! additive; there are no deny permissions.
//!
//! # Examples
//!
//! Basic authorization flow using the in-memory store (enable `memory-store`):
//! ```no_run
//! use rs_rbac::{Action, ManagerBuilder, NewPermission, NewRole, NewUser, ResourceName};
//! # #[cfg(feature = "memory-store")]
//! # {
//! use rs_rbac::MemoryRepo;
//! # futures::executor::block_on(async {
//! let manager = ManagerBuilder::new(MemoryRepo::new()).build();
//! let user = manager
//!     .create_user(NewUser {
//!         username: "alice".into(),
//!         email: "alice@example.com".into(),
//!         meta: Default::default(),
//!     })
//!     .await?;
//! let role = manager
//!     .create_role(NewRole {
//!         name: "editor".into(),
//!         description: String::new(),
//!     })
//!     .await?;
//! let permission = manager
//!     .create_permission(NewPermission {
//!         resource: "survey.**".into(),
//!         action: Action::All,
//!     })
//!     .await?;
//! manager.assign_permission_to_role(role.id.clone(), permission.id).await?;
//! manager.assign_role_to_user(user.id.clone(), role.id).await?;
//!
//! let resource = ResourceName::new("survey.q1")?;
//! assert!(manager.can(user.id, resource, Action::Update).await?);
//! # Ok::<(), rs_rbac::Error>(())
//! # });
//! # }
//! ```
#![forbid(unsafe_code)]

mod error;
mod manager;
mod matcher;
mod model;
mod recorder;
mod repo;
mod types;

#[cfg(feature = "memory-store")]
mod memory;

pub use crate::error::{BackendError, Error, Result, StoreError};
pub use crate::manager::{Manager, ManagerBuilder};
pub use crate::matcher::ResourcePattern;
pub use crate::model::{
    Action, GroupMembership, NewGroupMembership, NewPermission, NewRole, NewUser, Permission,
    Role, User,
};
pub use crate::recorder::{NoRecorder, Recorder};
pub use crate::repo::{
    GroupRoleRepo, PermissionRepo, Repo, RolePermissionRepo, RoleRepo, UserGroupRepo, UserRepo,
    UserRoleRepo,
};
pub use crate::types::{GroupName, MembershipId, PermissionId, ResourceName, RoleId, UserId};

#[cfg(feature = "memory-store")]
pub use crate::memory::MemoryRepo;
