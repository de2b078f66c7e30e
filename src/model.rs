use crate::error::{Error, Result};
use crate::types::{GroupName, MembershipId, PermissionId, RoleId, UserId};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

/// Operation kind a permission covers.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum Action {
    Create,
    Read,
    Update,
    Delete,
    /// Wildcard covering every action.
    #[cfg_attr(feature = "serde", serde(rename = "*"))]
    All,
}

impl Action {
    /// Returns whether this granted action covers `requested`.
    ///
    /// `All` covers everything; otherwise the match is identity. A request
    /// for `All` is only covered by a grant of `All`.
    pub fn covers(self, requested: Action) -> bool {
        self == Action::All || self == requested
    }

    /// Maps an HTTP method name to the action it conventionally performs.
    ///
    /// Unrecognized methods map to [`Action::All`].
    pub fn from_http_method(method: &str) -> Self {
        match method {
            "GET" => Action::Read,
            "POST" => Action::Create,
            "PUT" => Action::Update,
            "PATCH" => Action::Delete,
            _ => Action::All,
        }
    }

    /// Returns the wire representation of the action.
    pub fn as_str(self) -> &'static str {
        match self {
            Action::Create => "create",
            Action::Read => "read",
            Action::Update => "update",
            Action::Delete => "delete",
            Action::All => "*",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Action {
    type Err = Error;

    fn from_str(value: &str) -> Result<Self> {
        match value {
            "create" => Ok(Action::Create),
            "read" => Ok(Action::Read),
            "update" => Ok(Action::Update),
            "delete" => Ok(Action::Delete),
            "*" => Ok(Action::All),
            other => Err(Error::InvalidAction(other.to_string())),
        }
    }
}

/// A (resource pattern, action) grant.
///
/// The (resource, action) pair is unique within a store; creating a
/// duplicate returns the existing record.
#[derive(Clone, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Permission {
    pub id: PermissionId,
    /// Dot-segmented resource pattern, e.g. `survey.*.test` or `*`.
    pub resource: String,
    pub action: Action,
    /// Creation time, unix seconds.
    pub created_at: i64,
}

/// Named bundle of permissions, assignable to users and groups.
#[derive(Clone, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Role {
    pub id: RoleId,
    /// Unique role name.
    pub name: String,
    pub description: String,
    pub created_at: i64,
}

/// Principal holding direct role grants and group memberships.
#[derive(Clone, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct User {
    pub id: UserId,
    /// Unique username.
    pub username: String,
    /// Unique email.
    pub email: String,
    /// Open key/value bag for store-specific lookups.
    #[cfg_attr(feature = "serde", serde(default))]
    pub meta: HashMap<String, String>,
    pub created_at: i64,
}

/// Membership record tying a user to a named group.
#[derive(Clone, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct GroupMembership {
    pub id: MembershipId,
    pub group_name: GroupName,
    pub user_id: UserId,
    pub created_at: i64,
}

/// Creation draft for [`Permission`]; the store assigns id and timestamp.
#[derive(Clone, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct NewPermission {
    pub resource: String,
    pub action: Action,
}

/// Creation draft for [`Role`].
#[derive(Clone, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct NewRole {
    pub name: String,
    #[cfg_attr(feature = "serde", serde(default))]
    pub description: String,
}

/// Creation draft for [`User`].
#[derive(Clone, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct NewUser {
    pub username: String,
    pub email: String,
    #[cfg_attr(feature = "serde", serde(default))]
    pub meta: HashMap<String, String>,
}

/// Creation draft for [`GroupMembership`]; the store assigns the record id.
#[derive(Clone, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct NewGroupMembership {
    pub group_name: GroupName,
    pub user_id: UserId,
}

#[cfg(test)]
mod tests {
    use super::Action;
    use crate::error::Error;

    #[test]
    fn action_all_covers_every_concrete_action() {
        for requested in [Action::Create, Action::Read, Action::Update, Action::Delete] {
            assert!(Action::All.covers(requested));
        }
    }

    #[test]
    fn concrete_action_covers_only_itself() {
        assert!(Action::Delete.covers(Action::Delete));
        assert!(!Action::Delete.covers(Action::Update));
        assert!(!Action::Delete.covers(Action::All));
    }

    #[test]
    fn action_round_trips_through_wire_string() {
        for action in [
            Action::Create,
            Action::Read,
            Action::Update,
            Action::Delete,
            Action::All,
        ] {
            assert_eq!(action.as_str().parse::<Action>().unwrap(), action);
        }
    }

    #[test]
    fn action_parse_rejects_unknown_token() {
        let err = "truncate".parse::<Action>().expect_err("must reject");
        assert!(matches!(err, Error::InvalidAction(_)));
    }

    #[test]
    fn http_method_maps_to_action() {
        assert_eq!(Action::from_http_method("GET"), Action::Read);
        assert_eq!(Action::from_http_method("POST"), Action::Create);
        assert_eq!(Action::from_http_method("PUT"), Action::Update);
        assert_eq!(Action::from_http_method("PATCH"), Action::Delete);
        assert_eq!(Action::from_http_method("OPTIONS"), Action::All);
    }
}
