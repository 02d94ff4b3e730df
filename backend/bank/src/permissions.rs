//! # Permissions
//!
//! Roles and what they are allowed to do in the admin panel.
//!
//! The table is persisted with the settings document so admins holding
//! [`Permission::ManageRoles`] can edit it. [`Role::SuperAdmin`] bypasses the
//! table entirely so the panel can never lock itself out.
use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    SuperAdmin,
    Admin,
    Moderator,
    Finance,
    #[default]
    User,
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Permission {
    ManageContests,
    ApproveContests,
    ManageUsers,
    ManageFinances,
    ViewAuditLog,
    ManageRoles,
}

impl Permission {
    pub const ALL: [Permission; 6] = [
        Permission::ManageContests,
        Permission::ApproveContests,
        Permission::ManageUsers,
        Permission::ManageFinances,
        Permission::ViewAuditLog,
        Permission::ManageRoles,
    ];
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(transparent)]
pub struct RolePermissions(BTreeMap<Role, BTreeSet<Permission>>);

impl RolePermissions {
    pub fn allows(&self, role: Role, permission: Permission) -> bool {
        if role == Role::SuperAdmin {
            return true;
        }

        self.0
            .get(&role)
            .is_some_and(|granted| granted.contains(&permission))
    }

    pub fn grant(&mut self, role: Role, permission: Permission) {
        self.0.entry(role).or_default().insert(permission);
    }

    pub fn revoke(&mut self, role: Role, permission: Permission) {
        if let Some(granted) = self.0.get_mut(&role) {
            granted.remove(&permission);
        }
    }

    pub fn granted(&self, role: Role) -> BTreeSet<Permission> {
        if role == Role::SuperAdmin {
            return Permission::ALL.into_iter().collect();
        }

        self.0.get(&role).cloned().unwrap_or_default()
    }
}

impl Default for RolePermissions {
    fn default() -> Self {
        use Permission::*;

        let mut table = BTreeMap::new();
        table.insert(Role::SuperAdmin, Permission::ALL.into_iter().collect());
        table.insert(
            Role::Admin,
            BTreeSet::from([
                ManageContests,
                ApproveContests,
                ManageUsers,
                ManageFinances,
                ViewAuditLog,
            ]),
        );
        table.insert(Role::Moderator, BTreeSet::from([ManageContests, ManageUsers]));
        table.insert(Role::Finance, BTreeSet::from([ManageFinances, ViewAuditLog]));
        table.insert(Role::User, BTreeSet::new());

        Self(table)
    }
}
