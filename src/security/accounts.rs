//! Local user accounts and their role privileges.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

use crate::config::schema::AccountConfig;
use crate::routing::privilege::{
    CONFIGURE_COMPONENTS, CONFIGURE_MANAGER, CONFIGURE_SELF, CONFIGURE_USERS, LOGIN,
};
use crate::routing::PrivilegeSet;

/// Predefined Redfish roles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
pub enum Role {
    Administrator,
    Operator,
    ReadOnly,
}

impl Role {
    pub fn privileges(self) -> PrivilegeSet {
        let names: &[&str] = match self {
            Role::Administrator => &[
                LOGIN,
                CONFIGURE_MANAGER,
                CONFIGURE_USERS,
                CONFIGURE_SELF,
                CONFIGURE_COMPONENTS,
            ],
            Role::Operator => &[LOGIN, CONFIGURE_SELF, CONFIGURE_COMPONENTS],
            Role::ReadOnly => &[LOGIN, CONFIGURE_SELF],
        };
        names.iter().copied().collect()
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

struct Account {
    password: String,
    role: Role,
}

/// Successful login.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Caller {
    pub username: String,
    pub role: Role,
    pub privileges: PrivilegeSet,
}

/// Immutable account table; reloads replace the whole table.
#[derive(Default)]
pub struct AccountStore {
    accounts: HashMap<String, Account>,
}

impl fmt::Debug for AccountStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut users: Vec<&str> = self.accounts.keys().map(String::as_str).collect();
        users.sort_unstable();
        f.debug_struct("AccountStore").field("users", &users).finish()
    }
}

impl AccountStore {
    pub fn from_config(accounts: &[AccountConfig]) -> Self {
        let accounts = accounts
            .iter()
            .map(|a| {
                (
                    a.username.clone(),
                    Account {
                        password: a.password.clone(),
                        role: a.role,
                    },
                )
            })
            .collect();
        Self { accounts }
    }

    pub fn len(&self) -> usize {
        self.accounts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.accounts.is_empty()
    }

    /// Check a username and password.
    pub fn authenticate(&self, username: &str, password: &str) -> Option<Caller> {
        let account = self.accounts.get(username)?;
        if !constant_time_eq(account.password.as_bytes(), password.as_bytes()) {
            return None;
        }
        Some(Caller {
            username: username.to_string(),
            role: account.role,
            privileges: account.role.privileges(),
        })
    }
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    a.len() == b.len() && a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}
