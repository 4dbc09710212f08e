// Query Authentication Snapshot
//
// The identity a context was compiled for, captured from the pass parameters
// so access-control checks see the user even off the request thread.

use serde::{Serialize, Deserialize};

/// User identity attached to a query context
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct QueryAuthentication {
    username: Option<String>,
    roles: Vec<String>,
}

impl QueryAuthentication {
    /// Parse an authenticated-user blob: the first line is the user name,
    /// every further non-empty line is a granted role.
    pub fn parse_user_info(info: &str) -> Self {
        let mut lines = info.lines().map(str::trim).filter(|l| !l.is_empty());
        let username = lines.next().map(str::to_string);
        let roles = lines.map(str::to_string).collect();
        QueryAuthentication { username, roles }
    }

    pub fn username(&self) -> Option<&str> {
        self.username.as_deref()
    }

    pub fn roles(&self) -> &[String] {
        &self.roles
    }

    pub fn has_role(&self, role: &str) -> bool {
        self.roles.iter().any(|r| r == role)
    }

    pub fn is_anonymous(&self) -> bool {
        self.username.is_none()
    }
}
