use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use utoipa::ToSchema;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Student,
    Teacher,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::Student => "student",
            Role::Teacher => "teacher",
        }
    }

    /// Page a user of this role lands on after login or a role mismatch.
    pub fn landing_path(self) -> &'static str {
        match self {
            Role::Student => "/student/checkin/",
            Role::Teacher => "/teacher/dashboard/",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "student" => Ok(Role::Student),
            "teacher" => Ok(Role::Teacher),
            other => Err(format!("unknown role: {}", other)),
        }
    }
}

/// An account in the identity store.
///
/// `role` is `None` when the account exists but has no profile attached;
/// such accounts cannot log in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub username: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub role: Option<Role>,
    pub display_name: String,
    pub class_group: Option<String>,
}

impl User {
    /// Name shown to teachers: the display name, or the username when blank.
    pub fn shown_name(&self) -> &str {
        if self.display_name.trim().is_empty() {
            &self.username
        } else {
            &self.display_name
        }
    }
}

/// Fields required to provision an account. The password is already hashed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub role: Option<Role>,
    #[serde(default)]
    pub display_name: String,
    #[serde(default)]
    pub class_group: Option<String>,
}

impl From<NewUser> for User {
    fn from(new: NewUser) -> Self {
        User {
            username: new.username,
            email: new.email,
            password_hash: new.password_hash,
            role: new.role,
            display_name: new.display_name,
            class_group: new.class_group,
        }
    }
}

/// Partial update of an account; `None` keeps the stored value.
#[derive(Debug, Clone, Default)]
pub struct UserChanges {
    pub display_name: Option<String>,
    pub email: Option<String>,
    pub password_hash: Option<String>,
}

impl UserChanges {
    pub fn apply(&self, user: &mut User) {
        if let Some(name) = &self.display_name {
            user.display_name = name.clone();
        }
        if let Some(email) = &self.email {
            user.email = email.clone();
        }
        if let Some(hash) = &self.password_hash {
            user.password_hash = hash.clone();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(display_name: &str) -> User {
        User {
            username: "amy01".to_string(),
            email: "amy@school.test".to_string(),
            password_hash: String::new(),
            role: Some(Role::Student),
            display_name: display_name.to_string(),
            class_group: None,
        }
    }

    #[test]
    fn shown_name_falls_back_to_username() {
        assert_eq!(user("Amy Pond").shown_name(), "Amy Pond");
        assert_eq!(user("  ").shown_name(), "amy01");
    }

    #[test]
    fn role_round_trips_through_text() {
        assert_eq!("Teacher".parse::<Role>(), Ok(Role::Teacher));
        assert!("admin".parse::<Role>().is_err());
        assert_eq!(Role::Student.landing_path(), "/student/checkin/");
    }

    #[test]
    fn changes_only_touch_given_fields() {
        let mut u = user("Amy");
        UserChanges {
            email: Some("new@school.test".to_string()),
            ..Default::default()
        }
        .apply(&mut u);
        assert_eq!(u.email, "new@school.test");
        assert_eq!(u.display_name, "Amy");
    }
}
