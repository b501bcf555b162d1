use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// POST / (login form)
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct LoginForm {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub user_type: String,
}

/// POST /student/checkin/
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CheckinForm {
    #[serde(default)]
    pub mood: String,
    #[serde(default)]
    pub comment: Option<String>,
}

impl CheckinForm {
    /// Blank comments are stored as absent.
    pub fn comment(&self) -> Option<String> {
        self.comment
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .map(str::to_string)
    }
}

/// POST /teacher/settings/
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct SettingsForm {
    pub first_name: Option<String>,
    pub email: Option<String>,
    pub new_password: Option<String>,
}
