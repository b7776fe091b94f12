use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CareProvider {
    pub id: String,
    pub first_name: String,
    pub last_name: String,
    pub title: String,
    pub is_active: bool,
    pub created_at: NaiveDateTime,
}

impl CareProvider {
    pub fn display_name(&self) -> String {
        if self.title.is_empty() {
            format!("{} {}", self.first_name, self.last_name)
        } else {
            format!("{} {} {}", self.title, self.first_name, self.last_name)
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewCareProvider {
    pub first_name: String,
    pub last_name: String,
    #[serde(default)]
    pub title: String,
    #[serde(default = "default_active")]
    pub is_active: bool,
}

fn default_active() -> bool {
    true
}
