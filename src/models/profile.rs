//! Sections of the singleton profile record.
//!
//! Array elements are opaque to the service and are passed through as
//! `serde_json::Value`; the arrays themselves are typed so anything else is
//! rejected on update. Every field is required on update.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::FromRow;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct BasicInfo {
    pub email: String,
    pub cv_link: String,
    pub about_me: String,
    #[sqlx(json)]
    pub partners: Vec<Value>,
    #[sqlx(json)]
    pub carousel: Vec<Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Skills {
    #[sqlx(json)]
    pub tech_stack: Vec<Value>,
    #[sqlx(json)]
    pub soft_skills: Vec<Value>,
    #[sqlx(json)]
    pub hobbies: Vec<Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, FromRow)]
pub struct JobsAndProjects {
    #[sqlx(json)]
    pub jobs: Vec<Value>,
    #[sqlx(json)]
    pub projects: Vec<Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Socials {
    #[sqlx(json)]
    pub social_media: Vec<Value>,
}

/// Entry of the `partners` array
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Partner {
    #[serde(rename = "imgURL")]
    pub img_url: String,
    pub width: u32,
    pub height: u32,
}
