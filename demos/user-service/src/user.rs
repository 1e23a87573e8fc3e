use serde::{Deserialize, Serialize};

pub const COLLECTION_NAME: &str = "users";

/// Stored user document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Entity {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(rename = "firstName")]
    pub first_name: String,
    #[serde(rename = "lastName")]
    pub last_name: String,
    #[serde(rename = "emailAddress")]
    pub email_address: String,
}
