use serde::{Deserialize, Serialize};

use super::{Client, Error, Item};

#[derive(Debug, Clone, Serialize)]
pub struct AddOptions {
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Comma-separated.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct AddResult {
    pub item: Option<Item>,
    #[serde(default)]
    pub status: i64,
}

impl Client {
    pub fn add(&self, options: &AddOptions) -> Result<AddResult, Error> {
        self.post("/v3/add", options)
    }
}
