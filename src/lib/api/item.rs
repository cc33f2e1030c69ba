use std::{collections::HashMap, fmt::Display, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, de};

use super::{Client, Error};

/// A saved item as returned by `/v3/get`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    #[serde(deserialize_with = "number_or_string")]
    pub item_id: u64,
    #[serde(default)]
    pub given_url: String,
    #[serde(default)]
    pub resolved_url: String,
    #[serde(default)]
    pub given_title: String,
    #[serde(default)]
    pub resolved_title: String,
    #[serde(default)]
    pub excerpt: String,
    #[serde(default, deserialize_with = "number_or_string")]
    pub time_added: i64,
    #[serde(default, deserialize_with = "number_or_string")]
    pub sort_id: i64,
}

impl Item {
    pub fn new(item_id: u64, url: &str, title: &str, time_added: i64, sort_id: i64) -> Self {
        Self {
            item_id,
            given_url: url.to_owned(),
            given_title: title.to_owned(),
            time_added,
            sort_id,
            ..Default::default()
        }
    }

    /// The resolved URL when the service has one, else the URL as saved.
    pub fn url(&self) -> &str {
        if self.resolved_url.is_empty() {
            &self.given_url
        } else {
            &self.resolved_url
        }
    }

    pub fn title(&self) -> &str {
        if self.resolved_title.is_empty() {
            &self.given_title
        } else {
            &self.resolved_title
        }
    }

    pub fn added(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.time_added, 0)
    }
}

/// Pocket encodes most integers as JSON strings; accept both.
fn number_or_string<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: FromStr + Deserialize<'de>,
    T::Err: Display,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw<T> {
        Number(T),
        Text(String),
    }
    match Raw::<T>::deserialize(deserializer)? {
        Raw::Number(n) => Ok(n),
        Raw::Text(s) => s.trim().parse().map_err(de::Error::custom),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Sort {
    Newest,
    Oldest,
    Title,
    Site,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct RetrieveOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sort: Option<Sort>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub search: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub count: Option<u32>,
}

/// The `list` field is an object keyed by item id, or `[]` when nothing matched.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ItemList {
    Map(HashMap<String, Item>),
    /// Only matches a zero-length array.
    Empty([(); 0]),
}

impl Default for ItemList {
    fn default() -> Self {
        ItemList::Empty([])
    }
}

#[derive(Debug, Deserialize)]
pub struct RetrieveResult {
    #[serde(default)]
    list: ItemList,
    #[serde(default)]
    pub status: i64,
}

impl RetrieveResult {
    /// Items in no particular order.
    pub fn into_items(self) -> Vec<Item> {
        match self.list {
            ItemList::Map(map) => map.into_values().collect(),
            ItemList::Empty(_) => Vec::new(),
        }
    }
}

impl Client {
    pub fn retrieve(&self, options: &RetrieveOptions) -> Result<RetrieveResult, Error> {
        self.post("/v3/get", options)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_string_encoded_numbers() {
        let json = r#"{
            "status": 1,
            "list": {
                "229279689": {
                    "item_id": "229279689",
                    "given_url": "http://a.com/x",
                    "resolved_url": "https://a.com/x",
                    "given_title": "",
                    "resolved_title": "A",
                    "time_added": "1473260123",
                    "sort_id": 3
                }
            }
        }"#;
        let items = serde_json::from_str::<RetrieveResult>(json)
            .unwrap()
            .into_items();
        assert_eq!(items.len(), 1);
        let item = &items[0];
        assert_eq!(item.item_id, 229279689);
        assert_eq!(item.url(), "https://a.com/x");
        assert_eq!(item.title(), "A");
        assert_eq!(item.time_added, 1473260123);
        assert_eq!(item.sort_id, 3);
    }

    #[test]
    fn empty_list_is_an_array() {
        let json = r#"{"status": 2, "list": []}"#;
        let result = serde_json::from_str::<RetrieveResult>(json).unwrap();
        assert!(result.into_items().is_empty());
    }

    #[test]
    fn non_empty_array_or_bad_item_is_an_error() {
        assert!(serde_json::from_str::<RetrieveResult>(r#"{"list": [1]}"#).is_err());
        let missing_id = r#"{"list": {"7": {"given_url": "https://a.com"}}}"#;
        assert!(serde_json::from_str::<RetrieveResult>(missing_id).is_err());
    }

    #[test]
    fn url_and_title_fall_back_to_given() {
        let item = Item::new(7, "http://b.com", "B", 0, 0);
        assert_eq!(item.url(), "http://b.com");
        assert_eq!(item.title(), "B");
    }

    #[test]
    fn options_skip_unset_fields() {
        let options = RetrieveOptions {
            sort: Some(Sort::Oldest),
            domain: Some("a.com".into()),
            ..Default::default()
        };
        let json = serde_json::to_value(&options).unwrap();
        assert_eq!(json, serde_json::json!({"sort": "oldest", "domain": "a.com"}));
    }
}
