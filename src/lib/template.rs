use minijinja::{AutoEscape, Environment, UndefinedBehavior, Value};
use once_cell::sync::Lazy;
use serde::Serialize;
use thiserror::Error;

use crate::api::Item;

/// One line of metadata, then the URL in angle brackets.
pub const DEFAULT_TEMPLATE: &str = "[{{ item_id }}] ({{ added }}) {{ title }}\n<{{ url }}>";

const ADDED_FORMAT: &str = "%a, %d %b %Y %H:%M:%S UTC";

pub static ENVIRONMENT: Lazy<Environment> = Lazy::new(|| {
    let mut e = Environment::new();
    e.set_undefined_behavior(UndefinedBehavior::Strict);
    e.set_auto_escape_callback(|_| AutoEscape::None);
    e
});

#[derive(Error, Debug)]
pub enum Error {
    #[error(
        r#"Failed to initialise template string.
            Template:   {template}
            Error:      {error}"#
    )]
    TemplateInitialisationError {
        template: String,
        error: Box<minijinja::Error>,
    },
    #[error(
        r#"Failed to render template string.
            Template:   {template}
            Item:       {item_id}
            Error:      {error}"#
    )]
    RenderFailure {
        template: String,
        item_id: u64,
        error: Box<minijinja::Error>,
    },
}

/// A template string, checked for syntax errors on construction.
#[derive(Debug, Clone)]
pub struct Template(String);
impl Template {
    pub fn new(string: String) -> Result<Self, Error> {
        ENVIRONMENT.template_from_str(&string).map_err(|e| {
            Error::TemplateInitialisationError {
                template: string.clone(),
                error: Box::new(e),
            }
        })?;
        Ok(Self(string))
    }

    /// Substitute the keys in a template string with the item's values
    pub fn render(&self, item: &Item) -> Result<String, Error> {
        let template = ENVIRONMENT.template_from_str(&self.0).map_err(|e| {
            Error::TemplateInitialisationError {
                template: self.0.clone(),
                error: Box::new(e),
            }
        })?;
        template
            .render(context_value(item))
            .map_err(|e| Error::RenderFailure {
                template: self.0.clone(),
                item_id: item.item_id,
                error: Box::new(e),
            })
    }
}

impl Default for Template {
    fn default() -> Self {
        Self(DEFAULT_TEMPLATE.to_owned())
    }
}

/// Build the MiniJinja value map used to render an item.
pub fn context_value(item: &Item) -> Value {
    Value::from_serialize(ItemTemplateContext::new(item))
}

#[derive(Serialize)]
pub(crate) struct ItemTemplateContext<'a> {
    item_id: u64,
    url: &'a str,
    title: &'a str,
    excerpt: &'a str,
    /// Human-readable `time_added`, empty when the timestamp is out of range.
    added: String,
    time_added: i64,
    sort_id: i64,
    item: &'a Item,
}

impl<'a> ItemTemplateContext<'a> {
    pub(crate) fn new(item: &'a Item) -> Self {
        Self {
            item_id: item.item_id,
            url: item.url(),
            title: item.title(),
            excerpt: &item.excerpt,
            added: item
                .added()
                .map(|t| t.format(ADDED_FORMAT).to_string())
                .unwrap_or_default(),
            time_added: item.time_added,
            sort_id: item.sort_id,
            item,
        }
    }
}

#[cfg(test)]
pub(crate) fn item_strategy() -> impl proptest::strategy::Strategy<Value = Item> {
    use proptest::prelude::*;
    (
        any::<u64>(),
        "https?://[a-z]{1,12}\\.[a-z]{2,3}/[a-z0-9/]{0,16}",
        ".{0,40}",
        0i64..4_000_000_000,
        any::<i64>(),
    )
        .prop_map(|(id, url, title, added, sort)| Item::new(id, &url, &title, added, sort))
}
