use serde::{Deserialize, Serialize, Serializer};
use tracing::warn;

use super::{Client, Error};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionKind {
    Archive,
    Delete,
}

/// One mutation inside a bulk `/v3/send` request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Action {
    pub action: ActionKind,
    #[serde(serialize_with = "as_string")]
    pub item_id: u64,
}

fn as_string<S: Serializer>(id: &u64, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_str(id)
}

impl Action {
    pub fn archive(item_id: u64) -> Self {
        Self {
            action: ActionKind::Archive,
            item_id,
        }
    }

    pub fn delete(item_id: u64) -> Self {
        Self {
            action: ActionKind::Delete,
            item_id,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ModifyResult {
    /// One flag per requested action, in request order.
    #[serde(default)]
    pub action_results: Vec<bool>,
    #[serde(default)]
    pub status: i64,
}

impl ModifyResult {
    pub fn all_succeeded(&self) -> bool {
        self.action_results.iter().all(|ok| *ok)
    }
}

/// Anything that can apply a batch of actions. The cull pipeline only needs
/// this much of the client.
pub trait Modifier {
    fn modify(&self, actions: &[Action]) -> Result<ModifyResult, Error>;
}

#[derive(Serialize)]
struct ModifyRequest<'a> {
    actions: &'a [Action],
}

impl Modifier for Client {
    fn modify(&self, actions: &[Action]) -> Result<ModifyResult, Error> {
        let result: ModifyResult = self.post("/v3/send", &ModifyRequest { actions })?;
        for (action, ok) in actions.iter().zip(&result.action_results) {
            if !ok {
                warn!(action = ?action.action, item_id = action.item_id, "action failed");
            }
        }
        Ok(result)
    }
}
