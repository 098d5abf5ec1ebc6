//! Translates workload [`Action`]s into HTTP requests against the messages service.

use std::fmt;

use reqwest::Method;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// An action that can be performed by a simulated user.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Action {
    /// Append `text` to the messages of the given actor.
    AddMessage {
        /// The actor to write to.
        actor_id: u32,
        /// The random message text.
        text: String,
    },
    /// Retrieve all messages of the given actor.
    GetMessages {
        /// The actor to read from.
        actor_id: u32,
    },
}

impl Action {
    /// The kind of this action, used to group metrics.
    pub fn kind(&self) -> ActionKind {
        match self {
            Action::AddMessage { .. } => ActionKind::AddMessage,
            Action::GetMessages { .. } => ActionKind::GetMessages,
        }
    }

    /// Builds the HTTP request for this action.
    ///
    /// The text of an `AddMessage` action is encoded according to `body`.
    pub fn request(&self, body: &BodyFormat) -> Request {
        match self {
            Action::AddMessage { actor_id, text } => Request {
                method: Method::POST,
                path: messages_path(*actor_id),
                body: Some(body.encode(text)),
            },
            Action::GetMessages { actor_id } => Request {
                method: Method::GET,
                path: messages_path(*actor_id),
                body: None,
            },
        }
    }
}

fn messages_path(actor_id: u32) -> String {
    format!("/messages/{actor_id}")
}

/// The two kinds of [`Action`]s.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ActionKind {
    /// See [`Action::AddMessage`].
    AddMessage,
    /// See [`Action::GetMessages`].
    GetMessages,
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ActionKind::AddMessage => f.write_str("add_message"),
            ActionKind::GetMessages => f.write_str("get_messages"),
        }
    }
}

/// A transport-independent description of an HTTP request.
#[derive(Clone, Debug, PartialEq)]
pub struct Request {
    /// The HTTP method.
    pub method: Method,
    /// The path relative to the remote's base URL, starting with `/`.
    pub path: String,
    /// The JSON body, if any.
    pub body: Option<Value>,
}

/// How the text of an `AddMessage` action is encoded into the JSON request body.
///
/// The exact contract is owned by the service under test, so it is configurable.
///
/// ```yaml
/// body:
///   type: object
///   field: text
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum BodyFormat {
    /// The body is a bare JSON string, e.g. `"AB12CD34EF"`.
    #[default]
    String,
    /// The body is an object with a single string field, e.g. `{"text": "AB12CD34EF"}`.
    Object {
        /// Name of the field holding the text.
        field: String,
    },
}

impl BodyFormat {
    /// Encodes the message text as a JSON value.
    pub fn encode(&self, text: &str) -> Value {
        match self {
            BodyFormat::String => Value::String(text.to_owned()),
            BodyFormat::Object { field } => {
                let mut object = serde_json::Map::with_capacity(1);
                object.insert(field.clone(), Value::String(text.to_owned()));
                Value::Object(object)
            }
        }
    }
}
