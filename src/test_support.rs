//! Fixture models shared by unit tests.

use crate::driver::Record;
use crate::model::{Action, Model, Rule, ValidationErrors};
use serde::{Deserialize, Serialize, Serializer};
use serde_json::Value;

pub fn record(value: Value) -> Record {
    match value {
        Value::Object(map) => map,
        other => panic!("fixture record must be an object, got {}", other),
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Person {
    #[serde(default)]
    pub id: Option<i64>,
    pub name: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub age: Option<u32>,
    #[serde(default)]
    pub password_hash: String,
}

impl Person {
    pub fn new(id: i64, name: &str) -> Self {
        Person {
            id: Some(id),
            name: name.to_string(),
            email: Some(format!("{}@example.com", name.to_lowercase())),
            age: None,
            password_hash: "secret".to_string(),
        }
    }

    pub fn into_record(self) -> Record {
        record(serde_json::to_value(self).unwrap_or(Value::Null))
    }
}

impl Model for Person {
    const NAME: &'static str = "Person";
    const TABLE: &'static str = "people";
    const PROPERTIES: &'static [&'static str] = &["id", "name", "email", "age", "password_hash"];
    const MUTABLE: &'static [&'static str] = &["name", "email", "age"];
    const HIDDEN: &'static [&'static str] = &["password_hash"];

    fn rules() -> Vec<(&'static str, Rule)> {
        vec![
            ("name", Rule::new().required().length(1, 60)),
            ("age", Rule::new().range(0.0, 150.0)),
        ]
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Post {
    #[serde(default)]
    pub id: Option<i64>,
    pub title: String,
    #[serde(default)]
    pub published: bool,
}

impl Post {
    pub fn published(id: i64) -> Self {
        Post {
            id: Some(id),
            title: "Launch".to_string(),
            published: true,
        }
    }

    pub fn into_record(self) -> Record {
        record(serde_json::to_value(self).unwrap_or(Value::Null))
    }
}

impl Model for Post {
    const NAME: &'static str = "Post";
    const TABLE: &'static str = "posts";
    const PROPERTIES: &'static [&'static str] = &["id", "title", "published"];
    const MUTABLE: &'static [&'static str] = &["title", "published"];

    fn before_delete(&self, errors: &mut ValidationErrors) {
        if self.published {
            errors.add("Published posts cannot be deleted");
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Book {
    #[serde(default)]
    pub id: Option<i64>,
    pub name: String,
    #[serde(default)]
    pub not_allowed: bool,
}

impl Book {
    pub fn new(id: i64, name: &str) -> Self {
        Book {
            id: Some(id),
            name: name.to_string(),
            not_allowed: false,
        }
    }
}

impl Model for Book {
    const NAME: &'static str = "Book";
    const TABLE: &'static str = "books";
    const PROPERTIES: &'static [&'static str] = &["id", "name", "not_allowed"];
    const MUTABLE: &'static [&'static str] = &["name"];
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ReadOnlyNote {
    #[serde(default)]
    pub id: Option<i64>,
    pub text: String,
}

impl Model for ReadOnlyNote {
    const NAME: &'static str = "ReadOnlyNote";
    const TABLE: &'static str = "notes";
    const PROPERTIES: &'static [&'static str] = &["id", "text"];
    const MUTABLE: &'static [&'static str] = &["text"];
    const ACTIONS: &'static [Action] = &[Action::FindAll, Action::Retrieve];
}

/// Model whose serialization always fails.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct Unencodable {
    #[serde(default)]
    pub id: Option<i64>,
}

impl Serialize for Unencodable {
    fn serialize<S: Serializer>(&self, _serializer: S) -> Result<S::Ok, S::Error> {
        Err(serde::ser::Error::custom("invalid UTF-8 sequence"))
    }
}

impl Model for Unencodable {
    const NAME: &'static str = "Unencodable";
    const TABLE: &'static str = "unencodable";
    const PROPERTIES: &'static [&'static str] = &["id"];
    const MUTABLE: &'static [&'static str] = &[];
}
