//! JSON configuration import
//!
//! Translates a JSON object document into [`Config`] entries:
//!
//! | JSON kind | Entry                                  |
//! |-----------|----------------------------------------|
//! | string    | STRING                                 |
//! | integer   | INT64 (UINT64 above `i64::MAX`)        |
//! | float     | DOUBLE                                 |
//! | boolean   | INT64, 0 or 1                          |
//! | object    | OBJECT holding a nested [`Config`]     |
//! | array     | rejected                               |
//! | null      | rejected                               |
//!
//! Members are visited in document order, and a repeated member name is
//! imported again rather than collapsed: the store keeps the first value,
//! and a later member of an unsupported kind still fails the import. An
//! import that fails partway keeps the members imported before the failure;
//! only the nested config being built for the failing member is discarded.

use std::fmt;

use serde::de::{self, Deserialize, Deserializer, IgnoredAny, MapAccess, SeqAccess, Visitor};

use crate::config::Config;
use crate::error::{KvError, Result};

// =============================================================================
// Document Model
// =============================================================================

/// Object members in document order, duplicates included
type Members = Vec<(String, Node)>;

/// A parsed JSON value. Array contents are never imported, so only the
/// kind is kept.
#[derive(Debug)]
enum Node {
    Null,
    Bool(bool),
    Int(i64),
    UInt(u64),
    Float(f64),
    String(String),
    Array,
    Object(Members),
}

impl Node {
    fn kind_name(&self) -> &'static str {
        match self {
            Node::Null => "Null",
            Node::Bool(false) => "False",
            Node::Bool(true) => "True",
            Node::Object(_) => "Object",
            Node::Array => "Array",
            Node::String(_) => "String",
            Node::Int(_) | Node::UInt(_) | Node::Float(_) => "Number",
        }
    }

    fn is_number(&self) -> bool {
        matches!(self, Node::Int(_) | Node::UInt(_) | Node::Float(_))
    }
}

impl<'de> Deserialize<'de> for Node {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_any(NodeVisitor)
    }
}

struct NodeVisitor;

impl<'de> Visitor<'de> for NodeVisitor {
    type Value = Node;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a JSON value")
    }

    fn visit_unit<E: de::Error>(self) -> std::result::Result<Node, E> {
        Ok(Node::Null)
    }

    fn visit_bool<E: de::Error>(self, v: bool) -> std::result::Result<Node, E> {
        Ok(Node::Bool(v))
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> std::result::Result<Node, E> {
        Ok(Node::Int(v))
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> std::result::Result<Node, E> {
        Ok(match i64::try_from(v) {
            Ok(v) => Node::Int(v),
            Err(_) => Node::UInt(v),
        })
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> std::result::Result<Node, E> {
        Ok(Node::Float(v))
    }

    fn visit_str<E: de::Error>(self, v: &str) -> std::result::Result<Node, E> {
        Ok(Node::String(v.to_owned()))
    }

    fn visit_string<E: de::Error>(self, v: String) -> std::result::Result<Node, E> {
        Ok(Node::String(v))
    }

    fn visit_seq<A>(self, mut seq: A) -> std::result::Result<Node, A::Error>
    where
        A: SeqAccess<'de>,
    {
        while seq.next_element::<IgnoredAny>()?.is_some() {}
        Ok(Node::Array)
    }

    fn visit_map<A>(self, mut map: A) -> std::result::Result<Node, A::Error>
    where
        A: MapAccess<'de>,
    {
        let mut members = Vec::new();
        while let Some(member) = map.next_entry::<String, Node>()? {
            members.push(member);
        }
        Ok(Node::Object(members))
    }
}

// =============================================================================
// Import
// =============================================================================

impl Config {
    /// Build a fresh config from a JSON document
    pub fn from_json(json: &str) -> Result<Config> {
        let mut config = Config::new();
        import_json(&mut config, json)?;
        Ok(config)
    }
}

/// Import every member of the JSON object `json` into `config`
pub fn import_json(config: &mut Config, json: &str) -> Result<()> {
    let document: Node = serde_json::from_str(json)
        .map_err(|e| KvError::ConfigParsing(format!("malformed JSON: {}", e)))?;

    let members = match document {
        Node::Object(members) => members,
        other => {
            return Err(KvError::ConfigParsing(format!(
                "JSON document is {}, expected an object",
                other.kind_name()
            )))
        }
    };

    import_object(config, &members).map_err(|e| {
        tracing::error!(error = %e, "config import failed");
        e
    })
}

fn import_object(config: &mut Config, members: &[(String, Node)]) -> Result<()> {
    validate_reserved(members)?;

    for (name, value) in members {
        import_member(config, name, value).map_err(|e| match e {
            KvError::ConfigParsing(_) => e,
            other => KvError::ConfigParsing(format!("cannot import member '{}': {}", name, other)),
        })?;
    }

    Ok(())
}

fn first_member<'a>(members: &'a [(String, Node)], name: &str) -> Option<&'a Node> {
    members.iter().find(|(n, _)| n == name).map(|(_, v)| v)
}

/// `path` and `size` are read by the engine factory, so their JSON kind is
/// checked before anything is imported.
fn validate_reserved(members: &[(String, Node)]) -> Result<()> {
    if let Some(path) = first_member(members, "path") {
        if !matches!(path, Node::String(_)) {
            return Err(KvError::ConfigParsing(
                "'path' in JSON is not a valid string".to_string(),
            ));
        }
    }
    if let Some(size) = first_member(members, "size") {
        if !size.is_number() {
            return Err(KvError::ConfigParsing(
                "'size' in JSON is not a valid number".to_string(),
            ));
        }
    }
    Ok(())
}

fn import_member(config: &mut Config, name: &str, value: &Node) -> Result<()> {
    match value {
        Node::String(s) => config.put_string(name, s),
        Node::Int(v) => config.put_int64(name, *v),
        Node::UInt(v) => config.put_uint64(name, *v),
        Node::Float(v) => config.put_double(name, *v),
        Node::Bool(b) => config.put_int64(name, i64::from(*b)),
        Node::Object(members) => {
            // Dropped here if the nested import fails
            let mut nested = Config::new();
            import_object(&mut nested, members).map_err(|e| {
                KvError::ConfigParsing(format!("cannot parse subconfig '{}': {}", name, e))
            })?;
            config.put_config(name, nested)
        }
        Node::Array | Node::Null => Err(KvError::ConfigParsing(format!(
            "unsupported data type in JSON member '{}': {}",
            name,
            value.kind_name()
        ))),
    }
}
