//! Override rule set.
//!
//! # Responsibilities
//! - Parse the JSON rules document (`{"language": "zh", "temperature": 0.2}`)
//! - Reject values a multipart text field cannot carry (null, objects, nested lists)
//! - Render rule values into outbound form field values
//!
//! # Design Decisions
//! - Immutable after load; shared via `Arc`, no synchronization on reads
//! - Rules keep document order so appended fields are deterministic
//! - An empty object is a valid rule set (identity rewrite)

use serde_json::{Number, Value};

use crate::config::schema::ListEncoding;

/// A primitive rule value.
#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
    Text(String),
    Number(Number),
    Bool(bool),
}

impl Scalar {
    fn from_json(field: &str, value: Value) -> Result<Self, RulesError> {
        match value {
            Value::String(s) => Ok(Scalar::Text(s)),
            Value::Number(n) => Ok(Scalar::Number(n)),
            Value::Bool(b) => Ok(Scalar::Bool(b)),
            other => Err(RulesError::UnsupportedValue {
                field: field.to_string(),
                kind: json_kind(&other),
            }),
        }
    }

    /// Form field text for this value.
    pub fn render(&self) -> String {
        match self {
            Scalar::Text(s) => s.clone(),
            Scalar::Number(n) => n.to_string(),
            Scalar::Bool(b) => b.to_string(),
        }
    }

    fn to_json(&self) -> Value {
        match self {
            Scalar::Text(s) => Value::String(s.clone()),
            Scalar::Number(n) => Value::Number(n.clone()),
            Scalar::Bool(b) => Value::Bool(*b),
        }
    }
}

/// Value forced onto a form field.
#[derive(Debug, Clone, PartialEq)]
pub enum RuleValue {
    Scalar(Scalar),
    List(Vec<Scalar>),
}

impl RuleValue {
    /// Render into one or more field values.
    ///
    /// Scalars always produce exactly one value. Lists follow `encoding`;
    /// an empty list with [`ListEncoding::Repeated`] produces no values.
    pub fn render(&self, encoding: ListEncoding) -> Vec<String> {
        match self {
            RuleValue::Scalar(s) => vec![s.render()],
            RuleValue::List(items) => match encoding {
                ListEncoding::Comma => vec![items
                    .iter()
                    .map(Scalar::render)
                    .collect::<Vec<_>>()
                    .join(",")],
                ListEncoding::Repeated => items.iter().map(Scalar::render).collect(),
                ListEncoding::Json => {
                    let array = Value::Array(items.iter().map(Scalar::to_json).collect());
                    vec![array.to_string()]
                }
            },
        }
    }
}

/// Error raised while parsing a rules document.
#[derive(Debug, thiserror::Error)]
pub enum RulesError {
    #[error("rules document is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("rules document must be a JSON object, found {0}")]
    NotAnObject(&'static str),

    #[error("rule `{field}` has unsupported value type {kind}")]
    UnsupportedValue { field: String, kind: &'static str },

    #[error("rule name must not be empty")]
    EmptyName,
}

/// Immutable mapping of form field name to forced value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OverrideRules {
    rules: Vec<(String, RuleValue)>,
}

impl OverrideRules {
    /// Parse a JSON rules document.
    pub fn from_json_str(input: &str) -> Result<Self, RulesError> {
        let root: Value = serde_json::from_str(input)?;
        Self::from_json(root)
    }

    /// Build rules from an already parsed JSON value.
    pub fn from_json(root: Value) -> Result<Self, RulesError> {
        let Value::Object(map) = root else {
            return Err(RulesError::NotAnObject(json_kind(&root)));
        };

        let mut rules = Vec::with_capacity(map.len());
        for (field, value) in map {
            if field.is_empty() {
                return Err(RulesError::EmptyName);
            }
            let value = match value {
                Value::Array(items) => RuleValue::List(
                    items
                        .into_iter()
                        .map(|item| Scalar::from_json(&field, item))
                        .collect::<Result<_, _>>()?,
                ),
                other => RuleValue::Scalar(Scalar::from_json(&field, other)?),
            };
            rules.push((field, value));
        }

        Ok(Self { rules })
    }

    /// Rule for `field` together with its position in document order.
    pub fn lookup(&self, field: &str) -> Option<(usize, &RuleValue)> {
        self.rules
            .iter()
            .enumerate()
            .find(|(_, (name, _))| name == field)
            .map(|(index, (_, value))| (index, value))
    }

    pub fn get(&self, field: &str) -> Option<&RuleValue> {
        self.lookup(field).map(|(_, value)| value)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &RuleValue)> {
        self.rules.iter().map(|(name, value)| (name.as_str(), value))
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Field names, in document order.
    pub fn field_names(&self) -> Vec<&str> {
        self.rules.iter().map(|(name, _)| name.as_str()).collect()
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
