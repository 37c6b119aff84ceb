use serde::{Serialize, Deserialize};
use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;
use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Natural language text with an optional language tag
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Text {
    pub text: String,
    pub language: Option<String>,
}

impl Text {
    pub fn new(text: impl Into<String>, language: Option<&str>) -> Self {
        Text {
            text: text.into(),
            language: language.filter(|l| !l.is_empty()).map(str::to_string),
        }
    }
}

/// A single property value of an entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    Bool(bool),
    Byte(i8),
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    Reference(String),
    Date(DateTime<Utc>),
    Duration(Duration),
    Str(String),
    Text(Text),
    Uuid(Uuid),
    /// A literal with a datatype the hub has no native form for
    Typed { datatype: String, lexical: String },
}

/// Discriminant of [`Value`], used to look up converters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ValueKind {
    Bool,
    Byte,
    Int,
    Long,
    Float,
    Double,
    Reference,
    Date,
    Duration,
    Str,
    Text,
    Uuid,
    Typed,
}

impl Value {
    pub fn text(text: impl Into<String>, language: Option<&str>) -> Self {
        Value::Text(Text::new(text, language))
    }

    pub fn reference(uri: impl Into<String>) -> Self {
        Value::Reference(uri.into())
    }

    pub fn kind(&self) -> ValueKind {
        match self {
            Value::Bool(_) => ValueKind::Bool,
            Value::Byte(_) => ValueKind::Byte,
            Value::Int(_) => ValueKind::Int,
            Value::Long(_) => ValueKind::Long,
            Value::Float(_) => ValueKind::Float,
            Value::Double(_) => ValueKind::Double,
            Value::Reference(_) => ValueKind::Reference,
            Value::Date(_) => ValueKind::Date,
            Value::Duration(_) => ValueKind::Duration,
            Value::Str(_) => ValueKind::Str,
            Value::Text(_) => ValueKind::Text,
            Value::Uuid(_) => ValueKind::Uuid,
            Value::Typed { .. } => ValueKind::Typed,
        }
    }

    pub fn language(&self) -> Option<&str> {
        match self {
            Value::Text(t) => t.language.as_deref(),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Byte(v) => Some(*v as f64),
            Value::Int(v) => Some(*v as f64),
            Value::Long(v) => Some(*v as f64),
            Value::Float(v) => Some(*v as f64),
            Value::Double(v) => Some(*v),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Value::Bool(v) => write!(f, "{}", v),
            Value::Byte(v) => write!(f, "{}", v),
            Value::Int(v) => write!(f, "{}", v),
            Value::Long(v) => write!(f, "{}", v),
            Value::Float(v) => write!(f, "{}", v),
            Value::Double(v) => write!(f, "{}", v),
            Value::Reference(v) => write!(f, "{}", v),
            Value::Date(v) => write!(f, "{}", v.to_rfc3339()),
            Value::Duration(v) => write!(f, "{:?}", v),
            Value::Str(v) => write!(f, "{}", v),
            Value::Text(t) => match &t.language {
                Some(lang) => write!(f, "{}@{}", t.text, lang),
                None => write!(f, "{}", t.text),
            },
            Value::Uuid(v) => write!(f, "{}", v),
            Value::Typed { lexical, .. } => write!(f, "{}", lexical),
        }
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Str(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Str(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Long(v)
    }
}

impl From<f32> for Value {
    fn from(v: f32) -> Self {
        Value::Float(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Double(v)
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(v: DateTime<Utc>) -> Self {
        Value::Date(v)
    }
}

impl From<Text> for Value {
    fn from(v: Text) -> Self {
        Value::Text(v)
    }
}

/// An entity: identifier plus a multi-valued property map
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Representation {
    pub id: String,
    pub fields: BTreeMap<String, Vec<Value>>,
}

impl Representation {
    pub fn new(id: impl Into<String>) -> Self {
        Representation {
            id: id.into(),
            fields: BTreeMap::new(),
        }
    }

    pub fn add(&mut self, field: impl Into<String>, value: impl Into<Value>) {
        let value = value.into();
        let values = self.fields.entry(field.into()).or_default();
        if !values.contains(&value) {
            values.push(value);
        }
    }

    /// Replaces all values of the field
    pub fn set(&mut self, field: impl Into<String>, value: impl Into<Value>) {
        self.fields.insert(field.into(), vec![value.into()]);
    }

    pub fn get(&self, field: &str) -> &[Value] {
        self.fields.get(field).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn first(&self, field: &str) -> Option<&Value> {
        self.get(field).first()
    }

    pub fn remove_field(&mut self, field: &str) -> Option<Vec<Value>> {
        self.fields.remove(field)
    }

    pub fn remove_value(&mut self, field: &str, value: &Value) {
        if let Some(values) = self.fields.get_mut(field) {
            values.retain(|v| v != value);
            if values.is_empty() {
                self.fields.remove(field);
            }
        }
    }

    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    /// Text values of the field, optionally restricted to the given languages
    pub fn texts<'a>(&'a self, field: &str, languages: &'a [&str]) -> impl Iterator<Item = &'a Text> + 'a {
        self.get(field).iter().filter_map(move |v| match v {
            Value::Text(t) if languages.is_empty()
                || languages.iter().any(|l| t.language.as_deref() == Some(*l)) => Some(t),
            _ => None,
        })
    }

    pub fn references(&self, field: &str) -> impl Iterator<Item = &str> {
        self.get(field).iter().filter_map(|v| match v {
            Value::Reference(r) => Some(r.as_str()),
            _ => None,
        })
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}
