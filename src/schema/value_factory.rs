use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use chrono::{DateTime, SecondsFormat, Utc};
use uuid::Uuid;
use crate::core::error::{Error, ErrorKind, Result};
use crate::core::types::{Text, Value, ValueKind};
use crate::schema::datatype::IndexDataType;
use crate::schema::index_value::IndexValue;

/// Converts one native value kind to and from its index form
pub trait TypeConverter: Send + Sync {
    fn kind(&self) -> ValueKind;

    fn data_type(&self) -> IndexDataType;

    fn to_index_value(&self, value: &Value) -> Result<IndexValue>;

    fn to_value(&self, lexical: &str, language: Option<&str>) -> Result<Value>;
}

fn invalid(value: &Value, expected: &str) -> Error {
    Error::new(ErrorKind::InvalidValue, format!("{:?} is not a valid {} value", value, expected))
}

fn unparsable(lexical: &str, data_type: IndexDataType) -> Error {
    Error::new(ErrorKind::InvalidValue, format!("'{}' can not be read as {:?}", lexical, data_type))
}

fn non_empty(value: &Value, lexical: &str) -> Result<()> {
    if lexical.is_empty() {
        return Err(invalid(value, "non-empty"));
    }
    Ok(())
}

pub struct BooleanConverter;

impl TypeConverter for BooleanConverter {
    fn kind(&self) -> ValueKind { ValueKind::Bool }

    fn data_type(&self) -> IndexDataType { IndexDataType::Boolean }

    fn to_index_value(&self, value: &Value) -> Result<IndexValue> {
        match value {
            Value::Bool(b) => Ok(IndexValue::new(b.to_string(), IndexDataType::Boolean)),
            other => Err(invalid(other, "boolean")),
        }
    }

    fn to_value(&self, lexical: &str, _: Option<&str>) -> Result<Value> {
        match lexical {
            "true" | "1" => Ok(Value::Bool(true)),
            "false" | "0" => Ok(Value::Bool(false)),
            _ => Err(unparsable(lexical, IndexDataType::Boolean)),
        }
    }
}

pub struct ByteConverter;

impl TypeConverter for ByteConverter {
    fn kind(&self) -> ValueKind { ValueKind::Byte }

    fn data_type(&self) -> IndexDataType { IndexDataType::Byte }

    fn to_index_value(&self, value: &Value) -> Result<IndexValue> {
        match value {
            Value::Byte(v) => Ok(IndexValue::new(v.to_string(), IndexDataType::Byte)),
            other => Err(invalid(other, "byte")),
        }
    }

    fn to_value(&self, lexical: &str, _: Option<&str>) -> Result<Value> {
        lexical.parse().map(Value::Byte).map_err(|_| unparsable(lexical, IndexDataType::Byte))
    }
}

pub struct IntConverter;

impl TypeConverter for IntConverter {
    fn kind(&self) -> ValueKind { ValueKind::Int }

    fn data_type(&self) -> IndexDataType { IndexDataType::Int }

    fn to_index_value(&self, value: &Value) -> Result<IndexValue> {
        match value {
            Value::Int(v) => Ok(IndexValue::new(v.to_string(), IndexDataType::Int)),
            other => Err(invalid(other, "int")),
        }
    }

    fn to_value(&self, lexical: &str, _: Option<&str>) -> Result<Value> {
        lexical.parse().map(Value::Int).map_err(|_| unparsable(lexical, IndexDataType::Int))
    }
}

pub struct LongConverter;

impl TypeConverter for LongConverter {
    fn kind(&self) -> ValueKind { ValueKind::Long }

    fn data_type(&self) -> IndexDataType { IndexDataType::Long }

    fn to_index_value(&self, value: &Value) -> Result<IndexValue> {
        match value {
            Value::Long(v) => Ok(IndexValue::new(v.to_string(), IndexDataType::Long)),
            other => Err(invalid(other, "long")),
        }
    }

    fn to_value(&self, lexical: &str, _: Option<&str>) -> Result<Value> {
        lexical.parse().map(Value::Long).map_err(|_| unparsable(lexical, IndexDataType::Long))
    }
}

pub struct FloatConverter;

impl TypeConverter for FloatConverter {
    fn kind(&self) -> ValueKind { ValueKind::Float }

    fn data_type(&self) -> IndexDataType { IndexDataType::Float }

    fn to_index_value(&self, value: &Value) -> Result<IndexValue> {
        match value {
            Value::Float(v) => Ok(IndexValue::new(v.to_string(), IndexDataType::Float)),
            other => Err(invalid(other, "float")),
        }
    }

    fn to_value(&self, lexical: &str, _: Option<&str>) -> Result<Value> {
        lexical.parse().map(Value::Float).map_err(|_| unparsable(lexical, IndexDataType::Float))
    }
}

pub struct DoubleConverter;

impl TypeConverter for DoubleConverter {
    fn kind(&self) -> ValueKind { ValueKind::Double }

    fn data_type(&self) -> IndexDataType { IndexDataType::Double }

    fn to_index_value(&self, value: &Value) -> Result<IndexValue> {
        match value {
            Value::Double(v) => Ok(IndexValue::new(v.to_string(), IndexDataType::Double)),
            other => Err(invalid(other, "double")),
        }
    }

    fn to_value(&self, lexical: &str, _: Option<&str>) -> Result<Value> {
        lexical.parse().map(Value::Double).map_err(|_| unparsable(lexical, IndexDataType::Double))
    }
}

pub struct ReferenceConverter;

impl TypeConverter for ReferenceConverter {
    fn kind(&self) -> ValueKind { ValueKind::Reference }

    fn data_type(&self) -> IndexDataType { IndexDataType::Ref }

    fn to_index_value(&self, value: &Value) -> Result<IndexValue> {
        match value {
            Value::Reference(uri) => {
                non_empty(value, uri)?;
                Ok(IndexValue::new(uri.clone(), IndexDataType::Ref))
            }
            other => Err(invalid(other, "reference")),
        }
    }

    fn to_value(&self, lexical: &str, _: Option<&str>) -> Result<Value> {
        Ok(Value::Reference(lexical.to_string()))
    }
}

pub struct DateConverter;

impl TypeConverter for DateConverter {
    fn kind(&self) -> ValueKind { ValueKind::Date }

    fn data_type(&self) -> IndexDataType { IndexDataType::Date }

    fn to_index_value(&self, value: &Value) -> Result<IndexValue> {
        match value {
            Value::Date(d) => Ok(IndexValue::new(d.to_rfc3339_opts(SecondsFormat::Millis, true),
                                                 IndexDataType::Date)),
            other => Err(invalid(other, "date")),
        }
    }

    fn to_value(&self, lexical: &str, _: Option<&str>) -> Result<Value> {
        let date = DateTime::parse_from_rfc3339(lexical)?;
        Ok(Value::Date(date.with_timezone(&Utc)))
    }
}

/// Writes `xsd:duration` in day/time form (`P1DT2H3M4.5S`)
pub fn format_duration(duration: &Duration) -> String {
    let secs = duration.as_secs();
    let nanos = duration.subsec_nanos();
    let (days, rem) = (secs / 86_400, secs % 86_400);
    let (hours, rem) = (rem / 3600, rem % 3600);
    let (minutes, seconds) = (rem / 60, rem % 60);

    let mut out = String::from("P");
    if days > 0 {
        out.push_str(&format!("{}D", days));
    }
    out.push('T');
    if hours > 0 {
        out.push_str(&format!("{}H", hours));
    }
    if minutes > 0 {
        out.push_str(&format!("{}M", minutes));
    }
    if nanos > 0 {
        let frac = format!("{:09}", nanos);
        out.push_str(&format!("{}.{}S", seconds, frac.trim_end_matches('0')));
    } else {
        out.push_str(&format!("{}S", seconds));
    }
    out
}

pub fn parse_duration(lexical: &str) -> Option<Duration> {
    let rest = lexical.strip_prefix('P')?;
    let (date, time) = match rest.split_once('T') {
        Some((date, time)) => (date, Some(time)),
        None => (rest, None),
    };
    let mut secs = 0u64;
    let mut nanos = 0u32;
    if !date.is_empty() {
        secs += date.strip_suffix('D')?.parse::<u64>().ok()? * 86_400;
    }
    if let Some(mut time) = time {
        for (unit, factor) in [('H', 3600u64), ('M', 60)] {
            if let Some(pos) = time.find(unit) {
                secs += time[..pos].parse::<u64>().ok()? * factor;
                time = &time[pos + 1..];
            }
        }
        if !time.is_empty() {
            let seconds = time.strip_suffix('S')?;
            let (whole, frac) = seconds.split_once('.').unwrap_or((seconds, ""));
            secs += whole.parse::<u64>().ok()?;
            if !frac.is_empty() {
                if frac.len() > 9 || !frac.bytes().all(|b| b.is_ascii_digit()) {
                    return None;
                }
                nanos = format!("{:0<9}", frac).parse().ok()?;
            }
        }
    }
    Some(Duration::new(secs, nanos))
}

pub struct DurationConverter;

impl TypeConverter for DurationConverter {
    fn kind(&self) -> ValueKind { ValueKind::Duration }

    fn data_type(&self) -> IndexDataType { IndexDataType::Dur }

    fn to_index_value(&self, value: &Value) -> Result<IndexValue> {
        match value {
            Value::Duration(d) => Ok(IndexValue::new(format_duration(d), IndexDataType::Dur)),
            other => Err(invalid(other, "duration")),
        }
    }

    fn to_value(&self, lexical: &str, _: Option<&str>) -> Result<Value> {
        parse_duration(lexical)
            .map(Value::Duration)
            .ok_or_else(|| unparsable(lexical, IndexDataType::Dur))
    }
}

pub struct StringConverter;

impl TypeConverter for StringConverter {
    fn kind(&self) -> ValueKind { ValueKind::Str }

    fn data_type(&self) -> IndexDataType { IndexDataType::Str }

    fn to_index_value(&self, value: &Value) -> Result<IndexValue> {
        match value {
            Value::Str(s) => {
                non_empty(value, s)?;
                Ok(IndexValue::new(s.clone(), IndexDataType::Str))
            }
            other => Err(invalid(other, "string")),
        }
    }

    fn to_value(&self, lexical: &str, _: Option<&str>) -> Result<Value> {
        Ok(Value::Str(lexical.to_string()))
    }
}

pub struct TextConverter;

impl TypeConverter for TextConverter {
    fn kind(&self) -> ValueKind { ValueKind::Text }

    fn data_type(&self) -> IndexDataType { IndexDataType::Txt }

    fn to_index_value(&self, value: &Value) -> Result<IndexValue> {
        match value {
            Value::Text(t) => {
                non_empty(value, &t.text)?;
                Ok(IndexValue::with_language(t.text.clone(), IndexDataType::Txt, t.language.as_deref()))
            }
            other => Err(invalid(other, "text")),
        }
    }

    fn to_value(&self, lexical: &str, language: Option<&str>) -> Result<Value> {
        Ok(Value::Text(Text::new(lexical, language)))
    }
}

pub struct UuidConverter;

impl TypeConverter for UuidConverter {
    fn kind(&self) -> ValueKind { ValueKind::Uuid }

    fn data_type(&self) -> IndexDataType { IndexDataType::Id }

    fn to_index_value(&self, value: &Value) -> Result<IndexValue> {
        match value {
            Value::Uuid(id) => Ok(IndexValue::new(id.to_string(), IndexDataType::Id)),
            other => Err(invalid(other, "uuid")),
        }
    }

    fn to_value(&self, lexical: &str, _: Option<&str>) -> Result<Value> {
        Uuid::parse_str(lexical).map(Value::Uuid).map_err(|_| unparsable(lexical, IndexDataType::Id))
    }
}

/// Registry of converters between native values and index values.
///
/// Lookups go by the runtime kind of a value when writing and by the
/// index datatype when reading. A missing converter is reported as
/// [`ErrorKind::NoConverter`] so callers can fall back to the string form.
pub struct IndexValueFactory {
    by_kind: HashMap<ValueKind, Arc<dyn TypeConverter>>,
    by_data_type: HashMap<IndexDataType, Arc<dyn TypeConverter>>,
}

impl IndexValueFactory {
    /// Factory without any converter
    pub fn empty() -> Self {
        IndexValueFactory {
            by_kind: HashMap::new(),
            by_data_type: HashMap::new(),
        }
    }

    pub fn new() -> Self {
        let mut factory = Self::empty();
        factory.register_converter(Arc::new(BooleanConverter));
        factory.register_converter(Arc::new(ByteConverter));
        factory.register_converter(Arc::new(IntConverter));
        factory.register_converter(Arc::new(LongConverter));
        factory.register_converter(Arc::new(FloatConverter));
        factory.register_converter(Arc::new(DoubleConverter));
        factory.register_converter(Arc::new(ReferenceConverter));
        factory.register_converter(Arc::new(DateConverter));
        factory.register_converter(Arc::new(DurationConverter));
        factory.register_converter(Arc::new(StringConverter));
        factory.register_converter(Arc::new(TextConverter));
        factory.register_converter(Arc::new(UuidConverter));
        factory
    }

    /// Replaces any converter registered for the same kind or datatype
    pub fn register_converter(&mut self, converter: Arc<dyn TypeConverter>) {
        self.by_data_type.insert(converter.data_type(), converter.clone());
        self.by_kind.insert(converter.kind(), converter);
    }

    pub fn remove_converter(&mut self, kind: ValueKind) -> Option<Arc<dyn TypeConverter>> {
        let removed = self.by_kind.remove(&kind)?;
        let data_type = removed.data_type();
        if self.by_data_type.get(&data_type).is_some_and(|c| c.kind() == kind) {
            self.by_data_type.remove(&data_type);
        }
        Some(removed)
    }

    pub fn has_converter(&self, kind: ValueKind) -> bool {
        self.by_kind.contains_key(&kind)
    }

    pub fn create_index_value(&self, value: &Value) -> Result<IndexValue> {
        match self.by_kind.get(&value.kind()) {
            Some(converter) => converter.to_index_value(value),
            None => Err(Error::new(ErrorKind::NoConverter,
                format!("no converter for values of kind {:?} ({})", value.kind(), value))),
        }
    }

    /// Like [`create_index_value`](Self::create_index_value) but falls back
    /// to the lexical form typed as string when no converter exists
    pub fn create_index_value_or_string(&self, value: &Value) -> Result<IndexValue> {
        match self.create_index_value(value) {
            Err(e) if e.is(ErrorKind::NoConverter) => {
                tracing::debug!("{} -> indexing as string", e.context);
                Ok(IndexValue::new(value.to_string(), IndexDataType::Str))
            }
            other => other,
        }
    }

    pub fn create_value(&self, data_type: IndexDataType, lexical: &str, language: Option<&str>) -> Result<Value> {
        match self.by_data_type.get(&data_type) {
            Some(converter) => converter.to_value(lexical, language),
            None => Err(Error::new(ErrorKind::NoConverter,
                format!("no converter for index datatype {:?}", data_type))),
        }
    }
}

impl Default for IndexValueFactory {
    fn default() -> Self {
        Self::new()
    }
}
