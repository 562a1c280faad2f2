//! Header parsing shared by all readers.
//!
//! Binary formats (LeCroy, SAFT) describe their header as a table of
//! fixed-offset fields, text formats (CIVA, Ultravision) as `key <sep> value`
//! lines. Both produce a [`HeaderFieldMap`] that lives only for one decode call.

mod binary;
mod text;

pub(crate) use binary::{packed, parse_binary_header, Endian, FieldKind, FieldSpec};
pub(crate) use text::{parse_number, split_unit, Separator, TextHeaderParser};

use std::collections::BTreeMap;

use crate::error::{DecodeError, Location, Result};
use crate::model::MetaValue;

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum HeaderValue {
    Integer(i64),
    Float(f64),
    Text(String),
}

impl HeaderValue {
    /// Integer when the token is integral, float when it parses as a number
    /// (decimal comma accepted), text otherwise.
    pub(crate) fn coerce(raw: &str) -> Self {
        let raw = raw.trim();
        if let Ok(i) = raw.parse::<i64>() {
            return HeaderValue::Integer(i);
        }
        match parse_number(raw) {
            Some(v) => HeaderValue::Float(v),
            None => HeaderValue::Text(raw.to_string()),
        }
    }

    fn to_meta(&self) -> MetaValue {
        match self {
            HeaderValue::Integer(i) => MetaValue::Integer(*i),
            HeaderValue::Float(v) => MetaValue::Float(*v),
            HeaderValue::Text(s) => MetaValue::Text(s.clone()),
        }
    }
}

#[derive(Debug, Clone)]
pub(crate) struct HeaderField {
    pub value: HeaderValue,
    pub raw: String,
    pub unit: Option<String>,
    pub location: Location,
}

/// Field name to decoded value, with the unit and source location of each field.
#[derive(Debug, Clone, Default)]
pub(crate) struct HeaderFieldMap {
    fields: BTreeMap<String, HeaderField>,
}

impl HeaderFieldMap {
    pub(crate) fn new() -> Self {
        HeaderFieldMap::default()
    }

    pub(crate) fn insert(&mut self, name: impl Into<String>, field: HeaderField) {
        self.fields.insert(name.into(), field);
    }

    pub(crate) fn get(&self, name: &str) -> Option<&HeaderValue> {
        self.fields.get(name).map(|f| &f.value)
    }

    pub(crate) fn field(&self, name: &str) -> Result<&HeaderField> {
        self.fields.get(name).ok_or_else(|| DecodeError::missing(name))
    }

    pub(crate) fn contains(&self, name: &str) -> bool {
        self.fields.contains_key(name)
    }

    pub(crate) fn len(&self) -> usize {
        self.fields.len()
    }

    pub(crate) fn unit(&self, name: &str) -> Option<&str> {
        self.fields.get(name).and_then(|f| f.unit.as_deref())
    }

    pub(crate) fn f64(&self, name: &str) -> Result<f64> {
        let field = self.field(name)?;
        match field.value {
            HeaderValue::Float(v) => Ok(v),
            HeaderValue::Integer(i) => Ok(i as f64),
            HeaderValue::Text(ref s) => Err(DecodeError::malformed(
                field.location,
                format!("field '{}' is not numeric: '{}'", name, s),
            )),
        }
    }

    pub(crate) fn i64(&self, name: &str) -> Result<i64> {
        let field = self.field(name)?;
        match field.value {
            HeaderValue::Integer(i) => Ok(i),
            HeaderValue::Float(v) if v.fract() == 0.0 && v.abs() < i64::MAX as f64 => Ok(v as i64),
            _ => Err(DecodeError::malformed(
                field.location,
                format!("field '{}' is not an integer: '{}'", name, field.raw),
            )),
        }
    }

    /// Non-negative integer field, typically an extent or count.
    pub(crate) fn usize(&self, name: &str) -> Result<usize> {
        let value = self.i64(name)?;
        usize::try_from(value).map_err(|_| {
            DecodeError::malformed(
                self.fields[name].location,
                format!("field '{}' must not be negative, got {}", name, value),
            )
        })
    }

    /// Raw text of a field, whatever type it was coerced to.
    pub(crate) fn text(&self, name: &str) -> Result<&str> {
        Ok(self.field(name)?.raw.as_str())
    }

    pub(crate) fn meta(&self, name: &str) -> Option<MetaValue> {
        self.get(name).map(HeaderValue::to_meta)
    }

    /// Every field as metadata, in key order.
    pub(crate) fn metas(&self) -> impl Iterator<Item = (&str, MetaValue)> + '_ {
        self.fields.iter().map(|(k, f)| (k.as_str(), f.value.to_meta()))
    }
}
