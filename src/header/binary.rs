// Fixed-offset binary header fields

use byteorder::{BigEndian, ByteOrder, LittleEndian};

use super::{HeaderField, HeaderFieldMap, HeaderValue};
use crate::error::{DecodeError, Location, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Endian {
    Little,
    Big,
}

/// How the bytes of a field are interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum FieldKind {
    U8,
    I16,
    I32,
    F32,
    F64,
    /// Padded string.
    Text,
    /// ASCII digits holding an integer.
    TextInt,
    /// ASCII digits holding a float.
    TextFloat,
    /// ASCII float if it parses, string otherwise.
    TextAuto,
}

impl FieldKind {
    fn width(self) -> Option<usize> {
        match self {
            FieldKind::U8 => Some(1),
            FieldKind::I16 => Some(2),
            FieldKind::I32 | FieldKind::F32 => Some(4),
            FieldKind::F64 => Some(8),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub(crate) struct FieldSpec {
    pub name: &'static str,
    pub offset: usize,
    pub len: usize,
    pub kind: FieldKind,
}

impl FieldSpec {
    pub(crate) const fn new(name: &'static str, offset: usize, len: usize, kind: FieldKind) -> Self {
        FieldSpec {
            name,
            offset,
            len,
            kind,
        }
    }
}

/// Lay out back-to-back fields, each starting where the previous one ended.
pub(crate) fn packed(fields: &[(&'static str, usize, FieldKind)]) -> Vec<FieldSpec> {
    let mut offset = 0;
    fields
        .iter()
        .map(|&(name, len, kind)| {
            let spec = FieldSpec::new(name, offset, len, kind);
            offset += len;
            spec
        })
        .collect()
}

/// Decode `layout` from `buf`. `base` is the absolute file offset of
/// `buf[0]` and is only used to report error locations.
pub(crate) fn parse_binary_header(
    buf: &[u8],
    layout: &[FieldSpec],
    endian: Endian,
    base: usize,
) -> Result<HeaderFieldMap> {
    let required = layout.iter().map(|f| f.offset + f.len).max().unwrap_or(0);
    if buf.len() < required {
        return Err(DecodeError::malformed(
            Location::Byte(base + buf.len()),
            format!("header needs {} bytes, only {} available", required, buf.len()),
        ));
    }

    let mut map = HeaderFieldMap::new();
    for spec in layout {
        let location = Location::Byte(base + spec.offset);
        let bytes = &buf[spec.offset..spec.offset + spec.len];
        let (value, raw) = decode_field(spec, bytes, endian, location)?;
        map.insert(
            spec.name,
            HeaderField {
                value,
                raw,
                unit: None,
                location,
            },
        );
    }
    Ok(map)
}

fn decode_field(
    spec: &FieldSpec,
    bytes: &[u8],
    endian: Endian,
    location: Location,
) -> Result<(HeaderValue, String)> {
    if let Some(width) = spec.kind.width() {
        if width != spec.len {
            return Err(DecodeError::malformed(
                location,
                format!("field '{}' declared {} bytes for a {}-byte type", spec.name, spec.len, width),
            ));
        }
        let value = match endian {
            Endian::Little => read_numeric::<LittleEndian>(spec.kind, bytes),
            Endian::Big => read_numeric::<BigEndian>(spec.kind, bytes),
        };
        if let HeaderValue::Float(v) = value {
            if !v.is_finite() {
                return Err(DecodeError::malformed(
                    location,
                    format!("field '{}' holds a non-finite float", spec.name),
                ));
            }
        }
        let raw = match value {
            HeaderValue::Integer(i) => i.to_string(),
            HeaderValue::Float(v) => v.to_string(),
            HeaderValue::Text(ref s) => s.clone(),
        };
        return Ok((value, raw));
    }

    let text = padded_string(bytes);
    let value = match spec.kind {
        FieldKind::TextInt => text
            .parse::<i64>()
            .map(HeaderValue::Integer)
            .map_err(|_| not_a_number(spec, &text, location))?,
        FieldKind::TextFloat => match text.parse::<f64>() {
            Ok(v) if v.is_finite() => HeaderValue::Float(v),
            _ => return Err(not_a_number(spec, &text, location)),
        },
        FieldKind::TextAuto => match text.parse::<f64>() {
            Ok(v) if v.is_finite() => HeaderValue::Float(v),
            _ => HeaderValue::Text(text.clone()),
        },
        _ => HeaderValue::Text(text.clone()),
    };
    Ok((value, text))
}

fn read_numeric<B: ByteOrder>(kind: FieldKind, bytes: &[u8]) -> HeaderValue {
    match kind {
        FieldKind::U8 => HeaderValue::Integer(bytes[0] as i64),
        FieldKind::I16 => HeaderValue::Integer(B::read_i16(bytes) as i64),
        FieldKind::I32 => HeaderValue::Integer(B::read_i32(bytes) as i64),
        FieldKind::F32 => HeaderValue::Float(B::read_f32(bytes) as f64),
        FieldKind::F64 => HeaderValue::Float(B::read_f64(bytes)),
        _ => HeaderValue::Text(String::new()),
    }
}

/// Bytes as Latin-1 text, stripped of NUL, 0xCD fill and whitespace.
fn padded_string(bytes: &[u8]) -> String {
    let text: String = bytes.iter().map(|&b| b as char).collect();
    text.trim_matches(|c: char| c == '\0' || c == '\u{cd}' || c.is_whitespace())
        .to_string()
}

fn not_a_number(spec: &FieldSpec, text: &str, location: Location) -> DecodeError {
    DecodeError::malformed(
        location,
        format!("field '{}' is not a valid number: '{}'", spec.name, text),
    )
}
