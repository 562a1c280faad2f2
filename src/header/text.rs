// Key/value text header lines

use super::{HeaderField, HeaderFieldMap, HeaderValue};
use crate::error::Location;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Separator {
    /// Value is the last whitespace-delimited token, the key everything before it.
    Whitespace,
    Char(char),
}

/// Splits `key <sep> value` lines into a [`HeaderFieldMap`].
///
/// Keys may carry a unit suffix, `ScanResol (mm)` or `X step [mm]`; the
/// suffix is stored as the field unit and removed from the key. When markers
/// are set only keys starting with one of them are kept.
#[derive(Debug, Clone)]
pub(crate) struct TextHeaderParser<'a> {
    separator: Separator,
    markers: &'a [&'a str],
}

impl<'a> TextHeaderParser<'a> {
    pub(crate) fn new(separator: Separator) -> Self {
        TextHeaderParser {
            separator,
            markers: &[],
        }
    }

    pub(crate) fn with_markers(mut self, markers: &'a [&'a str]) -> Self {
        self.markers = markers;
        self
    }

    pub(crate) fn is_header_line(&self, line: &str) -> bool {
        match self.separator {
            Separator::Char(c) => line.contains(c),
            Separator::Whitespace => line.trim().contains(char::is_whitespace),
        }
    }

    /// Parse numbered lines (1-based). Lines without a separator or with an
    /// unrecognized key are skipped.
    pub(crate) fn parse<'l, I>(&self, lines: I) -> HeaderFieldMap
    where
        I: IntoIterator<Item = (usize, &'l str)>,
    {
        let mut map = HeaderFieldMap::new();
        for (line_no, line) in lines {
            let Some((key, unit, raw)) = self.split_line(line) else {
                continue;
            };
            if !self.recognized(&key) {
                continue;
            }
            map.insert(
                key,
                HeaderField {
                    value: HeaderValue::coerce(&raw),
                    raw,
                    unit,
                    location: Location::Line(line_no),
                },
            );
        }
        map
    }

    fn recognized(&self, key: &str) -> bool {
        self.markers.is_empty() || self.markers.iter().any(|m| key.starts_with(m))
    }

    fn split_line(&self, line: &str) -> Option<(String, Option<String>, String)> {
        let line = line.trim();
        let (label, rest) = match self.separator {
            Separator::Char(c) => {
                let (label, rest) = line.split_once(c)?;
                let value = rest
                    .split(c)
                    .map(str::trim)
                    .find(|t| !t.is_empty())
                    .unwrap_or("");
                (label, value)
            }
            Separator::Whitespace => line.rsplit_once(char::is_whitespace)?,
        };
        let (key, unit) = split_unit(label);
        if key.is_empty() {
            return None;
        }
        Some((key, unit, rest.trim().to_string()))
    }
}

/// Split a label into its key and the unit of a trailing `(unit)` or
/// `[unit]` group, which may span several words (`USoundStart (Half Path us)`).
pub(crate) fn split_unit(label: &str) -> (String, Option<String>) {
    let label = label.trim();
    let Some(open) = label.find(|c: char| c == '(' || c == '[') else {
        return (label.split_whitespace().collect::<Vec<_>>().join(" "), None);
    };
    let key = label[..open].split_whitespace().collect::<Vec<_>>().join(" ");
    let unit = label[open + 1..]
        .trim_end()
        .strip_suffix(|c: char| c == ')' || c == ']')
        .map(|u| u.trim().to_string())
        .filter(|u| !u.is_empty());
    (key, unit)
}

/// Parse a numeric token, accepting a decimal comma.
pub(crate) fn parse_number(token: &str) -> Option<f64> {
    let token = token.trim();
    if token.is_empty() {
        return None;
    }
    token
        .parse::<f64>()
        .ok()
        .or_else(|| token.replace(',', ".").parse::<f64>().ok())
}
