// Decoded entities returned by every reader

use std::collections::BTreeMap;
use std::fmt;

use chrono::NaiveDateTime;
use serde::ser::{Serialize, SerializeMap, Serializer};

use crate::error::{DecodeError, Result};

/// A coordinate name paired with its physical unit.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct UnitTag {
    pub name: String,
    pub unit: String,
}

impl UnitTag {
    pub fn new(name: impl Into<String>, unit: impl Into<String>) -> Self {
        UnitTag {
            name: name.into(),
            unit: unit.into(),
        }
    }
}

impl fmt::Display for UnitTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} [{}]", self.name, self.unit)
    }
}

/// An ordered coordinate axis.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct Axis {
    pub tag: UnitTag,
    pub values: Vec<f64>,
}

impl Axis {
    pub fn name(&self) -> &str {
        &self.tag.name
    }

    pub fn unit(&self) -> &str {
        &self.tag.unit
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn first(&self) -> Option<f64> {
        self.values.first().copied()
    }

    pub fn last(&self) -> Option<f64> {
        self.values.last().copied()
    }

    /// Distance between the first two samples, if the axis has two.
    pub fn spacing(&self) -> Option<f64> {
        match self.values.as_slice() {
            [a, b, ..] => Some(b - a),
            _ => None,
        }
    }

    /// True when the values are strictly increasing or strictly decreasing.
    pub fn is_monotonic(&self) -> bool {
        let rising = self.values.windows(2).all(|w| w[1] > w[0]);
        let falling = self.values.windows(2).all(|w| w[1] < w[0]);
        rising || falling
    }
}

/// Scalar metadata value used in info and attribute maps.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
#[serde(untagged)]
pub enum MetaValue {
    Integer(i64),
    Float(f64),
    Text(String),
    Bool(bool),
    Timestamp(NaiveDateTime),
}

impl MetaValue {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            MetaValue::Float(v) => Some(*v),
            MetaValue::Integer(i) => Some(*i as f64),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            MetaValue::Text(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for MetaValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MetaValue::Integer(i) => write!(f, "{i}"),
            MetaValue::Float(v) => write!(f, "{v}"),
            MetaValue::Text(s) => write!(f, "{s}"),
            MetaValue::Bool(b) => write!(f, "{b}"),
            MetaValue::Timestamp(t) => write!(f, "{}", t.format("%Y-%m-%d %H:%M:%S%.6f")),
        }
    }
}

impl From<f64> for MetaValue {
    fn from(v: f64) -> Self {
        MetaValue::Float(v)
    }
}

impl From<i64> for MetaValue {
    fn from(v: i64) -> Self {
        MetaValue::Integer(v)
    }
}

impl From<bool> for MetaValue {
    fn from(v: bool) -> Self {
        MetaValue::Bool(v)
    }
}

impl From<&str> for MetaValue {
    fn from(v: &str) -> Self {
        MetaValue::Text(v.to_string())
    }
}

impl From<String> for MetaValue {
    fn from(v: String) -> Self {
        MetaValue::Text(v)
    }
}

impl From<NaiveDateTime> for MetaValue {
    fn from(v: NaiveDateTime) -> Self {
        MetaValue::Timestamp(v)
    }
}

pub type InfoMap = BTreeMap<String, MetaValue>;

/// N-dimensional sampled array with one labeled axis per dimension.
///
/// Data is stored row-major: the last axis varies fastest. Once built the
/// array cannot be mutated, so the axis/shape agreement checked in
/// [`LabeledArray::new`] holds for its whole life.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct LabeledArray {
    data: Vec<f64>,
    shape: Vec<usize>,
    axes: Vec<Axis>,
    attrs: InfoMap,
}

impl LabeledArray {
    pub fn new(data: Vec<f64>, axes: Vec<Axis>, attrs: InfoMap) -> Result<Self> {
        let shape: Vec<usize> = axes.iter().map(Axis::len).collect();
        let expected: usize = shape.iter().product();
        if data.len() != expected {
            return Err(DecodeError::DimensionMismatch {
                what: format!("array of shape {:?}", shape),
                expected,
                actual: data.len(),
            });
        }

        for (i, axis) in axes.iter().enumerate() {
            if !axis.is_monotonic() {
                return Err(DecodeError::InvalidAxis {
                    axis: axis.name().to_string(),
                    reason: "values are not strictly monotonic".to_string(),
                });
            }
            if axes[..i].iter().any(|a| a.name() == axis.name()) {
                return Err(DecodeError::InvalidAxis {
                    axis: axis.name().to_string(),
                    reason: "axis name used twice".to_string(),
                });
            }
        }

        Ok(LabeledArray {
            data,
            shape,
            axes,
            attrs,
        })
    }

    pub fn data(&self) -> &[f64] {
        &self.data
    }

    pub fn into_data(self) -> Vec<f64> {
        self.data
    }

    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    pub fn axes(&self) -> &[Axis] {
        &self.axes
    }

    pub fn attrs(&self) -> &InfoMap {
        &self.attrs
    }

    pub fn ndim(&self) -> usize {
        self.shape.len()
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Axis names in dimension order.
    pub fn dims(&self) -> Vec<&str> {
        self.axes.iter().map(Axis::name).collect()
    }

    pub fn axis(&self, name: &str) -> Option<&Axis> {
        self.axes.iter().find(|a| a.name() == name)
    }

    /// Value at a multi-dimensional index, `None` when out of bounds.
    pub fn get(&self, index: &[usize]) -> Option<f64> {
        if index.len() != self.shape.len() {
            return None;
        }
        let mut flat = 0;
        for (&i, &extent) in index.iter().zip(&self.shape) {
            if i >= extent {
                return None;
            }
            flat = flat * extent + i;
        }
        self.data.get(flat).copied()
    }
}

/// One oscilloscope trace: time samples and the matching amplitudes.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct Waveform {
    pub horizontal: Axis,
    pub vertical: Vec<f64>,
    pub vertical_tag: UnitTag,
    pub info: InfoMap,
}

impl Waveform {
    pub fn len(&self) -> usize {
        self.vertical.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vertical.is_empty()
    }

    /// Iterate over `(time, amplitude)` pairs.
    pub fn points(&self) -> impl Iterator<Item = (f64, f64)> + '_ {
        self.horizontal
            .values
            .iter()
            .copied()
            .zip(self.vertical.iter().copied())
    }
}

/// Named arrays decoded from one multi-channel file, in file order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChannelSet {
    channels: Vec<(String, LabeledArray)>,
}

impl ChannelSet {
    pub fn new() -> Self {
        ChannelSet::default()
    }

    /// Add a channel. Returns the array back if the name is already taken.
    pub fn insert(
        &mut self,
        name: impl Into<String>,
        array: LabeledArray,
    ) -> std::result::Result<(), LabeledArray> {
        let name = name.into();
        if self.contains(&name) {
            return Err(array);
        }
        self.channels.push((name, array));
        Ok(())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.channels.iter().any(|(n, _)| n == name)
    }

    pub fn get(&self, name: &str) -> Option<&LabeledArray> {
        self.channels
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, a)| a)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.channels.iter().map(|(n, _)| n.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &LabeledArray)> {
        self.channels.iter().map(|(n, a)| (n.as_str(), a))
    }

    pub fn len(&self) -> usize {
        self.channels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }
}

impl Serialize for ChannelSet {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.channels.len()))?;
        for (name, array) in &self.channels {
            map.serialize_entry(name, array)?;
        }
        map.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn axis(name: &str, values: Vec<f64>) -> Axis {
        Axis {
            tag: UnitTag::new(name, "mm"),
            values,
        }
    }

    #[test]
    fn test_array_indexing() {
        let arr = LabeledArray::new(
            vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0],
            vec![axis("Y", vec![0.0, 1.0]), axis("X", vec![0.0, 0.5, 1.0])],
            InfoMap::new(),
        )
        .unwrap();

        assert_eq!(arr.shape(), &[2, 3]);
        assert_eq!(arr.dims(), vec!["Y", "X"]);
        assert_eq!(arr.get(&[0, 2]), Some(3.0));
        assert_eq!(arr.get(&[1, 0]), Some(4.0));
        assert_eq!(arr.get(&[2, 0]), None);
        assert_eq!(arr.get(&[0]), None);
    }

    #[test]
    fn test_array_rejects_shape_mismatch() {
        let result = LabeledArray::new(
            vec![1.0, 2.0, 3.0],
            vec![axis("Y", vec![0.0, 1.0]), axis("X", vec![0.0, 1.0])],
            InfoMap::new(),
        );
        assert!(matches!(
            result,
            Err(DecodeError::DimensionMismatch { expected: 4, actual: 3, .. })
        ));
    }

    #[test]
    fn test_array_rejects_non_monotonic_axis() {
        let result = LabeledArray::new(
            vec![0.0; 3],
            vec![axis("X", vec![0.0, 2.0, 1.0])],
            InfoMap::new(),
        );
        assert!(matches!(result, Err(DecodeError::InvalidAxis { .. })));
    }

    #[test]
    fn test_descending_axis_is_monotonic() {
        assert!(axis("X", vec![3.0, 2.0, 1.0]).is_monotonic());
        assert!(!axis("X", vec![1.0, 1.0]).is_monotonic());
    }

    #[test]
    fn test_channel_set_keeps_order_and_unique_names() {
        let arr = LabeledArray::new(vec![1.0], vec![axis("X", vec![0.0])], InfoMap::new()).unwrap();
        let mut set = ChannelSet::new();
        set.insert("b", arr.clone()).unwrap();
        set.insert("a", arr.clone()).unwrap();
        assert!(set.insert("b", arr).is_err());

        let names: Vec<&str> = set.names().collect();
        assert_eq!(names, vec!["b", "a"]);

        let json = serde_json::to_string(&set).unwrap();
        assert!(json.find("\"b\"").unwrap() < json.find("\"a\"").unwrap());
    }
}
