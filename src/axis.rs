// Coordinate axis construction

use crate::error::{DecodeError, Result};
use crate::model::{Axis, UnitTag};

/// Builds evenly spaced (`origin + i * step`) or explicit coordinate axes.
#[derive(Debug, Clone)]
pub struct AxisBuilder {
    tag: UnitTag,
    origin: f64,
    step: f64,
}

impl AxisBuilder {
    pub fn new(name: impl Into<String>, unit: impl Into<String>) -> Self {
        AxisBuilder {
            tag: UnitTag::new(name, unit),
            origin: 0.0,
            step: 1.0,
        }
    }

    pub fn origin(mut self, origin: f64) -> Self {
        self.origin = origin;
        self
    }

    pub fn step(mut self, step: f64) -> Self {
        self.step = step;
        self
    }

    /// Space samples by `1 / fs`.
    pub fn sampling_frequency(self, fs: f64) -> Self {
        self.step(1.0 / fs)
    }

    pub fn build(self, len: usize) -> Axis {
        let values = (0..len)
            .map(|i| self.origin + i as f64 * self.step)
            .collect();
        Axis {
            tag: self.tag,
            values,
        }
    }

    /// Use caller-supplied coordinates instead of a linear ramp.
    pub fn explicit(self, values: Vec<f64>) -> Result<Axis> {
        let axis = Axis {
            tag: self.tag,
            values,
        };
        if !axis.is_monotonic() {
            return Err(DecodeError::InvalidAxis {
                axis: axis.tag.name,
                reason: "explicit coordinates are not strictly monotonic".to_string(),
            });
        }
        Ok(axis)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_linear_axis() {
        let axis = AxisBuilder::new("X", "mm").origin(-1.0).step(0.25).build(5);
        assert_eq!(axis.name(), "X");
        assert_eq!(axis.unit(), "mm");
        assert_eq!(axis.values, vec![-1.0, -0.75, -0.5, -0.25, 0.0]);
    }

    #[test]
    fn test_sampled_axis() {
        let axis = AxisBuilder::new("Z", "s").sampling_frequency(100e6).build(4);
        assert_eq!(axis.first(), Some(0.0));
        assert!((axis.last().unwrap() - 3e-8).abs() < 1e-20);
        assert!((axis.spacing().unwrap() - 1e-8).abs() < 1e-20);
    }

    #[test]
    fn test_explicit_axis_validation() {
        let ok = AxisBuilder::new("X", "mm").explicit(vec![0.0, 1.5, 4.0]);
        assert!(ok.is_ok());

        let bad = AxisBuilder::new("X", "mm").explicit(vec![0.0, 1.5, 1.5]);
        assert!(matches!(bad, Err(DecodeError::InvalidAxis { .. })));
    }
}
