use serde::{Deserialize, Serialize};

use crate::BerError;

/// Relative slack used when counting the points of a stepped grid
const STEP_SLACK: f64 = 1e-9;
/// Largest number of points a stepped grid may expand to
pub const MAX_AXIS_POINTS: usize = 1 << 20;

/// A strictly ascending list of finite axis values.
/// Can only be constructed via `from_values()` or `stepped()`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<f64>", into = "Vec<f64>")]
pub struct AxisGrid(Vec<f64>);

impl AxisGrid {
    /// Takes arbitrary values and sorts them ascending, for ordered sweeps.
    /// Fails on empty input, non-finite values and duplicates.
    pub fn from_values(mut values: Vec<f64>) -> Result<Self, BerError> {
        crate::ensure_config!(!values.is_empty(), "axis", "axis grid needs at least one value");
        for v in &values {
            crate::ensure_config!(v.is_finite(), "axis", "axis value {} is not finite", v);
        }
        values.sort_by(|a, b| a.total_cmp(b));

        for pair in values.windows(2) {
            crate::ensure_config!(pair[0] < pair[1], "axis", "duplicate axis value {}", pair[1]);
        }
        Ok(Self(values))
    }

    /// Inclusive grid start, start + step, ... up to stop.
    /// Values are computed as start + i*step so no error accumulates along the grid.
    pub fn stepped(start: f64, stop: f64, step: f64) -> Result<Self, BerError> {
        crate::ensure_config!(
            start.is_finite() && stop.is_finite() && step.is_finite(),
            "axis",
            "stepped axis bounds must be finite"
        );
        crate::ensure_config!(step > 0.0, "axis", "axis step must be positive, got {}", step);
        crate::ensure_config!(stop >= start, "axis", "axis stop {} below start {}", stop, start);

        // Counted in floating point first, the quotient may be huge or infinite
        let steps = ((stop - start) / step + STEP_SLACK).floor();
        crate::ensure_config!(
            steps < MAX_AXIS_POINTS as f64,
            "axis",
            "stepped axis from {} to {} by {} exceeds {} points",
            start,
            stop,
            step,
            MAX_AXIS_POINTS
        );
        let count = steps as usize + 1;
        let values: Vec<f64> = (0..count).map(|i| start + i as f64 * step).collect();

        // A step below the resolution of the bounds repeats values
        for pair in values.windows(2) {
            crate::ensure_config!(pair[0] < pair[1], "axis", "axis step {} is too small to separate {}", step, pair[0]);
        }
        Ok(Self(values))
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = f64> + '_ {
        self.0.iter().copied()
    }
}

impl TryFrom<Vec<f64>> for AxisGrid {
    type Error = BerError;

    fn try_from(values: Vec<f64>) -> Result<Self, Self::Error> {
        Self::from_values(values)
    }
}

impl From<AxisGrid> for Vec<f64> {
    fn from(grid: AxisGrid) -> Self {
        grid.0
    }
}
