//! Parameter sweeps over the BER engine
//!
//! A sweep varies one parameter over an ascending grid, optionally repeated for each value
//! of a second "curve" parameter (e.g. SNR curves for several roll-offs). Every grid point is
//! an independent evaluation, so `run_parallel` returns exactly what `run` returns.

use core::fmt;
use std::fmt::Write as _;

use rayon::prelude::*;
use serde::Serialize;

use pulsebench_core::{AxisGrid, BerError, PowerRatio, ensure_config};

use crate::engine::{BerResult, evaluate_ber};
use crate::params::BerParameters;
use crate::pulse::PulseShape;

/// Swept parameter with its ascending grid
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "axis", content = "values", rename_all = "snake_case")]
pub enum SweepAxis {
    Tau(AxisGrid),
    Alpha(AxisGrid),
    SnrDb(AxisGrid),
    SirDb(AxisGrid),
    Interferers(AxisGrid),
    Window(AxisGrid),
}

impl SweepAxis {
    pub fn name(&self) -> &'static str {
        match self {
            SweepAxis::Tau(_) => "tau",
            SweepAxis::Alpha(_) => "alpha",
            SweepAxis::SnrDb(_) => "snr_db",
            SweepAxis::SirDb(_) => "sir_db",
            SweepAxis::Interferers(_) => "interferers",
            SweepAxis::Window(_) => "window",
        }
    }

    pub fn grid(&self) -> &AxisGrid {
        match self {
            SweepAxis::Tau(g)
            | SweepAxis::Alpha(g)
            | SweepAxis::SnrDb(g)
            | SweepAxis::SirDb(g)
            | SweepAxis::Interferers(g)
            | SweepAxis::Window(g) => g,
        }
    }

    /// Copy of `params` with this axis set to `value`
    pub fn apply(&self, params: &BerParameters, value: f64) -> Result<BerParameters, BerError> {
        let params = params.clone();
        match self {
            SweepAxis::Tau(_) => params.with_tau(value),
            SweepAxis::Alpha(_) => params.with_alpha(value),
            SweepAxis::SnrDb(_) => params.with_snr(PowerRatio::Db(value)),
            SweepAxis::SirDb(_) => params.with_sir(PowerRatio::Db(value)),
            SweepAxis::Interferers(_) => params.with_interferers(as_count(self.name(), value)?),
            SweepAxis::Window(_) => params.with_window(as_count(self.name(), value)?),
        }
    }
}

fn as_count(field: &'static str, value: f64) -> Result<usize, BerError> {
    ensure_config!(
        value >= 0.0 && value.fract() == 0.0 && value <= u32::MAX as f64,
        field,
        "expected a non-negative integer, got {}",
        value
    );
    Ok(value as usize)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SweepPoint {
    /// Value of the curve axis, if the sweep has one
    pub curve: Option<f64>,
    pub value: f64,
    pub result: BerResult,
}

/// Ordered sweep output, curve-major then ascending axis value
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SweepTable {
    axis: &'static str,
    curve_axis: Option<&'static str>,
    points: Vec<SweepPoint>,
}

impl SweepTable {
    pub fn new(axis: &'static str, curve_axis: Option<&'static str>) -> Self {
        Self { axis, curve_axis, points: Vec::new() }
    }

    pub fn push(&mut self, point: SweepPoint) {
        self.points.push(point);
    }

    pub fn axis(&self) -> &'static str {
        self.axis
    }

    pub fn curve_axis(&self) -> Option<&'static str> {
        self.curve_axis
    }

    pub fn points(&self) -> &[SweepPoint] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Points of one curve, or all points for single-axis sweeps
    pub fn curve(&self, curve: Option<f64>) -> impl Iterator<Item = &SweepPoint> + '_ {
        self.points.iter().filter(move |p| p.curve == curve)
    }

    pub fn to_csv(&self) -> String {
        let mut out = String::new();
        if let Some(curve_axis) = self.curve_axis {
            let _ = write!(out, "{},", curve_axis);
        }
        let _ = writeln!(out, "{},ber,mode,enumerated_taps", self.axis);
        for p in &self.points {
            if let Some(curve) = p.curve {
                let _ = write!(out, "{},", curve);
            }
            let _ = writeln!(
                out,
                "{},{:e},{},{}",
                p.value,
                p.result.ber(),
                p.result.mode().as_str(),
                p.result.enumerated_taps()
            );
        }
        out
    }
}

/// The grid point a sweep failed at
#[derive(Debug, Clone, PartialEq)]
pub struct PointFailure {
    pub axis: &'static str,
    pub value: f64,
    pub curve: Option<(&'static str, f64)>,
    pub error: BerError,
}

impl fmt::Display for PointFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.axis, self.value)?;
        if let Some((name, value)) = self.curve {
            write!(f, " ({}={})", name, value)?;
        }
        write!(f, ": {}", self.error)
    }
}

impl std::error::Error for PointFailure {}

/// A failed sweep with the points completed before the failing one
#[derive(Debug, Clone, PartialEq)]
pub struct SweepFailure {
    pub failure: PointFailure,
    pub partial: SweepTable,
}

impl fmt::Display for SweepFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sweep aborted after {} points at {}", self.partial.len(), self.failure)
    }
}

impl std::error::Error for SweepFailure {}

pub struct SweepDriver {
    shape: PulseShape,
    fixed: BerParameters,
    axis: SweepAxis,
    curves: Option<SweepAxis>,
}

impl SweepDriver {
    pub fn new(shape: PulseShape, fixed: BerParameters, axis: SweepAxis) -> Self {
        Self { shape, fixed, axis, curves: None }
    }

    /// Repeats the sweep for each value of a second parameter
    pub fn with_curves(mut self, curves: SweepAxis) -> Result<Self, BerError> {
        ensure_config!(
            curves.name() != self.axis.name(),
            "curves",
            "curve axis repeats the swept axis {}",
            self.axis.name()
        );
        self.curves = Some(curves);
        Ok(self)
    }

    pub fn shape(&self) -> &PulseShape {
        &self.shape
    }

    pub fn axis(&self) -> &SweepAxis {
        &self.axis
    }

    pub fn curves(&self) -> Option<&SweepAxis> {
        self.curves.as_ref()
    }

    /// Number of grid points
    pub fn len(&self) -> usize {
        self.axis.grid().len() * self.curves.as_ref().map_or(1, |c| c.grid().len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn coordinates(&self, index: usize) -> (Option<f64>, f64) {
        let n = self.axis.grid().len();
        let value = self.axis.grid().as_slice()[index % n];
        let curve = self.curves.as_ref().map(|c| c.grid().as_slice()[index / n]);
        (curve, value)
    }

    fn evaluate_point(&self, index: usize) -> Result<SweepPoint, PointFailure> {
        let (curve, value) = self.coordinates(index);
        let fail = |error: BerError| PointFailure {
            axis: self.axis.name(),
            value,
            curve: self.curves.as_ref().zip(curve).map(|(c, v)| (c.name(), v)),
            error,
        };

        let params = match (&self.curves, curve) {
            (Some(axis), Some(c)) => axis.apply(&self.fixed, c).map_err(fail)?,
            _ => self.fixed.clone(),
        };
        let params = self.axis.apply(&params, value).map_err(fail)?;
        let result = evaluate_ber(&self.shape, &params).map_err(fail)?;

        tracing::debug!(point = %format!("{}={}", self.axis.name(), value), "{} ber={:.6e}", self.shape.label(), result.ber());
        Ok(SweepPoint { curve, value, result })
    }

    fn table(&self) -> SweepTable {
        SweepTable::new(self.axis.name(), self.curves.as_ref().map(|c| c.name()))
    }

    /// Lazy, ordered evaluation of the grid. Restartable: each call starts from the first point.
    /// Stops after the first failing point.
    pub fn iter(&self) -> SweepIter<'_> {
        SweepIter { driver: self, next: 0, done: false }
    }

    pub fn run(&self) -> Result<SweepTable, SweepFailure> {
        let mut table = self.table();
        for point in self.iter() {
            match point {
                Ok(point) => table.push(point),
                Err(failure) => return Err(SweepFailure { failure, partial: table }),
            }
        }
        Ok(table)
    }

    /// Evaluates all grid points on the rayon pool, then assembles them in grid order.
    /// On failure the partial table holds the points before the first failing one.
    pub fn run_parallel(&self) -> Result<SweepTable, SweepFailure> {
        let results: Vec<Result<SweepPoint, PointFailure>> =
            (0..self.len()).into_par_iter().map(|i| self.evaluate_point(i)).collect();

        let mut table = self.table();
        for point in results {
            match point {
                Ok(point) => table.push(point),
                Err(failure) => return Err(SweepFailure { failure, partial: table }),
            }
        }
        Ok(table)
    }
}

pub struct SweepIter<'a> {
    driver: &'a SweepDriver,
    next: usize,
    done: bool,
}

impl Iterator for SweepIter<'_> {
    type Item = Result<SweepPoint, PointFailure>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done || self.next >= self.driver.len() {
            return None;
        }
        let point = self.driver.evaluate_point(self.next);
        self.next += 1;
        self.done = point.is_err();
        Some(point)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        if self.done {
            return (0, Some(0));
        }
        let left = self.driver.len() - self.next;
        (0, Some(left))
    }
}

impl std::iter::FusedIterator for SweepIter<'_> {}
