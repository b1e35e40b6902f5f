//! Chart Dataset Module
//! A fixed time axis plus aligned outcome series. Padding positions hold no
//! value so a drawn line starts and stops at the labeled periods.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum DataError {
    #[error("series '{name}' has {got} values but the time axis has {expected}")]
    LengthMismatch {
        name: String,
        got: usize,
        expected: usize,
    },
    #[error("time axis positions must be strictly increasing")]
    UnorderedAxis,
    #[error("period tick at {position} is not a position on the time axis")]
    UnknownTick { position: f64 },
    #[error("dataset has no series")]
    NoSeries,
}

/// A labeled period on the time axis. The label is split into a base glyph
/// and a subscript run so the renderer can typeset it (e.g. `T` + `-1`).
#[derive(Clone, Debug, PartialEq)]
pub struct PeriodTick {
    pub position: f64,
    pub base: String,
    pub subscript: String,
}

impl PeriodTick {
    pub fn new(position: f64, base: &str, subscript: &str) -> Self {
        Self {
            position,
            base: base.to_string(),
            subscript: subscript.to_string(),
        }
    }
}

/// The horizontal axis: ordered positions, a subset of which are labeled
/// periods. Unlabeled positions are padding that widens the plotted range
/// without carrying data.
#[derive(Clone, Debug)]
pub struct TimeAxis {
    positions: Vec<f64>,
    ticks: Vec<PeriodTick>,
}

impl TimeAxis {
    pub fn new(positions: Vec<f64>, ticks: Vec<PeriodTick>) -> Result<Self, DataError> {
        if positions.windows(2).any(|w| w[0] >= w[1]) {
            return Err(DataError::UnorderedAxis);
        }
        for tick in &ticks {
            if !positions.contains(&tick.position) {
                return Err(DataError::UnknownTick {
                    position: tick.position,
                });
            }
        }
        Ok(Self { positions, ticks })
    }

    pub fn positions(&self) -> &[f64] {
        &self.positions
    }

    pub fn ticks(&self) -> &[PeriodTick] {
        &self.ticks
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    /// Full extent of the axis, padding included.
    pub fn range(&self) -> (f64, f64) {
        match (self.positions.first(), self.positions.last()) {
            (Some(&lo), Some(&hi)) => (lo, hi),
            _ => (0.0, 1.0),
        }
    }
}

/// One outcome series aligned positionally with the time axis. `None` marks
/// a position with no value; the renderer leaves a gap there instead of
/// interpolating a segment.
#[derive(Clone, Debug)]
pub struct Series {
    pub name: String,
    pub values: Vec<Option<f64>>,
}

impl Series {
    pub fn new(name: &str, values: Vec<Option<f64>>) -> Self {
        Self {
            name: name.to_string(),
            values,
        }
    }

    /// Maximal runs of consecutive present values, as (axis index, value)
    /// pairs. Each run is drawn as one polyline; runs never cross a `None`.
    pub fn segments(&self) -> Vec<Vec<(usize, f64)>> {
        let mut runs = Vec::new();
        let mut current: Vec<(usize, f64)> = Vec::new();
        for (i, value) in self.values.iter().enumerate() {
            match value {
                Some(v) => current.push((i, *v)),
                None => {
                    if !current.is_empty() {
                        runs.push(std::mem::take(&mut current));
                    }
                }
            }
        }
        if !current.is_empty() {
            runs.push(current);
        }
        runs
    }
}

/// Immutable chart dataset: the time axis and the series drawn over it.
/// Series order matters; the renderer pairs series with strokes by index.
#[derive(Clone, Debug)]
pub struct Dataset {
    axis: TimeAxis,
    series: Vec<Series>,
}

impl Dataset {
    pub fn new(axis: TimeAxis, series: Vec<Series>) -> Result<Self, DataError> {
        if series.is_empty() {
            return Err(DataError::NoSeries);
        }
        for s in &series {
            if s.values.len() != axis.len() {
                return Err(DataError::LengthMismatch {
                    name: s.name.clone(),
                    got: s.values.len(),
                    expected: axis.len(),
                });
            }
        }
        Ok(Self { axis, series })
    }

    pub fn axis(&self) -> &TimeAxis {
        &self.axis
    }

    pub fn series(&self) -> &[Series] {
        &self.series
    }

    /// Min and max over all present values.
    pub fn value_range(&self) -> (f64, f64) {
        let mut min = f64::INFINITY;
        let mut max = f64::NEG_INFINITY;
        for s in &self.series {
            for v in s.values.iter().flatten() {
                min = min.min(*v);
                max = max.max(*v);
            }
        }
        if min.is_infinite() {
            return (0.0, 1.0);
        }
        (min, max)
    }

    /// The difference-in-differences illustration: an observed treated
    /// trend, the control trend, and the counterfactual the control implies,
    /// over a pre / treatment / post timeline with padding at both ends.
    pub fn did_illustration() -> Self {
        let axis = TimeAxis::new(
            vec![-1.6, -1.0, 0.0, 1.0, 1.6],
            vec![
                PeriodTick::new(-1.0, "T", "-1"),
                PeriodTick::new(0.0, "T", "0"),
                PeriodTick::new(1.0, "T", "1"),
            ],
        )
        .expect("literal axis is valid");

        let series = vec![
            Series::new(
                "treated",
                vec![None, Some(9.0), Some(12.0), Some(15.0), None],
            ),
            Series::new(
                "control",
                vec![None, Some(3.0), Some(6.0), Some(12.0), None],
            ),
            Series::new(
                "counterfactual",
                vec![None, Some(3.0), Some(6.0), Some(9.0), None],
            ),
        ];

        Dataset::new(axis, series).expect("literal dataset is valid")
    }
}
