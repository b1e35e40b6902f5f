//! Data module - the immutable chart dataset

mod series;

pub use series::{DataError, Dataset, PeriodTick, Series, TimeAxis};
