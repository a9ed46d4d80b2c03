//! Calendar time: constraint series, buckets and day counting.

mod bucket;
mod calendar;
mod series;

pub use bucket::{build_timeline, Bucket, Granularity};
pub use calendar::{DayCounting, WorkCalendar};
pub use series::{ConstraintInterval, ConstraintSeries};
