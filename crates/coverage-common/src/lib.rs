//! Common types shared across the coverage workspace.

pub mod bbox;
pub mod time;

pub use bbox::{BboxParseError, BoundingBox};
pub use time::{format_hourly, parse_datetime, parse_with_format, DatetimeSpec, TimeInterval, TimeParseError};
