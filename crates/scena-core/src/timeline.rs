//! Timeline transform recognition and timed intervals.
//!
//! The composition language animates properties through timeline transform
//! calls of the shape `interpolate(clock(), [in...], [out...])`, where
//! `clock()` is the single external timeline clock. This module recognizes
//! those calls and extracts the [`TimedInterval`]s consumed by the
//! transition consistency analyzer. Intervals are analysis artifacts; they
//! are never persisted.

use serde::{Deserialize, Serialize};

use crate::document::{CallArg, CallSignature};

/// Name of the timeline transform function.
pub const TRANSFORM_FN: &str = "interpolate";
/// Name of the timeline clock accessor.
pub const CLOCK_FN: &str = "clock";

/// A property animation window extracted from a timeline transform call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimedInterval {
    /// First frame of the input range.
    pub start: i64,
    /// Last frame of the input range.
    pub end: i64,
    /// The animated property name.
    pub property: String,
    /// The literal output values of the transform.
    pub values: Vec<f64>,
}

impl TimedInterval {
    /// Number of frames the interval covers.
    pub fn duration(&self) -> i64 {
        self.end - self.start
    }

    /// Extract an interval from a recognized timeline transform call.
    ///
    /// Returns `None` unless the call is a well-formed `interpolate` with a
    /// clock-driven first argument and numeric input/output ranges of at
    /// least two entries each.
    pub fn from_call(property: &str, call: &CallSignature) -> Option<TimedInterval> {
        if call.base_name() != TRANSFORM_FN || call.args().len() < 3 {
            return None;
        }
        match call.args().first() {
            Some(CallArg::Raw(text)) if text.contains(CLOCK_FN) => {}
            _ => return None,
        }
        let inputs = match call.args().get(1) {
            Some(CallArg::NumberList(values)) if values.len() >= 2 => values,
            _ => return None,
        };
        let outputs = match call.args().get(2) {
            Some(CallArg::NumberList(values)) if values.len() >= 2 => values,
            _ => return None,
        };
        Some(TimedInterval {
            start: inputs[0] as i64,
            end: inputs[inputs.len() - 1] as i64,
            property: property.to_string(),
            values: outputs.clone(),
        })
    }
}
