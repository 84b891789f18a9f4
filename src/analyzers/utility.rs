use serde::{Serialize, Serializer};
use std::fmt;

/// A percentage kept as an exact ratio so rounding happens exactly once.
///
/// Displays with one decimal place, rounding halves up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Rate {
    pub part: usize,
    pub whole: usize,
}

impl Rate {
    pub fn new(part: usize, whole: usize) -> Self {
        Self { part, whole }
    }

    /// Percentage in tenths of a percent. Returns 0 for an empty whole.
    pub fn tenths(&self) -> u64 {
        if self.whole == 0 {
            return 0;
        }
        let part = self.part as u64;
        let whole = self.whole as u64;
        (part * 2000 + whole) / (2 * whole)
    }

    /// The rounded percentage as a float, e.g. `66.7`.
    pub fn value(&self) -> f64 {
        self.tenths() as f64 / 10.0
    }
}

impl fmt::Display for Rate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tenths = self.tenths();
        write!(f, "{}.{}", tenths / 10, tenths % 10)
    }
}

impl Serialize for Rate {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Renders an EFTS sum with two decimal places.
pub fn format_efts(total: f64) -> String {
    let rounded = (total * 100.0).round() / 100.0;
    if rounded == 0.0 {
        return "0.00".to_string();
    }
    format!("{:.2}", rounded)
}
