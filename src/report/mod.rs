//! Report projection.
//!
//! Turns an aggregation result into chart series for rendering and tabular
//! sheets for export. Nothing here recomputes statistics or touches the
//! filesystem.

pub mod chart;
pub mod sheets;

pub use chart::{ChartData, chart_data, truncate_label};
pub use sheets::{Sheet, Workbook, report_file_name, workbook};
