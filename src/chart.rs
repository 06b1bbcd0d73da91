use serde::{Deserialize, Serialize};
use ts_rs::TS;
use utoipa::ToSchema;

/// Height of the tallest bar; every other bar is scaled linearly against it.
pub const MAX_BAR_HEIGHT: f64 = 100.0;

/// Bar
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, PartialEq)]
#[ts(export)]
pub struct Bar {
    pub label: String,
    pub value: f64,
    pub height: f64,
}

/// BarChart
///
/// Render-ready bar chart data. The UI draws `height` directly.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, PartialEq, Default)]
#[ts(export)]
pub struct BarChart {
    pub max_value: f64,
    pub bars: Vec<Bar>,
}

impl BarChart {
    /// Builds a chart from `(label, value)` pairs, keeping the input order.
    ///
    /// Heights are `value / max * MAX_BAR_HEIGHT`. When no value is positive
    /// every bar has height 0; negative values are clamped to 0.
    pub fn from_values<I, L>(values: I) -> Self
    where
        I: IntoIterator<Item = (L, f64)>,
        L: Into<String>,
    {
        let entries: Vec<(String, f64)> = values
            .into_iter()
            .map(|(label, value)| (label.into(), value))
            .collect();

        let max_value = entries
            .iter()
            .map(|(_, value)| *value)
            .fold(0.0_f64, f64::max);

        let bars = entries
            .into_iter()
            .map(|(label, value)| {
                let height = if max_value > 0.0 {
                    (value.max(0.0) / max_value) * MAX_BAR_HEIGHT
                } else {
                    0.0
                };
                Bar {
                    label,
                    value,
                    height,
                }
            })
            .collect();

        Self { max_value, bars }
    }
}
