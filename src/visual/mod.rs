//!
//! Visualization selection
//! -----------------------
//! Closed set of chart renderers. The catalog stores at most one `VisualKind`
//! per query; selection is a tag lookup and never looks at the data. Each kind
//! declares the positional shape it reads from a result, and rendering checks
//! that shape before building anything. Presentation fails closed: a result
//! that does not fit becomes "no data" instead of a broken chart.

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::catalog::{self, QueryId};
use crate::error::AppResult;
use crate::result::QueryResult;

mod bar;
mod pie;
mod shape;

pub use bar::{BarChart, Dataset, Orientation};
pub use pie::{PieChart, PieGroup};
pub use shape::{check_shape, FieldRole};

const ELECTRICITY_SERIES: &str = "Avg Electricity Consumption (in thous BTU)";
const NATURAL_GAS_SERIES: &str = "Avg Natural Gas Consumption (in thous BTU)";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VisualKind {
    /// Vertical bars, electricity and natural gas side by side per category.
    TwoSeriesBar,
    ElectricityByConstructionYear,
    ElectricityByBuildingActivity,
    DaylightComparison,
    /// One pie per census region, slices are water heating systems.
    WaterHeatingByRegion,
    /// One pie per census region, slices are fuel sources in percent.
    FuelShareByRegion,
}

impl VisualKind {
    pub const ALL: [VisualKind; 6] = [
        VisualKind::TwoSeriesBar,
        VisualKind::ElectricityByConstructionYear,
        VisualKind::ElectricityByBuildingActivity,
        VisualKind::DaylightComparison,
        VisualKind::WaterHeatingByRegion,
        VisualKind::FuelShareByRegion,
    ];

    /// Positional schema of `result.fields` this renderer reads.
    pub fn shape(self) -> &'static [FieldRole] {
        use FieldRole::*;
        match self {
            VisualKind::TwoSeriesBar => &[Label, Series(ELECTRICITY_SERIES), Series(NATURAL_GAS_SERIES)],
            VisualKind::ElectricityByConstructionYear
            | VisualKind::ElectricityByBuildingActivity
            | VisualKind::DaylightComparison => &[Label, Series(ELECTRICITY_SERIES)],
            VisualKind::WaterHeatingByRegion => &[Group, SliceLabel, SliceValue],
            VisualKind::FuelShareByRegion => &[Group, SliceLabel, Ignored, SliceValue],
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            VisualKind::TwoSeriesBar => "Average Consumption Comparison of Electricity and Natural Gas",
            VisualKind::ElectricityByConstructionYear => "Average Consumption Comparison of Electricity Based on Time Period",
            VisualKind::ElectricityByBuildingActivity => "Average Consumption Comparison of Electricity Based on Building Usage",
            VisualKind::DaylightComparison => "Daylight vs No Daylight - Electricity Consumption",
            VisualKind::WaterHeatingByRegion => "Water Heating System Distribution",
            VisualKind::FuelShareByRegion => "Fuel Source Usage Percentage",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Chart {
    Bar(BarChart),
    Pies(PieGroup),
}

/// What the presentation layer should draw next to the table.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum VisualView {
    /// The query has no chart configured.
    TableOnly,
    Chart { kind: VisualKind, chart: Chart },
    NoData { kind: VisualKind, reason: String },
}

/// Renderer tag for `id`, if any. The result is not inspected.
pub fn select(id: QueryId, _result: &QueryResult) -> Option<VisualKind> {
    kind_for(id)
}

pub fn kind_for(id: QueryId) -> Option<VisualKind> {
    catalog::lookup(id).ok().and_then(|e| e.visual)
}

/// Validate `result` against the kind's shape and build the chart.
pub fn render(kind: VisualKind, result: &QueryResult) -> AppResult<Chart> {
    check_shape(kind, result)?;
    Ok(match kind {
        VisualKind::TwoSeriesBar => Chart::Bar(bar::build(kind, result, Orientation::Vertical, None)),
        VisualKind::ElectricityByConstructionYear | VisualKind::ElectricityByBuildingActivity => {
            Chart::Bar(bar::build(kind, result, Orientation::Horizontal, None))
        }
        VisualKind::DaylightComparison => Chart::Bar(bar::build(
            kind,
            result,
            Orientation::Horizontal,
            Some("Average Electricity Consumption (in thous BTU)"),
        )),
        VisualKind::WaterHeatingByRegion => Chart::Pies(pie::build(kind, result, None)),
        VisualKind::FuelShareByRegion => Chart::Pies(pie::build(kind, result, Some("%"))),
    })
}

/// Selection plus rendering with the fail-closed policy applied.
pub fn present(id: QueryId, result: &QueryResult) -> VisualView {
    let Some(kind) = select(id, result) else { return VisualView::TableOnly };
    if result.is_empty() {
        return VisualView::NoData { kind, reason: "no rows".to_string() };
    }
    match render(kind, result) {
        Ok(chart) => VisualView::Chart { kind, chart },
        Err(e) => {
            warn!(target: "visual", query_id = id.get(), kind = ?kind, "chart skipped: {}", e);
            VisualView::NoData { kind, reason: e.message().to_string() }
        }
    }
}
