use serde::Serialize;

use super::{FieldRole, VisualKind};
use crate::result::{cell_number, cell_text, QueryResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Orientation {
    Vertical,
    Horizontal,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Dataset {
    pub label: String,
    pub values: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BarChart {
    pub title: String,
    pub orientation: Orientation,
    pub labels: Vec<String>,
    pub datasets: Vec<Dataset>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value_axis: Option<String>,
}

impl BarChart {
    pub fn categories(&self) -> usize { self.labels.len() }
}

// Shape is checked by the caller.
pub(super) fn build(kind: VisualKind, result: &QueryResult, orientation: Orientation, value_axis: Option<&str>) -> BarChart {
    let roles = kind.shape();
    let labels = result
        .rows
        .iter()
        .map(|row| {
            let text = result.cell(row, 0).map(cell_text).unwrap_or_default();
            text.replace(',', "")
        })
        .collect();
    let datasets = roles
        .iter()
        .enumerate()
        .filter_map(|(pos, role)| match role {
            FieldRole::Series(legend) => Some(Dataset {
                label: legend.to_string(),
                values: result
                    .rows
                    .iter()
                    .map(|row| result.cell(row, pos).and_then(cell_number).unwrap_or(0.0))
                    .collect(),
            }),
            _ => None,
        })
        .collect();
    BarChart {
        title: kind.title().to_string(),
        orientation,
        labels,
        datasets,
        value_axis: value_axis.map(str::to_string),
    }
}
