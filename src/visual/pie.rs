use serde::Serialize;

use super::{FieldRole, VisualKind};
use crate::result::{cell_number, cell_text, QueryResult};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PieChart {
    /// Group value this pie was built from (e.g. the census region).
    pub group: String,
    pub title: String,
    pub labels: Vec<String>,
    pub values: Vec<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
}

impl PieChart {
    pub fn slices(&self) -> usize { self.labels.len() }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PieGroup {
    pub pies: Vec<PieChart>,
}

// One pie per distinct group value, in order of first appearance.
pub(super) fn build(kind: VisualKind, result: &QueryResult, unit: Option<&str>) -> PieGroup {
    let roles = kind.shape();
    let pos_of = |want: FieldRole| roles.iter().position(|r| *r == want);
    let (Some(group_pos), Some(label_pos), Some(value_pos)) =
        (pos_of(FieldRole::Group), pos_of(FieldRole::SliceLabel), pos_of(FieldRole::SliceValue))
    else {
        return PieGroup { pies: Vec::new() };
    };

    let mut pies: Vec<PieChart> = Vec::new();
    for row in &result.rows {
        let group = result.cell(row, group_pos).map(cell_text).unwrap_or_default();
        let label = result.cell(row, label_pos).map(cell_text).unwrap_or_default();
        let value = result.cell(row, value_pos).and_then(cell_number).unwrap_or(0.0);
        let idx = match pies.iter().position(|p| p.group == group) {
            Some(i) => i,
            None => {
                pies.push(PieChart {
                    title: format!("{} in {}", kind.title(), group),
                    group,
                    labels: Vec::new(),
                    values: Vec::new(),
                    unit: unit.map(str::to_string),
                });
                pies.len() - 1
            }
        };
        pies[idx].labels.push(label);
        pies[idx].values.push(value);
    }
    PieGroup { pies }
}
