use serde_json::Value;

use super::VisualKind;
use crate::error::{AppError, AppResult};
use crate::result::{cell_number, QueryResult};

/// Meaning of one positional field for a renderer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldRole {
    /// Category axis label of a bar chart.
    Label,
    /// Numeric bar series with its legend text.
    Series(&'static str),
    /// Value that splits rows into separate pies.
    Group,
    SliceLabel,
    /// Numeric slice size.
    SliceValue,
    /// Position is present in the result but not drawn.
    Ignored,
}

impl FieldRole {
    pub fn is_numeric(self) -> bool {
        matches!(self, FieldRole::Series(_) | FieldRole::SliceValue)
    }
}

/// Check field count and per-row cell types against the kind's schema.
/// Extra trailing fields are allowed and ignored.
pub fn check_shape(kind: VisualKind, result: &QueryResult) -> AppResult<()> {
    let roles = kind.shape();
    if result.fields.len() < roles.len() {
        return Err(AppError::shape(
            "shape_mismatch",
            format!(
                "{:?} expects at least {} fields, result has {} ({})",
                kind,
                roles.len(),
                result.fields.len(),
                result.fields.join(", ")
            ),
        ));
    }
    for (n, row) in result.rows.iter().enumerate() {
        for (pos, role) in roles.iter().enumerate() {
            if *role == FieldRole::Ignored { continue; }
            let field = &result.fields[pos];
            let cell = result.cell(row, pos);
            match cell {
                None | Some(Value::Null) => {
                    return Err(AppError::shape(
                        "shape_mismatch",
                        format!("row {} has no value for field '{}'", n, field),
                    ));
                }
                Some(v) if role.is_numeric() && cell_number(v).is_none() => {
                    return Err(AppError::shape(
                        "shape_mismatch",
                        format!("row {} field '{}' is not numeric: {}", n, field, v),
                    ));
                }
                Some(_) => {}
            }
        }
    }
    Ok(())
}
