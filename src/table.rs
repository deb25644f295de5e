//!
//! Tabular renderer
//! ----------------
//! Turns a uniform result into a generic grid: one column per field in field
//! order, humanized headers, and column sorting driven by an explicit
//! `SortState`. Empty results become a "no data" placeholder.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::result::{cell_number, cell_text, Row};

pub const NO_DATA_TEXT: &str = "No data to display";

/// `building_type` -> `Building type`.
pub fn humanize(field: &str) -> String {
    let spaced: String = field.chars().map(|c| if c == '_' || c == '-' { ' ' } else { c }).collect();
    let mut chars = spaced.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortDirection {
    Ascending,
    Descending,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortKey {
    pub column: String,
    pub direction: SortDirection,
}

/// Current sort of a grid. `key == None` keeps the backend's row order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortState {
    pub key: Option<SortKey>,
}

impl SortState {
    pub fn unsorted() -> Self { Self::default() }

    pub fn by(column: impl Into<String>, direction: SortDirection) -> Self {
        Self { key: Some(SortKey { column: column.into(), direction }) }
    }

    /// Header click: ascending, then descending, then back to unsorted.
    /// A different column always starts ascending.
    pub fn toggle(&self, column: &str) -> SortState {
        match &self.key {
            Some(k) if k.column == column => match k.direction {
                SortDirection::Ascending => SortState::by(column, SortDirection::Descending),
                SortDirection::Descending => SortState::unsorted(),
            },
            _ => SortState::by(column, SortDirection::Ascending),
        }
    }

    pub fn is_sorted(&self) -> bool { self.key.is_some() }

    fn is_unsorted(&self) -> bool { self.key.is_none() }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Column {
    pub field: String,
    pub header: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Grid {
    pub columns: Vec<Column>,
    /// Cells in column order; absent keys are null.
    pub rows: Vec<Vec<Value>>,
    #[serde(skip_serializing_if = "SortState::is_unsorted")]
    pub sort: SortState,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum TableView {
    NoData { message: String },
    Grid(Grid),
}

impl TableView {
    pub fn is_no_data(&self) -> bool { matches!(self, TableView::NoData { .. }) }

    pub fn to_ascii(&self, max_width: usize) -> String {
        match self {
            TableView::NoData { message } => message.clone(),
            TableView::Grid(g) => g.to_ascii(max_width),
        }
    }
}

/// Build the grid for `fields` / `rows`, or the placeholder when either is empty.
pub fn render(fields: &[String], rows: &[Row]) -> TableView {
    if fields.is_empty() || rows.is_empty() {
        return TableView::NoData { message: NO_DATA_TEXT.to_string() };
    }
    let columns = fields
        .iter()
        .map(|f| Column { field: f.clone(), header: humanize(f) })
        .collect();
    let rows = rows
        .iter()
        .map(|row| fields.iter().map(|f| row.get(f).cloned().unwrap_or(Value::Null)).collect())
        .collect();
    TableView::Grid(Grid { columns, rows, sort: SortState::unsorted() })
}

impl Grid {
    pub fn column_index(&self, field: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.field == field)
    }

    /// Copy of the grid ordered by `state`. Stable; an unsorted state or an
    /// unknown column returns rows in their incoming order.
    pub fn sorted(&self, state: &SortState) -> Grid {
        let mut out = self.clone();
        out.sort = SortState::unsorted();
        let Some(key) = &state.key else { return out };
        let Some(idx) = self.column_index(&key.column) else { return out };
        out.rows.sort_by(|a, b| {
            let ord = compare_alphanumeric(&a[idx], &b[idx]);
            match key.direction {
                SortDirection::Ascending => ord,
                SortDirection::Descending => ord.reverse(),
            }
        });
        out.sort = state.clone();
        out
    }

    pub fn to_ascii(&self, max_width: usize) -> String {
        let headers: Vec<String> = self.columns.iter().map(|c| c.header.clone()).collect();
        let cells: Vec<Vec<String>> = self.rows.iter().map(|r| r.iter().map(cell_text).collect()).collect();

        let mut widths: Vec<usize> = headers.iter().map(|h| visible_len(h)).collect();
        for r in &cells {
            for (i, cell) in r.iter().enumerate() {
                widths[i] = widths[i].max(visible_len(cell));
            }
        }
        fit_widths(&mut widths, max_width);

        let sep = build_separator(&widths);
        let mut lines = Vec::with_capacity(cells.len() + 5);
        lines.push(sep.clone());
        lines.push(build_row(&headers, &widths, false));
        lines.push(sep.clone());
        for r in &cells {
            lines.push(build_row(r, &widths, true));
        }
        lines.push(sep);
        lines.push(format!("rows: {}, cols: {}", self.rows.len(), self.columns.len()));
        lines.join("\n")
    }
}

/// Nulls first, then numbers (commas ignored) in numeric order, then text.
pub fn compare_alphanumeric(a: &Value, b: &Value) -> Ordering {
    match (a.is_null(), b.is_null()) {
        (true, true) => return Ordering::Equal,
        (true, false) => return Ordering::Less,
        (false, true) => return Ordering::Greater,
        _ => {}
    }
    match (cell_number(a), cell_number(b)) {
        (Some(x), Some(y)) => x.total_cmp(&y),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => cell_text(a).cmp(&cell_text(b)),
    }
}

// Shrink the widest columns until a full row fits in `max_width`.
fn fit_widths(widths: &mut [usize], max_width: usize) {
    const MIN_COL: usize = 3;
    let line_len = |ws: &[usize]| ws.iter().map(|w| w + 3).sum::<usize>() + 1;
    while line_len(widths) > max_width {
        let Some((i, w)) = widths.iter().copied().enumerate().max_by_key(|(_, w)| *w) else { return };
        if w <= MIN_COL { return; }
        widths[i] = w - 1;
    }
}

fn build_separator(widths: &[usize]) -> String {
    let mut s = String::from("+");
    for w in widths {
        s.push_str(&"-".repeat(*w + 2));
        s.push('+');
    }
    s
}

fn build_row(cells: &[String], widths: &[usize], align_numbers: bool) -> String {
    let mut s = String::from("|");
    for (i, w) in widths.iter().enumerate() {
        let cell = cells.get(i).map(String::as_str).unwrap_or("");
        let text = truncate(cell, *w);
        let pad = " ".repeat(w.saturating_sub(visible_len(&text)));
        s.push(' ');
        if align_numbers && is_numeric_like(cell) {
            s.push_str(&pad);
            s.push_str(&text);
        } else {
            s.push_str(&text);
            s.push_str(&pad);
        }
        s.push_str(" |");
    }
    s
}

fn truncate(s: &str, max: usize) -> String {
    let len = s.chars().count();
    if len <= max { return s.to_string(); }
    if max <= 1 { return "…".to_string(); }
    s.chars().take(max - 1).collect::<String>() + "…"
}

fn is_numeric_like(s: &str) -> bool {
    let st = s.trim();
    if st.is_empty() { return false; }
    let mut has_digit = false;
    for ch in st.chars() {
        if ch.is_ascii_digit() { has_digit = true; continue; }
        if ".-+eE,_".contains(ch) { continue; }
        return false;
    }
    has_digit
}

fn visible_len(s: &str) -> usize { s.chars().count() }

#[cfg(test)]
#[path = "table_tests.rs"]
mod table_tests;
