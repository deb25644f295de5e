//! Combined presentation of one executed query: the catalog entry, the raw
//! result, the chart (or why there is none) and the sortable table. Both the
//! HTTP `view` endpoint and the CLI build their output from this.

use serde::Serialize;

use crate::catalog::{self, CatalogEntry};
use crate::error::{AppError, AppResult};
use crate::result::QueryResult;
use crate::table::{self, SortState, TableView};
use crate::visual::{self, VisualView};

#[derive(Debug, Clone, Serialize)]
pub struct QueryView {
    pub entry: &'static CatalogEntry,
    pub result: QueryResult,
    pub visual: VisualView,
    pub table: TableView,
}

impl QueryView {
    /// Build the view for `result` with the table ordered by `sort`.
    /// Sorting by a field the result does not have is a caller error.
    pub fn build(result: QueryResult, sort: &SortState) -> AppResult<QueryView> {
        let entry = catalog::lookup(result.id)?;
        if let Some(key) = &sort.key {
            if !result.fields.iter().any(|f| *f == key.column) {
                return Err(AppError::invalid(
                    "unknown_sort_field",
                    format!("query {} has no field '{}'", result.id, key.column),
                ));
            }
        }
        let visual = visual::present(result.id, &result);
        let table = match table::render(&result.fields, &result.rows) {
            TableView::Grid(g) => TableView::Grid(g.sorted(sort)),
            placeholder => placeholder,
        };
        Ok(QueryView { entry, result, visual, table })
    }

    /// Same result, new sort.
    pub fn resort(&self, sort: &SortState) -> AppResult<QueryView> {
        QueryView::build(self.result.clone(), sort)
    }

    pub fn sort(&self) -> SortState {
        match &self.table {
            TableView::Grid(g) => g.sort.clone(),
            TableView::NoData { .. } => SortState::unsorted(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::QueryId;
    use crate::result::row_from_pairs;
    use crate::table::SortDirection;
    use serde_json::json;

    fn daylight() -> QueryResult {
        QueryResult {
            id: QueryId::new(9).unwrap(),
            fields: vec!["category".into(), "avg_kwh".into()],
            rows: vec![
                row_from_pairs([("category", json!("No daylight")), ("avg_kwh", json!("140.25"))]),
                row_from_pairs([("category", json!("Daylight")), ("avg_kwh", json!("101.5"))]),
            ],
        }
    }

    #[test]
    fn builds_chart_and_sorted_table() {
        let v = QueryView::build(daylight(), &SortState::by("avg_kwh", SortDirection::Ascending)).unwrap();
        assert_eq!(v.entry.id.get(), 9);
        assert!(matches!(v.visual, VisualView::Chart { .. }));
        let TableView::Grid(g) = &v.table else { panic!("expected grid") };
        assert_eq!(g.rows[0][0], json!("Daylight"));
        // the raw result keeps backend order
        assert_eq!(v.result.rows[0]["category"], json!("No daylight"));
        assert_eq!(v.sort(), SortState::by("avg_kwh", SortDirection::Ascending));
    }

    #[test]
    fn unknown_sort_field_is_rejected() {
        let err = QueryView::build(daylight(), &SortState::by("nope", SortDirection::Ascending)).unwrap_err();
        assert_eq!(err.code_str(), "unknown_sort_field");
        assert_eq!(err.http_status(), 400);
    }

    #[test]
    fn resort_cycles_through_toggle() {
        let v = QueryView::build(daylight(), &SortState::unsorted()).unwrap();
        let next = v.sort().toggle("category");
        let v = v.resort(&next).unwrap();
        let TableView::Grid(g) = &v.table else { panic!("expected grid") };
        assert_eq!(g.rows[0][0], json!("Daylight"));
        let v = v.resort(&v.sort().toggle("category")).unwrap();
        let TableView::Grid(g) = &v.table else { panic!("expected grid") };
        assert_eq!(g.rows[0][0], json!("No daylight"));
    }

    #[test]
    fn empty_result_has_placeholder_and_no_chart() {
        let mut r = daylight();
        r.rows.clear();
        let v = QueryView::build(r, &SortState::unsorted()).unwrap();
        assert!(v.table.is_no_data());
        assert!(matches!(v.visual, VisualView::NoData { .. }));
    }
}
