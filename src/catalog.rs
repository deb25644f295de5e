//!
//! Procedure catalog
//! -----------------
//! The fixed set of analytical questions over the CBECS 2018 survey. Each entry
//! names the zero-argument stored procedure that answers it and, optionally,
//! the chart that goes with the result. The table is static; nothing mutates
//! it at runtime.

use std::collections::HashSet;
use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};
use crate::visual::VisualKind;

/// Validated query identifier in `QueryId::MIN..=QueryId::MAX`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct QueryId(u8);

impl QueryId {
    pub const MIN: u8 = 1;
    pub const MAX: u8 = 26;

    pub fn new(raw: u8) -> Option<Self> {
        (Self::MIN..=Self::MAX).contains(&raw).then_some(QueryId(raw))
    }

    pub fn get(self) -> u8 { self.0 }

    /// Parse the selection coming from a caller (query string, CLI argument).
    /// Only plain decimal digits are accepted; surrounding whitespace is ignored.
    pub fn parse(raw: Option<&str>) -> AppResult<Self> {
        let Some(raw) = raw else {
            return Err(AppError::invalid("missing_query_id", "queryId is required"));
        };
        let s = raw.trim();
        if s.is_empty() {
            return Err(AppError::invalid("missing_query_id", "queryId is required"));
        }
        if !s.bytes().all(|b| b.is_ascii_digit()) {
            return Err(AppError::invalid("invalid_query_id", format!("queryId '{}' is not a number", s)));
        }
        let n: u32 = s
            .parse()
            .map_err(|_| AppError::invalid("invalid_query_id", format!("queryId '{}' is out of range", s)))?;
        u8::try_from(n)
            .ok()
            .and_then(QueryId::new)
            .ok_or_else(|| AppError::invalid(
                "invalid_query_id",
                format!("queryId {} is outside {}..={}", n, Self::MIN, Self::MAX),
            ))
    }

    pub fn all() -> impl Iterator<Item = QueryId> {
        (Self::MIN..=Self::MAX).map(QueryId)
    }
}

impl TryFrom<u8> for QueryId {
    type Error = String;
    fn try_from(v: u8) -> Result<Self, Self::Error> {
        QueryId::new(v).ok_or_else(|| format!("query id {} outside {}..={}", v, Self::MIN, Self::MAX))
    }
}

impl From<QueryId> for u8 {
    fn from(id: QueryId) -> u8 { id.0 }
}

impl Display for QueryId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result { write!(f, "{}", self.0) }
}

/// Name of a backend procedure. Only the catalog creates these, so a value of
/// this type never carries caller input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct ProcedureName(&'static str);

impl ProcedureName {
    pub fn as_str(&self) -> &'static str { self.0 }

    /// The only statement ever sent to the backend for this procedure.
    pub fn call_statement(&self) -> String {
        format!("SELECT * FROM {}();", self.0)
    }
}

impl Display for ProcedureName {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result { f.write_str(self.0) }
}

/// Plain lower-case SQL identifier: `[a-z_][a-z0-9_]*`.
pub fn is_safe_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_ascii_lowercase() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct CatalogEntry {
    pub id: QueryId,
    pub question: &'static str,
    pub procedure: ProcedureName,
    pub visual: Option<VisualKind>,
}

impl CatalogEntry {
    pub fn is_visualized(&self) -> bool { self.visual.is_some() }
}

const fn entry(id: u8, question: &'static str, procedure: &'static str, visual: Option<VisualKind>) -> CatalogEntry {
    CatalogEntry { id: QueryId(id), question, procedure: ProcedureName(procedure), visual }
}

static CATALOG: [CatalogEntry; 26] = [
    entry(1, "What are the average costs for roof and wall construction across different census regions?",
        "get_avg_costs_for_census_region", None),
    entry(2, "How does the average annual electricity and natural gas consumption compare across different principal building activities and building owner types?",
        "get_avg_energy_consumption_for_industry", Some(VisualKind::TwoSeriesBar)),
    entry(3, "How does average energy consumption vary by building owner type?",
        "get_avg_energy_consumption_for_owner_type", None),
    entry(4, "What is the average energy consumption for buildings with different renovation statuses?",
        "get_avg_energy_consumption_for_renovation_options", None),
    entry(5, "What is the average electricity consumption per square foot for buildings, categorized by their construction year range?",
        "get_avg_electricity_per_sqft_by_construction_year", Some(VisualKind::ElectricityByConstructionYear)),
    entry(6, "What is the average electricity consumption per square foot for buildings based on their principal building activity?",
        "get_avg_electricity_per_sqft_by_building_activity", Some(VisualKind::ElectricityByBuildingActivity)),
    entry(7, "What is the average energy consumption and expenditure for buildings with different accessibility features?",
        "calculate_avg_energy_consumption", None),
    entry(8, "Is there a correlation between the number of employees and electricity consumption in buildings?",
        "get_avg_electricity_consumption_by_employee_category", None),
    entry(9, "How does electricity consumption for lighting compare in buildings with significant daylight exposure versus those with less?",
        "calculate_daylight_statistics", Some(VisualKind::DaylightComparison)),
    entry(10, "How does daylight affect electricity consumption in buildings across different census regions?",
        "get_daylight_buildings_statistics_by_region", None),
    entry(11, "What is the heating and cooling efficiency for different types of systems in buildings?",
        "get_avg_energy_consumption_by_heating_system", None),
    entry(12, "What is the cooling efficiency for various types of air conditioning systems in buildings?",
        "get_avg_energy_consumption_by_cooling_system", None),
    entry(13, "What are the most common fuel types used for water heating in buildings across different census regions?",
        "get_water_heating_system_statistics", Some(VisualKind::WaterHeatingByRegion)),
    entry(14, "How do different window types affect heating and cooling energy consumption?",
        "get_window_energy_consumption_statistics", None),
    entry(15, "How does the usage of various lighting technologies impact a building's electricity consumption?",
        "get_lighting_category_energy_consumption", None),
    entry(16, "How does energy consumption vary with building size?",
        "get_building_size_energy_consumption", None),
    entry(17, "Does the year of construction affect the choice of materials for roofs or walls?",
        "get_roof_construction_statistics_by_construction_year", None),
    entry(18, "How does the year of construction influence wall construction materials?",
        "get_wall_construction_statistics_by_construction_year", None),
    entry(19, "What are the most common types of air conditioning and heating systems in buildings, and how do they correlate with building size and type?",
        "get_air_conditioning_statistics", None),
    entry(20, "What are the most common heating systems in buildings and how do they relate to building size and type?",
        "get_heating_statistics", None),
    entry(21, "What are the most common roof and wall construction materials used in buildings owned by different types of entities?",
        "get_roof_construction_material_statistics_by_owner_type", None),
    entry(22, "How do owner types influence the choice of wall construction materials in buildings?",
        "get_wall_construction_material_statistics_by_owner_type", None),
    entry(23, "How does energy consumption vary in buildings with and without food service facilities?",
        "get_energy_consumption_for_food_service", None),
    entry(24, "What is the average carbon output for different principal building activities across all fuel sources?",
        "get_avg_carbon_output_by_building_activity", None),
    entry(25, "What is the average carbon output for buildings with different accessibility features?",
        "get_avg_carbon_output_by_accessibility_modes", None),
    entry(26, "What is the distribution of energy sources used in buildings across different census regions, and what is the percentage of each energy source within each region?",
        "get_consolidated_energy_source_usage", Some(VisualKind::FuelShareByRegion)),
];

/// All entries in id order.
pub fn entries() -> &'static [CatalogEntry] { &CATALOG }

pub fn lookup(id: QueryId) -> AppResult<&'static CatalogEntry> {
    CATALOG
        .iter()
        .find(|e| e.id == id)
        .ok_or_else(|| AppError::not_found("query_not_found", format!("no catalog entry for query {}", id)))
}

/// Presentation split of the catalog. Derived on demand, never stored.
#[derive(Debug, Clone, Serialize)]
pub struct CatalogGroups {
    pub visualized: Vec<&'static CatalogEntry>,
    pub data_only: Vec<&'static CatalogEntry>,
}

pub fn partition() -> CatalogGroups {
    let (visualized, data_only): (Vec<&'static CatalogEntry>, Vec<&'static CatalogEntry>) =
        CATALOG.iter().partition(|e| e.is_visualized());
    CatalogGroups { visualized, data_only }
}

/// Check the catalog invariants: ids unique and contiguous over the valid
/// range, procedure names non-empty, unique and plain identifiers.
pub fn validate() -> AppResult<()> {
    validate_entries(&CATALOG)
}

fn validate_entries(entries: &[CatalogEntry]) -> AppResult<()> {
    let mut ids = HashSet::new();
    let mut procs = HashSet::new();
    for e in entries {
        if !ids.insert(e.id) {
            return Err(AppError::internal("catalog_duplicate_id", format!("query id {} appears twice", e.id)));
        }
        let name = e.procedure.as_str();
        if name.is_empty() {
            return Err(AppError::internal("catalog_empty_procedure", format!("query {} has no procedure", e.id)));
        }
        if !is_safe_identifier(name) {
            return Err(AppError::internal("catalog_bad_procedure", format!("query {} procedure '{}' is not a plain identifier", e.id, name)));
        }
        if !procs.insert(name) {
            return Err(AppError::internal("catalog_duplicate_procedure", format!("procedure '{}' is mapped twice", name)));
        }
    }
    if let Some(missing) = QueryId::all().find(|id| !ids.contains(id)) {
        return Err(AppError::internal("catalog_gap", format!("query id {} has no entry", missing)));
    }
    Ok(())
}
