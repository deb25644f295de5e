//! Terminal client support: result sources, output formatting and the
//! interactive command grammar used by `cbecs_cli`.

pub mod connectivity;
pub mod outputformatter;

pub use connectivity::{HttpSession, QuerySource};
pub use outputformatter::{format_catalog, format_view, get_terminal_width};

use crate::table::SortDirection;

pub const REPL_HELP: &str = "Interactive commands:
  list                      show the question catalog
  <N> | run <N>             run catalog query N (1-26)
  sort <field> [asc|desc]   sort the last table; without a direction, cycles asc -> desc -> off
  json                      toggle raw JSON output
  status                    show the current data source
  help                      show this help
  quit | exit               leave the interpreter";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplCommand {
    Empty,
    List,
    Run(String),
    Sort { field: String, direction: Option<SortDirection> },
    ToggleJson,
    Status,
    Help,
    Quit,
    Unknown(String),
}

impl ReplCommand {
    pub fn parse(line: &str) -> ReplCommand {
        let parts: Vec<&str> = line.split_whitespace().collect();
        let Some(head) = parts.first() else { return ReplCommand::Empty };
        match head.to_ascii_lowercase().as_str() {
            "list" | "ls" => ReplCommand::List,
            "json" => ReplCommand::ToggleJson,
            "status" => ReplCommand::Status,
            "help" | "?" => ReplCommand::Help,
            "quit" | "exit" => ReplCommand::Quit,
            "run" => match parts.get(1) {
                Some(id) => ReplCommand::Run(id.to_string()),
                None => ReplCommand::Unknown(line.trim().to_string()),
            },
            "sort" => {
                let Some(field) = parts.get(1) else { return ReplCommand::Unknown(line.trim().to_string()) };
                let direction = match parts.get(2).map(|d| d.to_ascii_lowercase()) {
                    None => None,
                    Some(d) if d == "asc" => Some(SortDirection::Ascending),
                    Some(d) if d == "desc" => Some(SortDirection::Descending),
                    Some(_) => return ReplCommand::Unknown(line.trim().to_string()),
                };
                ReplCommand::Sort { field: field.to_string(), direction }
            }
            _ if head.chars().all(|c| c.is_ascii_digit()) => ReplCommand::Run(head.to_string()),
            _ => ReplCommand::Unknown(line.trim().to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_commands() {
        assert_eq!(ReplCommand::parse("   "), ReplCommand::Empty);
        assert_eq!(ReplCommand::parse("LIST"), ReplCommand::List);
        assert_eq!(ReplCommand::parse("13"), ReplCommand::Run("13".into()));
        assert_eq!(ReplCommand::parse("run 27"), ReplCommand::Run("27".into()));
        assert_eq!(ReplCommand::parse("sort region"), ReplCommand::Sort { field: "region".into(), direction: None });
        assert_eq!(
            ReplCommand::parse("sort count desc"),
            ReplCommand::Sort { field: "count".into(), direction: Some(SortDirection::Descending) }
        );
        assert_eq!(ReplCommand::parse("exit"), ReplCommand::Quit);
        assert!(matches!(ReplCommand::parse("sort"), ReplCommand::Unknown(_)));
        assert!(matches!(ReplCommand::parse("sort a sideways"), ReplCommand::Unknown(_)));
        assert!(matches!(ReplCommand::parse("select * from x"), ReplCommand::Unknown(_)));
    }
}
