//!
//! Configuration
//! -------------
//! Flag and environment resolution for `cbecs_server` and `cbecs_cli`.
//! Precedence is always: command-line flag, then environment variable, then
//! built-in default. Environment access goes through a lookup closure so the
//! resolution can be tested without touching the process environment.

use std::path::PathBuf;

use thiserror::Error;

use crate::backend::PgSettings;
use crate::error::AppError;

pub const DEFAULT_HTTP_PORT: u16 = 7878;
pub const DEFAULT_BIND: &str = "0.0.0.0";

pub const ENV_HTTP_PORT: &str = "CBECS_HTTP_PORT";
pub const ENV_BIND: &str = "CBECS_BIND";
pub const ENV_DATABASE_URL: &str = "CBECS_DATABASE_URL";
pub const ENV_DATABASE_URL_FALLBACK: &str = "POSTGRES_URL";
pub const ENV_SCHEMA: &str = "CBECS_DB_SCHEMA";
pub const ENV_FIXTURES: &str = "CBECS_FIXTURES";
pub const ENV_OUTPUT: &str = "CBECS_OUTPUT";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("{0} requires a value")]
    MissingValue(String),
    #[error("invalid port '{value}' from {origin}")]
    InvalidPort { origin: String, value: String },
    #[error("unrecognized argument: {0}")]
    UnknownArgument(String),
    #[error("only one data source may be given, found {0}")]
    ConflictingSources(String),
    #[error("no data source configured: pass --database-url or --fixtures (or set CBECS_DATABASE_URL / CBECS_FIXTURES)")]
    NoSource,
    #[error("--connect expects an http:// or https:// URL, got '{0}'")]
    UnsupportedUrl(String),
}

impl From<ConfigError> for AppError {
    fn from(e: ConfigError) -> Self { AppError::config("invalid_config", e.to_string()) }
}

/// Where query results come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceConfig {
    Postgres(PgSettings),
    Fixtures(PathBuf),
    /// Remote `cbecs_server` HTTP API (CLI only).
    Remote(String),
}

impl SourceConfig {
    pub fn describe(&self) -> String {
        match self {
            SourceConfig::Postgres(_) => "postgres".to_string(),
            SourceConfig::Fixtures(p) => format!("fixtures:{}", p.display()),
            SourceConfig::Remote(url) => format!("http:{}", url),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub bind: String,
    pub http_port: u16,
    pub source: SourceConfig,
}

impl ServerConfig {
    pub fn addr(&self) -> String { format!("{}:{}", self.bind, self.http_port) }

    /// Unknown flags are ignored, like the other server flags parsers here.
    pub fn resolve<E>(args: &[String], env: E) -> Result<ServerConfig, ConfigError>
    where
        E: Fn(&str) -> Option<String>,
    {
        let http_port = match parse_port_arg(args, "--http-port")? {
            Some(p) => p,
            None => parse_port_env(&env, ENV_HTTP_PORT)?.unwrap_or(DEFAULT_HTTP_PORT),
        };
        let bind = arg_value(args, "--bind")?
            .or_else(|| non_empty(env(ENV_BIND)))
            .unwrap_or_else(|| DEFAULT_BIND.to_string());
        let source = resolve_source(args, &env, false)?.ok_or(ConfigError::NoSource)?;
        Ok(ServerConfig { bind, http_port, source })
    }

    pub fn from_process(args: &[String]) -> Result<ServerConfig, ConfigError> {
        Self::resolve(args, |k| std::env::var(k).ok())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CliConfig {
    pub help: bool,
    pub list: bool,
    /// Raw id text; validated by the dispatcher like any other selection.
    pub query: Option<String>,
    pub repl: bool,
    pub json: bool,
    pub source: Option<SourceConfig>,
}

impl CliConfig {
    pub fn resolve<E>(args: &[String], env: E) -> Result<CliConfig, ConfigError>
    where
        E: Fn(&str) -> Option<String>,
    {
        let mut cfg = CliConfig::default();
        let mut i = 0;
        while i < args.len() {
            match args[i].as_str() {
                "-h" | "--help" => cfg.help = true,
                "--list" | "-l" => cfg.list = true,
                "--repl" => cfg.repl = true,
                "--json" => cfg.json = true,
                "--query" | "-q" => {
                    let v = args.get(i + 1).ok_or_else(|| ConfigError::MissingValue(args[i].clone()))?;
                    cfg.query = Some(v.clone());
                    i += 1;
                }
                // value-taking source flags, resolved below
                "--database-url" | "--fixtures" | "--connect" | "--schema" => {
                    if i + 1 >= args.len() { return Err(ConfigError::MissingValue(args[i].clone())); }
                    i += 1;
                }
                other => {
                    if cfg.query.is_none() && !other.starts_with('-') {
                        cfg.query = Some(other.to_string());
                    } else {
                        return Err(ConfigError::UnknownArgument(other.to_string()));
                    }
                }
            }
            i += 1;
        }
        if !cfg.json {
            cfg.json = env(ENV_OUTPUT).map(|v| v.eq_ignore_ascii_case("json")).unwrap_or(false);
        }
        cfg.source = resolve_source(args, &env, true)?;
        Ok(cfg)
    }

    pub fn from_process(args: &[String]) -> Result<CliConfig, ConfigError> {
        Self::resolve(args, |k| std::env::var(k).ok())
    }

    /// REPL runs when asked for, or when nothing else was requested.
    pub fn wants_repl(&self) -> bool {
        self.repl || (!self.list && self.query.is_none())
    }
}

fn resolve_source<E>(args: &[String], env: &E, allow_remote: bool) -> Result<Option<SourceConfig>, ConfigError>
where
    E: Fn(&str) -> Option<String>,
{
    let schema = arg_value(args, "--schema")?.or_else(|| non_empty(env(ENV_SCHEMA)));
    let mut from_flags: Vec<SourceConfig> = Vec::new();
    if let Some(url) = arg_value(args, "--database-url")? {
        from_flags.push(SourceConfig::Postgres(PgSettings { url, schema: schema.clone() }));
    }
    if let Some(path) = arg_value(args, "--fixtures")? {
        from_flags.push(SourceConfig::Fixtures(PathBuf::from(path)));
    }
    if allow_remote {
        if let Some(url) = arg_value(args, "--connect")? {
            let lower = url.to_ascii_lowercase();
            if !(lower.starts_with("http://") || lower.starts_with("https://")) {
                return Err(ConfigError::UnsupportedUrl(url));
            }
            from_flags.push(SourceConfig::Remote(url));
        }
    }
    if from_flags.len() > 1 {
        let names: Vec<String> = from_flags.iter().map(SourceConfig::describe).collect();
        return Err(ConfigError::ConflictingSources(names.join(", ")));
    }
    if let Some(src) = from_flags.pop() {
        return Ok(Some(src));
    }

    // Environment: a database URL wins over a fixture path.
    let db_url = non_empty(env(ENV_DATABASE_URL)).or_else(|| non_empty(env(ENV_DATABASE_URL_FALLBACK)));
    if let Some(url) = db_url {
        return Ok(Some(SourceConfig::Postgres(PgSettings { url, schema })));
    }
    Ok(non_empty(env(ENV_FIXTURES)).map(|p| SourceConfig::Fixtures(PathBuf::from(p))))
}

fn non_empty(v: Option<String>) -> Option<String> {
    v.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}

/// Value following `flag`, if the flag is present.
pub fn arg_value(args: &[String], flag: &str) -> Result<Option<String>, ConfigError> {
    match args.iter().position(|a| a == flag) {
        Some(i) => args.get(i + 1).cloned().map(Some).ok_or_else(|| ConfigError::MissingValue(flag.to_string())),
        None => Ok(None),
    }
}

pub fn has_flag(args: &[String], flag: &str) -> bool {
    args.iter().any(|a| a == flag)
}

fn parse_port_arg(args: &[String], flag: &str) -> Result<Option<u16>, ConfigError> {
    match arg_value(args, flag)? {
        Some(v) => parse_port(flag, &v).map(Some),
        None => Ok(None),
    }
}

fn parse_port_env<E>(env: &E, name: &str) -> Result<Option<u16>, ConfigError>
where
    E: Fn(&str) -> Option<String>,
{
    match non_empty(env(name)) {
        Some(v) => parse_port(name, &v).map(Some),
        None => Ok(None),
    }
}

fn parse_port(origin: &str, v: &str) -> Result<u16, ConfigError> {
    v.trim()
        .parse::<u16>()
        .map_err(|_| ConfigError::InvalidPort { origin: origin.to_string(), value: v.to_string() })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn args(list: &[&str]) -> Vec<String> { list.iter().map(|s| s.to_string()).collect() }

    fn env_of(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |k: &str| map.get(k).cloned()
    }

    #[test]
    fn server_defaults_need_a_source() {
        let err = ServerConfig::resolve(&args(&[]), env_of(&[])).unwrap_err();
        assert_eq!(err, ConfigError::NoSource);

        let cfg = ServerConfig::resolve(&args(&[]), env_of(&[(ENV_FIXTURES, "fx.json")])).unwrap();
        assert_eq!(cfg.http_port, DEFAULT_HTTP_PORT);
        assert_eq!(cfg.bind, DEFAULT_BIND);
        assert_eq!(cfg.source, SourceConfig::Fixtures(PathBuf::from("fx.json")));
    }

    #[test]
    fn flag_beats_env_beats_default() {
        let env = env_of(&[(ENV_HTTP_PORT, "9000"), (ENV_BIND, "127.0.0.1"), (ENV_FIXTURES, "a.json")]);
        let cfg = ServerConfig::resolve(&args(&["--http-port", "9100"]), &env).unwrap();
        assert_eq!(cfg.http_port, 9100);
        assert_eq!(cfg.bind, "127.0.0.1");
        let cfg = ServerConfig::resolve(&args(&[]), &env).unwrap();
        assert_eq!(cfg.http_port, 9000);
        assert_eq!(cfg.addr(), "127.0.0.1:9000");
    }

    #[test]
    fn invalid_port_is_rejected() {
        let env = env_of(&[(ENV_FIXTURES, "a.json")]);
        let err = ServerConfig::resolve(&args(&["--http-port", "eighty"]), &env).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidPort { .. }));
        let err = ServerConfig::resolve(&args(&[]), env_of(&[(ENV_FIXTURES, "a.json"), (ENV_HTTP_PORT, "70000")])).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidPort { .. }));
    }

    #[test]
    fn database_url_sources() {
        let cfg = ServerConfig::resolve(&args(&[]), env_of(&[(ENV_DATABASE_URL_FALLBACK, "postgres://u@h/db")])).unwrap();
        assert_eq!(cfg.source, SourceConfig::Postgres(PgSettings { url: "postgres://u@h/db".into(), schema: None }));

        let env = env_of(&[(ENV_DATABASE_URL, "postgres://a@h/x"), (ENV_DATABASE_URL_FALLBACK, "postgres://b@h/y"), (ENV_FIXTURES, "f.json")]);
        let cfg = ServerConfig::resolve(&args(&[]), &env).unwrap();
        assert_eq!(cfg.source, SourceConfig::Postgres(PgSettings { url: "postgres://a@h/x".into(), schema: None }));

        // a flag overrides every environment source
        let cfg = ServerConfig::resolve(&args(&["--fixtures", "cli.json"]), &env).unwrap();
        assert_eq!(cfg.source, SourceConfig::Fixtures(PathBuf::from("cli.json")));

        let cfg = ServerConfig::resolve(&args(&["--database-url", "postgres://c@h/z", "--schema", "cbecs"]), env_of(&[])).unwrap();
        assert_eq!(cfg.source, SourceConfig::Postgres(PgSettings { url: "postgres://c@h/z".into(), schema: Some("cbecs".into()) }));
    }

    #[test]
    fn conflicting_source_flags() {
        let err = ServerConfig::resolve(&args(&["--database-url", "postgres://h/db", "--fixtures", "f.json"]), env_of(&[])).unwrap_err();
        assert!(matches!(err, ConfigError::ConflictingSources(_)));
    }

    #[test]
    fn cli_positional_query_and_flags() {
        let cfg = CliConfig::resolve(&args(&["9", "--fixtures", "f.json"]), env_of(&[])).unwrap();
        assert_eq!(cfg.query.as_deref(), Some("9"));
        assert_eq!(cfg.source, Some(SourceConfig::Fixtures(PathBuf::from("f.json"))));
        assert!(!cfg.wants_repl());

        let cfg = CliConfig::resolve(&args(&["--query", "13", "--json"]), env_of(&[])).unwrap();
        assert_eq!(cfg.query.as_deref(), Some("13"));
        assert!(cfg.json);
        assert_eq!(cfg.source, None);

        let cfg = CliConfig::resolve(&args(&[]), env_of(&[])).unwrap();
        assert!(cfg.wants_repl());
        let cfg = CliConfig::resolve(&args(&["--list"]), env_of(&[])).unwrap();
        assert!(!cfg.wants_repl());
    }

    #[test]
    fn cli_output_env_and_errors() {
        let cfg = CliConfig::resolve(&args(&["2"]), env_of(&[(ENV_OUTPUT, "JSON")])).unwrap();
        assert!(cfg.json);

        assert_eq!(CliConfig::resolve(&args(&["--query"]), env_of(&[])).unwrap_err(), ConfigError::MissingValue("--query".into()));
        assert!(matches!(CliConfig::resolve(&args(&["--bogus"]), env_of(&[])), Err(ConfigError::UnknownArgument(_))));
        assert!(matches!(CliConfig::resolve(&args(&["1", "2"]), env_of(&[])), Err(ConfigError::UnknownArgument(_))));
    }

    #[test]
    fn cli_connect_requires_http() {
        let cfg = CliConfig::resolve(&args(&["--connect", "http://127.0.0.1:7878", "5"]), env_of(&[])).unwrap();
        assert_eq!(cfg.source, Some(SourceConfig::Remote("http://127.0.0.1:7878".into())));
        let err = CliConfig::resolve(&args(&["--connect", "ws://x"]), env_of(&[])).unwrap_err();
        assert!(matches!(err, ConfigError::UnsupportedUrl(_)));
    }

    #[test]
    fn config_error_maps_to_app_error() {
        let e: AppError = ConfigError::NoSource.into();
        assert_eq!(e.http_status(), 500);
        assert_eq!(e.code_str(), "invalid_config");
    }
}
