//! Command-line options

use clap::Parser;
use std::path::PathBuf;

/// Compile a matchql script and print the result
#[derive(Debug, Clone, PartialEq, Eq, Parser)]
#[command(name = "matchqlc", version, author = "matchql contributors")]
pub struct CliOptions {
    /// File holding the query script
    pub query_path: PathBuf,

    /// Optional JSON compiler configuration
    pub config_path: Option<PathBuf>,

    /// Default log filter when `RUST_LOG` is unset
    #[arg(long, default_value = "warn")]
    pub log_level: String,

    /// Log at debug level
    #[arg(short, long)]
    pub verbose: bool,
}

impl CliOptions {
    /// Create options for a query file
    pub fn new<P: Into<PathBuf>>(query_path: P) -> Self {
        Self {
            query_path: query_path.into(),
            config_path: None,
            log_level: "warn".to_string(),
            verbose: false,
        }
    }

    /// Log filter to install, `--verbose` winning over `--log-level`
    pub fn log_filter(&self) -> &str {
        if self.verbose { "debug" } else { &self.log_level }
    }

    /// Builder: set config file
    pub fn config_path<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.config_path = Some(path.into());
        self
    }

    /// Builder: set log level
    pub fn log_level(mut self, level: &str) -> Self {
        self.log_level = level.to_string();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_positionals() {
        let options = CliOptions::try_parse_from(["matchqlc", "query.sql", "backend.json"]).unwrap();
        assert_eq!(options.query_path, PathBuf::from("query.sql"));
        assert_eq!(options.config_path, Some(PathBuf::from("backend.json")));
        assert_eq!(options.log_filter(), "warn");
        assert_eq!(options, CliOptions::new("query.sql").config_path("backend.json"));
    }

    #[test]
    fn test_parse_flags() {
        let options = CliOptions::try_parse_from(["matchqlc", "-v", "query.sql"]).unwrap();
        assert_eq!(options.config_path, None);
        assert_eq!(options.log_filter(), "debug");

        let options = CliOptions::try_parse_from(["matchqlc", "--log-level", "trace", "query.sql"]).unwrap();
        assert_eq!(options.log_filter(), "trace");
    }

    #[test]
    fn test_parse_rejects_bad_input() {
        assert!(CliOptions::try_parse_from(["matchqlc"]).is_err());
        assert!(CliOptions::try_parse_from(["matchqlc", "--color", "q.sql"]).is_err());
        assert!(CliOptions::try_parse_from(["matchqlc", "a", "b", "c"]).is_err());
    }

    #[test]
    fn test_builder() {
        let options = CliOptions::new("q.sql").config_path("c.json").log_level("trace");
        assert_eq!(options.config_path, Some(PathBuf::from("c.json")));
        assert_eq!(options.log_filter(), "trace");
    }
}
