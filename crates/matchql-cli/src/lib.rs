//! matchql command-line front end
//!
//! Reads a query script and an optional compiler configuration, compiles
//! the script and returns the rendered output.

pub mod config;

pub use config::CliOptions;

use anyhow::{Context, Result};
use matchql_core::CompilerConfig;
use matchql_query::Compiler;
use std::fs;
use tracing::info;

/// Load the compiler configuration named by `options`
///
/// Without a config file the relational backend is used.
pub fn load_config(options: &CliOptions) -> Result<CompilerConfig> {
    match &options.config_path {
        Some(path) => CompilerConfig::from_json_file(path)
            .with_context(|| format!("failed to load config {}", path.display())),
        None => Ok(CompilerConfig::for_relational()),
    }
}

/// Compile the query file named by `options`
pub fn compile_file(options: &CliOptions) -> Result<String> {
    let config = load_config(options)?;
    info!("Compiling {} for {:?} backend", options.query_path.display(), config.backend);

    let text = fs::read_to_string(&options.query_path)
        .with_context(|| format!("failed to read {}", options.query_path.display()))?;
    let output = Compiler::new(config)
        .compile_text(&text)
        .with_context(|| format!("failed to compile {}", options.query_path.display()))?;
    Ok(output.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn temp_file(contents: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_compile_file_relational() {
        let query = temp_file("SELECT A.name FROM Node AS A WHERE A.age = 27");
        let output = compile_file(&CliOptions::new(query.path())).unwrap();
        assert_eq!(output, "SELECT A.name FROM Node AS A WHERE A.age = 27;");
    }

    #[test]
    fn test_compile_file_with_config() {
        let query = temp_file("INSERT INTO Node (id, name) VALUES ('v1', 'marko')");
        let config = temp_file(r#"{"backend": "json_server"}"#);

        let output = compile_file(&CliOptions::new(query.path()).config_path(config.path())).unwrap();
        let script: serde_json::Value = serde_json::from_str(&output).unwrap();

        assert_eq!(script["op"], "insert_vertex");
        assert_eq!(script["properties"]["name"][0]["_value"], "marko");
    }

    #[test]
    fn test_compile_file_reports_context() {
        let query = temp_file("SELECT FROM");
        let err = compile_file(&CliOptions::new(query.path())).unwrap_err();
        assert!(err.to_string().starts_with("failed to compile"));
        assert!(err.root_cause().to_string().contains("Syntax error"));
    }

    #[test]
    fn test_missing_query_file() {
        let err = compile_file(&CliOptions::new("/nonexistent/query.sql")).unwrap_err();
        assert!(err.to_string().contains("failed to read"));
    }
}
