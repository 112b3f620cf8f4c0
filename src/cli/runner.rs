//! CLI command execution

use super::commands::{Cli, Commands};
use crate::config::ScoutConfig;
use crate::error::{Error, Result};
use crate::http::ReplayClient;
use crate::source::Source;
use crate::types::{JsonValue, ValueMap};
use std::path::Path;
use tracing::info;

/// Executes parsed CLI commands
pub struct Runner {
    cli: Cli,
}

impl Runner {
    /// Create a runner for parsed arguments
    pub fn new(cli: Cli) -> Self {
        Self { cli }
    }

    /// Run the selected command
    pub async fn run(&self) -> Result<()> {
        let config = match &self.cli.config {
            Some(path) => ScoutConfig::from_yaml_file(path)?,
            None => ScoutConfig::default(),
        };

        match &self.cli.command {
            Commands::Replay {
                source,
                limit,
                offset,
                params,
            } => self.replay(&config, source, *limit, *offset, params).await,
            Commands::Show { source } => self.show(source),
            Commands::Validate { source } => self.validate(source),
        }
    }

    async fn replay(
        &self,
        config: &ScoutConfig,
        path: &Path,
        limit: i64,
        offset: i64,
        params: &[String],
    ) -> Result<()> {
        let source = Source::load(path)?;
        let client = ReplayClient::with_config(config.http.to_client_config());
        let dynamic = parse_params(params)?;

        let mut stream = source.generate_data(&client, limit, offset, dynamic)?;
        let mut total = 0usize;
        while let Some(batch) = stream.next_batch().await {
            for record in batch? {
                println!("{record}");
                total += 1;
            }
        }
        info!("replayed {total} records");
        Ok(())
    }

    fn show(&self, path: &Path) -> Result<()> {
        let source = Source::load(path)?;
        println!("target url:  {}", source.target_url);
        println!("query:       {}", source.query);
        println!("created:     {}", source.created_at);
        println!(
            "request:     {} {}",
            source.request_detail.request.method, source.request_detail.request.url
        );
        match &source.request_detail.pagination {
            Some(info) => println!("pagination:  {:?}", info.strategy()),
            None => println!("pagination:  none (single page)"),
        }
        let mut knobs: Vec<&String> = source.request_detail.dynamic_parameters.keys().collect();
        knobs.sort();
        if !knobs.is_empty() {
            println!(
                "parameters:  {}",
                knobs.into_iter().cloned().collect::<Vec<_>>().join(", ")
            );
        }
        println!(
            "extraction:  {}",
            if source.response_detail.extraction_code.is_some() {
                "generated code"
            } else {
                "whole-batch passthrough"
            }
        );
        println!(
            "page size:   {} (observed)",
            source.response_detail.default_entity_count
        );
        Ok(())
    }

    fn validate(&self, path: &Path) -> Result<()> {
        // Loading re-checks every construction invariant.
        let source = Source::load(path)?;
        println!(
            "ok: {} ({})",
            path.display(),
            match &source.request_detail.pagination {
                Some(info) => format!("{:?}", info.strategy()),
                None => "single page".to_string(),
            }
        );
        Ok(())
    }
}

/// Parse repeated `key=value` arguments into dynamic parameters
fn parse_params(params: &[String]) -> Result<ValueMap> {
    let mut map = ValueMap::new();
    for param in params {
        let Some((key, value)) = param.split_once('=') else {
            return Err(Error::config(format!(
                "invalid parameter `{param}`, expected key=value"
            )));
        };
        map.insert(key.to_string(), JsonValue::String(value.to_string()));
    }
    Ok(map)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_params() {
        let params = vec!["sort=newest".to_string(), "q=shoes".to_string()];
        let map = parse_params(&params).unwrap();
        assert_eq!(map["sort"], JsonValue::String("newest".into()));
        assert_eq!(map["q"], JsonValue::String("shoes".into()));
    }

    #[test]
    fn test_parse_params_rejects_malformed() {
        assert!(parse_params(&["nodelimiter".to_string()]).is_err());
    }
}
