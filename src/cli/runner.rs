//! CLI runner - executes commands

use crate::cli::commands::{Cli, Commands, OutputFormat};
use crate::client::CentralClient;
use crate::config::ClientConfig;
use crate::error::Result;
use crate::types::JsonValue;
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// CLI runner
pub struct Runner {
    cli: Cli,
    cancel: CancellationToken,
}

impl Runner {
    /// Create a new runner
    pub fn new(cli: Cli) -> Self {
        Self {
            cli,
            cancel: CancellationToken::new(),
        }
    }

    /// Token that stops an in-progress page collection when cancelled
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Run the CLI command
    pub async fn run(&self) -> Result<()> {
        let config = self.load_config()?;
        let mut client = CentralClient::new(&config)?;

        match &self.cli.command {
            Commands::Whoami => {
                let whoami = client.whoami().await?;
                self.print(&whoami)
            }
            Commands::List {
                path,
                tenant,
                host,
                query,
                all,
            } => {
                let client = match (tenant, host) {
                    (Some(tenant), Some(host)) => client.tenant(tenant, host)?,
                    _ => {
                        client.whoami().await?;
                        client
                    }
                };

                if *all {
                    self.list_all(&client, path, query).await
                } else {
                    let page = client.list::<JsonValue>(path, query).await?;
                    self.print(&page)
                }
            }
        }
    }

    async fn list_all(
        &self,
        client: &CentralClient,
        path: &str,
        query: &[(String, String)],
    ) -> Result<()> {
        let collected = client
            .list_all::<JsonValue>(path, query, &self.cancel)
            .await?;

        if self.cancel.is_cancelled() {
            warn!("Interrupted, output holds only the pages fetched so far");
        }
        if !collected.is_complete() {
            warn!(
                dropped = collected.pages_dropped,
                "Some pages could not be fetched"
            );
        }
        debug!(
            items = collected.response.items.len(),
            pages = collected.pages_merged + 1,
            "List complete"
        );

        self.print(&collected.response)
    }

    fn load_config(&self) -> Result<ClientConfig> {
        match &self.cli.config {
            Some(path) => ClientConfig::load(path),
            None => Ok(ClientConfig::from_env()),
        }
    }

    fn print<T: Serialize>(&self, value: &T) -> Result<()> {
        let output = render(value, self.cli.format)?;
        println!("{output}");
        Ok(())
    }
}

/// Serialize a value in the requested format
pub fn render<T: Serialize>(value: &T, format: OutputFormat) -> Result<String> {
    let output = match format {
        OutputFormat::Json => serde_json::to_string(value)?,
        OutputFormat::Pretty => serde_json::to_string_pretty(value)?,
    };
    Ok(output)
}
