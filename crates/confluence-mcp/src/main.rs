use crate::prelude::*;
use clap::Parser;
use confluence_mcp_core::config::AtlassianConfig;
use tokio_util::sync::CancellationToken;

mod confluence;
mod mcp;
mod prelude;
mod transport;

#[derive(Debug, clap::Parser)]
#[command(
    author,
    version,
    about,
    long_about = "Confluence search, spaces and pages for LLM coding agents, over MCP or the command line"
)]
pub struct App {
    #[command(subcommand)]
    pub command: SubCommands,

    #[clap(flatten)]
    global: Global,
}

#[derive(Debug, Clone, clap::Args)]
pub struct Global {
    /// Atlassian site name (e.g. "mycompany"), host, or full base URL
    #[clap(long, env = "ATLASSIAN_SITE_NAME", global = true)]
    site_name: Option<String>,

    /// Atlassian account email
    #[clap(long, env = "ATLASSIAN_USER_EMAIL", global = true)]
    user_email: Option<String>,

    /// Atlassian API token
    #[clap(long, env = "ATLASSIAN_API_TOKEN", global = true, hide_env_values = true)]
    api_token: Option<String>,

    /// Session cookie; replaces basic auth when set
    #[clap(long, env = "ATLASSIAN_COOKIE", global = true, hide_env_values = true)]
    cookie: Option<String>,

    /// Log outbound requests (secrets redacted) and other debug output
    #[clap(long, env = "DEBUG", global = true, default_value = "false")]
    debug: bool,

    /// Whether to display additional information.
    #[clap(long, env = "CONFLUENCE_MCP_VERBOSE", global = true, default_value = "false")]
    verbose: bool,

    /// Fires when the user interrupts a CLI command
    #[clap(skip)]
    cancel: CancellationToken,
}

impl Global {
    /// Immutable configuration snapshot shared by every request
    pub fn config(&self) -> AtlassianConfig {
        AtlassianConfig {
            site_name: self.site_name.clone(),
            user_email: self.user_email.clone(),
            api_token: self.api_token.clone(),
            cookie: self.cookie.clone(),
            debug: self.debug,
        }
    }
}

#[derive(Debug, clap::Parser)]
pub enum SubCommands {
    /// Confluence operations (spaces, pages, search)
    #[clap(subcommand)]
    Confluence(crate::confluence::Commands),

    /// Model Context Protocol server
    MCP(crate::mcp::App),
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;

    let app = App::parse();

    let mut logger = env_logger::Builder::from_default_env();
    if app.global.debug {
        logger.filter_level(log::LevelFilter::Debug);
    }
    logger.init();

    match app.command {
        SubCommands::Confluence(cmd) => {
            let cancel = app.global.cancel.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    log::debug!("Interrupted, cancelling in-flight request");
                    cancel.cancel();
                }
            });
            crate::confluence::run(cmd, app.global).await
        }
        SubCommands::MCP(sub_app) => crate::mcp::run(sub_app, app.global).await,
    }
    .map_err(|err: color_eyre::eyre::Report| eyre!(err))
}
