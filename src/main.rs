use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use gazette::app::AppContext;
use gazette::cli::{commands, Cli, Commands};
use gazette::config::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let config = Config::load()?;
    let ctx = AppContext::new(config)?;

    match cli.command {
        Commands::Add {
            name,
            url,
            logo,
            color,
        } => {
            commands::add_source(&ctx, &name, &url, &logo, &color).await?;
        }
        Commands::Remove { source } => {
            commands::remove_source(&ctx, &source).await?;
        }
        Commands::Sources => {
            commands::list_sources(&ctx).await?;
        }
        Commands::Import { path } => {
            commands::import_opml(&ctx, &path).await?;
        }
        Commands::Sync { force, offline } => {
            commands::sync(&ctx, force, offline).await?;
        }
        Commands::Show {
            limit,
            tag,
            author,
            source,
            collection,
        } => {
            commands::show(&ctx, limit, tag, author, source, collection).await?;
        }
        Commands::Status => {
            commands::status(&ctx).await?;
        }
        Commands::ClearCache => {
            commands::clear_cache(&ctx).await?;
        }
        Commands::Watch { interval } => {
            commands::watch(&ctx, &interval).await?;
        }
    }

    Ok(())
}
