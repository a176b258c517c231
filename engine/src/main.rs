// Troupe role orchestration engine
// Main entry point for the troupe binary

use clap::Parser;
use troupe_engine::cli::{Cli, Command, StateAction};
use troupe_engine::config::RolesConfig;
use troupe_engine::handlers::{
    handle_process, handle_roles, handle_state_clear, handle_state_cleanup, handle_state_show,
    OutputFormat, ProcessArgs,
};
use troupe_engine::telemetry::init_telemetry;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Parse CLI arguments
    let cli = Cli::parse();

    // Determine output format
    let format = if cli.json {
        OutputFormat::Json
    } else {
        OutputFormat::Text
    };

    // Load configuration (or use custom path if provided)
    let config = if let Some(config_path) = &cli.config {
        RolesConfig::load_from_path(config_path)?
    } else {
        RolesConfig::load_or_create()?
    };

    // The subscriber is installed exactly once, after the level is known;
    // --log overrides the configured level, RUST_LOG overrides both
    let log_level = cli.log.as_deref().unwrap_or(&config.settings.log_level);
    init_telemetry(log_level);

    let version = env!("CARGO_PKG_VERSION");
    let commit = env!("GIT_COMMIT_HASH");
    let timestamp = env!("BUILD_TIMESTAMP");

    tracing::info!("Troupe Engine v{} ({} - {})", version, commit, timestamp);

    // Handle commands
    match cli.command {
        Command::Process {
            input,
            conversation,
            user,
            mode,
            roles,
            tags,
            exclude_tags,
            stop_on_failure,
        } => {
            tracing::info!("Processing request ({} chars)", input.len());
            let args = ProcessArgs {
                input,
                conversation,
                user,
                mode,
                roles,
                tags,
                exclude_tags,
                stop_on_failure,
            };
            handle_process(args, &config, format).await
        }

        Command::Roles => {
            tracing::info!("Listing registered roles");
            handle_roles(&config, format).await
        }

        Command::State { action } => match action {
            StateAction::Show { conversation } => {
                tracing::info!("Showing state for conversation '{}'", conversation);
                handle_state_show(&conversation, &config, format).await
            }
            StateAction::Clear { conversation } => {
                tracing::info!("Clearing state for conversation '{}'", conversation);
                handle_state_clear(&conversation, &config).await
            }
            StateAction::Cleanup { older_than_hours } => {
                let hours =
                    older_than_hours.unwrap_or(config.settings.cleanup_interval_hours);
                tracing::info!("Cleaning up conversations older than {} hours", hours);
                handle_state_cleanup(hours, &config, format).await
            }
        },
    }
}
