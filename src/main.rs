use clap::Parser;

use pvenotes::cli::{Cli, Command, OutputFormat};
use pvenotes::config::{self, SystemConfig};
use pvenotes::error::SyncError;
use pvenotes::fetcher::{ProxmoxClient, ResourceFetcher};
use pvenotes::logging;
use pvenotes::reconcile::Reconciler;
use pvenotes::report::{self, ResourceJson, SummaryJson};
use pvenotes::resource::ResourceKind;

#[tokio::main]
async fn main() -> miette::Result<()> {
    let cli = Cli::parse();

    let log_handle = logging::init(cli.verbose);

    // Handle init before loading config, since it creates the config
    if let Command::Init { force } = cli.command {
        return pvenotes::init::run(&cli.config, force).map_err(Into::into);
    }

    let sys_config = config::load_config(&cli.config)?;
    let client = ProxmoxClient::new(&sys_config)?;

    match cli.command {
        Command::Init { .. } => unreachable!(),
        Command::List { kinds } => {
            let kinds = resolve_kinds(kinds, &sys_config)?;
            run_list(&client, &kinds, cli.output).await?;
        }
        Command::Sync { kinds } => {
            let kinds = resolve_kinds(kinds, &sys_config)?;

            let log_file = sys_config.log_file();
            if let Err(e) = log_handle.attach(&log_file) {
                tracing::warn!(path = %log_file.display(), error = %e, "sync log unavailable");
            }

            run_sync(client, &sys_config, &kinds, cli.output).await?;
        }
    }

    Ok(())
}

/// Kinds from the command line, or the configured defaults when none given.
fn resolve_kinds(
    requested: Vec<ResourceKind>,
    sys_config: &SystemConfig,
) -> Result<Vec<ResourceKind>, SyncError> {
    if requested.is_empty() {
        return sys_config.default_kinds();
    }
    let mut kinds = Vec::new();
    for kind in requested {
        if !kinds.contains(&kind) {
            kinds.push(kind);
        }
    }
    Ok(kinds)
}

/// Run one reconciliation pass per kind. A kind whose listing fails is
/// reported; the remaining kinds still sync and the first failure becomes
/// the exit error.
async fn run_sync(
    client: ProxmoxClient,
    sys_config: &SystemConfig,
    kinds: &[ResourceKind],
    output: OutputFormat,
) -> Result<(), SyncError> {
    let reconciler = Reconciler::new(client, sys_config.notes_dir.clone());
    tracing::info!(dir = %reconciler.notes_dir().display(), "syncing notes");

    let mut summaries = Vec::new();
    let mut first_error = None;

    for &kind in kinds {
        let spinner = report::spinner(kind);
        let result = reconciler.sync_kind(kind).await;
        if let Some(s) = spinner {
            s.finish_and_clear();
        }

        match result {
            Ok(summary) => summaries.push(summary),
            Err(e) => {
                tracing::error!(kind = %kind, error = %e, "cannot list resources");
                first_error.get_or_insert(e);
            }
        }
    }

    match output {
        OutputFormat::Json => {
            let json: Vec<SummaryJson> = summaries.iter().map(SummaryJson::from).collect();
            println!(
                "{}",
                facet_json::to_string(&json).expect("JSON serialization")
            );
        }
        OutputFormat::Plain => {
            for summary in &summaries {
                println!("{}", report::summary_line(summary));
            }
        }
    }

    match first_error {
        Some(e) => Err(e),
        None => Ok(()),
    }
}

async fn run_list(
    client: &ProxmoxClient,
    kinds: &[ResourceKind],
    output: OutputFormat,
) -> Result<(), SyncError> {
    let mut resources = Vec::new();
    for &kind in kinds {
        let listed = client.list_resources(kind).await?;
        resources.extend(listed.into_iter().filter(|r| r.kind == kind));
    }

    match output {
        OutputFormat::Json => {
            let json: Vec<ResourceJson> = resources.iter().map(ResourceJson::from).collect();
            println!(
                "{}",
                facet_json::to_string(&json).expect("JSON serialization")
            );
        }
        OutputFormat::Plain => {
            if resources.is_empty() {
                println!("No resources.");
            }
            for resource in &resources {
                println!("{}", report::resource_line(resource));
            }
        }
    }

    Ok(())
}
