use std::{net::SocketAddr, path::PathBuf, sync::Arc};

use anyhow::{Context, Result};
use bindforge::{
    AppState, SharedState, api,
    config::{AppConfig, ReverseSoa},
    db,
    deploy::{AnsibleDeployer, Deployer, DeploymentGate},
    dns::assemble::ZoneAssembler,
    dns::render::ZoneFileRenderer,
    publish::Publisher,
    staging::StagingCoordinator,
    vcs::{GitWorkingCopy, NoVersionControl, VersionControl},
};
use clap::Parser;
use tokio::{net::TcpListener, signal};
use tower_http::cors::CorsLayer;
use tracing::{error, info};

#[derive(Parser, Debug)]
#[command(author, version, about, rename_all = "kebab-case")]
struct Cli {
    /// Path to the SQLite database file
    #[arg(long, value_name = "PATH")]
    db_path: PathBuf,
    /// Listen address for the HTTP server
    #[arg(long, value_name = "ADDR", default_value = "0.0.0.0:8080")]
    listen: SocketAddr,
    /// Directory rendered zone files are written to (the git working copy)
    #[arg(long, value_name = "PATH", default_value = "output")]
    output_dir: PathBuf,
    /// Directory holding the zone-file templates
    #[arg(long, value_name = "PATH", default_value = "templates")]
    template_dir: PathBuf,

    /// Primary NS written into synthesized reverse zones
    #[arg(long, value_name = "FQDN", default_value = "ns1.localhost.")]
    reverse_primary_ns: String,
    /// Admin mailbox written into synthesized reverse zones
    #[arg(long, value_name = "EMAIL", default_value = "hostmaster@localhost")]
    reverse_admin_email: String,

    /// Git remote to push rendered configuration to
    #[arg(long, value_name = "REMOTE", default_value = "origin")]
    git_remote: String,
    /// Git branch to push to
    #[arg(long, value_name = "BRANCH", default_value = "master")]
    git_branch: String,
    /// Commit author name
    #[arg(long, value_name = "NAME", default_value = "bindforge")]
    git_author_name: String,
    /// Commit author email
    #[arg(long, value_name = "EMAIL", default_value = "bindforge@localhost")]
    git_author_email: String,
    /// Skip committing and pushing rendered files (local development)
    #[arg(long)]
    no_vcs: bool,

    /// Ansible playbook applying the configuration to the fleet
    #[arg(long, value_name = "PATH", default_value = "ansible/deploy_config.yaml")]
    ansible_playbook: PathBuf,
    /// Ansible inventory file
    #[arg(long, value_name = "PATH", default_value = "ansible/inventory.ini")]
    ansible_inventory: PathBuf,
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    let cli = Cli::parse();
    let state = init_shared_state(&cli).await?;

    let app = api::create_router(state).layer(CorsLayer::permissive());

    let listener = TcpListener::bind(cli.listen)
        .await
        .with_context(|| format!("failed to bind to {}", cli.listen))?;

    info!("listening on http://{}", listener.local_addr()?);

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server exited with error")?;

    Ok(())
}

async fn init_shared_state(cli: &Cli) -> Result<SharedState> {
    if let Some(parent) = cli.db_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create db directory {}", parent.display()))?;
    }

    let config = AppConfig {
        output_dir: cli.output_dir.clone(),
        template_dir: cli.template_dir.clone(),
        reverse_soa: ReverseSoa {
            primary_ns: cli.reverse_primary_ns.clone(),
            admin_email: cli.reverse_admin_email.clone(),
            ..ReverseSoa::default()
        },
    };

    let db = db::init_db(&cli.db_path).await?;

    // a malformed template should fail startup, not the first publish
    let renderer = ZoneFileRenderer::new(&config.template_glob(), &config.output_dir)
        .context("failed to load zone templates")?;

    let vcs: Arc<dyn VersionControl> = if cli.no_vcs {
        Arc::new(NoVersionControl)
    } else {
        Arc::new(GitWorkingCopy::new(
            config.output_dir.clone(),
            cli.git_remote.clone(),
            cli.git_branch.clone(),
            cli.git_author_name.clone(),
            cli.git_author_email.clone(),
        ))
    };
    let deployer: Arc<dyn Deployer> = Arc::new(AnsibleDeployer {
        playbook: cli.ansible_playbook.clone(),
        inventory: cli.ansible_inventory.clone(),
    });

    let assembler = ZoneAssembler::new(db.clone(), config.reverse_soa.clone());
    let staging = StagingCoordinator::new(db.clone());
    let gate = DeploymentGate::new(db.clone());
    let publisher = Publisher::new(
        assembler,
        renderer,
        staging.clone(),
        gate.clone(),
        vcs,
        deployer,
    );

    Ok(Arc::new(AppState {
        config,
        db,
        staging,
        gate,
        publisher,
    }))
}

async fn shutdown_signal() {
    if let Err(err) = signal::ctrl_c().await {
        error!("failed to install CTRL+C handler: {err}");
    }
    info!("shutdown signal received");
}

fn init_tracing() {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info,tower_http=info".into());
    tracing_subscriber::fmt().with_env_filter(env_filter).init();
}
