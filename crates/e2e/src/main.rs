//! Smoke run against a live build server
//!
//! Creates a generated project, build configuration and user, reads them
//! back, then deletes everything it created.

use anyhow::{ensure, Context, Result};
use clap::Parser;
use std::path::PathBuf;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use ciprobe_common::{BuildType, Category, Project, User};
use ciprobe_e2e::{HarnessConfig, TestContext};

#[derive(Parser, Debug)]
#[command(name = "ciprobe-smoke")]
#[command(about = "Create, read back and clean up test entities on a build server")]
struct Args {
    /// Path to harness configuration
    #[arg(short, long, default_value = "ciprobe.toml")]
    config: PathBuf,

    /// Server root, overrides the configuration
    #[arg(long, env = "CIPROBE_BASE_URL")]
    base_url: Option<String>,

    /// Leave created entities on the server
    #[arg(long)]
    keep: bool,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    let rt = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("Error: failed to create tokio runtime: {}", e);
            std::process::exit(2);
        }
    };

    match rt.block_on(run(args)) {
        Ok(()) => std::process::exit(0),
        Err(e) => {
            error!("Smoke run failed: {:#}", e);
            std::process::exit(1);
        }
    }
}

async fn run(args: Args) -> Result<()> {
    let mut config = HarnessConfig::load(&args.config)
        .with_context(|| format!("loading {}", args.config.display()))?;
    if let Some(base_url) = args.base_url {
        config.base_url = base_url;
    }

    let ctx = TestContext::new(config)?;
    info!("Running smoke test against {}", ctx.config().base_url());

    let outcome = exercise(&ctx).await;

    if args.keep {
        info!("Keeping {} created entities", ctx.registry().len());
    } else {
        ctx.teardown().await;
    }
    outcome
}

async fn exercise(ctx: &TestContext) -> Result<()> {
    let data = ctx.test_data()?;
    let admin = ctx.superuser();

    let project = ctx.create_as_superuser(&data.project).await?;
    ensure!(project.id == data.project.id, "created project id differs");

    let build_type = ctx.create_as_superuser(&data.build_type).await?;
    ensure!(build_type.id == data.build_type.id, "created build type id differs");

    let (user, _client) = ctx.create_user_client(&data.user).await?;
    ensure!(user.username == data.user.username, "created username differs");

    let locator = Category::Projects.identity_locator(project.id.as_deref().unwrap_or_default());
    let read: Project = admin.checked::<Project>().read(&locator).await?;
    ensure!(read.name == data.project.name, "project name was not stored");

    let locator = Category::BuildTypes.identity_locator(build_type.id.as_deref().unwrap_or_default());
    let read: BuildType = admin.checked::<BuildType>().read(&locator).await?;
    ensure!(read.name == data.build_type.name, "build type name was not stored");

    let locator = Category::Users.name_locator(user.username.as_deref().unwrap_or_default());
    let read: User = admin.checked::<User>().read(&locator).await?;
    ensure!(read.id.is_some(), "user has no id");

    info!("Smoke test passed");
    Ok(())
}
