/// CivicFix server binary
use anyhow::Context;
use civicfix::{jobs::JobScheduler, server, AppContext, ServerConfig};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "civicfix=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    print_banner();

    let config = ServerConfig::from_env().context("failed to load configuration")?;

    let ctx = AppContext::new(config)
        .await
        .context("failed to initialize application context")?;

    ctx.account_manager
        .ensure_superuser(&ctx.config.bootstrap)
        .await
        .context("failed to bootstrap superuser")?;

    // Start background jobs
    let scheduler = Arc::new(JobScheduler::new(Arc::new(ctx.clone())));
    scheduler.start();

    server::serve(ctx).await?;

    Ok(())
}

fn print_banner() {
    println!(
        r#"
   _____ _       _      ______ _
  / ____(_)     (_)    |  ____(_)
 | |     ___   ___  ___| |__   ___  __
 | |    | \ \ / / |/ __|  __| | \ \/ /
 | |____| |\ V /| | (__| |    | |>  <
  \_____|_| \_/ |_|\___|_|    |_/_/\_\

        Municipal issue reporting v{}
        "#,
        env!("CARGO_PKG_VERSION")
    );
}
