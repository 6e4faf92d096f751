mod config;

use std::{net::SocketAddr, sync::Arc, time::Duration};

use anyhow::Context;
use clap::Parser;
use cryptodash::{CryptoDash, CryptoDashBuilder, SqliteRepositoryProvider, UpstreamConfig};
use cryptodash_axum::{CookieConfig, CsrfConfig};
use tokio::sync::watch;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use config::{AttemptStoreKind, Cli, Commands, ServeArgs};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,cryptodash=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Serve(args) => serve(&cli.database_url, args).await,
        Commands::Migrate => {
            tracing::info!("Running migrations");
            let dash = CryptoDashBuilder::new()
                .with_sqlite(&cli.database_url)
                .await?
                .build()
                .await?;
            dash.migrate().await.context("Migration failed")?;
            tracing::info!("Migrations applied");
            Ok(())
        }
        Commands::CheckAlerts(upstream) => {
            let dash = CryptoDashBuilder::new()
                .with_sqlite(&cli.database_url)
                .await?
                .with_upstream(upstream.into())
                .apply_migrations(true)
                .build()
                .await?;
            let report = dash.check_alerts().await.context("Alert check failed")?;
            tracing::info!(
                checked = report.checked,
                triggered = report.triggered,
                failed = report.failed,
                "Alert check finished"
            );
            println!("{}", serde_json::to_string_pretty(&report)?);
            Ok(())
        }
        Commands::CheckUserEmails => {
            let dash = open(&cli.database_url).await?;
            let users = dash.users_without_email().await?;
            if users.is_empty() {
                println!("All users have an e-mail address");
            } else {
                println!("{} user(s) without an e-mail address:", users.len());
                for user in &users {
                    println!("  {} ({})", user.username, user.id);
                }
            }
            Ok(())
        }
        Commands::SetUserEmail {
            username,
            email,
            replace,
        } => {
            let dash = open(&cli.database_url).await?;
            let user = dash
                .set_user_email(&username, &email, replace)
                .await
                .map_err(|e| anyhow::anyhow!(e.public_message()))?;
            println!("E-mail of {} set to {}", user.username, user.email_or_empty());
            Ok(())
        }
        Commands::Version => {
            println!("cryptodash v{}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}

async fn open(database_url: &str) -> anyhow::Result<CryptoDash<SqliteRepositoryProvider>> {
    Ok(CryptoDashBuilder::new()
        .with_sqlite(database_url)
        .await?
        .apply_migrations(true)
        .build()
        .await?)
}

async fn build_dash(
    database_url: &str,
    args: &ServeArgs,
) -> anyhow::Result<CryptoDash<SqliteRepositoryProvider>> {
    let upstream: UpstreamConfig = args.upstream.clone().into();
    let mut builder = CryptoDashBuilder::new()
        .with_sqlite(database_url)
        .await?
        .with_upstream(upstream)
        .with_media_root(&args.media_root)
        .apply_migrations(true);

    if args.attempt_store == AttemptStoreKind::Sqlite {
        builder = builder.with_sqlite_attempt_store();
    }

    Ok(builder.build().await?)
}

async fn serve(database_url: &str, args: ServeArgs) -> anyhow::Result<()> {
    let dash = Arc::new(build_dash(database_url, &args).await?);
    tracing::info!(
        attempt_store = ?args.attempt_store,
        media_root = %args.media_root,
        "Service initialised"
    );

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let housekeeping = dash.start_housekeeping(shutdown_rx);

    let cookies = CookieConfig::default()
        .with_secure(args.cookie_secure)
        .with_max_age(dash.session_config().lifetime_seconds());
    let csrf = if args.csrf_enforced {
        CsrfConfig::default()
    } else {
        CsrfConfig::disabled()
    };

    let app = cryptodash_axum::routes(dash.clone())
        .with_cookie_config(cookies)
        .with_csrf_config(csrf)
        .with_public_url(args.public_url.clone())
        .with_cors_origins(args.cors_allowed_origins.clone())
        .build();

    let listener = tokio::net::TcpListener::bind(args.bind_addr)
        .await
        .with_context(|| format!("Failed to bind {}", args.bind_addr))?;
    tracing::info!(addr = %args.bind_addr, "Listening");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
    .context("Server error")?;

    tracing::info!("Server stopped, waiting for background tasks");
    let _ = shutdown_tx.send(true);
    for handle in housekeeping {
        let _ = tokio::time::timeout(Duration::from_secs(5), handle).await;
    }
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => tracing::info!("Received Ctrl-C, shutting down"),
        () = terminate => tracing::info!("Received SIGTERM, shutting down"),
    }
}
