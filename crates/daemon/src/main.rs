// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `quaerod` entrypoint.

use quaero_core::SharedClock;
use quaero_daemon::env::Settings;
use quaero_daemon::{collaborators, crash, listener, DaemonError};
use quaero_definition::DefinitionSet;
use quaero_engine::{Runtime, RuntimeConfig, VariableStore};
use std::process::ExitCode;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    let settings = Settings::from_env();
    let _log_guard = init_tracing(&settings);
    crash::install(&settings.log_dir);

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(runtime) => runtime,
        Err(e) => {
            eprintln!("unable to start async runtime: {e}");
            return ExitCode::FAILURE;
        }
    };
    match runtime.block_on(run(settings)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "fatal");
            eprintln!("quaerod: {e}");
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(settings: &Settings) -> tracing_appender::non_blocking::WorkerGuard {
    let file_appender = tracing_appender::rolling::daily(&settings.log_dir, "quaerod.log");
    let (writer, guard) = tracing_appender::non_blocking(file_appender);
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(writer)
        .with_ansi(false)
        .init();
    guard
}

async fn run(settings: Settings) -> Result<(), DaemonError> {
    std::fs::create_dir_all(&settings.definitions_dir)?;
    let definitions = DefinitionSet::load_dir(&settings.definitions_dir)?;
    let vars = VariableStore::init(settings.variables.clone());
    let adapters = collaborators::default_set(&settings.state_dir).map_err(
        quaero_engine::EngineError::Adapter,
    )?;

    let mut config = RuntimeConfig::new(settings.state_dir.clone());
    config.concurrency = settings.concurrency;
    config.visibility_timeout = settings.visibility_timeout;

    let runtime = Arc::new(Runtime::open(
        config,
        SharedClock::system(),
        adapters,
        definitions,
        vars,
    )?);
    runtime.start();
    tracing::info!(
        concurrency = settings.concurrency,
        state_dir = %settings.state_dir.display(),
        "quaerod running"
    );

    // Kick off definitions marked auto_start
    for id in runtime.definition_ids() {
        if let Err(e) = autostart(&runtime, &id) {
            tracing::warn!(definition = %id, error = %e, "auto start failed");
        }
    }

    let shutdown = CancellationToken::new();
    {
        let shutdown = shutdown.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::info!("interrupt received, shutting down");
                shutdown.cancel();
            }
        });
    }

    listener::serve(Arc::clone(&runtime), &settings.socket_path, shutdown).await?;
    runtime.shutdown().await;
    tracing::info!("quaerod stopped");
    Ok(())
}

fn autostart(runtime: &Runtime, id: &str) -> Result<(), DaemonError> {
    if runtime.definition_auto_starts(id) {
        let root = runtime.execute(id)?;
        tracing::info!(definition = %id, job_id = %root.id, "auto started");
    }
    Ok(())
}
