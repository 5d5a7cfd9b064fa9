// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Unix-socket listener serving the control protocol.
//!
//! One task per connection. Regular requests are answered in order;
//! `Subscribe` switches the connection to a one-way stream of bus events
//! until the client hangs up.

use crate::DaemonError;
use quaero_core::JobId;
use quaero_engine::Runtime;
use quaero_wire::{read_frame, write_frame, JobSummary, ProtocolError, Request, Response};
use std::path::Path;
use std::sync::Arc;
use tokio::net::{UnixListener, UnixStream};
use tokio_util::sync::CancellationToken;

/// Accept connections until `shutdown` fires.
pub async fn serve(
    runtime: Arc<Runtime>,
    socket_path: &Path,
    shutdown: CancellationToken,
) -> Result<(), DaemonError> {
    // A dead daemon leaves its socket file behind
    if socket_path.exists() {
        std::fs::remove_file(socket_path)?;
    }
    if let Some(parent) = socket_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    let listener = UnixListener::bind(socket_path)?;
    tracing::info!(socket = %socket_path.display(), "listening");

    loop {
        tokio::select! {
            _ = shutdown.cancelled() => break,
            accepted = listener.accept() => {
                match accepted {
                    Ok((stream, _)) => {
                        let runtime = Arc::clone(&runtime);
                        let shutdown = shutdown.clone();
                        tokio::spawn(async move {
                            if let Err(e) = serve_connection(runtime, stream, shutdown).await {
                                tracing::debug!(error = %e, "connection ended with error");
                            }
                        });
                    }
                    Err(e) => tracing::warn!(error = %e, "accept failed"),
                }
            }
        }
    }
    let _ = std::fs::remove_file(socket_path);
    Ok(())
}

async fn serve_connection(
    runtime: Arc<Runtime>,
    stream: UnixStream,
    shutdown: CancellationToken,
) -> Result<(), ProtocolError> {
    let (mut reader, mut writer) = stream.into_split();
    loop {
        let request: Request = tokio::select! {
            _ = shutdown.cancelled() => break,
            read = read_frame(&mut reader) => match read {
                Ok(request) => request,
                Err(ProtocolError::Closed) => break,
                Err(e) => {
                    let _ = write_frame(&mut writer, &Response::error(e.to_string())).await;
                    return Err(e);
                }
            },
        };
        tracing::debug!(?request, "request");

        match request {
            Request::Subscribe => {
                write_frame(&mut writer, &Response::Subscribed).await?;
                stream_events(&runtime, &mut writer, &shutdown).await;
                break;
            }
            Request::Shutdown => {
                write_frame(&mut writer, &Response::Ok).await?;
                shutdown.cancel();
                break;
            }
            other => {
                let response = handle_request(&runtime, other);
                write_frame(&mut writer, &response).await?;
            }
        }
    }
    Ok(())
}

/// Forward bus events until the client disconnects or shutdown fires.
async fn stream_events(
    runtime: &Runtime,
    writer: &mut (impl tokio::io::AsyncWrite + Unpin),
    shutdown: &CancellationToken,
) {
    let mut events = runtime.bus().subscribe();
    loop {
        let event = tokio::select! {
            _ = shutdown.cancelled() => break,
            received = events.recv() => match received {
                Ok(event) => event,
                Err(tokio::sync::broadcast::error::RecvError::Lagged(dropped)) => {
                    tracing::warn!(dropped, "subscriber lagged, events dropped");
                    continue;
                }
                Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
            },
        };
        if write_frame(writer, &Response::Event { event }).await.is_err() {
            break;
        }
    }
}

fn handle_request(runtime: &Runtime, request: Request) -> Response {
    match request {
        Request::Execute { definition_id } => match runtime.execute(&definition_id) {
            Ok(root) => Response::Executed {
                job_id: root.id.to_string(),
                status: "queued".to_string(),
            },
            Err(e) => Response::error(e.to_string()),
        },
        Request::ListJobs { offset, limit } => Response::Jobs {
            jobs: runtime
                .jobs()
                .list_roots(offset, limit)
                .iter()
                .map(JobSummary::from)
                .collect(),
        },
        Request::GetJob { id } => match runtime.jobs().get(&JobId::from_string(id)) {
            Some(job) => Response::Job { job },
            None => Response::error("job not found"),
        },
        Request::ListChildren { id } => Response::Children {
            children: runtime
                .jobs()
                .list_children(&JobId::from_string(id))
                .iter()
                .map(JobSummary::from)
                .collect(),
        },
        Request::ListLogs { id, limit, since_ms } => Response::Logs {
            entries: runtime
                .jobs()
                .list_logs(&JobId::from_string(id), limit, since_ms),
        },
        Request::TreeStatus { id } => {
            match runtime.jobs().tree_status(&JobId::from_string(id)) {
                Ok(tree) => Response::Tree { tree },
                Err(e) => Response::error(e.to_string()),
            }
        }
        Request::CancelJob { id } => match runtime.cancel_job(&JobId::from_string(id)) {
            Ok(_) => Response::Ok,
            Err(e) => Response::error(e.to_string()),
        },
        Request::CopyJob { id } => match runtime.copy_job(&JobId::from_string(id)) {
            Ok(job) => Response::Job { job },
            Err(e) => Response::error(e.to_string()),
        },
        Request::DeleteJob { id } => match runtime.delete_job(&JobId::from_string(id)) {
            Ok(()) => Response::Ok,
            Err(e) => Response::error(e.to_string()),
        },
        Request::QueueStatus => Response::Queue {
            stats: runtime.queue_stats(),
        },
        Request::ListDefinitions => Response::Definitions {
            ids: runtime.definition_ids(),
        },
        // Handled by the connection loop
        Request::Subscribe | Request::Shutdown => Response::Ok,
    }
}

#[cfg(test)]
#[path = "listener_tests.rs"]
mod tests;
