//! Terminal client runner.

use std::sync::Arc;

use rustyline::{DefaultEditor, error::ReadlineError};
use tokio::sync::{mpsc, watch};
use yoriai_shared::time::jst_clock;

use super::{
    args::Args,
    error::ClientError,
    render::{Renderer, format_connection},
};
use crate::{
    domain::{ConnectionState, Snapshot},
    infrastructure::HttpHistoryLoader,
    usecase::{SessionError, SessionHandle},
};

const PROMPT: &str = "> ";

/// Join the room given on the command line until the prompt is closed
pub async fn run(args: Args) -> Result<(), ClientError> {
    let room = args.room_name()?;
    let config = args.config();
    tracing::info!("Joining room '{}' on {}", room, config.host);

    let loader = Arc::new(HttpHistoryLoader::new(config.clone()));
    let mut session = SessionHandle::activate(&config, room, loader)?;

    let render_task = tokio::spawn(render_loop(
        session.subscribe(),
        session.subscribe_connection(),
    ));

    // rustyline blocks, so it gets its own thread
    let (line_tx, line_rx) = mpsc::unbounded_channel();
    let prompt_task = tokio::task::spawn_blocking(move || read_lines(line_tx));

    let forwarded = forward_lines(line_rx, &session).await;

    session.deactivate().await;
    render_task.abort();

    // The prompt thread stays blocked in readline until the process exits
    forwarded?;

    match prompt_task.await {
        Ok(result) => result?,
        Err(e) => tracing::warn!("Prompt task failed: {}", e),
    }
    Ok(())
}

/// Submit prompt lines until the prompt closes or the session ends
async fn forward_lines(
    mut lines: mpsc::UnboundedReceiver<String>,
    session: &SessionHandle,
) -> Result<(), SessionError> {
    while let Some(mut draft) = lines.recv().await {
        session.submit(&mut draft)?;
    }
    Ok(())
}

/// Print every new snapshot suffix and connection change
async fn render_loop(
    mut snapshots: watch::Receiver<Snapshot>,
    mut connection: watch::Receiver<ConnectionState>,
) {
    let mut renderer = Renderer::new();
    let mut snapshots_live = true;
    let mut connection_live = true;

    while snapshots_live || connection_live {
        tokio::select! {
            changed = snapshots.changed(), if snapshots_live => {
                if changed.is_err() {
                    snapshots_live = false;
                    continue;
                }
                let snapshot = snapshots.borrow_and_update().clone();
                for line in renderer.pending_lines(&snapshot) {
                    println!("[{}] {}", jst_clock(), line);
                }
            }
            changed = connection.changed(), if connection_live => {
                if changed.is_err() {
                    connection_live = false;
                    continue;
                }
                let state = *connection.borrow_and_update();
                eprintln!("{}", format_connection(state));
            }
        }
    }
}

/// Forward prompt lines until EOF or Ctrl-C
fn read_lines(lines: mpsc::UnboundedSender<String>) -> Result<(), ClientError> {
    let mut editor = DefaultEditor::new()?;
    loop {
        match editor.readline(PROMPT) {
            Ok(line) => {
                if !line.is_empty() {
                    let _ = editor.add_history_entry(line.as_str());
                }
                if lines.send(line).is_err() {
                    return Ok(());
                }
            }
            Err(ReadlineError::Interrupted | ReadlineError::Eof) => return Ok(()),
            Err(e) => return Err(e.into()),
        }
    }
}
