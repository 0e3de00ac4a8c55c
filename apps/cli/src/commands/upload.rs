use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use hupload_protocol::Item;
use hupload_share_client::{Client, share_path};
use hupload_transfer::{FileHandle, ProgressSummary, QueueEntryView, UploadQueue, snapshot_channel};

use crate::cli::UploadArgs;
use crate::config::CliConfig;
use crate::render;

pub async fn execute(config: &CliConfig, args: UploadArgs) -> Result<()> {
    let client = Arc::new(Client::new(config.client_config()).context("failed to create client")?);
    let prefix = share_path(&args.share)?;

    let files = args
        .files
        .iter()
        .map(|path| {
            FileHandle::from_path(path).with_context(|| format!("cannot upload {}", path.display()))
        })
        .collect::<Result<Vec<_>>>()?;

    let (tx, rx) = snapshot_channel();
    let queue = UploadQueue::new(client.clone(), prefix, Some(Arc::new(tx)))
        .with_layout(args.layout.unwrap_or(config.layout));

    info!(share = %args.share, files = files.len(), "uploading");

    let result = drive(
        queue.add_files(files),
        rx,
        Duration::from_millis(args.refresh_ms.max(10)),
        tokio::signal::ctrl_c(),
        &queue.cancel_token(),
    )
    .await;

    for entry in &queue.snapshot() {
        eprintln!("{}", render::entry_line(entry));
    }
    eprintln!("{}", render::summary_line(&queue.progress_summary()));

    // The server's listing is authoritative once the batch has settled.
    match client.list_items(&args.share).await {
        Ok(items) => {
            let removed = queue.remove_committed(items.iter().map(Item::name));
            info!(
                share = %args.share,
                items = items.len(),
                pruned = removed.len(),
                "share refreshed"
            );
        }
        Err(e) => warn!(share = %args.share, error = %e, "failed to refresh share items"),
    }

    match result {
        Ok(receipts) => {
            println!("uploaded {} files to {}", receipts.len(), args.share);
            Ok(())
        }
        Err(e) => Err(anyhow::Error::new(e).context(format!("upload to {} failed", args.share))),
    }
}

/// Polls `upload` to completion, printing the latest summary on every tick
/// that saw a change. The first completion of `interrupt` cancels `cancel`.
async fn drive<U, I, E>(
    upload: U,
    mut rx: watch::Receiver<Vec<QueueEntryView>>,
    refresh: Duration,
    interrupt: I,
    cancel: &CancellationToken,
) -> U::Output
where
    U: Future,
    I: Future<Output = std::io::Result<E>>,
{
    let mut tick = tokio::time::interval(refresh);
    tick.set_missed_tick_behavior(MissedTickBehavior::Delay);

    tokio::pin!(upload);
    tokio::pin!(interrupt);
    let mut interrupted = false;

    loop {
        tokio::select! {
            result = &mut upload => return result,
            _ = tick.tick() => {
                if rx.has_changed().unwrap_or(false) {
                    let summary = ProgressSummary::from_entries(&rx.borrow_and_update());
                    eprintln!("{}", render::summary_line(&summary));
                }
            }
            signal = &mut interrupt, if !interrupted => {
                interrupted = true;
                match signal {
                    Ok(_) => {
                        warn!("interrupted, cancelling uploads");
                        cancel.cancel();
                    }
                    Err(e) => warn!(error = %e, "failed to listen for interrupts"),
                }
            }
        }
    }
}
