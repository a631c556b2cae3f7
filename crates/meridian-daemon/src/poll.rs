//! Poll loop keeping the configured tokens fresh.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info};

use meridian_oracle::{AggregatedOracle, ObservationStore};
use meridian_types::TokenId;

/// Outcome of one pass over the tokens.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PollSummary {
    /// Tokens whose staleness was checked.
    pub checked: usize,
    /// Tokens for which an update ran.
    pub updated: usize,
    /// Tokens whose check or update failed.
    pub failed: usize,
}

/// Update every token that needs it. Failures are logged and counted.
pub fn poll_tokens<S: ObservationStore>(
    oracle: &AggregatedOracle<S>,
    tokens: &[TokenId],
) -> PollSummary {
    let mut summary = PollSummary::default();
    for token in tokens {
        summary.checked += 1;
        let result = oracle.needs_update(token).and_then(|stale| {
            if stale {
                oracle.update(token).map(Some)
            } else {
                Ok(None)
            }
        });
        match result {
            Ok(Some(changed)) => {
                summary.updated += 1;
                debug!(%token, changed, "token updated");
            }
            Ok(None) => {}
            Err(e) => {
                summary.failed += 1;
                error!(%token, "update failed: {e}");
            }
        }
    }
    summary
}

/// Poll `tokens` every `every` until `shutdown` fires.
pub async fn run<S: ObservationStore + 'static>(
    oracle: Arc<AggregatedOracle<S>>,
    tokens: Vec<TokenId>,
    every: Duration,
    mut shutdown: broadcast::Receiver<()>,
) {
    let mut ticker = tokio::time::interval(every);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let tokens = Arc::new(tokens);

    info!(tokens = tokens.len(), interval = ?every, "poll loop started");
    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let oracle = Arc::clone(&oracle);
                let tokens = Arc::clone(&tokens);
                match tokio::task::spawn_blocking(move || poll_tokens(&oracle, &tokens)).await {
                    Ok(summary) => debug!(
                        checked = summary.checked,
                        updated = summary.updated,
                        failed = summary.failed,
                        "poll complete"
                    ),
                    Err(e) => error!("poll task failed: {e}"),
                }
            }
            _ = shutdown.recv() => {
                info!("poll loop stopping");
                break;
            }
        }
    }
}
