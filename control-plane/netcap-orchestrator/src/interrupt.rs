//! Two-stage interrupt handling: the first signal stops new work, the second
//! ends the process while operations are still being awaited.

use futures_util::{Stream, StreamExt, stream};
use tokio_util::sync::CancellationToken;
use tracing::{error, warn};

/// 128 + SIGINT.
pub const FORCED_EXIT_CODE: i32 = 130;

/// Every Ctrl-C delivered to the process. Ends if the handler cannot be
/// installed.
pub fn interrupt_signals() -> impl Stream<Item = ()> + Send + Unpin {
    Box::pin(stream::unfold((), |_| async {
        tokio::signal::ctrl_c().await.ok().map(|_| ((), ()))
    }))
}

/// Cancels `cancel` on the first signal and resolves `true` on the second.
/// Resolves `false` if the stream ends before a second signal.
pub async fn escalate_interrupts<S>(mut signals: S, cancel: CancellationToken) -> bool
where
    S: Stream<Item = ()> + Unpin,
{
    if signals.next().await.is_none() {
        return false;
    }
    warn!(
        event = "interrupted",
        message = "no new operations will start, interrupt again to exit"
    );
    cancel.cancel();

    if signals.next().await.is_none() {
        return false;
    }
    error!(
        event = "forced_exit",
        message = "abandoning in-flight operations"
    );
    true
}
