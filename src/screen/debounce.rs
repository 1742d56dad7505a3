use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::sleep;

pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(300);

/// Forward only the last value of each burst from `input`, once it has been
/// quiet for `delay`. A pending value is flushed when `input` closes.
pub fn debounce<T>(delay: Duration, mut input: mpsc::Receiver<T>) -> mpsc::Receiver<T>
where
    T: Send + 'static,
{
    let (tx, rx) = mpsc::channel(1);
    tokio::spawn(async move {
        while let Some(mut latest) = input.recv().await {
            loop {
                tokio::select! {
                    next = input.recv() => match next {
                        Some(value) => latest = value,
                        None => {
                            let _ = tx.send(latest).await;
                            return;
                        }
                    },
                    _ = sleep(delay) => break,
                }
            }
            if tx.send(latest).await.is_err() {
                return;
            }
        }
    });
    rx
}
