//! View lifetimes: results that resolve after their view was left are discarded.

use std::{future::Future, sync::Arc};

use tokio::sync::watch;

/// Generation counter for one navigation slot (e.g. "the current screen").
///
/// Entering a view bumps the generation; tickets from older generations
/// become stale.
#[derive(Debug, Clone)]
pub struct ViewScope {
    generation: Arc<watch::Sender<u64>>,
}

impl Default for ViewScope {
    fn default() -> Self {
        Self::new()
    }
}

impl ViewScope {
    /// Scope at generation zero.
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(0);
        Self {
            generation: Arc::new(tx),
        }
    }

    /// Enter a new view, invalidating every outstanding ticket.
    pub fn enter(&self) -> ViewTicket {
        let mut entered = 0;
        self.generation.send_modify(|generation| {
            *generation += 1;
            entered = *generation;
        });
        ViewTicket {
            generation: entered,
            rx: self.generation.subscribe(),
        }
    }

    /// Leave the current view without entering another.
    pub fn leave(&self) {
        self.generation.send_modify(|generation| *generation += 1);
    }

    /// Current generation.
    pub fn current(&self) -> u64 {
        *self.generation.borrow()
    }

    /// Whether `generation` still names the live view.
    pub fn is_current(&self, generation: u64) -> bool {
        self.current() == generation
    }
}

/// Proof of having entered a view at a given generation.
#[derive(Debug, Clone)]
pub struct ViewTicket {
    generation: u64,
    rx: watch::Receiver<u64>,
}

impl ViewTicket {
    /// Generation this ticket was issued for.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Whether the view this ticket belongs to is still live.
    pub fn is_current(&self) -> bool {
        *self.rx.borrow() == self.generation
    }

    /// Drive `fut` while the view is live.
    ///
    /// Returns `None`, dropping `fut`, as soon as the view is left; a value
    /// that completes after the view was left is discarded as well.
    pub async fn run<F: Future>(mut self, fut: F) -> Option<F::Output> {
        if !self.is_current() {
            return None;
        }
        tokio::pin!(fut);
        loop {
            tokio::select! {
                output = &mut fut => {
                    return self.is_current().then_some(output);
                }
                changed = self.rx.changed() => {
                    if changed.is_err() || !self.is_current() {
                        return None;
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::oneshot;

    #[test]
    fn entering_invalidates_older_tickets() {
        let scope = ViewScope::new();
        let first = scope.enter();
        assert!(first.is_current());

        let second = scope.enter();
        assert!(!first.is_current());
        assert!(second.is_current());
        assert!(scope.is_current(second.generation()));

        scope.leave();
        assert!(!second.is_current());
    }

    #[tokio::test]
    async fn run_yields_output_while_live() {
        let scope = ViewScope::new();
        let ticket = scope.enter();
        assert_eq!(ticket.run(async { 7 }).await, Some(7));
    }

    #[tokio::test]
    async fn run_discards_result_after_navigation() {
        let scope = ViewScope::new();
        let ticket = scope.enter();
        let (tx, rx) = oneshot::channel::<u32>();

        let pending = tokio::spawn(ticket.run(async move { rx.await.unwrap_or(0) }));
        tokio::task::yield_now().await;
        scope.enter();

        assert_eq!(pending.await.unwrap(), None);
        // The sender's future was dropped along with the cancelled fetch.
        assert!(tx.send(1).is_err());
    }

    #[tokio::test]
    async fn stale_ticket_never_starts() {
        let scope = ViewScope::new();
        let stale = scope.enter();
        scope.enter();
        assert_eq!(stale.run(async { 1 }).await, None);
    }
}
