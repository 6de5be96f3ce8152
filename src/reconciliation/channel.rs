use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex, Notify};
use tokio::task::{JoinHandle, JoinSet};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::errors::PublishError;
use crate::reconciliation::fact::{FactPublisher, PaymentRecorded};
use crate::reconciliation::reconciler::BalanceReconciler;

/// facts published but not yet fully handled
#[derive(Debug, Default)]
struct Pending {
    count: AtomicUsize,
    idle: Notify,
}

impl Pending {
    fn add(&self) {
        self.count.fetch_add(1, Ordering::SeqCst);
    }

    fn done(&self) {
        if self.count.fetch_sub(1, Ordering::SeqCst) == 1 {
            self.idle.notify_waiters();
        }
    }

    async fn wait_idle(&self) {
        loop {
            let notified = self.idle.notified();
            tokio::pin!(notified);
            // register before checking so a concurrent `done` is not missed
            notified.as_mut().enable();
            if self.count.load(Ordering::SeqCst) == 0 {
                return;
            }
            notified.await;
        }
    }
}

/// marks a fact handled even if its handler panics
struct PendingGuard(Arc<Pending>);

impl Drop for PendingGuard {
    fn drop(&mut self) {
        self.0.done();
    }
}

/// in-process queue feeding recorded payments to a [`BalanceReconciler`]
///
/// Every fact runs in its own task, so a slow retry on one contract never holds
/// up another. The channel owns its cancellation; callers of the ledger cannot
/// cancel a fact once it is published.
pub struct ReconciliationChannel {
    sender: mpsc::UnboundedSender<PaymentRecorded>,
    pending: Arc<Pending>,
    shutdown: CancellationToken,
    consumer: Mutex<Option<JoinHandle<()>>>,
}

impl ReconciliationChannel {
    /// spawn the consumer task; must be called inside a tokio runtime
    pub fn start(reconciler: BalanceReconciler) -> Self {
        let (sender, receiver) = mpsc::unbounded_channel();
        let pending = Arc::new(Pending::default());
        let shutdown = CancellationToken::new();

        let consumer = tokio::spawn(consume(
            Arc::new(reconciler),
            receiver,
            pending.clone(),
            shutdown.clone(),
        ));

        Self {
            sender,
            pending,
            shutdown,
            consumer: Mutex::new(Some(consumer)),
        }
    }

    /// resolves once every published fact has been handled
    pub async fn wait_idle(&self) {
        self.pending.wait_idle().await;
    }

    pub fn pending(&self) -> usize {
        self.pending.count.load(Ordering::SeqCst)
    }

    /// stop taking facts, cut pending backoffs short and wait for running handlers
    pub async fn shutdown(&self) {
        self.shutdown.cancel();

        let consumer = self.consumer.lock().await.take();
        if let Some(consumer) = consumer {
            if let Err(e) = consumer.await {
                error!(error = %e, "reconciliation consumer ended abnormally");
            }
        }
    }
}

impl FactPublisher for ReconciliationChannel {
    fn publish(&self, fact: PaymentRecorded) -> Result<(), PublishError> {
        if self.shutdown.is_cancelled() {
            return Err(PublishError::Closed);
        }

        self.pending.add();
        self.sender.send(fact).map_err(|_| {
            self.pending.done();
            PublishError::Closed
        })
    }
}

async fn consume(
    reconciler: Arc<BalanceReconciler>,
    mut receiver: mpsc::UnboundedReceiver<PaymentRecorded>,
    pending: Arc<Pending>,
    shutdown: CancellationToken,
) {
    let mut handlers = JoinSet::new();

    loop {
        tokio::select! {
            _ = shutdown.cancelled() => break,
            fact = receiver.recv() => match fact {
                Some(fact) => {
                    let reconciler = reconciler.clone();
                    let cancel = shutdown.clone();
                    let guard = PendingGuard(pending.clone());
                    handlers.spawn(async move {
                        let _guard = guard;
                        reconciler.handle(&fact, &cancel).await;
                    });
                }
                None => break,
            },
            Some(joined) = handlers.join_next(), if !handlers.is_empty() => {
                if let Err(e) = joined {
                    error!(error = %e, "reconciliation handler panicked");
                }
            }
        }
    }

    receiver.close();
    while let Ok(fact) = receiver.try_recv() {
        warn!(
            contract_id = %fact.contract_id,
            payment_id = %fact.payment_id,
            amortization = %fact.amortization,
            "reconciliation dropped at shutdown, manual correction required"
        );
        pending.done();
    }

    while let Some(joined) = handlers.join_next().await {
        if let Err(e) = joined {
            error!(error = %e, "reconciliation handler panicked");
        }
    }

    info!("reconciliation channel stopped");
}
