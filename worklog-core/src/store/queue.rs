use std::future::Future;

use tokio::sync::Mutex;

/// Serializes every operation against one logical table.
///
/// Operations run one after another in submission order; tokio's mutex
/// grants the lock first-in, first-out.
#[derive(Debug, Default)]
pub struct TableQueue {
    lock: Mutex<()>,
}

impl TableQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn run<F, T>(&self, op: F) -> T
    where
        F: Future<Output = T>,
    {
        let _turn = self.lock.lock().await;
        op.await
    }
}
