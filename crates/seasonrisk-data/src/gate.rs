//! Readiness gates consulted before loading season data on demand.

use async_trait::async_trait;
use tokio::sync::watch;

use crate::error::SeasonError;

/// External signal saying whether the data source may be queried.
///
/// `Ok(true)` means go ahead, `Ok(false)` means skip this cycle, and an
/// error is treated by callers as a failed load.
#[async_trait]
pub trait DataReadyGate: Send + Sync {
    async fn wait_ready(&self) -> Result<bool, SeasonError>;
}

/// Gate with a fixed answer.
#[derive(Debug, Clone, Copy)]
pub struct StaticGate(pub bool);

#[async_trait]
impl DataReadyGate for StaticGate {
    async fn wait_ready(&self) -> Result<bool, SeasonError> {
        Ok(self.0)
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Readiness {
    Pending,
    Loaded(bool),
    Failed(String),
}

/// Shared "data loaded" flag that starts pending and is settled by whoever
/// owns the backing data. Waiters block until it is settled; later settles
/// overwrite earlier ones.
#[derive(Debug)]
pub struct DataLoadedSignal {
    tx: watch::Sender<Readiness>,
}

impl Default for DataLoadedSignal {
    fn default() -> Self {
        Self::new()
    }
}

impl DataLoadedSignal {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(Readiness::Pending);
        Self { tx }
    }

    pub fn resolve(&self, loaded: bool) {
        self.tx.send_replace(Readiness::Loaded(loaded));
    }

    pub fn fail(&self, reason: impl Into<String>) {
        self.tx.send_replace(Readiness::Failed(reason.into()));
    }

    pub fn is_settled(&self) -> bool {
        *self.tx.borrow() != Readiness::Pending
    }
}

#[async_trait]
impl DataReadyGate for DataLoadedSignal {
    async fn wait_ready(&self) -> Result<bool, SeasonError> {
        let mut rx = self.tx.subscribe();
        let settled = rx
            .wait_for(|state| *state != Readiness::Pending)
            .await
            .map_err(|_| SeasonError::Gate("readiness signal dropped".to_string()))?;

        match &*settled {
            Readiness::Loaded(loaded) => Ok(*loaded),
            Readiness::Failed(reason) => Err(SeasonError::Gate(reason.clone())),
            Readiness::Pending => Ok(false),
        }
    }
}
