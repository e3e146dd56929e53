use std::sync::Arc;

use exam_core::model::{Hotspot, HotspotId};
use storage::repository::{HotspotRepository, StorageError};

/// The persistence call an authoring action resolves to.
#[derive(Debug, Clone, PartialEq)]
pub enum HotspotWrite {
    Create(Hotspot),
    Update(Hotspot),
    Delete(HotspotId),
}

impl HotspotWrite {
    #[must_use]
    pub fn hotspot_id(&self) -> HotspotId {
        match self {
            HotspotWrite::Create(h) | HotspotWrite::Update(h) => h.id(),
            HotspotWrite::Delete(id) => *id,
        }
    }
}

/// A write produced by the controller, waiting to be sent.
#[derive(Debug, Clone, PartialEq)]
pub struct WriteRequest {
    pub(crate) seq: u64,
    pub(crate) write: HotspotWrite,
}

impl WriteRequest {
    #[must_use]
    pub fn seq(&self) -> u64 {
        self.seq
    }

    #[must_use]
    pub fn write(&self) -> &HotspotWrite {
        &self.write
    }
}

/// A resolved write, handed back to the controller for reconciliation.
#[derive(Debug, Clone, PartialEq)]
pub struct WriteOutcome {
    pub request: WriteRequest,
    pub result: Result<(), StorageError>,
}

/// Sends hotspot writes to the repository.
///
/// Holds no controller state, so several writes can be in flight while the
/// author keeps working.
#[derive(Clone)]
pub struct HotspotWriter {
    repo: Arc<dyn HotspotRepository>,
}

impl HotspotWriter {
    #[must_use]
    pub fn new(repo: Arc<dyn HotspotRepository>) -> Self {
        Self { repo }
    }

    pub async fn send(&self, request: WriteRequest) -> WriteOutcome {
        let result = match &request.write {
            HotspotWrite::Create(hotspot) => self.repo.create_hotspot(hotspot).await,
            HotspotWrite::Update(hotspot) => self.repo.update_hotspot(hotspot).await,
            HotspotWrite::Delete(id) => self.repo.delete_hotspot(*id).await,
        };
        if let Err(err) = &result {
            tracing::warn!(
                hotspot_id = %request.write.hotspot_id(),
                seq = request.seq,
                error = %err,
                "Hotspot write rejected"
            );
        }
        WriteOutcome { request, result }
    }
}
