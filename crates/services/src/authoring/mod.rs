mod controller;
mod gesture;
mod writer;

pub use controller::{HotspotAuthoringController, Modal, Notice, NoticeLevel, Tool};
pub use gesture::{
    DetachedPointer, Interaction, InteractionKind, ListenerId, PointerCapture, PointerEvents,
    Preview,
};
pub use writer::{HotspotWrite, HotspotWriter, WriteOutcome, WriteRequest};
