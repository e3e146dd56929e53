use std::collections::HashMap;
use std::sync::Arc;

use exam_core::geometry::{self, ContainerSize, PixelDelta, Rect, ResizeCorner};
use exam_core::model::{
    AuthoringSettings, Exercise, Hotspot, HotspotFields, HotspotId, HotspotKind, Step, StepId,
    StepImage,
};
use storage::repository::{StepRepository, StorageError};

use super::gesture::{Interaction, InteractionKind, PointerCapture, PointerEvents, Preview};
use super::writer::{HotspotWrite, WriteOutcome, WriteRequest};
use crate::error::AuthoringError;

//
// ─── TOOLS & MODALS ────────────────────────────────────────────────────────────
//

/// Governs what a click on the image container does.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Tool {
    #[default]
    Select,
    Button,
    Textbox,
}

impl Tool {
    fn creates(self) -> Option<HotspotKind> {
        match self {
            Tool::Select => None,
            Tool::Button => Some(HotspotKind::Button),
            Tool::Textbox => Some(HotspotKind::Textbox),
        }
    }
}

/// Dialog currently shown over the editor.
#[derive(Debug, Clone, PartialEq)]
pub enum Modal {
    Edit {
        hotspot_id: HotspotId,
        fields: HotspotFields,
    },
    ConfirmDelete {
        hotspot_id: HotspotId,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Error,
}

/// Transient message for the author, e.g. a failed save.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

impl Notice {
    fn error(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Error,
            message: message.into(),
        }
    }

    fn info(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Info,
            message: message.into(),
        }
    }
}

/// Writes still awaiting reconciliation for one hotspot.
#[derive(Debug)]
struct PendingHotspot {
    /// Storage's copy as far as resolved writes tell; `None` while absent.
    committed: Option<Hotspot>,
    latest_seq: u64,
    outstanding: usize,
    latest_failed: bool,
    removed_from: Option<(StepId, usize)>,
}

//
// ─── CONTROLLER ────────────────────────────────────────────────────────────────
//

/// Edits the hotspots of one exercise.
///
/// Every mutation applies to local state first and returns a `WriteRequest`
/// for the caller to send through a `HotspotWriter`. The resulting
/// `WriteOutcome` goes back through [`Self::reconcile`].
pub struct HotspotAuthoringController {
    exercise: Exercise,
    active_step: Option<StepId>,
    tool: Tool,
    selected: Option<HotspotId>,
    interaction: Interaction,
    modal: Option<Modal>,
    settings: AuthoringSettings,
    pointer: Arc<dyn PointerEvents>,
    next_seq: u64,
    pending: HashMap<HotspotId, PendingHotspot>,
    notices: Vec<Notice>,
}

impl HotspotAuthoringController {
    #[must_use]
    pub fn new(
        exercise: Exercise,
        settings: AuthoringSettings,
        pointer: Arc<dyn PointerEvents>,
    ) -> Self {
        let active_step = exercise.steps().first().map(Step::id);
        Self {
            exercise,
            active_step,
            tool: Tool::Select,
            selected: None,
            interaction: Interaction::Idle,
            modal: None,
            settings,
            pointer,
            next_seq: 0,
            pending: HashMap::new(),
            notices: Vec::new(),
        }
    }

    #[must_use]
    pub fn exercise(&self) -> &Exercise {
        &self.exercise
    }

    #[must_use]
    pub fn active_step(&self) -> Option<StepId> {
        self.active_step
    }

    #[must_use]
    pub fn tool(&self) -> Tool {
        self.tool
    }

    #[must_use]
    pub fn selected(&self) -> Option<HotspotId> {
        self.selected
    }

    #[must_use]
    pub fn modal(&self) -> Option<&Modal> {
        self.modal.as_ref()
    }

    #[must_use]
    pub fn interaction_kind(&self) -> InteractionKind {
        self.interaction.kind()
    }

    /// True while any write issued by this controller awaits reconciliation.
    #[must_use]
    pub fn has_pending_writes(&self) -> bool {
        !self.pending.is_empty()
    }

    /// Drain notices raised since the last call.
    pub fn take_notices(&mut self) -> Vec<Notice> {
        std::mem::take(&mut self.notices)
    }

    /// Switch the step that hotspot tools operate on. Any running gesture is dropped.
    ///
    /// # Errors
    ///
    /// Returns `AuthoringError::StepNotFound` if the exercise has no such step.
    pub fn set_active_step(&mut self, step_id: StepId) -> Result<(), AuthoringError> {
        if self.exercise.step(step_id).is_none() {
            return Err(AuthoringError::StepNotFound(step_id));
        }
        self.cancel_gesture();
        self.selected = None;
        self.active_step = Some(step_id);
        Ok(())
    }

    pub fn select_tool(&mut self, tool: Tool) {
        self.tool = tool;
    }

    pub fn set_exercise_complete(&mut self, complete: bool) {
        self.exercise.set_complete(complete);
    }

    //
    // ─── CLICKS ────────────────────────────────────────────────────────────────
    //

    /// Handle a click at pixel `(px, py)` inside the image container.
    ///
    /// With a creation tool active this places a new hotspot centered on the
    /// click and reverts to `Tool::Select`. With `Tool::Select` it selects the
    /// topmost hotspot under the click, or clears the selection.
    ///
    /// # Errors
    ///
    /// Returns `AuthoringError::GestureInProgress` while dragging or resizing and
    /// `AuthoringError::NoActiveStep` when the exercise has no steps.
    pub fn click_container(
        &mut self,
        px: f64,
        py: f64,
        container: ContainerSize,
    ) -> Result<Option<WriteRequest>, AuthoringError> {
        if self.interaction.is_active() {
            return Err(AuthoringError::GestureInProgress);
        }
        let step_id = self.active_step.ok_or(AuthoringError::NoActiveStep)?;
        let point = container.point_to_percent(px, py);

        let Some(kind) = self.tool.creates() else {
            let step = self
                .exercise
                .step(step_id)
                .ok_or(AuthoringError::StepNotFound(step_id))?;
            self.selected = step.hit_test(point).map(Hotspot::id);
            return Ok(None);
        };

        let (width, height) = self.settings.default_size(kind);
        let hotspot =
            Hotspot::place_sized(HotspotId::generate(), step_id, kind, point, width, height);
        let id = hotspot.id();
        let step = self
            .exercise
            .step_mut(step_id)
            .ok_or(AuthoringError::StepNotFound(step_id))?;
        step.push_hotspot(hotspot)?;
        let created = step
            .hotspot(id)
            .cloned()
            .ok_or(AuthoringError::HotspotNotFound(id))?;

        self.tool = Tool::Select;
        self.selected = Some(id);
        tracing::info!(
            hotspot_id = %id,
            step_id = %step_id,
            kind = ?kind,
            x = created.rect().x,
            y = created.rect().y,
            "Hotspot placed"
        );
        Ok(Some(self.issue(HotspotWrite::Create(created), None)))
    }

    //
    // ─── GESTURES ──────────────────────────────────────────────────────────────
    //

    /// Start moving a hotspot on the active step.
    ///
    /// # Errors
    ///
    /// Returns `AuthoringError::GestureInProgress` if another gesture runs, or
    /// `AuthoringError::HotspotNotFound` if the hotspot is not on the active step.
    pub fn begin_drag(
        &mut self,
        hotspot_id: HotspotId,
        container: ContainerSize,
    ) -> Result<(), AuthoringError> {
        let origin = self.gesture_origin(hotspot_id)?;
        self.interaction = Interaction::Dragging {
            preview: Preview {
                hotspot_id,
                origin,
                delta: PixelDelta::default(),
                container,
            },
            capture: PointerCapture::acquire(&self.pointer),
        };
        self.selected = Some(hotspot_id);
        Ok(())
    }

    /// Start resizing a hotspot from `corner`.
    ///
    /// # Errors
    ///
    /// Same as [`Self::begin_drag`], plus `GeometryError::UnsupportedCorner`
    /// for anything other than the south-east handle.
    pub fn begin_resize(
        &mut self,
        hotspot_id: HotspotId,
        corner: ResizeCorner,
        container: ContainerSize,
    ) -> Result<(), AuthoringError> {
        let origin = self.gesture_origin(hotspot_id)?;
        geometry::apply_resize(origin, PixelDelta::default(), container, corner)?;
        self.interaction = Interaction::Resizing {
            preview: Preview {
                hotspot_id,
                origin,
                delta: PixelDelta::default(),
                container,
            },
            corner,
            capture: PointerCapture::acquire(&self.pointer),
        };
        self.selected = Some(hotspot_id);
        Ok(())
    }

    /// Feed the pointer offset accumulated since the gesture started.
    ///
    /// Only the preview changes; nothing is written.
    ///
    /// # Errors
    ///
    /// Returns `AuthoringError::NoActiveGesture` when idle.
    pub fn pointer_move(&mut self, total_delta: PixelDelta) -> Result<Rect, AuthoringError> {
        if !self.interaction.set_delta(total_delta) {
            return Err(AuthoringError::NoActiveGesture);
        }
        self.interaction
            .preview_rect()?
            .ok_or(AuthoringError::NoActiveGesture)
    }

    /// Geometry to draw for a hotspot: the gesture preview when it is the
    /// gesture target, the stored rect otherwise.
    #[must_use]
    pub fn display_rect(&self, hotspot_id: HotspotId) -> Option<Rect> {
        let stored = self.exercise.find_hotspot(hotspot_id)?.rect();
        if self.interaction.target() == Some(hotspot_id)
            && let Ok(Some(preview)) = self.interaction.preview_rect()
        {
            return Some(preview);
        }
        Some(stored)
    }

    /// End the gesture and commit its geometry.
    ///
    /// Produces one update per gesture, or none when the rect did not change.
    ///
    /// # Errors
    ///
    /// Returns `AuthoringError::NoActiveGesture` when idle.
    pub fn release(&mut self) -> Result<Option<WriteRequest>, AuthoringError> {
        let finished = std::mem::take(&mut self.interaction);
        let hotspot_id = finished.target().ok_or(AuthoringError::NoActiveGesture)?;
        let rect = finished
            .preview_rect()?
            .ok_or(AuthoringError::NoActiveGesture)?;
        drop(finished);

        let Some(hotspot) = self.exercise.hotspot_mut(hotspot_id) else {
            return Ok(None);
        };
        let before = hotspot.clone();
        hotspot.set_rect(rect);
        if hotspot.rect() == before.rect() {
            return Ok(None);
        }
        let after = hotspot.clone();
        let committed = after.rect();
        tracing::info!(
            hotspot_id = %hotspot_id,
            x = committed.x,
            y = committed.y,
            width = committed.width,
            height = committed.height,
            "Hotspot geometry committed"
        );
        Ok(Some(self.issue(HotspotWrite::Update(after), Some(before))))
    }

    /// Abandon the running gesture, discarding its preview. Returns whether one was running.
    pub fn cancel_gesture(&mut self) -> bool {
        let was_active = self.interaction.is_active();
        self.interaction = Interaction::Idle;
        was_active
    }

    fn gesture_origin(&self, hotspot_id: HotspotId) -> Result<Rect, AuthoringError> {
        if self.interaction.is_active() {
            return Err(AuthoringError::GestureInProgress);
        }
        let step_id = self.active_step.ok_or(AuthoringError::NoActiveStep)?;
        self.exercise
            .step(step_id)
            .and_then(|step| step.hotspot(hotspot_id))
            .map(Hotspot::rect)
            .ok_or(AuthoringError::HotspotNotFound(hotspot_id))
    }

    //
    // ─── EDITING ───────────────────────────────────────────────────────────────
    //

    /// Open the edit dialog prefilled with the hotspot's current fields.
    ///
    /// # Errors
    ///
    /// Returns `AuthoringError::HotspotNotFound` for an unknown hotspot.
    pub fn open_editor(&mut self, hotspot_id: HotspotId) -> Result<HotspotFields, AuthoringError> {
        if self.interaction.is_active() {
            return Err(AuthoringError::GestureInProgress);
        }
        let fields = self
            .exercise
            .find_hotspot(hotspot_id)
            .ok_or(AuthoringError::HotspotNotFound(hotspot_id))?
            .fields();
        self.selected = Some(hotspot_id);
        self.modal = Some(Modal::Edit {
            hotspot_id,
            fields: fields.clone(),
        });
        Ok(fields)
    }

    /// Commit the edit dialog.
    ///
    /// A rejected edit keeps the dialog open with the entered values.
    ///
    /// # Errors
    ///
    /// Returns `AuthoringError::NoOpenEditor` without an open dialog, or
    /// `HotspotError::MissingCorrectAnswer` for a textbox with no answer.
    pub fn save_edit(&mut self, fields: HotspotFields) -> Result<WriteRequest, AuthoringError> {
        let Some(Modal::Edit { hotspot_id, .. }) = self.modal else {
            return Err(AuthoringError::NoOpenEditor);
        };
        let before = self
            .exercise
            .find_hotspot(hotspot_id)
            .cloned()
            .ok_or(AuthoringError::HotspotNotFound(hotspot_id))?;
        let mut edited = before.clone();
        if let Err(err) = edited.apply_fields(fields.clone()) {
            self.modal = Some(Modal::Edit { hotspot_id, fields });
            return Err(err.into());
        }
        if let Some(slot) = self.exercise.hotspot_mut(hotspot_id) {
            *slot = edited.clone();
        }
        self.modal = None;
        tracing::info!(hotspot_id = %hotspot_id, "Hotspot fields saved");
        Ok(self.issue(HotspotWrite::Update(edited), Some(before)))
    }

    /// Ask for confirmation before deleting a hotspot.
    ///
    /// # Errors
    ///
    /// Returns `AuthoringError::HotspotNotFound` for an unknown hotspot.
    pub fn request_delete(&mut self, hotspot_id: HotspotId) -> Result<(), AuthoringError> {
        if self.exercise.find_hotspot(hotspot_id).is_none() {
            return Err(AuthoringError::HotspotNotFound(hotspot_id));
        }
        self.modal = Some(Modal::ConfirmDelete { hotspot_id });
        Ok(())
    }

    /// Delete the hotspot awaiting confirmation.
    ///
    /// A gesture on the deleted hotspot is cancelled and its listeners released.
    ///
    /// # Errors
    ///
    /// Returns `AuthoringError::NoPendingDelete` if nothing awaits confirmation.
    pub fn confirm_delete(&mut self) -> Result<WriteRequest, AuthoringError> {
        let Some(Modal::ConfirmDelete { hotspot_id }) = self.modal else {
            return Err(AuthoringError::NoPendingDelete);
        };
        self.modal = None;
        if self.interaction.target() == Some(hotspot_id) {
            self.interaction = Interaction::Idle;
        }
        let (step_id, index) = self
            .exercise
            .locate_hotspot(hotspot_id)
            .ok_or(AuthoringError::HotspotNotFound(hotspot_id))?;
        let step = self
            .exercise
            .step_mut(step_id)
            .ok_or(AuthoringError::StepNotFound(step_id))?;
        let removed = step.remove_hotspot(hotspot_id)?;
        if self.selected == Some(hotspot_id) {
            self.selected = None;
        }
        tracing::info!(hotspot_id = %hotspot_id, step_id = %step_id, "Hotspot deleted");
        let request = self.issue(HotspotWrite::Delete(hotspot_id), Some(removed));
        if let Some(pending) = self.pending.get_mut(&hotspot_id) {
            pending.removed_from = Some((step_id, index));
        }
        Ok(request)
    }

    /// Close whichever dialog is open without committing anything.
    pub fn dismiss_modal(&mut self) {
        self.modal = None;
    }

    //
    // ─── WRITE RECONCILIATION ──────────────────────────────────────────────────
    //

    /// Fold a resolved write back into local state.
    ///
    /// Each hotspot with writes in flight keeps the copy storage is known to
    /// hold. When the newest write for a hotspot is rejected, local state goes
    /// back to that copy and a notice is raised; a hotspot storage never
    /// received is removed. Older writes resolving afterwards move the copy
    /// and local state follows it. An update that finds the hotspot gone
    /// never brings it back.
    pub fn reconcile(&mut self, outcome: WriteOutcome) {
        let WriteOutcome { request, result } = outcome;
        let hotspot_id = request.write.hotspot_id();
        let Some(pending) = self.pending.get_mut(&hotspot_id) else {
            tracing::debug!(
                hotspot_id = %hotspot_id,
                seq = request.seq,
                "Write outcome for untracked hotspot"
            );
            return;
        };
        pending.outstanding = pending.outstanding.saturating_sub(1);
        let is_latest = pending.latest_seq == request.seq;

        let failure = match (&request.write, result) {
            (HotspotWrite::Create(hotspot) | HotspotWrite::Update(hotspot), Ok(())) => {
                pending.committed = Some(hotspot.clone());
                None
            }
            (HotspotWrite::Delete(_), Ok(()) | Err(StorageError::NotFound)) => {
                pending.committed = None;
                None
            }
            (HotspotWrite::Update(_), Err(StorageError::NotFound)) => {
                pending.committed = None;
                if !is_latest {
                    tracing::debug!(
                        hotspot_id = %hotspot_id,
                        "Stale update for hotspot absent from storage"
                    );
                }
                is_latest.then_some(StorageError::NotFound)
            }
            (_, Err(err)) => Some(err),
        };
        if failure.is_some() && is_latest {
            pending.latest_failed = true;
        }
        let resync = pending
            .latest_failed
            .then(|| (pending.committed.clone(), pending.removed_from));
        if pending.outstanding == 0 {
            self.pending.remove(&hotspot_id);
        }

        if let Some(err) = failure {
            self.notices
                .push(Notice::error(format!("Could not save hotspot: {err}")));
        }
        if let Some((committed, removed_from)) = resync {
            self.restore_committed(hotspot_id, committed, removed_from);
        }
    }

    fn restore_committed(
        &mut self,
        hotspot_id: HotspotId,
        committed: Option<Hotspot>,
        removed_from: Option<(StepId, usize)>,
    ) {
        let Some(committed) = committed else {
            let Some((step_id, _)) = self.exercise.locate_hotspot(hotspot_id) else {
                return;
            };
            if self.interaction.target() == Some(hotspot_id) {
                self.interaction = Interaction::Idle;
            }
            if let Some(step) = self.exercise.step_mut(step_id)
                && step.remove_hotspot(hotspot_id).is_ok()
            {
                tracing::info!(hotspot_id = %hotspot_id, "Discarded unsaved hotspot");
            }
            if self.selected == Some(hotspot_id) {
                self.selected = None;
            }
            return;
        };

        if let Some(slot) = self.exercise.hotspot_mut(hotspot_id) {
            let display_number = slot.display_number();
            if slot.rect() == committed.rect() && slot.fields() == committed.fields() {
                return;
            }
            *slot = committed;
            slot.set_display_number(display_number);
            if self.interaction.target() == Some(hotspot_id) {
                self.interaction = Interaction::Idle;
            }
            tracing::info!(hotspot_id = %hotspot_id, "Restored last saved hotspot");
            return;
        }

        let (step_id, index) = removed_from.unwrap_or((committed.step_id(), usize::MAX));
        let Some(step) = self.exercise.step_mut(step_id) else {
            return;
        };
        match step.restore_hotspot(index, committed) {
            Ok(()) => {
                tracing::info!(hotspot_id = %hotspot_id, "Restored saved hotspot");
                self.notices
                    .push(Notice::info("A hotspot was restored to its last saved state."));
            }
            Err(err) => {
                tracing::warn!(hotspot_id = %hotspot_id, error = %err, "Could not restore hotspot");
            }
        }
    }

    /// `committed` is storage's copy before this write. It only counts when no
    /// other write for the hotspot is in flight.
    fn issue(&mut self, write: HotspotWrite, committed: Option<Hotspot>) -> WriteRequest {
        self.next_seq += 1;
        let seq = self.next_seq;
        let pending = self
            .pending
            .entry(write.hotspot_id())
            .or_insert_with(|| PendingHotspot {
                committed,
                latest_seq: seq,
                outstanding: 0,
                latest_failed: false,
                removed_from: None,
            });
        pending.latest_seq = seq;
        pending.outstanding += 1;
        pending.latest_failed = false;
        WriteRequest { seq, write }
    }

    //
    // ─── STEPS ─────────────────────────────────────────────────────────────────
    //

    /// Create a step in storage and append it.
    ///
    /// Steps are not optimistic: nothing changes locally if the call fails.
    ///
    /// # Errors
    ///
    /// Returns `AuthoringError::Storage` if the repository rejects the step.
    pub async fn add_step(
        &mut self,
        steps: &dyn StepRepository,
        image: StepImage,
    ) -> Result<StepId, AuthoringError> {
        let step = steps.create_step(self.exercise.id(), &image).await?;
        let step_id = step.id();
        self.exercise.push_step(step);
        if self.active_step.is_none() {
            self.active_step = Some(step_id);
        }
        tracing::info!(
            exercise_id = %self.exercise.id(),
            step_id = %step_id,
            steps = self.exercise.steps().len(),
            "Step added"
        );
        Ok(step_id)
    }

    /// Delete a step and its hotspots, renumbering the remaining steps.
    ///
    /// # Errors
    ///
    /// Returns `AuthoringError::StepNotFound` for an unknown step or
    /// `AuthoringError::Storage` if the repository rejects the delete.
    pub async fn delete_step(
        &mut self,
        steps: &dyn StepRepository,
        step_id: StepId,
    ) -> Result<(), AuthoringError> {
        if self.exercise.step(step_id).is_none() {
            return Err(AuthoringError::StepNotFound(step_id));
        }
        steps.delete_step(step_id).await?;

        let Some(removed) = self.exercise.remove_step(step_id) else {
            return Ok(());
        };
        let removed_target =
            |id: Option<HotspotId>| id.is_some_and(|id| removed.contains_hotspot(id));
        if removed_target(self.interaction.target()) {
            self.interaction = Interaction::Idle;
        }
        if removed_target(self.selected) {
            self.selected = None;
        }
        let modal_target = match self.modal {
            Some(Modal::Edit { hotspot_id, .. } | Modal::ConfirmDelete { hotspot_id }) => {
                Some(hotspot_id)
            }
            None => None,
        };
        if removed_target(modal_target) {
            self.modal = None;
        }
        if self.active_step == Some(step_id) {
            self.active_step = self.exercise.steps().first().map(Step::id);
        }
        tracing::info!(
            exercise_id = %self.exercise.id(),
            step_id = %step_id,
            steps = self.exercise.steps().len(),
            "Step deleted"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::authoring::gesture::{DetachedPointer, ListenerId};
    use exam_core::model::{ExerciseId, TopicId};
    use std::sync::atomic::{AtomicU64, Ordering};

    fn container() -> ContainerSize {
        ContainerSize::new(1000.0, 500.0).unwrap()
    }

    fn exercise() -> Exercise {
        let mut exercise = Exercise::new(ExerciseId::new(1), TopicId::new(1), "Checkout");
        let image = StepImage::new("https://cdn.example.com/1.png", 1000, 500).unwrap();
        exercise.push_step(Step::new(StepId::new(10), exercise.id(), 1, image).unwrap());
        exercise
    }

    fn controller() -> HotspotAuthoringController {
        HotspotAuthoringController::new(
            exercise(),
            AuthoringSettings::default(),
            Arc::new(DetachedPointer),
        )
    }

    fn place(ctl: &mut HotspotAuthoringController, tool: Tool, px: f64, py: f64) -> HotspotId {
        ctl.select_tool(tool);
        let request = ctl.click_container(px, py, container()).unwrap().unwrap();
        request.write().hotspot_id()
    }

    fn place_saved(ctl: &mut HotspotAuthoringController, px: f64, py: f64) -> HotspotId {
        ctl.select_tool(Tool::Button);
        let request = ctl.click_container(px, py, container()).unwrap().unwrap();
        let id = request.write().hotspot_id();
        ctl.reconcile(accepted(request));
        id
    }

    fn drag(ctl: &mut HotspotAuthoringController, id: HotspotId, dx: f64) -> WriteRequest {
        ctl.begin_drag(id, container()).unwrap();
        ctl.pointer_move(PixelDelta::new(dx, 0.0)).unwrap();
        ctl.release().unwrap().unwrap()
    }

    fn accepted(request: WriteRequest) -> WriteOutcome {
        WriteOutcome {
            request,
            result: Ok(()),
        }
    }

    fn rejected(request: WriteRequest) -> WriteOutcome {
        WriteOutcome {
            request,
            result: Err(StorageError::Connection("offline".into())),
        }
    }

    #[test]
    fn creation_tool_places_centered_hotspot_and_reverts_to_select() {
        let mut ctl = controller();
        ctl.select_tool(Tool::Button);
        let request = ctl.click_container(500.0, 250.0, container()).unwrap().unwrap();

        let HotspotWrite::Create(created) = request.write() else {
            panic!("expected create");
        };
        assert_eq!(created.rect(), Rect::new(44.0, 47.0, 12.0, 6.0));
        assert_eq!(created.display_number(), 1);
        assert_eq!(ctl.tool(), Tool::Select);
        assert_eq!(ctl.selected(), Some(created.id()));
    }

    #[test]
    fn select_click_hits_topmost_or_clears() {
        let mut ctl = controller();
        let first = place(&mut ctl, Tool::Textbox, 500.0, 250.0);
        let second = place(&mut ctl, Tool::Button, 500.0, 250.0);
        assert_ne!(first, second);

        assert!(ctl.click_container(500.0, 250.0, container()).unwrap().is_none());
        assert_eq!(ctl.selected(), Some(second));

        ctl.click_container(10.0, 10.0, container()).unwrap();
        assert_eq!(ctl.selected(), None);
    }

    #[test]
    fn drag_moves_preview_and_commits_once_on_release() {
        let mut ctl = controller();
        let id = place(&mut ctl, Tool::Button, 500.0, 250.0);

        ctl.begin_drag(id, container()).unwrap();
        assert_eq!(ctl.interaction_kind(), InteractionKind::Dragging(id));
        ctl.pointer_move(PixelDelta::new(100.0, 0.0)).unwrap();
        let preview = ctl.pointer_move(PixelDelta::new(5000.0, 5000.0)).unwrap();
        assert_eq!(preview, Rect::new(88.0, 94.0, 12.0, 6.0));
        assert_eq!(ctl.display_rect(id), Some(preview));
        assert_eq!(
            ctl.exercise().find_hotspot(id).unwrap().rect(),
            Rect::new(44.0, 47.0, 12.0, 6.0)
        );

        let request = ctl.release().unwrap().unwrap();
        assert!(matches!(request.write(), HotspotWrite::Update(h) if h.rect() == preview));
        assert_eq!(ctl.interaction_kind(), InteractionKind::Idle);
        assert!(matches!(ctl.release(), Err(AuthoringError::NoActiveGesture)));
    }

    #[test]
    fn release_without_movement_writes_nothing() {
        let mut ctl = controller();
        let id = place(&mut ctl, Tool::Button, 500.0, 250.0);
        ctl.begin_drag(id, container()).unwrap();
        assert!(ctl.release().unwrap().is_none());
    }

    #[test]
    fn resize_respects_minimum_and_rejects_other_corners() {
        let mut ctl = controller();
        let id = place(&mut ctl, Tool::Button, 500.0, 250.0);

        let err = ctl
            .begin_resize(id, ResizeCorner::NorthWest, container())
            .unwrap_err();
        assert!(matches!(err, AuthoringError::Geometry(_)));
        assert_eq!(ctl.interaction_kind(), InteractionKind::Idle);

        ctl.begin_resize(id, ResizeCorner::SouthEast, container())
            .unwrap();
        let rect = ctl.pointer_move(PixelDelta::new(-900.0, -900.0)).unwrap();
        assert_eq!((rect.width, rect.height), (5.0, 3.0));
        ctl.release().unwrap();
    }

    #[test]
    fn cancel_discards_preview() {
        let mut ctl = controller();
        let id = place(&mut ctl, Tool::Button, 500.0, 250.0);
        ctl.begin_drag(id, container()).unwrap();
        ctl.pointer_move(PixelDelta::new(50.0, 50.0)).unwrap();
        assert!(ctl.cancel_gesture());
        assert_eq!(ctl.display_rect(id), Some(Rect::new(44.0, 47.0, 12.0, 6.0)));
    }

    #[test]
    fn second_gesture_is_rejected_while_one_runs() {
        let mut ctl = controller();
        let id = place(&mut ctl, Tool::Button, 500.0, 250.0);
        ctl.begin_drag(id, container()).unwrap();
        assert!(matches!(
            ctl.begin_drag(id, container()),
            Err(AuthoringError::GestureInProgress)
        ));
        assert!(matches!(
            ctl.click_container(1.0, 1.0, container()),
            Err(AuthoringError::GestureInProgress)
        ));
    }

    #[test]
    fn textbox_edit_without_answer_keeps_dialog_open() {
        let mut ctl = controller();
        let id = place(&mut ctl, Tool::Textbox, 500.0, 250.0);
        ctl.open_editor(id).unwrap();

        let fields = HotspotFields {
            label: Some("Email".into()),
            ..HotspotFields::default()
        };
        let err = ctl.save_edit(fields.clone()).unwrap_err();
        assert!(matches!(err, AuthoringError::Hotspot(_)));
        assert_eq!(
            ctl.modal(),
            Some(&Modal::Edit {
                hotspot_id: id,
                fields
            })
        );

        let request = ctl
            .save_edit(HotspotFields {
                correct_answer: Some("me@example.com".into()),
                ..HotspotFields::default()
            })
            .unwrap();
        assert!(matches!(request.write(), HotspotWrite::Update(_)));
        assert!(ctl.modal().is_none());
        assert_eq!(
            ctl.exercise().find_hotspot(id).unwrap().correct_answer(),
            Some("me@example.com")
        );
    }

    #[test]
    fn delete_needs_confirmation_and_renumbers() {
        let mut ctl = controller();
        let first = place(&mut ctl, Tool::Button, 100.0, 100.0);
        let second = place(&mut ctl, Tool::Button, 800.0, 400.0);

        assert!(matches!(
            ctl.confirm_delete(),
            Err(AuthoringError::NoPendingDelete)
        ));
        ctl.request_delete(first).unwrap();
        let request = ctl.confirm_delete().unwrap();
        assert_eq!(request.write(), &HotspotWrite::Delete(first));
        assert!(ctl.exercise().find_hotspot(first).is_none());
        assert_eq!(ctl.exercise().find_hotspot(second).unwrap().display_number(), 1);
    }

    #[test]
    fn rejected_create_discards_hotspot() {
        let mut ctl = controller();
        ctl.select_tool(Tool::Button);
        let request = ctl.click_container(500.0, 250.0, container()).unwrap().unwrap();
        let id = request.write().hotspot_id();
        assert!(ctl.has_pending_writes());

        ctl.reconcile(rejected(request));
        assert!(ctl.exercise().find_hotspot(id).is_none());
        assert!(!ctl.has_pending_writes());
        assert_eq!(ctl.take_notices().len(), 1);
    }

    #[test]
    fn rejected_update_restores_last_committed_rect() {
        let mut ctl = controller();
        let id = place_saved(&mut ctl, 500.0, 250.0);
        let request = drag(&mut ctl, id, 100.0);

        ctl.reconcile(rejected(request));
        assert_eq!(
            ctl.exercise().find_hotspot(id).unwrap().rect(),
            Rect::new(44.0, 47.0, 12.0, 6.0)
        );
    }

    #[test]
    fn rejected_delete_reinserts_at_old_position() {
        let mut ctl = controller();
        let first = place_saved(&mut ctl, 100.0, 100.0);
        let second = place_saved(&mut ctl, 800.0, 400.0);
        ctl.request_delete(first).unwrap();
        let request = ctl.confirm_delete().unwrap();

        ctl.reconcile(rejected(request));
        let step = ctl.exercise().step(StepId::new(10)).unwrap();
        let order: Vec<_> = step.hotspots().iter().map(Hotspot::id).collect();
        assert_eq!(order, vec![first, second]);
        assert_eq!(step.hotspots()[0].display_number(), 1);
    }

    #[test]
    fn rejected_create_and_drag_remove_hotspot_in_either_order() {
        for create_first in [true, false] {
            let mut ctl = controller();
            ctl.select_tool(Tool::Button);
            let create = ctl.click_container(500.0, 250.0, container()).unwrap().unwrap();
            let id = create.write().hotspot_id();
            let update = drag(&mut ctl, id, 100.0);

            if create_first {
                ctl.reconcile(rejected(create));
                ctl.reconcile(rejected(update));
            } else {
                ctl.reconcile(rejected(update));
                ctl.reconcile(rejected(create));
            }
            assert!(ctl.exercise().find_hotspot(id).is_none());
            assert_eq!(ctl.selected(), None);
            assert!(!ctl.has_pending_writes());
        }
    }

    #[test]
    fn two_rejected_drags_restore_the_stored_rect() {
        let mut ctl = controller();
        let id = place_saved(&mut ctl, 500.0, 250.0);
        let first = drag(&mut ctl, id, 100.0);
        let second = drag(&mut ctl, id, 100.0);
        assert_eq!(ctl.exercise().find_hotspot(id).unwrap().rect().x, 64.0);

        ctl.reconcile(rejected(first));
        ctl.reconcile(rejected(second));
        assert_eq!(
            ctl.exercise().find_hotspot(id).unwrap().rect(),
            Rect::new(44.0, 47.0, 12.0, 6.0)
        );
        assert_eq!(ctl.take_notices().len(), 2);
    }

    #[test]
    fn older_accepted_write_after_newer_rejection_follows_storage() {
        let mut ctl = controller();
        let id = place_saved(&mut ctl, 500.0, 250.0);
        let first = drag(&mut ctl, id, 100.0);
        let second = drag(&mut ctl, id, 100.0);

        ctl.reconcile(rejected(second));
        assert_eq!(ctl.exercise().find_hotspot(id).unwrap().rect().x, 44.0);
        ctl.reconcile(accepted(first));
        assert_eq!(ctl.exercise().find_hotspot(id).unwrap().rect().x, 54.0);
        assert!(!ctl.has_pending_writes());
    }

    #[test]
    fn create_accepted_after_rejected_drag_shows_created_hotspot() {
        let mut ctl = controller();
        ctl.select_tool(Tool::Button);
        let create = ctl.click_container(500.0, 250.0, container()).unwrap().unwrap();
        let id = create.write().hotspot_id();
        let update = drag(&mut ctl, id, 100.0);

        ctl.reconcile(rejected(update));
        assert!(ctl.exercise().find_hotspot(id).is_none());
        ctl.reconcile(accepted(create));
        assert_eq!(
            ctl.exercise().find_hotspot(id).unwrap().rect(),
            Rect::new(44.0, 47.0, 12.0, 6.0)
        );
    }

    #[test]
    fn late_update_failure_does_not_resurrect_deleted_hotspot() {
        let mut ctl = controller();
        let id = place(&mut ctl, Tool::Button, 500.0, 250.0);
        ctl.begin_drag(id, container()).unwrap();
        ctl.pointer_move(PixelDelta::new(100.0, 0.0)).unwrap();
        let update = ctl.release().unwrap().unwrap();
        ctl.request_delete(id).unwrap();
        let delete = ctl.confirm_delete().unwrap();

        ctl.reconcile(accepted(delete));
        ctl.reconcile(WriteOutcome {
            request: update,
            result: Err(StorageError::NotFound),
        });
        assert!(ctl.exercise().find_hotspot(id).is_none());
    }

    #[test]
    fn deleting_gesture_target_releases_listeners() {
        #[derive(Default)]
        struct Counting(AtomicU64);
        impl PointerEvents for Counting {
            fn acquire(&self) -> ListenerId {
                self.0.fetch_add(1, Ordering::SeqCst);
                ListenerId(7)
            }
            fn release(&self, _id: ListenerId) {
                self.0.fetch_sub(1, Ordering::SeqCst);
            }
        }

        let counting = Arc::new(Counting::default());
        let mut ctl = HotspotAuthoringController::new(
            exercise(),
            AuthoringSettings::default(),
            counting.clone(),
        );
        let id = place(&mut ctl, Tool::Button, 500.0, 250.0);
        ctl.begin_drag(id, container()).unwrap();
        assert_eq!(counting.0.load(Ordering::SeqCst), 1);

        ctl.request_delete(id).unwrap();
        ctl.confirm_delete().unwrap();
        assert_eq!(counting.0.load(Ordering::SeqCst), 0);
        assert_eq!(ctl.interaction_kind(), InteractionKind::Idle);
    }
}
