/// Aggregated view of exam progress, useful for UI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionProgress {
    pub total: usize,
    pub answered: usize,
    pub current_index: usize,
    /// `None` for an untimed exam.
    pub remaining_seconds: Option<u64>,
    pub is_finalized: bool,
}
