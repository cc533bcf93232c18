use log_indexer_repository::LifecycleError;
use log_indexer_shared::LogRecord;

/// Outcome of one record of a bulk submission.
#[derive(Debug, Clone, PartialEq)]
pub enum BulkOutcome {
    Accepted,
    Rejected(LifecycleError),
}

impl BulkOutcome {
    pub fn is_accepted(&self) -> bool {
        matches!(self, Self::Accepted)
    }

    /// Why the record was rejected, if it was.
    pub fn reason(&self) -> Option<&LifecycleError> {
        match self {
            Self::Accepted => None,
            Self::Rejected(reason) => Some(reason),
        }
    }
}

/// Per-record outcomes of a bulk submission, in input order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BulkResult {
    outcomes: Vec<BulkOutcome>,
}

impl BulkResult {
    pub(crate) fn new(outcomes: Vec<BulkOutcome>) -> Self {
        Self { outcomes }
    }

    pub fn outcomes(&self) -> &[BulkOutcome] {
        &self.outcomes
    }

    pub fn len(&self) -> usize {
        self.outcomes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }

    pub fn accepted_count(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_accepted()).count()
    }

    pub fn rejected_count(&self) -> usize {
        self.len() - self.accepted_count()
    }

    /// Every record was accepted.
    pub fn is_complete(&self) -> bool {
        self.outcomes.iter().all(BulkOutcome::is_accepted)
    }

    /// Input positions of the rejected records.
    pub fn rejected_positions(&self) -> Vec<usize> {
        self.outcomes
            .iter()
            .enumerate()
            .filter(|(_, outcome)| !outcome.is_accepted())
            .map(|(position, _)| position)
            .collect()
    }

    /// The rejected subset of `input`, ready to be fixed and resubmitted.
    ///
    /// `input` must be the slice this result was produced for.
    pub fn rejected_records<'a>(&self, input: &'a [LogRecord]) -> Vec<&'a LogRecord> {
        self.rejected_positions()
            .into_iter()
            .filter_map(|position| input.get(position))
            .collect()
    }
}

impl IntoIterator for BulkResult {
    type Item = BulkOutcome;
    type IntoIter = std::vec::IntoIter<BulkOutcome>;

    fn into_iter(self) -> Self::IntoIter {
        self.outcomes.into_iter()
    }
}
