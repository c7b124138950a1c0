//! Collects completed parts of a multipart session.

use objectstack_model::CompletedPart;

/// Completed-part records in arrival order.
///
/// Parts may be added in any order; [`CompletedParts::finalize`] returns
/// them sorted by part number, the order the completion request requires.
#[derive(Debug, Clone, Default)]
pub struct CompletedParts {
    parts: Vec<CompletedPart>,
}

impl CompletedParts {
    /// Create an empty register.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a successfully uploaded part.
    pub fn add(&mut self, part: CompletedPart) {
        self.parts.push(part);
    }

    /// Number of parts recorded so far.
    #[must_use]
    pub fn len(&self) -> usize {
        self.parts.len()
    }

    /// Whether no part has been recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }

    /// Consume the register, returning parts ascending by part number.
    #[must_use]
    pub fn finalize(mut self) -> Vec<CompletedPart> {
        self.parts.sort_by_key(|p| p.part_number);
        self.parts
    }
}
