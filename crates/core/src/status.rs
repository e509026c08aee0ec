//! Lifecycle statuses for quotes and generation attempts.
//!
//! Stored as lowercase TEXT in Postgres; the repositories convert via
//! [`GenerationStatus::as_str`] and [`GenerationStatus::parse`].

/// Sentinel stored in `processing_error` when the image model declined the
/// prompt on content-policy grounds. Distinguishes "declined" from "errored"
/// without parsing free-text error messages.
pub const CONTENT_POLICY_DECLINED: &str = "content_policy_declined";

/// Lifecycle of a quote or a single generation attempt.
///
/// `Pending → Processing → {Completed | Failed}`; both end states are
/// terminal and are never left once written.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GenerationStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl GenerationStatus {
    /// Database representation.
    pub fn as_str(self) -> &'static str {
        match self {
            GenerationStatus::Pending => "pending",
            GenerationStatus::Processing => "processing",
            GenerationStatus::Completed => "completed",
            GenerationStatus::Failed => "failed",
        }
    }

    /// Parse the database representation. Unknown values yield `None`.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(GenerationStatus::Pending),
            "processing" => Some(GenerationStatus::Processing),
            "completed" => Some(GenerationStatus::Completed),
            "failed" => Some(GenerationStatus::Failed),
            _ => None,
        }
    }

    /// Completed and Failed are terminal; a redelivered job whose
    /// generation is already terminal must be a no-op.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            GenerationStatus::Completed | GenerationStatus::Failed
        )
    }
}

impl std::fmt::Display for GenerationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
