/// Lifecycle of one URL in the durable scrape log
///
/// `absent -> pending -> {completed, failed}`; terminal states never change.
use std::fmt;

/// Durable status of a scrape log row
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScrapeStatus {
    /// Work on the URL has started but not finished
    Pending,

    /// The URL was fetched and its artifacts written
    Completed,

    /// The URL could not be fetched or its primary artifacts not written
    Failed,
}

impl ScrapeStatus {
    /// Returns true if no further transition is allowed
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }

    /// Returns true if a URL in this state should be attempted again
    ///
    /// Only completed URLs are skipped; pending rows left by an interrupted run
    /// and failed rows are retried.
    pub fn is_retryable(&self) -> bool {
        !matches!(self, Self::Completed)
    }

    /// Returns true if `self -> next` is a legal transition
    pub fn can_transition_to(&self, next: ScrapeStatus) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::Completed) | (Self::Pending, Self::Failed)
        )
    }

    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(Self::Pending),
            "completed" => Some(Self::Completed),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }

    /// Returns all possible statuses
    pub fn all_statuses() -> Vec<Self> {
        vec![Self::Pending, Self::Completed, Self::Failed]
    }
}

impl fmt::Display for ScrapeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_string())
    }
}
