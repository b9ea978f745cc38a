/// Terminal conditions for a crawl
///
/// Every crawl that does not fail outright ends in exactly one of these.
use std::fmt;

/// Why a crawl stopped paginating
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StopReason {
    // ===== Expected Endings =====
    /// A tag older than the cutoff was seen; everything past it is older still
    CutoffReached,

    /// The listing returned no tags (or an empty body)
    EmptyPage,

    // ===== Degraded Endings =====
    /// The listing container was missing from the page
    MissingContainer,

    /// The page could not be fetched (status or transport failure)
    FetchFailed,

    /// The crawl was cancelled before it finished
    Cancelled,
}

impl StopReason {
    /// Returns true if the crawl ran to a natural end of the listing window
    pub fn is_complete(&self) -> bool {
        matches!(self, Self::CutoffReached | Self::EmptyPage)
    }

    /// Short machine-friendly label, used in log fields
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CutoffReached => "cutoff_reached",
            Self::EmptyPage => "empty_page",
            Self::MissingContainer => "missing_container",
            Self::FetchFailed => "fetch_failed",
            Self::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
