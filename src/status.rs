use std::fmt;
use std::ops::{Bound, RangeBounds};

/// Partition of response status codes the gauges are published by.
///
/// `ClientError` stops at 499 inclusive; `ServerError` is open-ended from 500
/// so any non-standard code past 599 still lands somewhere. Codes outside
/// every range (1xx, 3xx, anything below 100) only count toward `All`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum StatusClass {
    All,
    Success,
    ClientError,
    ServerError,
}

impl StatusClass {
    /// Every class, in publication order.
    pub const EVERY: [StatusClass; 4] = [
        StatusClass::All,
        StatusClass::Success,
        StatusClass::ClientError,
        StatusClass::ServerError,
    ];

    /// Status predicate for this class; `None` means unfiltered.
    pub fn range(self) -> Option<(Bound<i32>, Bound<i32>)> {
        use Bound::{Included, Unbounded};
        match self {
            Self::All => None,
            Self::Success => Some((Included(200), Included(299))),
            Self::ClientError => Some((Included(400), Included(499))),
            Self::ServerError => Some((Included(500), Unbounded)),
        }
    }

    /// Value of the `status` label on per-destination gauges.
    pub fn label(self) -> &'static str {
        match self {
            Self::All => "Total",
            Self::Success => "200",
            Self::ClientError => "400",
            Self::ServerError => "500",
        }
    }

    pub fn matches(self, status: i32) -> bool {
        self.range().map_or(true, |r| r.contains(&status))
    }

    /// The narrow class a status belongs to, if any.
    pub fn classify(status: i32) -> Option<Self> {
        [Self::Success, Self::ClientError, Self::ServerError]
            .into_iter()
            .find(|class| class.matches(status))
    }
}

impl fmt::Display for StatusClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::All => "all",
            Self::Success => "success",
            Self::ClientError => "client_error",
            Self::ServerError => "server_error",
        };
        f.write_str(name)
    }
}
