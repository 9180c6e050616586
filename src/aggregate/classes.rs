use tracing::debug;

use super::Aggregator;
use crate::error::StoreError;
use crate::status::StatusClass;
use crate::store::{timed, CountQuery};
use crate::window::Window;

/// Global event counts for one window, one per status class.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ClassCounts {
    pub all: u64,
    pub success: u64,
    pub client_error: u64,
    pub server_error: u64,
}

impl ClassCounts {
    pub fn get(&self, class: StatusClass) -> u64 {
        match class {
            StatusClass::All => self.all,
            StatusClass::Success => self.success,
            StatusClass::ClientError => self.client_error,
            StatusClass::ServerError => self.server_error,
        }
    }

    fn slot(&mut self, class: StatusClass) -> &mut u64 {
        match class {
            StatusClass::All => &mut self.all,
            StatusClass::Success => &mut self.success,
            StatusClass::ClientError => &mut self.client_error,
            StatusClass::ServerError => &mut self.server_error,
        }
    }
}

impl Aggregator {
    /// One count query per class. The first failure aborts the pass.
    pub async fn class_counts(&self, window: Window) -> Result<ClassCounts, StoreError> {
        let mut counts = ClassCounts::default();
        for class in StatusClass::EVERY {
            let query = CountQuery::global(window, class);
            let n = timed(self.budget, self.store.count(&query)).await?;
            *counts.slot(class) = n;
        }
        debug!(
            %window,
            all = counts.all,
            success = counts.success,
            client_error = counts.client_error,
            server_error = counts.server_error,
            "class counts"
        );
        Ok(counts)
    }
}
