//! Dashboard-wide unread/total summary.
//!
//! # Responsibility
//! - Aggregate per-kind `Counts` into the sidebar summary.
//! - Keep the latest counts per kind and recompute on every change.

use crate::counter::Counts;
use crate::model::submission::SubmissionKind;
use serde::Serialize;

/// Aggregated counts shown in the persistent summary panel.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DashboardSummary {
    pub applications: Counts,
    pub inquiries: Counts,
    pub total_unread: usize,
    pub total_all: usize,
}

impl DashboardSummary {
    pub fn new(applications: Counts, inquiries: Counts) -> Self {
        Self {
            applications,
            inquiries,
            total_unread: applications.unread + inquiries.unread,
            total_all: applications.total + inquiries.total,
        }
    }

    pub fn counts_for(&self, kind: SubmissionKind) -> Counts {
        match kind {
            SubmissionKind::Application => self.applications,
            SubmissionKind::Inquiry => self.inquiries,
        }
    }

    /// One-line footer text for the summary panel.
    pub fn headline(&self) -> String {
        if self.total_all == 0 {
            "No submissions yet".to_string()
        } else if self.total_unread > 0 {
            format!("{} unread of {} total", self.total_unread, self.total_all)
        } else {
            format!("All {} items read", self.total_all)
        }
    }
}

/// Holds the latest counts per kind.
#[derive(Debug, Default)]
pub struct SummaryBoard {
    applications: Counts,
    inquiries: Counts,
    revision: u64,
}

impl SummaryBoard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records new counts for one kind.
    ///
    /// Returns `true` when the summary changed.
    pub fn record(&mut self, kind: SubmissionKind, counts: Counts) -> bool {
        let slot = match kind {
            SubmissionKind::Application => &mut self.applications,
            SubmissionKind::Inquiry => &mut self.inquiries,
        };
        if *slot == counts {
            return false;
        }
        *slot = counts;
        self.revision += 1;
        true
    }

    pub fn summary(&self) -> DashboardSummary {
        DashboardSummary::new(self.applications, self.inquiries)
    }

    /// Incremented on every effective change.
    pub fn revision(&self) -> u64 {
        self.revision
    }
}

#[cfg(test)]
mod tests {
    use super::{DashboardSummary, SummaryBoard};
    use crate::counter::Counts;
    use crate::model::submission::SubmissionKind;

    #[test]
    fn summary_adds_both_kinds() {
        let summary = DashboardSummary::new(
            Counts { unread: 1, total: 2 },
            Counts { unread: 3, total: 5 },
        );
        assert_eq!(summary.total_unread, 4);
        assert_eq!(summary.total_all, 7);
        assert_eq!(summary.headline(), "4 unread of 7 total");
        assert_eq!(summary.counts_for(SubmissionKind::Inquiry).total, 5);
    }

    #[test]
    fn headline_covers_empty_and_all_read() {
        assert_eq!(DashboardSummary::default().headline(), "No submissions yet");
        let all_read = DashboardSummary::new(Counts { unread: 0, total: 3 }, Counts::default());
        assert_eq!(all_read.headline(), "All 3 items read");
    }

    #[test]
    fn board_recomputes_only_on_change() {
        let mut board = SummaryBoard::new();
        assert!(board.record(SubmissionKind::Application, Counts { unread: 1, total: 1 }));
        assert!(!board.record(SubmissionKind::Application, Counts { unread: 1, total: 1 }));
        assert!(board.record(SubmissionKind::Inquiry, Counts { unread: 0, total: 2 }));
        assert_eq!(board.revision(), 2);
        assert_eq!(board.summary().total_all, 3);
    }
}
