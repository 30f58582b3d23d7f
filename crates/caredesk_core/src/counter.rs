//! Unread/total counting over a submission collection.
//!
//! # Invariants
//! - `unread` uses `Submission::is_unread`, the same predicate list rows and
//!   detail badges use.
//! - Empty input yields `Counts::default()` (`0/0`).

use crate::model::submission::{Submission, SubmissionPayload};
use serde::Serialize;

/// Derived counts for one submission kind. Never persisted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Counts {
    pub unread: usize,
    pub total: usize,
}

impl Counts {
    pub fn read(&self) -> usize {
        self.total - self.unread
    }
}

/// Counts all submissions and those that are unread, in one pass.
pub fn count_submissions<'a, P, I>(submissions: I) -> Counts
where
    P: SubmissionPayload,
    I: IntoIterator<Item = &'a Submission<P>>,
{
    submissions
        .into_iter()
        .fold(Counts::default(), |mut counts, submission| {
            counts.total += 1;
            if submission.is_unread() {
                counts.unread += 1;
            }
            counts
        })
}

#[cfg(test)]
mod tests {
    use super::{count_submissions, Counts};
    use crate::model::status::ApplicationStatus;
    use crate::model::submission::{Application, ApplicationRecord};
    use uuid::Uuid;

    fn record(status: Option<ApplicationStatus>) -> ApplicationRecord {
        ApplicationRecord {
            id: Uuid::new_v4(),
            created_at: 0,
            status,
            last_viewed: None,
            payload: Application {
                full_name: "Sarah Johnson".to_string(),
                email: "sarah@email.com".to_string(),
                phone: None,
                availability: None,
                contact_information: None,
                references: None,
                education_background: None,
                resume_url: None,
            },
        }
    }

    #[test]
    fn empty_collection_counts_zero() {
        let records: Vec<ApplicationRecord> = Vec::new();
        assert_eq!(count_submissions(&records), Counts::default());
    }

    #[test]
    fn absent_and_new_statuses_are_unread() {
        let records = vec![
            record(None),
            record(Some(ApplicationStatus::New)),
            record(Some(ApplicationStatus::Contacted)),
            record(Some(ApplicationStatus::Hired)),
        ];
        let counts = count_submissions(&records);
        assert_eq!(counts, Counts { unread: 2, total: 4 });
        assert_eq!(counts.read(), 2);
    }
}
