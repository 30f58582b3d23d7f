//! Sample submissions for local testing.

use anyhow::Context;
use caredesk_core::db::Connection;
use caredesk_core::model::submission::{now_epoch_ms, payload_fields};
use caredesk_core::{
    Application, ApplicationStatus, DocumentStore, Inquiry, InquiryStatus, SqliteDocumentStore,
    SubmissionPayload,
};

const MINUTE_MS: i64 = 60 * 1000;

pub fn run(conn: &Connection) -> anyhow::Result<()> {
    let store = SqliteDocumentStore::new(conn);
    let inserted = seed_samples(&store, now_epoch_ms())?;
    println!("Inserted {inserted} sample submissions");
    Ok(())
}

/// Inserts the samples with `createdAt` a few minutes apart before `now_ms`.
pub fn seed_samples<S: DocumentStore + ?Sized>(store: &S, now_ms: i64) -> anyhow::Result<usize> {
    let mut inserted = 0;
    for (offset, (application, status)) in sample_applications().into_iter().enumerate() {
        insert(store, &application, status, now_ms - offset as i64 * MINUTE_MS)?;
        inserted += 1;
    }
    for (offset, (inquiry, status)) in sample_inquiries().into_iter().enumerate() {
        insert(store, &inquiry, status, now_ms - offset as i64 * MINUTE_MS)?;
        inserted += 1;
    }
    Ok(inserted)
}

fn insert<S, P>(store: &S, payload: &P, status: P::Status, created_at: i64) -> anyhow::Result<()>
where
    S: DocumentStore + ?Sized,
    P: SubmissionPayload,
{
    let collection = P::KIND.collection();
    let fields = payload_fields(payload, Some(status))?;
    store
        .insert(collection, fields, Some(created_at))
        .with_context(|| format!("failed to seed {collection}"))?;
    Ok(())
}

fn sample_applications() -> Vec<(Application, ApplicationStatus)> {
    vec![
        (
            application(
                "Sarah Johnson",
                "sarah.johnson@email.com",
                "Full Time",
                "Phone: (555) 123-4567\nAddress: 123 Main St, City, State 12345",
                "Dr. Emily Smith - Previous Supervisor\nPhone: (555) 987-6543",
                "Bachelor of Science in Nursing\nState University, 2020\nCertified Nursing Assistant (CNA)",
                Some("https://example.com/resume-sarah.pdf"),
            ),
            ApplicationStatus::New,
        ),
        (
            application(
                "Michael Chen",
                "michael.chen@email.com",
                "Part Time",
                "Phone: (555) 234-5678\nAddress: 456 Oak Ave, City, State 12345",
                "Maria Rodriguez - Care Coordinator\nPhone: (555) 876-5432",
                "Associate Degree in Health Sciences\nCommunity College, 2019",
                Some("https://example.com/resume-michael.pdf"),
            ),
            ApplicationStatus::Reviewed,
        ),
        (
            application(
                "Jennifer Williams",
                "jennifer.williams@email.com",
                "Flexible",
                "Phone: (555) 345-6789\nAddress: 789 Pine St, City, State 12345",
                "Robert Davis - Clinical Manager\nPhone: (555) 765-4321",
                "Master of Social Work\nUniversity College, 2018\n5 years experience in elder care",
                None,
            ),
            ApplicationStatus::Contacted,
        ),
    ]
}

fn application(
    full_name: &str,
    email: &str,
    availability: &str,
    contact: &str,
    references: &str,
    education: &str,
    resume: Option<&str>,
) -> Application {
    Application {
        full_name: full_name.to_string(),
        email: email.to_string(),
        phone: None,
        availability: Some(availability.to_string()),
        contact_information: Some(contact.to_string()),
        references: Some(references.to_string()),
        education_background: Some(education.to_string()),
        resume_url: resume.map(str::to_string),
    }
}

fn sample_inquiries() -> Vec<(Inquiry, InquiryStatus)> {
    let inquiry = |full_name: &str, email: &str, phone: &str, message: &str| Inquiry {
        full_name: full_name.to_string(),
        email: email.to_string(),
        phone: Some(phone.to_string()),
        message: message.to_string(),
    };

    vec![
        (
            inquiry(
                "Robert Thompson",
                "robert.thompson@email.com",
                "(555) 456-7890",
                "I'm interested in home care services for my elderly mother. She needs help \
                 with daily activities and medication management.",
            ),
            InquiryStatus::New,
        ),
        (
            inquiry(
                "Lisa Anderson",
                "lisa.anderson@email.com",
                "(555) 567-8901",
                "My father recently had surgery and needs temporary home care during his \
                 recovery. What are your availability and rates?",
            ),
            InquiryStatus::Reviewed,
        ),
        (
            inquiry(
                "David Martinez",
                "david.martinez@email.com",
                "(555) 678-9012",
                "I need information about long-term memory care options for my spouse.",
            ),
            InquiryStatus::Responded,
        ),
    ]
}
