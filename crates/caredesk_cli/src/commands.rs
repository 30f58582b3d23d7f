//! Subcommand handlers.

use anyhow::{anyhow, bail, Context};
use caredesk_core::db::Connection;
use caredesk_core::{
    Application, Dashboard, DashboardConfig, DetailView, DocumentStore, FeedState, Inquiry,
    LifecycleStatus, ListFilter, Notice, PdfRenderer, ProjectionSnapshot, ReplyDraft, SmtpMailer,
    SqliteDocumentStore, Submission, SubmissionId, SubmissionKind, SubmissionPayload,
};
use std::path::Path;

pub fn summary(conn: &Connection) -> anyhow::Result<()> {
    let store = SqliteDocumentStore::new(conn);
    let mut dashboard = Dashboard::new(&store);
    dashboard.mount();

    let summary = dashboard.summary();
    println!(
        "Applications  {:>4} unread / {:>4} total",
        summary.applications.unread, summary.applications.total
    );
    println!(
        "Inquiries     {:>4} unread / {:>4} total",
        summary.inquiries.unread, summary.inquiries.total
    );
    println!("{}", summary.headline());
    finish(&mut dashboard);
    Ok(())
}

pub fn list(
    conn: &Connection,
    kind: SubmissionKind,
    search: Option<String>,
    availability: Option<String>,
) -> anyhow::Result<()> {
    let store = SqliteDocumentStore::new(conn);
    let mut dashboard = Dashboard::new(&store);
    dashboard.mount();

    let filter = ListFilter {
        search,
        availability,
    };
    match kind {
        SubmissionKind::Application => print_list(&dashboard.applications(), &filter),
        SubmissionKind::Inquiry => print_list(&dashboard.inquiries(), &filter),
    }
    finish(&mut dashboard);
    Ok(())
}

pub fn show(conn: &Connection, kind: SubmissionKind, id: &str) -> anyhow::Result<()> {
    let id = parse_id(id)?;
    let store = SqliteDocumentStore::new(conn);
    let mut dashboard = Dashboard::new(&store);
    dashboard.mount();

    match kind {
        SubmissionKind::Application => {
            if let Some(view) = dashboard.open_application(id) {
                print_application(view);
            }
        }
        SubmissionKind::Inquiry => {
            if let Some(view) = dashboard.open_inquiry(id) {
                print_inquiry(view);
            }
        }
    }
    finish(&mut dashboard);
    Ok(())
}

pub fn set_status(
    conn: &Connection,
    kind: SubmissionKind,
    id: &str,
    status: &str,
) -> anyhow::Result<()> {
    let id = parse_id(id)?;
    let store = SqliteDocumentStore::new(conn);
    let mut dashboard = Dashboard::new(&store);
    dashboard.mount();

    let changed = dashboard.set_status(kind, id, status);
    finish(&mut dashboard);
    if !changed {
        bail!("status was not changed");
    }
    Ok(())
}

pub fn reply(
    conn: &Connection,
    config: &DashboardConfig,
    kind: SubmissionKind,
    id: &str,
    subject: String,
    message: String,
) -> anyhow::Result<()> {
    let id = parse_id(id)?;
    let mailer = SmtpMailer::from_config(&config.mail).context("email is not configured")?;
    let store = SqliteDocumentStore::new(conn);
    let mut dashboard = Dashboard::new(&store).with_mailer(&mailer);
    dashboard.mount();

    let mut draft = ReplyDraft::new(subject, message);
    let sent = match kind {
        SubmissionKind::Application => {
            dashboard.open_application(id).is_some() && dashboard.reply_application(&mut draft)
        }
        SubmissionKind::Inquiry => {
            dashboard.open_inquiry(id).is_some() && dashboard.reply_inquiry(&mut draft)
        }
    };
    finish(&mut dashboard);
    if !sent {
        bail!("reply was not sent");
    }
    Ok(())
}

pub fn export(conn: &Connection, id: &str, out: &Path) -> anyhow::Result<()> {
    let id = parse_id(id)?;
    let store = SqliteDocumentStore::new(conn);
    let mut dashboard = Dashboard::new(&store);
    dashboard.mount();

    let exported = if dashboard.open_application(id).is_some() {
        dashboard.export_application(&PdfRenderer::default())
    } else {
        None
    };
    finish(&mut dashboard);

    let file = exported.ok_or_else(|| anyhow!("application was not exported"))?;
    let path = out.join(&file.file_name);
    std::fs::write(&path, &file.bytes)
        .with_context(|| format!("failed to write `{}`", path.display()))?;
    println!("Wrote {} ({} bytes)", path.display(), file.bytes.len());
    Ok(())
}

fn parse_id(id: &str) -> anyhow::Result<SubmissionId> {
    SubmissionId::parse_str(id.trim()).with_context(|| format!("`{id}` is not a submission id"))
}

fn finish<S: DocumentStore + ?Sized>(dashboard: &mut Dashboard<'_, S>) {
    print_notices(&dashboard.take_notices());
    dashboard.unmount();
}

fn print_notices(notices: &[Notice]) {
    for notice in notices {
        if notice.is_error() {
            eprintln!("{notice}");
        } else {
            println!("{notice}");
        }
    }
}

fn print_list<P: SubmissionPayload>(snapshot: &ProjectionSnapshot<P>, filter: &ListFilter) {
    if let FeedState::Unavailable(err) = &snapshot.state {
        println!("Feed unavailable ({})", err.code());
        return;
    }

    let rows = snapshot.filtered(filter);
    if rows.is_empty() {
        println!("No {} found", P::KIND.plural());
    }
    for item in rows {
        println!(
            "{} {} {:<10} {:<24} {}",
            if item.is_unread() { "*" } else { " " },
            item.id,
            item.effective_status().label(),
            item.payload.display_name(),
            item.contact_email()
        );
    }
    println!(
        "{} unread / {} total",
        snapshot.counts.unread, snapshot.counts.total
    );
    if snapshot.skipped > 0 {
        println!("{} unreadable documents skipped", snapshot.skipped);
    }
}

fn print_header<P: SubmissionPayload>(record: &Submission<P>) {
    println!("{}", record.payload.display_name());
    println!("  id:        {}", record.id);
    println!("  status:    {}", record.effective_status().label());
    println!("  submitted: {}", format_ms(record.created_at));
    println!("  email:     {}", record.contact_email());
}

fn print_application(view: &DetailView<Application>) {
    let record = view.record();
    let application = &record.payload;
    print_header(record);
    print_optional("phone", application.phone.as_deref());
    print_optional("availability", application.availability.as_deref());
    print_optional("contact", application.contact_information.as_deref());
    print_optional("education", application.education_background.as_deref());
    print_optional("references", application.references.as_deref());
    print_optional("resume", application.resume_url.as_deref());
}

fn print_inquiry(view: &DetailView<Inquiry>) {
    let record = view.record();
    print_header(record);
    print_optional("phone", record.payload.phone.as_deref());
    println!();
    println!("{}", record.payload.message);
}

fn print_optional(label: &str, value: Option<&str>) {
    if let Some(value) = value.filter(|value| !value.trim().is_empty()) {
        println!("  {label}: {}", value.replace('\n', "\n    "));
    }
}

fn format_ms(epoch_ms: i64) -> String {
    caredesk_core::service::export_service::format_timestamp(epoch_ms)
}
