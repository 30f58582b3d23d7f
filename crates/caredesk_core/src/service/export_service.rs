//! Application export use-case.
//!
//! # Responsibility
//! - Render one application record into a downloadable document.
//! - Derive the download file name from the applicant's name.
//!
//! # Invariants
//! - Records with a blank full name are rejected before rendering.
//! - Export is a pure transformation; no store writes happen here.

use crate::model::status::LifecycleStatus;
use crate::document::{DocumentLayout, FontWeight};
use crate::model::submission::{now_epoch_ms, ApplicationRecord};
use chrono::DateTime;
use log::{error, info};
use std::error::Error;
use std::fmt::{Display, Formatter};

pub const PDF_CONTENT_TYPE: &str = "application/pdf";
const DOCUMENT_TITLE: &str = "Golden Serenity Job Application";
const DATE_FORMAT: &str = "%B %d, %Y at %-I:%M %p";

/// Rendered export ready for download.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportedFile {
    pub file_name: String,
    pub content_type: &'static str,
    pub bytes: Vec<u8>,
}

/// Export failure.
#[derive(Debug)]
pub enum ExportError {
    MissingName,
    Render(std::io::Error),
}

impl ExportError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::MissingName => "missing_name",
            Self::Render(_) => "render_failed",
        }
    }
}

impl Display for ExportError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingName => write!(f, "Missing application data"),
            Self::Render(err) => write!(f, "Failed to generate PDF: {err}"),
        }
    }
}

impl Error for ExportError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Render(err) => Some(err),
            Self::MissingName => None,
        }
    }
}

/// Renders an application into document bytes.
pub trait ApplicationRenderer {
    fn content_type(&self) -> &'static str;
    fn extension(&self) -> &'static str;
    fn render(&self, record: &ApplicationRecord) -> Result<Vec<u8>, ExportError>;
}

/// PDF renderer.
#[derive(Debug, Clone, Default)]
pub struct PdfRenderer {
    /// Fixed "generated on" time; `None` uses the current time.
    pub generated_at_ms: Option<i64>,
}

impl PdfRenderer {
    /// Lays out the application sections without serializing them.
    pub fn layout(&self, record: &ApplicationRecord) -> DocumentLayout {
        let application = &record.payload;
        let mut layout = DocumentLayout::new();

        layout.line(DOCUMENT_TITLE, 24.0, FontWeight::Bold);
        layout.gap(5.0);
        layout.line(
            &format!("Submitted: {}", format_timestamp(record.created_at)),
            14.0,
            FontWeight::Regular,
        );
        layout.gap(5.0);
        layout.line(
            &format!(
                "Status: {}",
                record.effective_status().as_str().to_uppercase()
            ),
            12.0,
            FontWeight::Bold,
        );
        layout.gap(10.0);

        layout.line("Personal Information", 16.0, FontWeight::Bold);
        for detail in [
            format!("Full Name: {}", application.full_name.trim()),
            format!("Email: {}", application.email),
            format!("Phone: {}", or_fallback(&application.phone, "Not provided")),
            format!(
                "Availability: {}",
                or_fallback(&application.availability, "Not specified")
            ),
            format!(
                "Contact Info: {}",
                or_fallback(&application.contact_information, "N/A")
            ),
        ] {
            layout.paragraph(&detail, 12.0, FontWeight::Regular);
        }
        layout.gap(10.0);

        for (heading, body) in [
            ("Education Background", &application.education_background),
            ("References", &application.references),
            ("Resume", &application.resume_url),
        ] {
            if let Some(body) = present(body) {
                layout.line(heading, 16.0, FontWeight::Bold);
                layout.paragraph(body, 12.0, FontWeight::Regular);
                layout.gap(10.0);
            }
        }

        let generated_at = self.generated_at_ms.unwrap_or_else(now_epoch_ms);
        layout.set_footer(format!("Generated on {}", format_timestamp(generated_at)));
        layout
    }
}

impl ApplicationRenderer for PdfRenderer {
    fn content_type(&self) -> &'static str {
        PDF_CONTENT_TYPE
    }

    fn extension(&self) -> &'static str {
        "pdf"
    }

    fn render(&self, record: &ApplicationRecord) -> Result<Vec<u8>, ExportError> {
        self.layout(record)
            .render_pdf(DOCUMENT_TITLE)
            .map_err(|err| ExportError::Render(std::io::Error::other(err.to_string())))
    }
}

/// Exports one application record.
///
/// # Errors
/// - `ExportError::MissingName` when the full name is blank.
/// - `ExportError::Render` when the renderer fails.
pub fn export_application<R: ApplicationRenderer + ?Sized>(
    renderer: &R,
    record: &ApplicationRecord,
) -> Result<ExportedFile, ExportError> {
    let name = record.payload.full_name.trim();
    if name.is_empty() {
        error!(
            "event=pdf_export module=service status=error id={} error_code=missing_name",
            record.id
        );
        return Err(ExportError::MissingName);
    }

    let bytes = renderer.render(record).inspect_err(|err| {
        error!(
            "event=pdf_export module=service status=error id={} error_code={}",
            record.id,
            err.code()
        );
    })?;
    let file_name = export_file_name(name, renderer.extension());

    info!(
        "event=pdf_export module=service status=ok id={} bytes={}",
        record.id,
        bytes.len()
    );
    Ok(ExportedFile {
        file_name,
        content_type: renderer.content_type(),
        bytes,
    })
}

/// `application-<name with whitespace runs as dashes>.<extension>`.
pub fn export_file_name(full_name: &str, extension: &str) -> String {
    let slug = full_name.split_whitespace().collect::<Vec<_>>().join("-");
    format!("application-{slug}.{extension}")
}

/// Formats epoch milliseconds as `March 05, 2025 at 2:30 PM` (UTC).
pub fn format_timestamp(epoch_ms: i64) -> String {
    DateTime::from_timestamp_millis(epoch_ms)
        .map(|at| at.format(DATE_FORMAT).to_string())
        .unwrap_or_else(|| "Unknown date".to_string())
}

fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|value| !value.is_empty())
}

fn or_fallback<'a>(value: &'a Option<String>, fallback: &'a str) -> &'a str {
    present(value).unwrap_or(fallback)
}
