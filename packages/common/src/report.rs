use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};

/// File formats accepted for report attachments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum ReportType {
    Pdf,
    Png,
    Jpg,
}

impl ReportType {
    pub const ALL: [ReportType; 3] = [ReportType::Pdf, ReportType::Png, ReportType::Jpg];

    pub fn as_str(&self) -> &'static str {
        match self {
            ReportType::Pdf => "pdf",
            ReportType::Png => "png",
            ReportType::Jpg => "jpg",
        }
    }

    pub fn mime_type(&self) -> &'static str {
        match self {
            ReportType::Pdf => "application/pdf",
            ReportType::Png => "image/png",
            ReportType::Jpg => "image/jpeg",
        }
    }

    pub fn from_mime(mime: &str) -> Option<Self> {
        let essence = mime.split(';').next().unwrap_or_default().trim();
        match essence.to_ascii_lowercase().as_str() {
            "application/pdf" => Some(ReportType::Pdf),
            "image/png" => Some(ReportType::Png),
            "image/jpeg" | "image/jpg" | "image/pjpeg" => Some(ReportType::Jpg),
            _ => None,
        }
    }

    pub fn from_extension(ext: &str) -> Option<Self> {
        Self::parse(ext.trim_start_matches('.'))
    }

    pub fn from_file_name(name: &str) -> Option<Self> {
        Path::new(name)
            .extension()
            .and_then(|e| e.to_str())
            .and_then(Self::from_extension)
    }

    /// Parse a type hint such as `"pdf"`, `"PNG"` or `"jpeg"`.
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "pdf" => Some(ReportType::Pdf),
            "png" => Some(ReportType::Png),
            "jpg" | "jpeg" => Some(ReportType::Jpg),
            _ => None,
        }
    }

    /// Resolve the type of an upload: declared MIME first, then the file
    /// extension, then an explicit hint.
    pub fn detect(mime: Option<&str>, file_name: Option<&str>, hint: Option<&str>) -> Option<Self> {
        mime.and_then(Self::from_mime)
            .or_else(|| file_name.and_then(Self::from_file_name))
            .or_else(|| hint.and_then(Self::parse))
    }
}

impl fmt::Display for ReportType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub const MIN_REPORT_ID_LEN: usize = 8;
pub const MAX_REPORT_ID_LEN: usize = 64;

/// `^[A-Za-z0-9_-]{8,64}$`. Report ids double as storage keys.
pub fn is_valid_report_id(id: &str) -> bool {
    (MIN_REPORT_ID_LEN..=MAX_REPORT_ID_LEN).contains(&id.len())
        && id
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_')
}

/// Keep a client-supplied id when it is acceptable, otherwise mint a fresh one.
pub fn sanitize_report_id(id: Option<&str>) -> String {
    match id.map(str::trim) {
        Some(id) if is_valid_report_id(id) => id.to_string(),
        _ => uuid::Uuid::new_v4().to_string(),
    }
}
