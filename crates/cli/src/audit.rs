//! CSV audit trail of processed pages.

use anyhow::{Context, Result};
use chrono::{SecondsFormat, Utc};
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};

pub const HEADER: [&str; 7] = [
    "source_page",
    "target_page",
    "source_lang",
    "target_lang",
    "status",
    "date_iso",
    "notes",
];

/// Outcome recorded for a page
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageStatus {
    /// Already translated; nothing done
    Skipped,
    /// Target existed; only the interwiki link was added
    Linked,
    Error,
    Translated,
}

impl PageStatus {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Skipped => "skipped",
            Self::Linked => "linked",
            Self::Error => "error",
            Self::Translated => "translated",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuditRow {
    pub source_page: String,
    pub target_page: String,
    pub source_lang: String,
    pub target_lang: String,
    pub status: PageStatus,
    pub notes: String,
}

/// Append-only CSV log; the header is written when the file is created
#[derive(Debug, Clone)]
pub struct AuditLog {
    path: PathBuf,
}

impl AuditLog {
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        if !path.exists() {
            let mut writer = csv::Writer::from_path(&path)
                .with_context(|| format!("Failed to create {}", path.display()))?;
            writer.write_record(HEADER)?;
            writer.flush()?;
        }
        Ok(Self { path })
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn append(&self, row: &AuditRow) -> Result<()> {
        let file = OpenOptions::new()
            .append(true)
            .open(&self.path)
            .with_context(|| format!("Failed to open {}", self.path.display()))?;
        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(file);
        let date = Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true);
        writer.write_record([
            row.source_page.as_str(),
            row.target_page.as_str(),
            row.source_lang.as_str(),
            row.target_lang.as_str(),
            row.status.as_str(),
            date.as_str(),
            row.notes.as_str(),
        ])?;
        writer.flush()?;
        Ok(())
    }
}
