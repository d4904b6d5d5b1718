//! RNC entity type - non-conformance reports ("Relatório de Não Conformidade")

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::core::numbering::RncNumber;

/// RNC workflow status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[derive(Default)]
pub enum RncStatus {
    #[default]
    Open,
    InProgress,
    Closed,
    Cancelled,
}

impl RncStatus {
    pub const ALL: [RncStatus; 4] = [
        RncStatus::Open,
        RncStatus::InProgress,
        RncStatus::Closed,
        RncStatus::Cancelled,
    ];

    /// Label used in reports and PDFs
    pub fn label(&self) -> &'static str {
        match self {
            RncStatus::Open => "Open",
            RncStatus::InProgress => "In Progress",
            RncStatus::Closed => "Closed",
            RncStatus::Cancelled => "Cancelled",
        }
    }
}

impl std::fmt::Display for RncStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RncStatus::Open => write!(f, "open"),
            RncStatus::InProgress => write!(f, "in_progress"),
            RncStatus::Closed => write!(f, "closed"),
            RncStatus::Cancelled => write!(f, "cancelled"),
        }
    }
}

impl std::str::FromStr for RncStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // Portuguese labels come from spreadsheets exported by the old form app
        match s.trim().to_lowercase().as_str() {
            "open" | "aberta" => Ok(RncStatus::Open),
            "in_progress" | "in-progress" | "in progress" | "em ação" | "em acao" => {
                Ok(RncStatus::InProgress)
            }
            "closed" | "encerrada" => Ok(RncStatus::Closed),
            "cancelled" | "canceled" | "cancelada" => Ok(RncStatus::Cancelled),
            _ => Err(format!(
                "Invalid RNC status: {}. Use open, in_progress, closed, or cancelled",
                s
            )),
        }
    }
}

/// Status-changing actions an operator can take
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RncAction {
    Close,
    Reopen,
    Cancel,
}

impl std::fmt::Display for RncAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RncAction::Close => write!(f, "close"),
            RncAction::Reopen => write!(f, "reopen"),
            RncAction::Cancel => write!(f, "cancel"),
        }
    }
}

impl std::str::FromStr for RncAction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "close" => Ok(RncAction::Close),
            "reopen" => Ok(RncAction::Reopen),
            "cancel" => Ok(RncAction::Cancel),
            _ => Err(format!("Unknown action: {}", s)),
        }
    }
}

/// One entry in an RNC's status history
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RncEvent {
    pub action: RncAction,
    pub from: RncStatus,
    pub to: RncStatus,

    /// Free-text note entered with the action
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub note: String,

    /// Who performed the action
    pub actor: String,

    pub at: DateTime<Utc>,
}

/// Which moment of the RNC lifecycle a photo documents
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[derive(Default)]
pub enum PhotoCategory {
    #[default]
    Opening,
    Closing,
    Reopening,
}

impl std::fmt::Display for PhotoCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PhotoCategory::Opening => write!(f, "opening"),
            PhotoCategory::Closing => write!(f, "closing"),
            PhotoCategory::Reopening => write!(f, "reopening"),
        }
    }
}

impl std::str::FromStr for PhotoCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "opening" | "abertura" => Ok(PhotoCategory::Opening),
            "closing" | "encerramento" => Ok(PhotoCategory::Closing),
            "reopening" | "reabertura" => Ok(PhotoCategory::Reopening),
            _ => Err(format!(
                "Invalid photo category: {}. Use opening, closing, or reopening",
                s
            )),
        }
    }
}

/// Reference to a photo held in object storage
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhotoRef {
    /// Object storage key
    pub key: String,

    /// Public URL for the key
    pub url: String,

    pub category: PhotoCategory,

    /// Original file name as uploaded
    pub filename: String,

    pub uploaded: DateTime<Utc>,
}

/// Fields captured by the creation form
#[derive(Debug, Clone, PartialEq)]
pub struct NewRnc {
    pub reporter: String,
    pub report_date: NaiveDate,
    pub area: String,
    pub pep: String,
    pub title: String,
    pub description: String,

    /// Initial status; always `Open` except for CSV restores
    pub status: RncStatus,
}

impl NewRnc {
    /// Create an open RNC form with the given title, dated today
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            reporter: String::new(),
            report_date: chrono::Local::now().date_naive(),
            area: String::new(),
            pep: String::new(),
            title: title.into(),
            description: String::new(),
            status: RncStatus::Open,
        }
    }

    pub fn with_reporter(mut self, reporter: impl Into<String>) -> Self {
        self.reporter = reporter.into();
        self
    }

    pub fn with_report_date(mut self, date: NaiveDate) -> Self {
        self.report_date = date;
        self
    }

    pub fn with_area(mut self, area: impl Into<String>) -> Self {
        self.area = area.into();
        self
    }

    pub fn with_pep(mut self, pep: impl Into<String>) -> Self {
        self.pep = pep.into();
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_status(mut self, status: RncStatus) -> Self {
        self.status = status;
        self
    }
}

/// Field edits; `None` leaves the field unchanged
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RncPatch {
    pub reporter: Option<String>,
    pub report_date: Option<NaiveDate>,
    pub area: Option<String>,
    pub pep: Option<String>,
    pub title: Option<String>,
    pub description: Option<String>,
}

impl RncPatch {
    pub fn is_empty(&self) -> bool {
        self.reporter.is_none()
            && self.report_date.is_none()
            && self.area.is_none()
            && self.pep.is_none()
            && self.title.is_none()
            && self.description.is_none()
    }

    /// Apply the edits to a record
    pub fn apply_to(&self, rnc: &mut Rnc) {
        if let Some(ref v) = self.reporter {
            rnc.reporter = v.clone();
        }
        if let Some(d) = self.report_date {
            rnc.report_date = d;
        }
        if let Some(ref v) = self.area {
            rnc.area = v.clone();
        }
        if let Some(ref v) = self.pep {
            rnc.pep = v.clone();
        }
        if let Some(ref v) = self.title {
            rnc.title = v.clone();
        }
        if let Some(ref v) = self.description {
            rnc.description = v.clone();
        }
    }
}

/// A non-conformance report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rnc {
    /// Sequential number, e.g. "2025-003"
    pub number: RncNumber,

    /// Creation timestamp
    pub created: DateTime<Utc>,

    /// Date the non-conformance was observed
    pub report_date: NaiveDate,

    /// Who issued the report
    #[serde(default)]
    pub reporter: String,

    /// Area or location
    #[serde(default)]
    pub area: String,

    /// Project/cost code
    #[serde(default)]
    pub pep: String,

    pub title: String,

    #[serde(default)]
    pub description: String,

    #[serde(default)]
    pub status: RncStatus,

    /// Status history, oldest first
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub events: Vec<RncEvent>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub photos: Vec<PhotoRef>,
}

impl Rnc {
    /// Materialize a creation form under an assigned number
    pub fn from_new(number: RncNumber, new: NewRnc, created: DateTime<Utc>) -> Self {
        Self {
            number,
            created,
            report_date: new.report_date,
            reporter: new.reporter,
            area: new.area,
            pep: new.pep,
            title: new.title,
            description: new.description,
            status: new.status,
            events: Vec::new(),
            photos: Vec::new(),
        }
    }

    pub fn photos_in(&self, category: PhotoCategory) -> impl Iterator<Item = &PhotoRef> {
        self.photos.iter().filter(move |p| p.category == category)
    }
}
