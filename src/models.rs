use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::errors::FieldError;

/// Identifier assigned by the remote store.
///
/// The reference server hands out UUID strings, other deployments use
/// integer keys. Both are kept in their wire form so a record can be sent
/// back exactly as it arrived.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RecordId {
    Number(i64),
    Text(String),
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordId::Number(n) => write!(f, "{}", n),
            RecordId::Text(s) => f.write_str(s),
        }
    }
}

impl From<i64> for RecordId {
    fn from(n: i64) -> Self {
        RecordId::Number(n)
    }
}

impl From<&str> for RecordId {
    fn from(s: &str) -> Self {
        RecordId::Text(s.to_string())
    }
}

/// Lowercase and drop separators so "Awaiting Results", "awaiting-results"
/// and "awaiting_results" all compare equal.
fn normalize(s: &str) -> String {
    s.chars()
        .filter(|c| c.is_alphanumeric())
        .flat_map(char::to_lowercase)
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Status {
    #[serde(rename = "Applied")]
    Applied,
    #[default]
    #[serde(rename = "Not Applied")]
    NotApplied,
    #[serde(rename = "Vacancy Not Available")]
    VacancyNotAvailable,
    #[serde(rename = "Awaiting Results")]
    AwaitingResults,
}

impl Status {
    /// Board column order.
    pub const ALL: [Status; 4] = [
        Status::Applied,
        Status::NotApplied,
        Status::VacancyNotAvailable,
        Status::AwaitingResults,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Status::Applied => "Applied",
            Status::NotApplied => "Not Applied",
            Status::VacancyNotAvailable => "Vacancy Not Available",
            Status::AwaitingResults => "Awaiting Results",
        }
    }

    pub fn position(self) -> usize {
        Self::ALL.iter().position(|s| *s == self).unwrap_or(0)
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.label())
    }
}

impl FromStr for Status {
    type Err = FieldError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = normalize(s);
        Self::ALL
            .into_iter()
            .find(|status| normalize(status.label()) == wanted)
            .ok_or_else(|| FieldError::InvalidValue {
                field: "status",
                value: s.to_string(),
            })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Stage {
    #[default]
    #[serde(rename = "Not Started")]
    NotStarted,
    #[serde(rename = "Screening")]
    Screening,
    #[serde(rename = "Technical Interview")]
    TechnicalInterview,
    #[serde(rename = "Behavioral Interview")]
    BehavioralInterview,
    #[serde(rename = "Final Round")]
    FinalRound,
    #[serde(rename = "Offer")]
    Offer,
    #[serde(rename = "Rejected")]
    Rejected,
}

impl Stage {
    /// Pipeline order.
    pub const ALL: [Stage; 7] = [
        Stage::NotStarted,
        Stage::Screening,
        Stage::TechnicalInterview,
        Stage::BehavioralInterview,
        Stage::FinalRound,
        Stage::Offer,
        Stage::Rejected,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Stage::NotStarted => "Not Started",
            Stage::Screening => "Screening",
            Stage::TechnicalInterview => "Technical Interview",
            Stage::BehavioralInterview => "Behavioral Interview",
            Stage::FinalRound => "Final Round",
            Stage::Offer => "Offer",
            Stage::Rejected => "Rejected",
        }
    }

    /// Next stage in pipeline order, wrapping after `Rejected`.
    pub fn next(self) -> Stage {
        let idx = Self::ALL.iter().position(|s| *s == self).unwrap_or(0);
        Self::ALL[(idx + 1) % Self::ALL.len()]
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.label())
    }
}

impl FromStr for Stage {
    type Err = FieldError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = normalize(s);
        Self::ALL
            .into_iter()
            .find(|stage| normalize(stage.label()) == wanted)
            .ok_or_else(|| FieldError::InvalidValue {
                field: "stage",
                value: s.to_string(),
            })
    }
}

/// The free-text columns of an application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextField {
    Role,
    Company,
    Location,
    Salary,
    Link,
    Notes,
    Description,
    AiInsights,
}

impl TextField {
    pub const ALL: [TextField; 8] = [
        TextField::Role,
        TextField::Company,
        TextField::Location,
        TextField::Salary,
        TextField::Link,
        TextField::Notes,
        TextField::Description,
        TextField::AiInsights,
    ];

    /// Key used in the JSON payload.
    pub fn wire_name(self) -> &'static str {
        match self {
            TextField::Role => "role",
            TextField::Company => "company",
            TextField::Location => "location",
            TextField::Salary => "salary",
            TextField::Link => "link",
            TextField::Notes => "notes",
            TextField::Description => "description",
            TextField::AiInsights => "aiInsights",
        }
    }
}

/// Everything about an application except its id. This is also the body
/// of a create request, before the store has assigned an id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Fields {
    pub role: Option<String>,
    pub company: Option<String>,
    pub location: Option<String>,
    pub salary: Option<String>,
    pub link: Option<String>,
    pub notes: Option<String>,
    pub description: Option<String>,
    pub ai_insights: Option<String>,
    pub status: Status,
    pub stage: Stage,
    pub date_applied: NaiveDate,
}

impl Fields {
    /// A fresh application as created from the "add" action.
    pub fn draft(today: NaiveDate) -> Self {
        Self {
            role: Some("New Opportunity".to_string()),
            company: Some("Target Company".to_string()),
            location: Some("Remote".to_string()),
            salary: Some(String::new()),
            link: Some(String::new()),
            notes: Some(String::new()),
            description: Some(String::new()),
            ai_insights: Some(String::new()),
            status: Status::default(),
            stage: Stage::default(),
            date_applied: today,
        }
    }

    pub fn text(&self, field: TextField) -> Option<&str> {
        match field {
            TextField::Role => self.role.as_deref(),
            TextField::Company => self.company.as_deref(),
            TextField::Location => self.location.as_deref(),
            TextField::Salary => self.salary.as_deref(),
            TextField::Link => self.link.as_deref(),
            TextField::Notes => self.notes.as_deref(),
            TextField::Description => self.description.as_deref(),
            TextField::AiInsights => self.ai_insights.as_deref(),
        }
    }

    fn text_mut(&mut self, field: TextField) -> &mut Option<String> {
        match field {
            TextField::Role => &mut self.role,
            TextField::Company => &mut self.company,
            TextField::Location => &mut self.location,
            TextField::Salary => &mut self.salary,
            TextField::Link => &mut self.link,
            TextField::Notes => &mut self.notes,
            TextField::Description => &mut self.description,
            TextField::AiInsights => &mut self.ai_insights,
        }
    }

    /// Apply a single-field change and return the patch that undoes it.
    pub fn apply(&mut self, patch: Patch) -> Patch {
        match patch {
            Patch::Text(field, value) => {
                let previous = std::mem::replace(self.text_mut(field), value);
                Patch::Text(field, previous)
            }
            Patch::Status(status) => Patch::Status(std::mem::replace(&mut self.status, status)),
            Patch::Stage(stage) => Patch::Stage(std::mem::replace(&mut self.stage, stage)),
            Patch::DateApplied(date) => {
                Patch::DateApplied(std::mem::replace(&mut self.date_applied, date))
            }
        }
    }

    /// The value these fields hold for the field `patch` touches.
    pub fn current(&self, patch: &Patch) -> Patch {
        match patch {
            Patch::Text(field, _) => Patch::Text(*field, self.text(*field).map(str::to_string)),
            Patch::Status(_) => Patch::Status(self.status),
            Patch::Stage(_) => Patch::Stage(self.stage),
            Patch::DateApplied(_) => Patch::DateApplied(self.date_applied),
        }
    }

    /// Whether the field touched by `patch` currently holds the patch's value.
    pub fn holds(&self, patch: &Patch) -> bool {
        match patch {
            Patch::Text(field, value) => self.text(*field) == value.as_deref(),
            Patch::Status(status) => self.status == *status,
            Patch::Stage(stage) => self.stage == *stage,
            Patch::DateApplied(date) => self.date_applied == *date,
        }
    }
}

/// One tracked job application as known to the remote store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub id: RecordId,
    #[serde(flatten)]
    pub fields: Fields,
}

impl Record {
    pub fn role(&self) -> &str {
        self.fields.role.as_deref().unwrap_or("")
    }

    pub fn company(&self) -> &str {
        self.fields.company.as_deref().unwrap_or("")
    }
}

/// A change to exactly one field of a record.
#[derive(Debug, Clone, PartialEq)]
pub enum Patch {
    Text(TextField, Option<String>),
    Status(Status),
    Stage(Stage),
    DateApplied(NaiveDate),
}

impl Patch {
    pub fn field_name(&self) -> &'static str {
        match self {
            Patch::Text(field, _) => field.wire_name(),
            Patch::Status(_) => "status",
            Patch::Stage(_) => "stage",
            Patch::DateApplied(_) => "dateApplied",
        }
    }

    /// Build a patch from user input such as `("stage", "final-round")`.
    /// Field names match the JSON keys, case and separators ignored.
    pub fn parse(field: &str, value: &str) -> Result<Patch, FieldError> {
        let wanted = normalize(field);
        match wanted.as_str() {
            "status" => Ok(Patch::Status(value.parse()?)),
            "stage" => Ok(Patch::Stage(value.parse()?)),
            "dateapplied" | "date" => {
                let date = NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d").map_err(|_| {
                    FieldError::InvalidValue {
                        field: "dateApplied",
                        value: value.to_string(),
                    }
                })?;
                Ok(Patch::DateApplied(date))
            }
            _ => TextField::ALL
                .into_iter()
                .find(|f| normalize(f.wire_name()) == wanted)
                .map(|f| Patch::Text(f, Some(value.to_string())))
                .ok_or_else(|| FieldError::UnknownField(field.to_string())),
        }
    }
}
