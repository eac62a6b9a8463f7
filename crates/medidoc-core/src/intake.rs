//! Patient-intake form model.
//!
//! A [`PatientIntake`] is the structured alternative to uploading an
//! existing PDF: the client fills it in, validates it, lays it out as
//! [`IntakeSection`]s and renders those into a PDF before upload. This
//! module owns everything except the drawing.

use chrono::{DateTime, Datelike, Local, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{DocumentError, Result};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Gender {
    Male,
    Female,
    Other,
    #[default]
    #[serde(alias = "")]
    NotSpecified,
}

impl Gender {
    pub fn label(&self) -> &'static str {
        match self {
            Gender::Male => "Male",
            Gender::Female => "Female",
            Gender::Other => "Other",
            Gender::NotSpecified => "Not specified",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportType {
    BloodTest,
    Imaging,
    #[default]
    Prescription,
    DischargeSummary,
    ReferralNote,
    Other,
}

impl ReportType {
    pub fn label(&self) -> &'static str {
        match self {
            ReportType::BloodTest => "Blood Test",
            ReportType::Imaging => "Imaging (X-ray, CT, MRI)",
            ReportType::Prescription => "Prescription",
            ReportType::DischargeSummary => "Discharge Summary",
            ReportType::ReferralNote => "Referral Note",
            ReportType::Other => "Other",
        }
    }
}

fn today() -> NaiveDate {
    Local::now().date_naive()
}

/// Structured patient-intake form.
///
/// Free-text fields default to empty and print as `-` when rendered.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatientIntake {
    // Patient information
    pub full_name: String,
    #[serde(default)]
    pub date_of_birth: Option<NaiveDate>,
    #[serde(default)]
    pub gender: Gender,
    #[serde(default)]
    pub contact_number: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub address: String,

    // Medical information
    #[serde(default)]
    pub patient_id: String,
    #[serde(default)]
    pub primary_diagnosis: String,
    #[serde(default)]
    pub current_medications: String,
    #[serde(default)]
    pub allergies: String,
    #[serde(default)]
    pub past_medical_history: String,
    #[serde(default = "today")]
    pub visit_date: NaiveDate,

    // Report details
    #[serde(default)]
    pub report_type: ReportType,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub doctor_name: String,

    // Additional
    #[serde(default)]
    pub additional_comments: String,
    #[serde(default)]
    pub consent: bool,
}

/// The four blocks of a rendered intake document, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SectionKind {
    Patient,
    Medical,
    Report,
    Additional,
}

impl SectionKind {
    pub fn title(&self) -> &'static str {
        match self {
            SectionKind::Patient => "1. PATIENT INFORMATION",
            SectionKind::Medical => "2. MEDICAL INFORMATION",
            SectionKind::Report => "3. TEST/REPORT DETAILS",
            SectionKind::Additional => "4. ADDITIONAL INFORMATION",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IntakeLine {
    /// A single `Label: value` line.
    Field(String),
    /// Highlighted warning line (allergies).
    Alert(String),
    /// Free text that may need wrapping.
    Paragraph(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IntakeSection {
    pub kind: SectionKind,
    pub lines: Vec<IntakeLine>,
}

fn or_dash(value: &str) -> &str {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        "-"
    } else {
        trimmed
    }
}

fn field(label: &str, value: &str) -> IntakeLine {
    IntakeLine::Field(format!("{}: {}", label, or_dash(value)))
}

impl PatientIntake {
    /// Minimal valid form, used as a starting point by callers and tests.
    pub fn new(full_name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            full_name: full_name.into(),
            date_of_birth: None,
            gender: Gender::default(),
            contact_number: String::new(),
            email: String::new(),
            address: String::new(),
            patient_id: String::new(),
            primary_diagnosis: String::new(),
            current_medications: String::new(),
            allergies: String::new(),
            past_medical_history: String::new(),
            visit_date: today(),
            report_type: ReportType::default(),
            description: description.into(),
            doctor_name: String::new(),
            additional_comments: String::new(),
            consent: true,
        }
    }

    /// Required fields: full name, description, consent.
    pub fn validate(&self) -> Result<()> {
        if self.full_name.trim().is_empty() {
            return Err(DocumentError::validation("Full Name is required"));
        }
        if self.description.trim().is_empty() {
            return Err(DocumentError::validation("Description/Notes is required"));
        }
        if !self.consent {
            return Err(DocumentError::validation(
                "You must consent to upload the document",
            ));
        }
        Ok(())
    }

    /// Whole years between the date of birth and `on`.
    ///
    /// `None` without a date of birth or when it lies after `on`.
    pub fn age_on(&self, on: NaiveDate) -> Option<u32> {
        let dob = self.date_of_birth?;
        let mut age = on.year() - dob.year();
        if (on.month(), on.day()) < (dob.month(), dob.day()) {
            age -= 1;
        }
        u32::try_from(age).ok()
    }

    /// `medical_document_<name>_<millis>.pdf`, name lowercased with
    /// whitespace runs collapsed to `_`.
    pub fn upload_filename(&self, now: DateTime<Utc>) -> String {
        let name = self
            .full_name
            .split_whitespace()
            .collect::<Vec<_>>()
            .join("_")
            .to_lowercase();
        format!("medical_document_{}_{}.pdf", name, now.timestamp_millis())
    }

    /// Lay the form out as sections. `today` drives the age calculation.
    pub fn sections(&self, today: NaiveDate) -> Vec<IntakeSection> {
        let age = self
            .age_on(today)
            .map(|a| format!("{} years", a))
            .unwrap_or_else(|| "-".to_string());
        let dob = self
            .date_of_birth
            .map(|d| d.to_string())
            .unwrap_or_default();

        let patient = IntakeSection {
            kind: SectionKind::Patient,
            lines: vec![
                field("Full Name", &self.full_name),
                field("Date of Birth", &dob),
                field("Age", &age),
                field("Gender", self.gender.label()),
                field("Patient ID", &self.patient_id),
                field("Contact", &self.contact_number),
                field("Email", &self.email),
                field("Address", &self.address),
            ],
        };

        let mut medical_lines = vec![
            field("Diagnosis", &self.primary_diagnosis),
            field("Visit Date", &self.visit_date.to_string()),
            field("Medications", &self.current_medications),
        ];
        if !self.allergies.trim().is_empty() {
            medical_lines.push(IntakeLine::Alert(format!(
                "ALLERGIES: {}",
                self.allergies.trim()
            )));
        }
        if !self.past_medical_history.trim().is_empty() {
            medical_lines.push(field("Past History", &self.past_medical_history));
        }

        let report = IntakeSection {
            kind: SectionKind::Report,
            lines: vec![
                field("Report Type", self.report_type.label()),
                field("Doctor Name", &self.doctor_name),
                field("Description", &self.description),
            ],
        };

        let mut sections = vec![
            patient,
            IntakeSection {
                kind: SectionKind::Medical,
                lines: medical_lines,
            },
            report,
        ];

        if !self.additional_comments.trim().is_empty() {
            sections.push(IntakeSection {
                kind: SectionKind::Additional,
                lines: vec![IntakeLine::Paragraph(
                    self.additional_comments.trim().to_string(),
                )],
            });
        }

        sections
    }
}
