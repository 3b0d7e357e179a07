use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::options::{CompanySize, DegreeLevel, ExperienceLevel, Industry, JobType};

/// Date format accepted for date fields entered as text.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum FormError {
    #[error("unknown field: {0}")]
    UnknownField(String),
    #[error("field {0} expects text")]
    ExpectedText(String),
    #[error("field {0} expects a date")]
    ExpectedDate(String),
    #[error("'{value}' is not an option for {field}")]
    UnknownOption { field: String, value: String },
    #[error("'{value}' is not a YYYY-MM-DD date for {field}")]
    InvalidDate { field: String, value: String },
}

/// A single edit coming from an input, textarea, dropdown or date picker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue {
    Text(String),
    Date(Option<NaiveDate>),
}

impl FieldValue {
    pub fn text(value: impl Into<String>) -> Self {
        FieldValue::Text(value.into())
    }

    pub fn date(date: NaiveDate) -> Self {
        FieldValue::Date(Some(date))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    Text,
    LongText,
    Select,
    Date,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FieldSpec {
    pub key: &'static str,
    pub label: &'static str,
    pub kind: FieldKind,
    /// Marked with an asterisk in the form. Not enforced.
    pub required: bool,
}

const fn field(key: &'static str, label: &'static str, kind: FieldKind, required: bool) -> FieldSpec {
    FieldSpec {
        key,
        label,
        kind,
        required,
    }
}

/// Form state updated one field at a time. `apply` never mutates in place.
pub trait FormState: Default + Clone + Serialize {
    const FIELDS: &'static [FieldSpec];

    fn apply(self, key: &str, value: FieldValue) -> Result<Self, FormError>;

    fn spec(key: &str) -> Option<&'static FieldSpec> {
        Self::FIELDS.iter().find(|f| f.key == key)
    }

    /// Interpret raw text for `key` according to the field's kind.
    /// An empty string clears date and select fields.
    fn parse_value(key: &str, raw: &str) -> Result<FieldValue, FormError> {
        let spec = Self::spec(key).ok_or_else(|| FormError::UnknownField(key.to_string()))?;
        match spec.kind {
            FieldKind::Date if raw.trim().is_empty() => Ok(FieldValue::Date(None)),
            FieldKind::Date => NaiveDate::parse_from_str(raw.trim(), DATE_FORMAT)
                .map(FieldValue::date)
                .map_err(|_| FormError::InvalidDate {
                    field: key.to_string(),
                    value: raw.to_string(),
                }),
            FieldKind::Text | FieldKind::LongText | FieldKind::Select => Ok(FieldValue::text(raw)),
        }
    }
}

fn text(key: &str, value: FieldValue) -> Result<String, FormError> {
    match value {
        FieldValue::Text(s) => Ok(s),
        FieldValue::Date(_) => Err(FormError::ExpectedText(key.to_string())),
    }
}

fn date(key: &str, value: FieldValue) -> Result<Option<NaiveDate>, FormError> {
    match value {
        FieldValue::Date(d) => Ok(d),
        FieldValue::Text(_) => Err(FormError::ExpectedDate(key.to_string())),
    }
}

fn select<T: FromStr>(key: &str, value: FieldValue) -> Result<Option<T>, FormError> {
    let raw = text(key, value)?;
    if raw.is_empty() {
        return Ok(None);
    }
    raw.parse().map(Some).map_err(|_| FormError::UnknownOption {
        field: key.to_string(),
        value: raw,
    })
}

// ── Company / job posting ────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompanyForm {
    pub company_name: String,
    pub contact_person: String,
    pub email: String,
    pub phone: String,
    pub website: String,
    pub industry: Option<Industry>,
    pub company_size: Option<CompanySize>,
    pub location: String,
    pub job_title: String,
    pub department: String,
    pub job_type: Option<JobType>,
    pub experience_level: Option<ExperienceLevel>,
    pub salary: String,
    pub skills: String,
    pub job_description: String,
    pub requirements: String,
    pub benefits: String,
    pub application_deadline: Option<NaiveDate>,
    pub interview_date: Option<NaiveDate>,
}

impl FormState for CompanyForm {
    const FIELDS: &'static [FieldSpec] = &[
        field("companyName", "Company Name", FieldKind::Text, true),
        field("contactPerson", "Contact Person", FieldKind::Text, true),
        field("email", "Email Address", FieldKind::Text, true),
        field("phone", "Phone Number", FieldKind::Text, true),
        field("website", "Company Website", FieldKind::Text, false),
        field("industry", "Industry", FieldKind::Select, true),
        field("companySize", "Company Size", FieldKind::Select, false),
        field("location", "Company Location", FieldKind::Text, true),
        field("jobTitle", "Job Title", FieldKind::Text, true),
        field("department", "Department", FieldKind::Text, true),
        field("jobType", "Job Type", FieldKind::Select, true),
        field("experienceLevel", "Experience Level", FieldKind::Select, true),
        field("salary", "Salary Range", FieldKind::Text, false),
        field("skills", "Required Skills", FieldKind::Text, true),
        field("jobDescription", "Job Description", FieldKind::LongText, true),
        field("requirements", "Additional Requirements", FieldKind::LongText, false),
        field("benefits", "Benefits & Perks", FieldKind::LongText, false),
        field("applicationDeadline", "Application Deadline", FieldKind::Date, true),
        field("interviewDate", "Preferred Interview Date", FieldKind::Date, false),
    ];

    fn apply(mut self, key: &str, value: FieldValue) -> Result<Self, FormError> {
        match key {
            "companyName" => self.company_name = text(key, value)?,
            "contactPerson" => self.contact_person = text(key, value)?,
            "email" => self.email = text(key, value)?,
            "phone" => self.phone = text(key, value)?,
            "website" => self.website = text(key, value)?,
            "industry" => self.industry = select(key, value)?,
            "companySize" => self.company_size = select(key, value)?,
            "location" => self.location = text(key, value)?,
            "jobTitle" => self.job_title = text(key, value)?,
            "department" => self.department = text(key, value)?,
            "jobType" => {
                let job_type: Option<JobType> = select(key, value)?;
                // Postings cannot be hybrid; only candidates pick that.
                if job_type == Some(JobType::Hybrid) {
                    return Err(FormError::UnknownOption {
                        field: key.to_string(),
                        value: JobType::Hybrid.as_str().to_string(),
                    });
                }
                self.job_type = job_type;
            }
            "experienceLevel" => self.experience_level = select(key, value)?,
            "salary" => self.salary = text(key, value)?,
            "skills" => self.skills = text(key, value)?,
            "jobDescription" => self.job_description = text(key, value)?,
            "requirements" => self.requirements = text(key, value)?,
            "benefits" => self.benefits = text(key, value)?,
            "applicationDeadline" => self.application_deadline = date(key, value)?,
            "interviewDate" => self.interview_date = date(key, value)?,
            _ => return Err(FormError::UnknownField(key.to_string())),
        }
        Ok(self)
    }
}

// ── Student / candidate ──────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentForm {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: String,
    pub date_of_birth: Option<NaiveDate>,
    pub address: String,
    pub city: String,
    pub state: String,
    pub zip_code: String,
    pub university: String,
    pub degree: Option<DegreeLevel>,
    pub major: String,
    pub graduation_date: Option<NaiveDate>,
    pub gpa: String,
    pub skills: String,
    pub experience: String,
    pub projects: String,
    pub certifications: String,
    pub linked_in: String,
    pub portfolio: String,
    pub preferred_job_type: Option<JobType>,
    pub preferred_location: String,
    pub salary_expectations: String,
    pub availability_date: Option<NaiveDate>,
    pub cover_letter: String,
}

impl FormState for StudentForm {
    const FIELDS: &'static [FieldSpec] = &[
        field("firstName", "First Name", FieldKind::Text, true),
        field("lastName", "Last Name", FieldKind::Text, true),
        field("email", "Email Address", FieldKind::Text, true),
        field("phone", "Phone Number", FieldKind::Text, true),
        field("dateOfBirth", "Date of Birth", FieldKind::Date, false),
        field("address", "Street Address", FieldKind::Text, false),
        field("city", "City", FieldKind::Text, true),
        field("state", "State/Province", FieldKind::Text, false),
        field("zipCode", "ZIP/Postal Code", FieldKind::Text, false),
        field("university", "University/College", FieldKind::Text, true),
        field("degree", "Degree Type", FieldKind::Select, true),
        field("major", "Major/Field of Study", FieldKind::Text, true),
        field("graduationDate", "Graduation Date", FieldKind::Date, true),
        field("gpa", "GPA (optional)", FieldKind::Text, false),
        field("skills", "Technical Skills", FieldKind::LongText, true),
        field("experience", "Work Experience", FieldKind::LongText, false),
        field("projects", "Projects & Achievements", FieldKind::LongText, false),
        field("certifications", "Certifications & Awards", FieldKind::LongText, false),
        field("linkedIn", "LinkedIn Profile", FieldKind::Text, false),
        field("portfolio", "Portfolio/Website", FieldKind::Text, false),
        field("preferredJobType", "Preferred Job Type", FieldKind::Select, true),
        field("preferredLocation", "Preferred Location", FieldKind::Text, false),
        field("salaryExpectations", "Salary Expectations", FieldKind::Text, false),
        field("availabilityDate", "Availability Date", FieldKind::Date, false),
        field("coverLetter", "Tell us about yourself", FieldKind::LongText, false),
    ];

    fn apply(mut self, key: &str, value: FieldValue) -> Result<Self, FormError> {
        match key {
            "firstName" => self.first_name = text(key, value)?,
            "lastName" => self.last_name = text(key, value)?,
            "email" => self.email = text(key, value)?,
            "phone" => self.phone = text(key, value)?,
            "dateOfBirth" => self.date_of_birth = date(key, value)?,
            "address" => self.address = text(key, value)?,
            "city" => self.city = text(key, value)?,
            "state" => self.state = text(key, value)?,
            "zipCode" => self.zip_code = text(key, value)?,
            "university" => self.university = text(key, value)?,
            "degree" => self.degree = select(key, value)?,
            "major" => self.major = text(key, value)?,
            "graduationDate" => self.graduation_date = date(key, value)?,
            "gpa" => self.gpa = text(key, value)?,
            "skills" => self.skills = text(key, value)?,
            "experience" => self.experience = text(key, value)?,
            "projects" => self.projects = text(key, value)?,
            "certifications" => self.certifications = text(key, value)?,
            "linkedIn" => self.linked_in = text(key, value)?,
            "portfolio" => self.portfolio = text(key, value)?,
            "preferredJobType" => self.preferred_job_type = select(key, value)?,
            "preferredLocation" => self.preferred_location = text(key, value)?,
            "salaryExpectations" => self.salary_expectations = text(key, value)?,
            "availabilityDate" => self.availability_date = date(key, value)?,
            "coverLetter" => self.cover_letter = text(key, value)?,
            _ => return Err(FormError::UnknownField(key.to_string())),
        }
        Ok(self)
    }
}
