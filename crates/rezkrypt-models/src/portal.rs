use serde::{Deserialize, Serialize};

use crate::forms::{CompanyForm, FieldValue, FormError, FormState, StudentForm};

/// Which registration form the landing page shows.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PortalMode {
    #[default]
    Student,
    Company,
}

impl PortalMode {
    pub fn from_company_switch(checked: bool) -> Self {
        if checked {
            PortalMode::Company
        } else {
            PortalMode::Student
        }
    }

    pub fn is_company(self) -> bool {
        self == PortalMode::Company
    }

    pub fn toggled(self) -> Self {
        Self::from_company_switch(!self.is_company())
    }

    pub fn tagline(self) -> &'static str {
        match self {
            PortalMode::Student => "Showcase your skills and get discovered by top employers",
            PortalMode::Company => {
                "Post your job openings and find the perfect candidates for your team"
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PortalEvent {
    /// The navbar switch; `true` means company mode.
    SetCompanyMode(bool),
    ToggleMode,
    EditCompany { key: String, value: FieldValue },
    EditStudent { key: String, value: FieldValue },
    ResetForms,
}

/// Everything the landing page renders from. Both forms keep their contents
/// while the other one is on screen.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PortalState {
    pub mode: PortalMode,
    pub company: CompanyForm,
    pub student: StudentForm,
}

impl PortalState {
    pub fn update(self, event: PortalEvent) -> Result<Self, FormError> {
        Ok(match event {
            PortalEvent::SetCompanyMode(checked) => Self {
                mode: PortalMode::from_company_switch(checked),
                ..self
            },
            PortalEvent::ToggleMode => Self {
                mode: self.mode.toggled(),
                ..self
            },
            PortalEvent::EditCompany { key, value } => Self {
                company: self.company.apply(&key, value)?,
                ..self
            },
            PortalEvent::EditStudent { key, value } => Self {
                student: self.student.apply(&key, value)?,
                ..self
            },
            PortalEvent::ResetForms => Self {
                mode: self.mode,
                ..Self::default()
            },
        })
    }

    /// Build the edit event for whichever form is active.
    pub fn edit_active(&self, key: &str, raw: &str) -> Result<PortalEvent, FormError> {
        let key = key.to_string();
        Ok(match self.mode {
            PortalMode::Company => PortalEvent::EditCompany {
                value: CompanyForm::parse_value(&key, raw)?,
                key,
            },
            PortalMode::Student => PortalEvent::EditStudent {
                value: StudentForm::parse_value(&key, raw)?,
                key,
            },
        })
    }

    pub fn tagline(&self) -> &'static str {
        self.mode.tagline()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_to_student_mode() {
        let state = PortalState::default();
        assert_eq!(state.mode, PortalMode::Student);
        assert!(state.tagline().starts_with("Showcase your skills"));
    }

    #[test]
    fn switch_and_toggle_change_mode_only() {
        let state = PortalState::default()
            .update(PortalEvent::EditStudent {
                key: "firstName".into(),
                value: FieldValue::text("Ada"),
            })
            .expect("edit");
        let state = state.update(PortalEvent::SetCompanyMode(true)).expect("switch");
        assert_eq!(state.mode, PortalMode::Company);
        assert_eq!(state.student.first_name, "Ada");
        let state = state.update(PortalEvent::ToggleMode).expect("toggle");
        assert_eq!(state.mode, PortalMode::Student);
    }

    #[test]
    fn edit_active_targets_current_form() {
        let state = PortalState::default()
            .update(PortalEvent::SetCompanyMode(true))
            .expect("switch");
        let event = state.edit_active("industry", "finance").expect("event");
        let state = state.update(event).expect("edit");
        assert_eq!(state.company.industry, Some(crate::options::Industry::Finance));
        assert!(state.edit_active("firstName", "Ada").is_err());
    }

    #[test]
    fn failed_edit_is_reported() {
        let err = PortalState::default()
            .update(PortalEvent::EditStudent {
                key: "degree".into(),
                value: FieldValue::text("wizard"),
            })
            .unwrap_err();
        assert!(matches!(err, FormError::UnknownOption { .. }));
    }

    #[test]
    fn reset_keeps_mode() {
        let state = PortalState::default()
            .update(PortalEvent::SetCompanyMode(true))
            .and_then(|s| {
                s.update(PortalEvent::EditCompany {
                    key: "companyName".into(),
                    value: FieldValue::text("TechCorp Inc."),
                })
            })
            .and_then(|s| s.update(PortalEvent::ResetForms))
            .expect("update");
        assert_eq!(state.mode, PortalMode::Company);
        assert_eq!(state.company, CompanyForm::default());
    }
}
