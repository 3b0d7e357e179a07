pub mod forms;
pub mod options;
pub mod portal;

pub use forms::{CompanyForm, FieldKind, FieldSpec, FieldValue, FormError, FormState, StudentForm};
pub use options::{CompanySize, DegreeLevel, ExperienceLevel, Industry, JobType};
pub use portal::{PortalEvent, PortalMode, PortalState};
