//! Fixed choices offered by the registration form dropdowns.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

macro_rules! select_option {
    ($(#[$meta:meta])* $name:ident { $($variant:ident => ($value:literal, $label:literal)),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum $name {
            $(
                #[serde(rename = $value)]
                $variant,
            )+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            /// Wire value, as submitted by the form.
            pub fn as_str(self) -> &'static str {
                match self {
                    $($name::$variant => $value,)+
                }
            }

            /// Text shown in the dropdown.
            pub fn label(self) -> &'static str {
                match self {
                    $($name::$variant => $label,)+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.label())
            }
        }

        impl FromStr for $name {
            type Err = ();

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Self::ALL.iter().copied().find(|o| o.as_str() == s).ok_or(())
            }
        }
    };
}

select_option!(Industry {
    Technology => ("technology", "Technology"),
    Finance => ("finance", "Finance"),
    Healthcare => ("healthcare", "Healthcare"),
    Education => ("education", "Education"),
    Manufacturing => ("manufacturing", "Manufacturing"),
    Retail => ("retail", "Retail"),
    Consulting => ("consulting", "Consulting"),
    Other => ("other", "Other"),
});

select_option!(CompanySize {
    Startup => ("startup", "1-10 employees"),
    Small => ("small", "11-50 employees"),
    Medium => ("medium", "51-200 employees"),
    Large => ("large", "201-1000 employees"),
    Enterprise => ("enterprise", "1000+ employees"),
});

select_option!(
    /// Company postings offer the first five; students may also pick hybrid.
    JobType {
        FullTime => ("full-time", "Full-time"),
        PartTime => ("part-time", "Part-time"),
        Contract => ("contract", "Contract"),
        Internship => ("internship", "Internship"),
        Remote => ("remote", "Remote"),
        Hybrid => ("hybrid", "Hybrid"),
    }
);

select_option!(ExperienceLevel {
    Entry => ("entry", "Entry Level (0-2 years)"),
    Mid => ("mid", "Mid Level (2-5 years)"),
    Senior => ("senior", "Senior Level (5-10 years)"),
    Lead => ("lead", "Lead/Principal (10+ years)"),
});

select_option!(DegreeLevel {
    Bachelor => ("bachelor", "Bachelor's Degree"),
    Master => ("master", "Master's Degree"),
    Phd => ("phd", "PhD"),
    Associate => ("associate", "Associate Degree"),
    Diploma => ("diploma", "Diploma/Certificate"),
    HighSchool => ("high-school", "High School"),
});
