//! # Ward Types
//!
//! Small validated value types shared by every ward crate:
//! - [`Specialty`]: the closed list of ward specialties used as the aggregation domain
//! - [`Mrn`]: a medical record number, the natural key of admissions and consultations

use std::fmt;
use std::str::FromStr;

/// Errors that can occur when creating validated ward types.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum TypeError {
    /// The medical record number was empty or contained only whitespace
    #[error("MRN cannot be empty")]
    EmptyMrn,
    /// The specialty name is not one of the ward specialties
    #[error("unknown specialty: {0}")]
    UnknownSpecialty(String),
}

/// A ward specialty.
///
/// The set is closed: statistics are only ever computed over [`Specialty::ALL`], in that order.
/// Records stored with any other specialty string are listed but never counted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Specialty {
    GeneralInternalMedicine,
    RespiratoryMedicine,
    InfectiousDiseases,
    Neurology,
    Gastroenterology,
    Rheumatology,
    Hematology,
    ThrombosisMedicine,
    ImmunologyAndAllergy,
    SafetyAdmission,
    MedicalConsultations,
}

impl Specialty {
    /// Every specialty, in canonical display order.
    pub const ALL: [Specialty; 11] = [
        Specialty::GeneralInternalMedicine,
        Specialty::RespiratoryMedicine,
        Specialty::InfectiousDiseases,
        Specialty::Neurology,
        Specialty::Gastroenterology,
        Specialty::Rheumatology,
        Specialty::Hematology,
        Specialty::ThrombosisMedicine,
        Specialty::ImmunologyAndAllergy,
        Specialty::SafetyAdmission,
        Specialty::MedicalConsultations,
    ];

    /// The name as stored in the record service.
    pub fn as_str(&self) -> &'static str {
        match self {
            Specialty::GeneralInternalMedicine => "General Internal Medicine",
            Specialty::RespiratoryMedicine => "Respiratory Medicine",
            Specialty::InfectiousDiseases => "Infectious Diseases",
            Specialty::Neurology => "Neurology",
            Specialty::Gastroenterology => "Gastroenterology",
            Specialty::Rheumatology => "Rheumatology",
            Specialty::Hematology => "Hematology",
            Specialty::ThrombosisMedicine => "Thrombosis Medicine",
            Specialty::ImmunologyAndAllergy => "Immunology & Allergy",
            Specialty::SafetyAdmission => "Safety Admission",
            Specialty::MedicalConsultations => "Medical Consultations",
        }
    }

    /// Looks up a specialty by its stored name. Matching is exact.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.as_str() == name)
    }
}

impl fmt::Display for Specialty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Specialty {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_name(s).ok_or_else(|| TypeError::UnknownSpecialty(s.to_owned()))
    }
}

impl serde::Serialize for Specialty {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> serde::Deserialize<'de> for Specialty {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// A medical record number.
///
/// The input is trimmed on construction and must not be empty. Matching against stored rows is
/// exact, so the trimmed value is what gets sent to the record service.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Mrn(String);

impl Mrn {
    pub fn new(input: impl AsRef<str>) -> Result<Self, TypeError> {
        let trimmed = input.as_ref().trim();
        if trimmed.is_empty() {
            return Err(TypeError::EmptyMrn);
        }
        Ok(Self(trimmed.to_owned()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Mrn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Mrn {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl FromStr for Mrn {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl serde::Serialize for Mrn {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> serde::Deserialize<'de> for Mrn {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Mrn::new(&s).map_err(serde::de::Error::custom)
    }
}
