//! Competency frameworks and their default competency lists.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Framework {
    /// UK Civil Service Success Profiles behaviours.
    CivilService,
    /// NHS values-based recruitment.
    Nhs,
    General,
}

const CIVIL_SERVICE_BEHAVIOURS: &[&str] = &[
    "Seeing the Big Picture",
    "Changing and Improving",
    "Making Effective Decisions",
    "Leadership",
    "Communicating and Influencing",
    "Working Together",
    "Developing Self and Others",
    "Managing a Quality Service",
    "Delivering at Pace",
];

const NHS_VALUES: &[&str] = &[
    "Working Together for Patients",
    "Respect and Dignity",
    "Commitment to Quality of Care",
    "Compassion",
    "Improving Lives",
    "Everyone Counts",
];

const GENERAL_COMPETENCIES: &[&str] = &[
    "Teamwork",
    "Communication",
    "Problem Solving",
    "Leadership",
    "Adaptability",
    "Customer Focus",
];

impl Framework {
    pub fn as_str(&self) -> &'static str {
        match self {
            Framework::CivilService => "civil_service",
            Framework::Nhs => "nhs",
            Framework::General => "general",
        }
    }

    pub fn default_competencies(&self) -> Vec<String> {
        let list = match self {
            Framework::CivilService => CIVIL_SERVICE_BEHAVIOURS,
            Framework::Nhs => NHS_VALUES,
            Framework::General => GENERAL_COMPETENCIES,
        };
        list.iter().map(|c| c.to_string()).collect()
    }

    /// The caller's focus list when it has any usable entries, the framework defaults otherwise.
    pub fn competencies(&self, focus: Option<&[String]>) -> Vec<String> {
        let chosen: Vec<String> = focus
            .unwrap_or_default()
            .iter()
            .map(|c| c.trim())
            .filter(|c| !c.is_empty())
            .map(str::to_string)
            .collect();
        if chosen.is_empty() {
            self.default_competencies()
        } else {
            chosen
        }
    }
}

impl fmt::Display for Framework {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Framework {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "civil_service" => Ok(Framework::CivilService),
            "nhs" => Ok(Framework::Nhs),
            "general" => Ok(Framework::General),
            other => Err(format!(
                "unknown framework '{other}', expected civil_service, nhs or general"
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_is_case_insensitive() {
        assert_eq!("NHS".parse::<Framework>(), Ok(Framework::Nhs));
        assert_eq!("civil_service".parse::<Framework>(), Ok(Framework::CivilService));
        assert!("banking".parse::<Framework>().is_err());
    }

    #[test]
    fn test_focus_overrides_defaults() {
        let focus = vec!["Leadership".to_string(), "  ".to_string()];
        assert_eq!(
            Framework::General.competencies(Some(&focus)),
            vec!["Leadership".to_string()]
        );
    }

    #[test]
    fn test_empty_focus_falls_back_to_defaults() {
        let competencies = Framework::CivilService.competencies(Some(&[]));
        assert_eq!(competencies.len(), CIVIL_SERVICE_BEHAVIOURS.len());
        assert!(competencies.contains(&"Delivering at Pace".to_string()));
        assert_eq!(Framework::Nhs.competencies(None).len(), NHS_VALUES.len());
    }
}
