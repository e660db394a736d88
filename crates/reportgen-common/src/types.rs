use std::{fmt, str::FromStr};

use serde::{Deserialize, Deserializer, Serialize};

use crate::error::{ReportError, Result};

pub const MAX_CHAPTER_COUNT: usize = 12;

/// Raw submission body. Every field defaults to empty, and required fields also accept `null`,
/// so that a missing field is reported by [`ReportRequest::validate`] with its own message
/// instead of a deserializer error.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ReportRequest {
    #[serde(deserialize_with = "null_as_empty")]
    pub student_name: String,
    #[serde(deserialize_with = "null_as_empty")]
    pub student_id: String,
    #[serde(deserialize_with = "null_as_empty")]
    pub course: String,
    #[serde(deserialize_with = "null_as_empty")]
    pub semester: String,
    #[serde(deserialize_with = "null_as_empty")]
    pub institution: String,
    #[serde(deserialize_with = "null_as_empty")]
    pub supervisor: String,
    #[serde(deserialize_with = "null_as_empty")]
    pub project_title: String,
    #[serde(deserialize_with = "null_as_empty")]
    pub project_description: String,
    #[serde(deserialize_with = "null_as_empty")]
    pub report_type: String,
    pub department: Option<String>,
    pub academic_year: Option<String>,
    pub chapter_count: Option<usize>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportType {
    Project,
    Internship,
    Research,
    Thesis,
    Lab,
    Seminar,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportConfig {
    pub student_name: String,
    pub student_id: String,
    pub course: String,
    pub semester: String,
    pub institution: String,
    pub supervisor: String,
    pub project_title: String,
    pub project_description: String,
    pub report_type: ReportType,
    pub department: Option<String>,
    pub academic_year: Option<String>,
    pub chapter_count: Option<usize>,
}

impl ReportRequest {
    pub fn validate(&self) -> Result<ReportConfig> {
        let student_name = required("studentName", &self.student_name)?;
        let student_id = required("studentId", &self.student_id)?;
        let course = required("course", &self.course)?;
        let semester = required("semester", &self.semester)?;
        let institution = required("institution", &self.institution)?;
        let supervisor = required("supervisor", &self.supervisor)?;
        let project_title = required("projectTitle", &self.project_title)?;
        let project_description = required("projectDescription", &self.project_description)?;
        let report_type = required("reportType", &self.report_type)?.parse::<ReportType>()?;

        let chapter_count = match self.chapter_count {
            Some(count) if count == 0 || count > MAX_CHAPTER_COUNT => {
                return Err(ReportError::InvalidField {
                    field: "chapterCount".to_string(),
                    reason: format!("must be between 1 and {MAX_CHAPTER_COUNT}"),
                });
            }
            other => other,
        };

        Ok(ReportConfig {
            student_name,
            student_id,
            course,
            semester,
            institution,
            supervisor,
            project_title,
            project_description,
            report_type,
            department: optional(self.department.as_deref()),
            academic_year: optional(self.academic_year.as_deref()),
            chapter_count,
        })
    }
}

fn required(field: &str, value: &str) -> Result<String> {
    let value = value.trim();
    if value.is_empty() {
        return Err(ReportError::MissingField(field.to_string()));
    }
    Ok(value.to_string())
}

fn null_as_empty<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

fn optional(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}

impl ReportType {
    pub const ALL: [ReportType; 6] = [
        Self::Project,
        Self::Internship,
        Self::Research,
        Self::Thesis,
        Self::Lab,
        Self::Seminar,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Project => "project",
            Self::Internship => "internship",
            Self::Research => "research",
            Self::Thesis => "thesis",
            Self::Lab => "lab",
            Self::Seminar => "seminar",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Project => "Project Report",
            Self::Internship => "Internship Report",
            Self::Research => "Research Report",
            Self::Thesis => "Thesis",
            Self::Lab => "Laboratory Report",
            Self::Seminar => "Seminar Report",
        }
    }
}

impl fmt::Display for ReportType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReportType {
    type Err = ReportError;

    fn from_str(value: &str) -> Result<Self> {
        let normalized = value.trim().to_ascii_lowercase().replace(['-', '_', ' '], "");
        let normalized = normalized.strip_suffix("report").unwrap_or(&normalized);
        match normalized {
            "project" => Ok(Self::Project),
            "internship" => Ok(Self::Internship),
            "research" => Ok(Self::Research),
            "thesis" => Ok(Self::Thesis),
            "lab" | "laboratory" => Ok(Self::Lab),
            "seminar" => Ok(Self::Seminar),
            _ => Err(ReportError::InvalidField {
                field: "reportType".to_string(),
                reason: format!("unsupported report type '{}'", value.trim()),
            }),
        }
    }
}
