use std::fmt;

use bytes::Bytes;
use chrono::{DateTime, Utc};
use reportgen_common::ReportConfig;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Analyzing,
    Planning,
    Generating,
    Formatting,
    Completed,
    Failed,
}

impl Phase {
    pub const WORKING: [Phase; 4] = [
        Self::Analyzing,
        Self::Planning,
        Self::Generating,
        Self::Formatting,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Analyzing => "analyzing",
            Self::Planning => "planning",
            Self::Generating => "generating",
            Self::Formatting => "formatting",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }

    /// Position on the success path. `Failed` sorts with `Completed`.
    pub fn rank(&self) -> u8 {
        match self {
            Self::Analyzing => 0,
            Self::Planning => 1,
            Self::Generating => 2,
            Self::Formatting => 3,
            Self::Completed | Self::Failed => 4,
        }
    }

    /// Percentage at which a working phase counts as done.
    pub fn completion_threshold(&self) -> Option<u8> {
        match self {
            Self::Analyzing => Some(15),
            Self::Planning => Some(25),
            Self::Generating => Some(90),
            Self::Formatting => Some(100),
            Self::Completed | Self::Failed => None,
        }
    }

    pub fn next_working(&self) -> Option<Phase> {
        match self {
            Self::Analyzing => Some(Self::Planning),
            Self::Planning => Some(Self::Generating),
            Self::Generating => Some(Self::Formatting),
            _ => None,
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PhaseTiming {
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub completed: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PhaseDetails {
    pub analyzing: PhaseTiming,
    pub planning: PhaseTiming,
    pub generating: PhaseTiming,
    pub formatting: PhaseTiming,
}

impl PhaseDetails {
    pub fn get(&self, phase: Phase) -> Option<&PhaseTiming> {
        match phase {
            Phase::Analyzing => Some(&self.analyzing),
            Phase::Planning => Some(&self.planning),
            Phase::Generating => Some(&self.generating),
            Phase::Formatting => Some(&self.formatting),
            Phase::Completed | Phase::Failed => None,
        }
    }

    pub fn get_mut(&mut self, phase: Phase) -> Option<&mut PhaseTiming> {
        match phase {
            Phase::Analyzing => Some(&mut self.analyzing),
            Phase::Planning => Some(&mut self.planning),
            Phase::Generating => Some(&mut self.generating),
            Phase::Formatting => Some(&mut self.formatting),
            Phase::Completed | Phase::Failed => None,
        }
    }
}

#[derive(Clone, PartialEq, Eq)]
pub struct Artifact {
    pub filename: String,
    pub content_type: String,
    pub bytes: Bytes,
}

impl fmt::Debug for Artifact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Artifact")
            .field("filename", &self.filename)
            .field("content_type", &self.content_type)
            .field("len", &self.bytes.len())
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct Job {
    pub id: String,
    pub config: ReportConfig,
    pub phase: Phase,
    pub percentage: u8,
    pub current_label: String,
    pub words_generated: u64,
    pub estimated_seconds_remaining: u64,
    pub phase_details: PhaseDetails,
    pub error: Option<String>,
    pub artifact: Option<Artifact>,
    pub created_at: DateTime<Utc>,
    pub last_updated: DateTime<Utc>,
}

impl Job {
    pub fn new(id: String, config: ReportConfig, now: DateTime<Utc>) -> Self {
        let mut phase_details = PhaseDetails::default();
        phase_details.analyzing.started_at = Some(now);

        Self {
            id,
            config,
            phase: Phase::Analyzing,
            percentage: 0,
            current_label: "Job created".to_string(),
            words_generated: 0,
            estimated_seconds_remaining: 0,
            phase_details,
            error: None,
            artifact: None,
            created_at: now,
            last_updated: now,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.phase.is_terminal()
    }

    pub fn status(&self) -> JobStatus {
        JobStatus {
            job_id: self.id.clone(),
            phase: self.phase,
            percentage: self.percentage,
            current_label: self.current_label.clone(),
            words_generated: self.words_generated,
            estimated_seconds_remaining: self.estimated_seconds_remaining,
            phase_details: self.phase_details.clone(),
            error: self.error.clone(),
            is_complete: self.phase == Phase::Completed,
            is_failed: self.phase == Phase::Failed,
            is_terminal: self.is_terminal(),
            filename: self.artifact.as_ref().map(|artifact| artifact.filename.clone()),
            last_updated: self.last_updated,
        }
    }
}

/// Externally visible view of a [`Job`]; never carries the artifact bytes or the submitted config.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JobStatus {
    pub job_id: String,
    pub phase: Phase,
    pub percentage: u8,
    pub current_label: String,
    pub words_generated: u64,
    pub estimated_seconds_remaining: u64,
    pub phase_details: PhaseDetails,
    pub error: Option<String>,
    pub is_complete: bool,
    pub is_failed: bool,
    pub is_terminal: bool,
    pub filename: Option<String>,
    pub last_updated: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JobTicket {
    pub job_id: String,
}

#[cfg(test)]
mod tests {
    use bytes::Bytes;
    use chrono::Utc;

    use super::{Artifact, Job, Phase};
    use crate::store::tests::sample_config;

    #[test]
    fn status_payload_uses_camel_case_and_hides_internals() {
        let mut job = Job::new("job_abc".to_string(), sample_config(), Utc::now());
        job.phase = Phase::Completed;
        job.percentage = 100;
        job.artifact = Some(Artifact {
            filename: "T_Project_Report.docx".to_string(),
            content_type: "application/octet-stream".to_string(),
            bytes: Bytes::from_static(b"PK"),
        });

        let payload = serde_json::to_value(job.status()).unwrap();
        assert_eq!(payload["jobId"], "job_abc");
        assert_eq!(payload["phase"], "completed");
        assert_eq!(payload["isComplete"], true);
        assert_eq!(payload["isFailed"], false);
        assert_eq!(payload["filename"], "T_Project_Report.docx");
        assert!(payload["phaseDetails"]["analyzing"]["startedAt"].is_string());
        assert!(payload.get("artifact").is_none());
        assert!(payload.get("config").is_none());
    }

    #[test]
    fn artifact_debug_omits_bytes() {
        let artifact = Artifact {
            filename: "a.docx".to_string(),
            content_type: "x".to_string(),
            bytes: Bytes::from_static(b"secret"),
        };
        let rendered = format!("{artifact:?}");
        assert!(rendered.contains("len: 6"));
        assert!(!rendered.contains("secret"));
    }
}
