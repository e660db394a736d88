use async_trait::async_trait;
use reportgen_common::{ReportConfig, ReportType, Result};

use crate::{
    renderer::{ContentRenderer, limit_chapters},
    types::ChapterPlan,
};

type ChapterTable = &'static [(&'static str, &'static [&'static str])];

const PROJECT_CHAPTERS: ChapterTable = &[
    ("Introduction", &["Background", "Problem Statement", "Objectives", "Scope"]),
    ("Literature Review", &["Existing Systems", "Related Work", "Research Gap"]),
    ("System Analysis", &["Requirements Analysis", "Feasibility Study"]),
    ("System Design", &["Architecture", "Data Design", "Interface Design"]),
    ("Implementation", &["Development Environment", "Core Modules", "Integration"]),
    ("Testing and Results", &["Test Strategy", "Results", "Discussion"]),
    ("Conclusion", &["Summary", "Future Work"]),
];

const INTERNSHIP_CHAPTERS: ChapterTable = &[
    ("Introduction", &["Purpose of the Internship", "Objectives"]),
    ("Organization Profile", &["Company Overview", "Department Structure"]),
    ("Internship Activities", &["Assigned Tasks", "Tools and Technologies", "Weekly Progress"]),
    ("Project Work", &["Project Overview", "Contribution", "Outcomes"]),
    ("Learning Outcomes", &["Technical Skills", "Professional Skills"]),
    ("Conclusion", &["Summary", "Recommendations"]),
];

const RESEARCH_CHAPTERS: ChapterTable = &[
    ("Introduction", &["Background", "Research Questions", "Significance"]),
    ("Literature Review", &["Theoretical Framework", "Prior Studies", "Research Gap"]),
    ("Methodology", &["Research Design", "Data Collection", "Data Analysis"]),
    ("Results", &["Findings", "Statistical Analysis"]),
    ("Discussion", &["Interpretation", "Limitations"]),
    ("Conclusion", &["Summary", "Future Research"]),
];

const THESIS_CHAPTERS: ChapterTable = &[
    ("Introduction", &["Motivation", "Problem Statement", "Contributions", "Thesis Outline"]),
    ("Background and Related Work", &["Foundations", "State of the Art", "Open Problems"]),
    ("Methodology", &["Approach", "Experimental Setup"]),
    ("Design and Implementation", &["Architecture", "Implementation Details"]),
    ("Evaluation", &["Experiments", "Results", "Threats to Validity"]),
    ("Discussion", &["Implications", "Limitations"]),
    ("Conclusion", &["Summary of Contributions", "Future Work"]),
];

const LAB_CHAPTERS: ChapterTable = &[
    ("Aim", &["Objective", "Expected Outcome"]),
    ("Theory", &["Principles", "Equations"]),
    ("Apparatus and Procedure", &["Apparatus", "Procedure"]),
    ("Observations and Results", &["Observations", "Calculations", "Results"]),
    ("Conclusion", &["Inference", "Precautions"]),
];

const SEMINAR_CHAPTERS: ChapterTable = &[
    ("Introduction", &["Overview", "Motivation"]),
    ("Technical Background", &["Core Concepts", "Evolution"]),
    ("Discussion", &["Applications", "Advantages", "Challenges"]),
    ("Conclusion", &["Summary", "Future Scope"]),
];

const PARAGRAPH_TEMPLATES: &[&str] = &[
    "This section on {section} forms part of the chapter \"{chapter}\" of the {report} titled \"{title}\". \
     The work addresses the following description: {description}. It was carried out by {student} \
     ({student_id}) for the course {course} during {semester} at {institution}.",
    "In the context of \"{title}\", {section} is examined with respect to the goals set out for the \
     {course} course. The discussion builds on the project description ({description}) and \
     records the decisions taken under the supervision of {supervisor}.",
    "{section} within \"{chapter}\" summarises the relevant considerations for {title}. Each point \
     was reviewed against the requirements of {institution} and the expectations agreed with \
     {supervisor}, so that the {report} remains consistent and verifiable.",
];

/// Deterministic content from a static chapter table. Used directly when no
/// generative backend is configured and as the fallback for one that is.
#[derive(Debug, Clone, Default)]
pub struct TemplateRenderer;

impl TemplateRenderer {
    pub fn new() -> Self {
        Self
    }

    pub fn chapter_table(report_type: ReportType) -> Vec<ChapterPlan> {
        let table = match report_type {
            ReportType::Project => PROJECT_CHAPTERS,
            ReportType::Internship => INTERNSHIP_CHAPTERS,
            ReportType::Research => RESEARCH_CHAPTERS,
            ReportType::Thesis => THESIS_CHAPTERS,
            ReportType::Lab => LAB_CHAPTERS,
            ReportType::Seminar => SEMINAR_CHAPTERS,
        };

        table
            .iter()
            .map(|(title, sections)| ChapterPlan::new(*title, sections))
            .collect()
    }

    pub fn render_section(config: &ReportConfig, chapter: &str, section: &str) -> String {
        let index = template_index(chapter, section);
        let mut paragraphs = Vec::with_capacity(2);
        for offset in 0..2 {
            let template = PARAGRAPH_TEMPLATES[(index + offset) % PARAGRAPH_TEMPLATES.len()];
            paragraphs.push(fill(template, config, chapter, section));
        }
        paragraphs.join("\n\n")
    }
}

#[async_trait]
impl ContentRenderer for TemplateRenderer {
    async fn plan_chapters(&self, config: &ReportConfig) -> Result<Vec<ChapterPlan>> {
        Ok(limit_chapters(Self::chapter_table(config.report_type), config))
    }

    async fn write_section(
        &self,
        config: &ReportConfig,
        chapter: &str,
        section: &str,
    ) -> Result<String> {
        Ok(Self::render_section(config, chapter, section))
    }
}

pub fn references_for(config: &ReportConfig) -> Vec<String> {
    let mut references = vec![
        format!(
            "{}. ({}). {}: {}. {}.",
            config.student_name,
            config.academic_year.as_deref().unwrap_or(&config.semester),
            config.project_title,
            config.report_type.display_name(),
            config.institution
        ),
        "Sommerville, I. (2016). Software Engineering (10th ed.). Pearson.".to_string(),
        "Pressman, R. S., & Maxim, B. R. (2019). Software Engineering: A Practitioner's Approach (9th ed.). McGraw-Hill.".to_string(),
    ];

    let extra = match config.report_type {
        ReportType::Research | ReportType::Thesis => vec![
            "Creswell, J. W., & Creswell, J. D. (2018). Research Design (5th ed.). SAGE.",
            "Kothari, C. R. (2004). Research Methodology: Methods and Techniques. New Age International.",
        ],
        ReportType::Internship => {
            vec!["Kolb, D. A. (2014). Experiential Learning (2nd ed.). Pearson FT Press."]
        }
        ReportType::Lab => {
            vec!["Taylor, J. R. (1997). An Introduction to Error Analysis (2nd ed.). University Science Books."]
        }
        ReportType::Project | ReportType::Seminar => vec![
            "Bass, L., Clements, P., & Kazman, R. (2021). Software Architecture in Practice (4th ed.). Addison-Wesley.",
        ],
    };
    references.extend(extra.into_iter().map(str::to_string));
    references
}

fn fill(template: &str, config: &ReportConfig, chapter: &str, section: &str) -> String {
    template
        .replace("{section}", section)
        .replace("{chapter}", chapter)
        .replace("{report}", &config.report_type.display_name().to_lowercase())
        .replace("{title}", &config.project_title)
        .replace("{description}", config.project_description.trim_end_matches('.'))
        .replace("{student}", &config.student_name)
        .replace("{student_id}", &config.student_id)
        .replace("{course}", &config.course)
        .replace("{semester}", &config.semester)
        .replace("{institution}", &config.institution)
        .replace("{supervisor}", &config.supervisor)
}

fn template_index(chapter: &str, section: &str) -> usize {
    chapter
        .bytes()
        .chain(section.bytes())
        .fold(0usize, |acc, byte| acc.wrapping_mul(31).wrapping_add(byte as usize))
}

#[cfg(test)]
mod tests {
    use reportgen_common::{ReportConfig, ReportRequest, ReportType};

    use super::{TemplateRenderer, references_for};

    fn config(report_type: &str) -> ReportConfig {
        ReportRequest {
            student_name: "Ada".to_string(),
            student_id: "42".to_string(),
            course: "CS401".to_string(),
            semester: "Fall".to_string(),
            institution: "State University".to_string(),
            supervisor: "Dr. X".to_string(),
            project_title: "Smart Irrigation".to_string(),
            project_description: "Soil moisture driven watering".to_string(),
            report_type: report_type.to_string(),
            ..ReportRequest::default()
        }
        .validate()
        .unwrap()
    }

    #[test]
    fn every_report_type_has_a_plan() {
        for report_type in ReportType::ALL {
            let plan = TemplateRenderer::chapter_table(report_type);
            assert!(plan.len() >= 4, "{report_type} plan too short");
            assert!(plan.iter().all(|chapter| !chapter.sections.is_empty()));
        }
    }

    #[test]
    fn prose_is_deterministic_and_interpolated() {
        let config = config("research");
        let first = TemplateRenderer::render_section(&config, "Methodology", "Data Collection");
        let second = TemplateRenderer::render_section(&config, "Methodology", "Data Collection");
        assert_eq!(first, second);
        assert!(first.contains("Smart Irrigation"));
        assert!(!first.contains('{'));
    }

    #[test]
    fn references_mention_the_report() {
        let references = references_for(&config("thesis"));
        assert!(references[0].contains("Smart Irrigation"));
        assert!(references.iter().any(|reference| reference.contains("Research Design")));
    }
}
