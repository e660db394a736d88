pub mod builder;
pub mod renderer;
pub mod renderers;
pub mod types;

pub use builder::{DOCX_CONTENT_TYPE, DocumentBuilder, DocxBuilder, report_filename};
pub use renderer::{ContentRenderer, FallbackRenderer};
pub use renderers::{
    generative::{GenerativeRenderer, GeneratorConfig},
    template::{TemplateRenderer, references_for},
};
pub use types::{ChapterContent, ChapterPlan, ReportDocument, SectionContent};
