use std::{future::Future, sync::Arc, time::Duration};

use async_trait::async_trait;
use reportgen_common::{ReportConfig, ReportError, Result};
use tracing::{debug, warn};

use crate::{renderers::template::TemplateRenderer, types::ChapterPlan};

#[async_trait]
pub trait ContentRenderer: Send + Sync {
    async fn plan_chapters(&self, config: &ReportConfig) -> Result<Vec<ChapterPlan>>;

    async fn write_section(
        &self,
        config: &ReportConfig,
        chapter: &str,
        section: &str,
    ) -> Result<String>;
}

/// Bounds every call to the primary renderer with a timeout and answers from the
/// template table whenever the primary fails, times out, or returns nothing usable.
/// Without a primary it serves templates only.
pub struct FallbackRenderer {
    primary: Option<Arc<dyn ContentRenderer>>,
    fallback: TemplateRenderer,
    timeout: Duration,
}

impl FallbackRenderer {
    pub fn new(primary: Arc<dyn ContentRenderer>, timeout: Duration) -> Self {
        Self {
            primary: Some(primary),
            fallback: TemplateRenderer::new(),
            timeout,
        }
    }

    pub fn templates_only() -> Self {
        Self {
            primary: None,
            fallback: TemplateRenderer::new(),
            timeout: Duration::ZERO,
        }
    }

    pub fn has_primary(&self) -> bool {
        self.primary.is_some()
    }

    async fn bounded<T>(&self, call: impl Future<Output = Result<T>>) -> Result<T> {
        match tokio::time::timeout(self.timeout, call).await {
            Ok(result) => result,
            Err(_) => Err(ReportError::Upstream(format!(
                "content renderer timed out after {}ms",
                self.timeout.as_millis()
            ))),
        }
    }
}

#[async_trait]
impl ContentRenderer for FallbackRenderer {
    async fn plan_chapters(&self, config: &ReportConfig) -> Result<Vec<ChapterPlan>> {
        if let Some(primary) = self.primary.as_ref() {
            match self.bounded(primary.plan_chapters(config)).await {
                Ok(plan) if !plan.is_empty() => {
                    debug!(chapters = plan.len(), "chapter plan served by primary renderer");
                    return Ok(limit_chapters(plan, config));
                }
                Ok(_) => warn!("primary renderer returned an empty chapter plan, using templates"),
                Err(err) => warn!(error = %err, "chapter planning failed, using templates"),
            }
        }

        self.fallback.plan_chapters(config).await
    }

    async fn write_section(
        &self,
        config: &ReportConfig,
        chapter: &str,
        section: &str,
    ) -> Result<String> {
        if let Some(primary) = self.primary.as_ref() {
            match self
                .bounded(primary.write_section(config, chapter, section))
                .await
            {
                Ok(text) if !text.trim().is_empty() => return Ok(text),
                Ok(_) => warn!(
                    chapter,
                    section,
                    "primary renderer returned empty prose, using templates"
                ),
                Err(err) => warn!(
                    chapter,
                    section,
                    error = %err,
                    "section generation failed, using templates"
                ),
            }
        }

        self.fallback.write_section(config, chapter, section).await
    }
}

pub fn limit_chapters(mut plan: Vec<ChapterPlan>, config: &ReportConfig) -> Vec<ChapterPlan> {
    if let Some(limit) = config.chapter_count {
        plan.truncate(limit);
    }
    plan
}

#[cfg(test)]
mod tests {
    use std::{
        sync::{
            Arc,
            atomic::{AtomicUsize, Ordering},
        },
        time::Duration,
    };

    use async_trait::async_trait;
    use reportgen_common::{ReportConfig, ReportError, ReportRequest, Result};

    use super::{ContentRenderer, FallbackRenderer};
    use crate::types::ChapterPlan;

    fn config() -> ReportConfig {
        ReportRequest {
            student_name: "A".to_string(),
            student_id: "1".to_string(),
            course: "CS".to_string(),
            semester: "S1".to_string(),
            institution: "I".to_string(),
            supervisor: "Dr. X".to_string(),
            project_title: "Inventory Tracker".to_string(),
            project_description: "A tool for tracking stock".to_string(),
            report_type: "project".to_string(),
            ..ReportRequest::default()
        }
        .validate()
        .unwrap()
    }

    struct SlowRenderer;

    #[async_trait]
    impl ContentRenderer for SlowRenderer {
        async fn plan_chapters(&self, _config: &ReportConfig) -> Result<Vec<ChapterPlan>> {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok(vec![ChapterPlan::new("Never", &[])])
        }

        async fn write_section(
            &self,
            _config: &ReportConfig,
            _chapter: &str,
            _section: &str,
        ) -> Result<String> {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok("never".to_string())
        }
    }

    struct BrokenRenderer {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl ContentRenderer for BrokenRenderer {
        async fn plan_chapters(&self, _config: &ReportConfig) -> Result<Vec<ChapterPlan>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Err(ReportError::Upstream("503 from provider".to_string()))
        }

        async fn write_section(
            &self,
            _config: &ReportConfig,
            _chapter: &str,
            _section: &str,
        ) -> Result<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Err(ReportError::Upstream("503 from provider".to_string()))
        }
    }

    struct FixedRenderer;

    #[async_trait]
    impl ContentRenderer for FixedRenderer {
        async fn plan_chapters(&self, _config: &ReportConfig) -> Result<Vec<ChapterPlan>> {
            Ok((1..=6)
                .map(|index| ChapterPlan::new(format!("Chapter {index}"), &["Only"]))
                .collect())
        }

        async fn write_section(
            &self,
            _config: &ReportConfig,
            chapter: &str,
            section: &str,
        ) -> Result<String> {
            Ok(format!("{chapter} / {section}"))
        }
    }

    #[tokio::test]
    async fn timed_out_calls_degrade_to_templates() {
        let renderer = FallbackRenderer::new(Arc::new(SlowRenderer), Duration::from_millis(20));
        let config = config();

        let plan = renderer.plan_chapters(&config).await.unwrap();
        assert!(!plan.is_empty());
        assert_ne!(plan[0].title, "Never");

        let text = renderer
            .write_section(&config, "Introduction", "Background")
            .await
            .unwrap();
        assert!(text.contains("Inventory Tracker"));
    }

    #[tokio::test]
    async fn upstream_errors_are_not_surfaced() {
        let primary = Arc::new(BrokenRenderer {
            calls: AtomicUsize::new(0),
        });
        let renderer = FallbackRenderer::new(primary.clone(), Duration::from_secs(1));
        let config = config();

        assert!(renderer.plan_chapters(&config).await.is_ok());
        assert!(renderer.write_section(&config, "Design", "Overview").await.is_ok());
        assert_eq!(primary.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn chapter_count_limits_primary_plan() {
        let renderer = FallbackRenderer::new(Arc::new(FixedRenderer), Duration::from_secs(1));
        let mut config = config();
        config.chapter_count = Some(2);

        let plan = renderer.plan_chapters(&config).await.unwrap();
        assert_eq!(plan.len(), 2);
        assert_eq!(
            renderer.write_section(&config, "Chapter 1", "Only").await.unwrap(),
            "Chapter 1 / Only"
        );
    }

    #[tokio::test]
    async fn templates_only_never_calls_out() {
        let renderer = FallbackRenderer::templates_only();
        assert!(!renderer.has_primary());
        assert!(!renderer.plan_chapters(&config()).await.unwrap().is_empty());
    }
}
