use std::sync::Arc;

use reportgen_common::{ReportConfig, ReportError, Result};
use reportgen_content::{
    ChapterContent, ChapterPlan, ContentRenderer, DocumentBuilder, ReportDocument,
    SectionContent, TemplateRenderer, references_for, report_filename, types::word_count,
};
use tracing::{info, warn};

use crate::{
    tracker::ProgressTracker,
    types::{Artifact, Phase},
};

const PLANNING_START: i32 = 15;
const GENERATING_START: i32 = 25;
const GENERATING_END: i32 = 90;

/// Drives one job from `analyzing` to a terminal phase. Collaborator calls sit
/// between progress checkpoints; every await is a yield point for other jobs.
#[derive(Clone)]
pub struct GenerationPipeline {
    tracker: ProgressTracker,
    renderer: Arc<dyn ContentRenderer>,
    builder: Arc<dyn DocumentBuilder>,
}

struct GeneratedContent {
    chapters: Vec<ChapterContent>,
    words: u64,
}

impl GenerationPipeline {
    pub fn new(
        tracker: ProgressTracker,
        renderer: Arc<dyn ContentRenderer>,
        builder: Arc<dyn DocumentBuilder>,
    ) -> Self {
        Self {
            tracker,
            renderer,
            builder,
        }
    }

    /// Same collaborators, different progress sink.
    pub fn with_tracker(&self, tracker: ProgressTracker) -> Self {
        Self {
            tracker,
            renderer: Arc::clone(&self.renderer),
            builder: Arc::clone(&self.builder),
        }
    }

    pub fn tracker(&self) -> &ProgressTracker {
        &self.tracker
    }

    /// Never returns an error: anything that goes wrong becomes a `failed` transition.
    pub async fn run(&self, id: &str, config: &ReportConfig) {
        info!(job_id = %id, report_type = %config.report_type, "report generation started");

        let result = match self.execute(id, config).await {
            Ok(artifact) => {
                let size = artifact.bytes.len();
                self.tracker.complete(id, artifact).await.map(|()| size)
            }
            Err(err) => Err(err),
        };

        match result {
            Ok(size) => info!(job_id = %id, bytes = size, "report generation completed"),
            Err(err) => {
                warn!(job_id = %id, error = %err, "report generation failed");
                if let Err(fail_err) = self.tracker.fail(id, err.to_string()).await {
                    warn!(job_id = %id, error = %fail_err, "failed to record job failure");
                }
            }
        }
    }

    async fn execute(&self, id: &str, config: &ReportConfig) -> Result<Artifact> {
        self.analyze(id, config).await?;
        let plan = self.plan(id, config).await?;
        let content = self.generate(id, config, &plan).await?;
        self.format(id, config, content).await
    }

    async fn analyze(&self, id: &str, config: &ReportConfig) -> Result<()> {
        self.tracker
            .advance(id, Phase::Analyzing, 5, "Analyzing project requirements", None)
            .await?;
        self.tracker
            .advance(
                id,
                Phase::Analyzing,
                10,
                format!("Scoping {} for {}", config.report_type.display_name(), config.course),
                None,
            )
            .await?;
        self.tracker
            .advance(id, Phase::Analyzing, PLANNING_START, "Analysis complete", None)
            .await
    }

    async fn plan(&self, id: &str, config: &ReportConfig) -> Result<Vec<ChapterPlan>> {
        self.tracker
            .advance(id, Phase::Planning, 18, "Planning chapter structure", None)
            .await?;
        let plan = self.renderer.plan_chapters(config).await?;
        self.tracker
            .advance(
                id,
                Phase::Planning,
                GENERATING_START,
                format!("Planned {} chapters", plan.len()),
                None,
            )
            .await?;
        Ok(plan)
    }

    async fn generate(
        &self,
        id: &str,
        config: &ReportConfig,
        plan: &[ChapterPlan],
    ) -> Result<GeneratedContent> {
        let total = plan.len();
        let mut words = 0u64;
        let mut chapters = Vec::with_capacity(total);

        if total == 0 {
            self.tracker
                .advance(id, Phase::Generating, GENERATING_END, "No chapters planned", Some(0))
                .await?;
            return Ok(GeneratedContent { chapters, words });
        }

        for (index, chapter) in plan.iter().enumerate() {
            let section_total = chapter.sections.len();
            if section_total == 0 {
                let checkpoint = band_checkpoint(index, total, 1, 1);
                self.tracker
                    .advance(
                        id,
                        Phase::Generating,
                        checkpoint,
                        format!("Chapter {}: {}", index + 1, chapter.title),
                        Some(words),
                    )
                    .await?;
                chapters.push(ChapterContent {
                    title: chapter.title.clone(),
                    sections: Vec::new(),
                });
                continue;
            }

            let mut sections = Vec::with_capacity(section_total);
            for (section_index, heading) in chapter.sections.iter().enumerate() {
                let label = format!("Writing {}: {}", chapter.title, heading);
                self.tracker
                    .advance(
                        id,
                        Phase::Generating,
                        band_checkpoint(index, total, section_index, section_total),
                        label.clone(),
                        Some(words),
                    )
                    .await?;

                let body = self.write_section(id, config, &chapter.title, heading).await;
                words += word_count(&body);

                self.tracker
                    .advance(
                        id,
                        Phase::Generating,
                        band_checkpoint(index, total, section_index + 1, section_total),
                        label,
                        Some(words),
                    )
                    .await?;
                sections.push(SectionContent {
                    heading: heading.clone(),
                    body,
                });
            }

            chapters.push(ChapterContent {
                title: chapter.title.clone(),
                sections,
            });
        }

        Ok(GeneratedContent { chapters, words })
    }

    async fn write_section(
        &self,
        id: &str,
        config: &ReportConfig,
        chapter: &str,
        section: &str,
    ) -> String {
        match self.renderer.write_section(config, chapter, section).await {
            Ok(body) => body,
            Err(err) => {
                warn!(
                    job_id = %id,
                    chapter,
                    section,
                    error = %err,
                    "section prose unavailable, using template"
                );
                TemplateRenderer::render_section(config, chapter, section)
            }
        }
    }

    async fn format(
        &self,
        id: &str,
        config: &ReportConfig,
        content: GeneratedContent,
    ) -> Result<Artifact> {
        let words = Some(content.words);
        self.tracker
            .advance(id, Phase::Formatting, 92, "Formatting document", words)
            .await?;

        let document = ReportDocument {
            config: config.clone(),
            chapters: content.chapters,
            references: references_for(config),
        };
        let builder = Arc::clone(&self.builder);
        let bytes = tokio::task::spawn_blocking(move || builder.build(&document))
            .await
            .map_err(|err| ReportError::Build(format!("document builder task failed: {err}")))??;
        if bytes.is_empty() {
            return Err(ReportError::Build(
                "document builder produced an empty artifact".to_string(),
            ));
        }

        self.tracker
            .advance(id, Phase::Formatting, 98, "Finalizing document", words)
            .await?;

        Ok(Artifact {
            filename: report_filename(config),
            content_type: self.builder.content_type().to_string(),
            bytes,
        })
    }
}

/// Checkpoint for `step` of `steps` inside chapter `chapter` of `chapters`, where the
/// chapters split the generating band evenly.
fn band_checkpoint(chapter: usize, chapters: usize, step: usize, steps: usize) -> i32 {
    let span = (GENERATING_END - GENERATING_START) as usize;
    let done = chapter * steps + step;
    GENERATING_START + (span * done / (chapters * steps)) as i32
}

#[cfg(test)]
mod tests {
    use std::sync::{
        Arc, Mutex,
        atomic::{AtomicBool, Ordering},
    };

    use async_trait::async_trait;
    use bytes::Bytes;
    use reportgen_common::{ReportConfig, ReportError, Result};
    use reportgen_content::{
        ChapterPlan, ContentRenderer, DocumentBuilder, DocxBuilder, FallbackRenderer,
        ReportDocument,
    };

    use super::{GenerationPipeline, band_checkpoint};
    use crate::{
        store::{InMemoryJobStore, JobMutator, JobStore, tests::sample_config},
        tracker::ProgressTracker,
        types::{Job, Phase},
    };

    /// Records every percentage written so monotonicity can be checked afterwards.
    struct RecordingStore {
        inner: InMemoryJobStore,
        history: Arc<Mutex<Vec<(Phase, u8)>>>,
    }

    #[async_trait]
    impl JobStore for RecordingStore {
        async fn create(&self, config: ReportConfig) -> Result<String> {
            self.inner.create(config).await
        }

        async fn get(&self, id: &str) -> Result<Option<Job>> {
            self.inner.get(id).await
        }

        async fn update(&self, id: &str, mutator: JobMutator) -> Result<bool> {
            let history = Arc::clone(&self.history);
            self.inner
                .update(
                    id,
                    Box::new(move |job| {
                        mutator(job);
                        if let Ok(mut history) = history.lock() {
                            history.push((job.phase, job.percentage));
                        }
                    }),
                )
                .await
        }

        async fn delete(&self, id: &str) -> Result<bool> {
            self.inner.delete(id).await
        }

        async fn list(&self) -> Result<Vec<Job>> {
            self.inner.list().await
        }
    }

    struct ScriptedRenderer {
        plan: Vec<ChapterPlan>,
        fail_sections: bool,
    }

    #[async_trait]
    impl ContentRenderer for ScriptedRenderer {
        async fn plan_chapters(&self, _config: &ReportConfig) -> Result<Vec<ChapterPlan>> {
            Ok(self.plan.clone())
        }

        async fn write_section(
            &self,
            _config: &ReportConfig,
            chapter: &str,
            section: &str,
        ) -> Result<String> {
            if self.fail_sections {
                return Err(ReportError::Upstream("provider unavailable".to_string()));
            }
            Ok(format!("{chapter} {section} body text"))
        }
    }

    struct FailingPlanner;

    #[async_trait]
    impl ContentRenderer for FailingPlanner {
        async fn plan_chapters(&self, _config: &ReportConfig) -> Result<Vec<ChapterPlan>> {
            Err(ReportError::Upstream("planner offline".to_string()))
        }

        async fn write_section(
            &self,
            _config: &ReportConfig,
            _chapter: &str,
            _section: &str,
        ) -> Result<String> {
            Ok(String::new())
        }
    }

    struct BrokenBuilder;

    impl DocumentBuilder for BrokenBuilder {
        fn content_type(&self) -> &'static str {
            "application/octet-stream"
        }

        fn build(&self, _document: &ReportDocument) -> Result<Bytes> {
            Err(ReportError::Build("disk full".to_string()))
        }
    }

    struct PanickingBuilder {
        called: AtomicBool,
    }

    impl DocumentBuilder for PanickingBuilder {
        fn content_type(&self) -> &'static str {
            "application/octet-stream"
        }

        fn build(&self, _document: &ReportDocument) -> Result<Bytes> {
            self.called.store(true, Ordering::SeqCst);
            panic!("builder bug");
        }
    }

    async fn run_with(
        renderer: Arc<dyn ContentRenderer>,
        builder: Arc<dyn DocumentBuilder>,
    ) -> (Job, Vec<(Phase, u8)>) {
        let history = Arc::new(Mutex::new(Vec::new()));
        let store: Arc<dyn JobStore> = Arc::new(RecordingStore {
            inner: InMemoryJobStore::new(),
            history: Arc::clone(&history),
        });
        let config = sample_config();
        let id = store.create(config.clone()).await.unwrap();
        let pipeline =
            GenerationPipeline::new(ProgressTracker::new(Arc::clone(&store), 0.5), renderer, builder);

        pipeline.run(&id, &config).await;

        let job = store.get(&id).await.unwrap().unwrap();
        let history = history.lock().unwrap().clone();
        (job, history)
    }

    fn assert_monotonic(history: &[(Phase, u8)]) {
        for pair in history.windows(2) {
            assert!(pair[0].1 <= pair[1].1, "percentage went backwards: {history:?}");
            assert!(pair[0].0.rank() <= pair[1].0.rank(), "phase went backwards: {history:?}");
        }
    }

    #[test]
    fn checkpoints_split_band_evenly() {
        assert_eq!(band_checkpoint(0, 1, 1, 1), 90);
        assert_eq!(band_checkpoint(0, 2, 1, 2), 41);
        assert_eq!(band_checkpoint(0, 2, 2, 2), 57);
        assert_eq!(band_checkpoint(1, 2, 2, 2), 90);
        assert_eq!(band_checkpoint(2, 3, 3, 3), 90);
    }

    #[tokio::test]
    async fn completes_with_template_content() {
        let (job, history) = run_with(
            Arc::new(FallbackRenderer::templates_only()),
            Arc::new(DocxBuilder::new()),
        )
        .await;

        assert_eq!(job.phase, Phase::Completed);
        assert_eq!(job.percentage, 100);
        assert!(job.words_generated > 0);
        let artifact = job.artifact.expect("completed job carries artifact");
        assert!(!artifact.bytes.is_empty());
        assert_eq!(artifact.filename, "T_Project_Report.docx");

        assert_monotonic(&history);
        let phases: Vec<Phase> = history.iter().map(|(phase, _)| *phase).collect();
        for phase in Phase::WORKING {
            assert!(phases.contains(&phase), "{phase} was skipped");
        }
        assert_eq!(history.last(), Some(&(Phase::Completed, 100)));
    }

    #[tokio::test]
    async fn zero_chapters_still_complete() {
        let (job, history) = run_with(
            Arc::new(ScriptedRenderer {
                plan: Vec::new(),
                fail_sections: false,
            }),
            Arc::new(DocxBuilder::new()),
        )
        .await;

        assert_eq!(job.phase, Phase::Completed);
        assert_eq!(job.words_generated, 0);
        assert!(job.artifact.is_some());
        assert_monotonic(&history);
    }

    #[tokio::test]
    async fn empty_chapter_takes_its_whole_band() {
        let (job, history) = run_with(
            Arc::new(ScriptedRenderer {
                plan: vec![
                    ChapterPlan::new("Preface", &[]),
                    ChapterPlan::new("Body", &["One", "Two"]),
                ],
                fail_sections: false,
            }),
            Arc::new(DocxBuilder::new()),
        )
        .await;

        assert_eq!(job.phase, Phase::Completed);
        assert!(history.contains(&(Phase::Generating, 57)));
        assert_eq!(job.words_generated, 8);
        assert_monotonic(&history);
    }

    #[tokio::test]
    async fn section_failures_fall_back_to_templates() {
        let (job, _) = run_with(
            Arc::new(ScriptedRenderer {
                plan: vec![ChapterPlan::new("Introduction", &["Background"])],
                fail_sections: true,
            }),
            Arc::new(DocxBuilder::new()),
        )
        .await;

        assert_eq!(job.phase, Phase::Completed);
        assert!(job.words_generated > 0);
    }

    #[tokio::test]
    async fn planning_failure_fails_the_job() {
        let (job, history) = run_with(Arc::new(FailingPlanner), Arc::new(DocxBuilder::new())).await;

        assert_eq!(job.phase, Phase::Failed);
        assert!(job.error.as_deref().unwrap().contains("planner offline"));
        assert!(job.artifact.is_none());
        assert_eq!(history.last().map(|(_, pct)| *pct), Some(18));
    }

    #[tokio::test]
    async fn builder_error_fails_the_job() {
        let (job, _) = run_with(
            Arc::new(FallbackRenderer::templates_only()),
            Arc::new(BrokenBuilder),
        )
        .await;

        assert_eq!(job.phase, Phase::Failed);
        assert_eq!(job.error.as_deref(), Some("document build failed: disk full"));
        assert!(job.artifact.is_none());
        assert!(job.percentage < 100);
    }

    #[tokio::test]
    async fn builder_panic_is_contained() {
        let builder = Arc::new(PanickingBuilder {
            called: AtomicBool::new(false),
        });
        let (job, _) = run_with(Arc::new(FallbackRenderer::templates_only()), builder.clone()).await;

        assert!(builder.called.load(Ordering::SeqCst));
        assert_eq!(job.phase, Phase::Failed);
        assert!(job.error.as_deref().unwrap().contains("document builder task failed"));
    }
}
