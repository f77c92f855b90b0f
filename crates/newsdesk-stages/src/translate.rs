use async_trait::async_trait;
use newsdesk_core::{
    call_with_timeout, DocumentRef, ErrorKind, FanOut, Language, LanguageModel, RenderRequest,
    Renderer, RunContext, Stage, StageError, StageKind, StageOutput, TranslatedDocument,
};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use uuid::Uuid;

/// Fans the summary out into one rendered document per language.
pub struct TranslateStage {
    model: Arc<dyn LanguageModel>,
    renderer: Arc<dyn Renderer>,
    languages: Vec<Language>,
    title: String,
    call_timeout: Duration,
    fanout: FanOut,
}

impl TranslateStage {
    pub fn new(
        model: Arc<dyn LanguageModel>,
        renderer: Arc<dyn Renderer>,
        languages: Vec<Language>,
        fanout: FanOut,
        call_timeout: Duration,
    ) -> Self {
        Self {
            model,
            renderer,
            languages,
            title: "Financial News Summary".to_string(),
            call_timeout,
            fanout,
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    /// Translated report title, or the source title when translation fails.
    async fn localized_title(&self, language: &Language, run_id: Uuid) -> String {
        match call_with_timeout(self.call_timeout, self.model.translate(&self.title, language)).await {
            Ok(title) if !title.trim().is_empty() => title,
            Ok(_) => {
                warn!(%run_id, language = %language.code, "Title translation empty, keeping source title");
                self.title.clone()
            }
            Err(error) => {
                warn!(%run_id, language = %language.code, error = %error, "Title translation failed, keeping source title");
                self.title.clone()
            }
        }
    }

    async fn translate_one(
        &self,
        language: Language,
        source_text: &str,
        run_id: Uuid,
    ) -> Result<DocumentRef, ErrorKind> {
        let text = call_with_timeout(self.call_timeout, self.model.translate(source_text, &language))
            .await?;
        if text.trim().is_empty() {
            return Err(ErrorKind::EmptyResult);
        }

        let title = self.localized_title(&language, run_id).await;

        call_with_timeout(
            self.call_timeout,
            self.renderer.render(RenderRequest {
                run_id,
                title: title.trim(),
                text: text.trim(),
                language: &language,
                direction: language.direction,
            }),
        )
        .await
    }
}

#[async_trait]
impl Stage for TranslateStage {
    fn id(&self) -> &'static str {
        "translate.fanout.v1"
    }

    fn kind(&self) -> StageKind {
        StageKind::Translate
    }

    async fn execute(&self, ctx: &mut RunContext) -> Result<StageOutput, StageError> {
        let source_text = match &ctx.summary {
            Some(summary) => summary.text.clone(),
            None => return Err(StageError::Translation(ErrorKind::EmptyResult)),
        };
        let run_id = ctx.run_id;

        let report = self
            .fanout
            .run(self.languages.clone(), |language| {
                self.translate_one(language, &source_text, run_id)
            })
            .await;
        let failure = report.failure();

        let documents: Vec<TranslatedDocument> = self
            .languages
            .iter()
            .cloned()
            .zip(report.into_outcomes())
            .map(|(language, outcome)| match outcome {
                Ok(document) => {
                    info!(%run_id, language = %language.code, path = %document.path.display(), "Document rendered");
                    TranslatedDocument::rendered(language, document)
                }
                Err(err) => {
                    warn!(%run_id, language = %language.code, error = %err, "Translation failed");
                    TranslatedDocument::failed(language, err)
                }
            })
            .collect();

        let rendered = documents.iter().filter(|d| d.is_rendered()).count();
        let digest_input = documents
            .iter()
            .filter_map(|d| d.document.as_ref())
            .map(|d| d.path.to_string_lossy().into_owned())
            .collect::<Vec<_>>()
            .join("\n");
        ctx.documents = documents;

        match failure {
            Some(kind) => Err(StageError::Translation(kind)),
            None => Ok(StageOutput::new(rendered).with_digest(digest_input.as_bytes())),
        }
    }
}
