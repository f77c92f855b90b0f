use async_trait::async_trait;
use newsdesk_core::{
    call_with_timeout, ChannelConfig, DeliveryReceipt, DeliveryStatus, DistributionRecord,
    DocumentRef, DocumentStatus, ErrorKind, Exclusion, FanOut, RunContext, Sender, Stage,
    StageError, StageKind, StageOutput,
};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// One (document, channel) delivery attempt.
#[derive(Debug, Clone)]
struct Delivery {
    language: String,
    document: DocumentRef,
    channel: ChannelConfig,
}

/// Sends every rendered document over every configured channel.
pub struct DistributeStage {
    channels: Vec<ChannelConfig>,
    senders: HashMap<String, Arc<dyn Sender>>,
    call_timeout: Duration,
    fanout: FanOut,
}

impl DistributeStage {
    pub fn new(
        channels: Vec<ChannelConfig>,
        senders: HashMap<String, Arc<dyn Sender>>,
        fanout: FanOut,
        call_timeout: Duration,
    ) -> Self {
        Self {
            channels,
            senders,
            call_timeout,
            fanout,
        }
    }

    async fn deliver(&self, delivery: &Delivery) -> Result<DeliveryReceipt, ErrorKind> {
        let sender = self.senders.get(&delivery.channel.name).ok_or_else(|| {
            ErrorKind::Provider(format!("no sender registered for channel '{}'", delivery.channel.name))
        })?;
        call_with_timeout(
            self.call_timeout,
            sender.send(&delivery.document, &delivery.channel),
        )
        .await
    }

    /// Pairs rendered documents with channels; failed documents become exclusions.
    fn plan(&self, ctx: &RunContext) -> (Vec<Delivery>, Vec<Exclusion>) {
        let mut deliveries = Vec::new();
        let mut exclusions = Vec::new();

        for doc in &ctx.documents {
            match (&doc.status, &doc.document) {
                (DocumentStatus::Rendered, Some(document)) => {
                    for channel in &self.channels {
                        deliveries.push(Delivery {
                            language: doc.language.code.clone(),
                            document: document.clone(),
                            channel: channel.clone(),
                        });
                    }
                }
                (DocumentStatus::Failed { error }, _) => exclusions.push(Exclusion {
                    language: doc.language.code.clone(),
                    reason: format!("translation failed: {error}"),
                }),
                (DocumentStatus::Rendered, None) => exclusions.push(Exclusion {
                    language: doc.language.code.clone(),
                    reason: "no rendered file".to_string(),
                }),
            }
        }
        (deliveries, exclusions)
    }
}

#[async_trait]
impl Stage for DistributeStage {
    fn id(&self) -> &'static str {
        "distribute.fanout.v1"
    }

    fn kind(&self) -> StageKind {
        StageKind::Distribute
    }

    async fn execute(&self, ctx: &mut RunContext) -> Result<StageOutput, StageError> {
        let run_id = ctx.run_id;
        let (deliveries, exclusions) = self.plan(ctx);

        for exclusion in &exclusions {
            warn!(%run_id, language = %exclusion.language, reason = %exclusion.reason, "Document excluded from distribution");
        }
        ctx.exclusions = exclusions;

        if deliveries.is_empty() {
            return Err(StageError::Distribution(ErrorKind::EmptyResult));
        }

        let report = self
            .fanout
            .run(deliveries.clone(), |delivery| async move {
                self.deliver(&delivery).await
            })
            .await;
        let failure = report.failure();

        let records: Vec<DistributionRecord> = deliveries
            .into_iter()
            .zip(report.into_outcomes())
            .map(|(delivery, outcome)| {
                let mut record = DistributionRecord {
                    channel: delivery.channel.name,
                    language: delivery.language,
                    document: delivery.document.path,
                    status: DeliveryStatus::Delivered,
                    receipt: None,
                    error_detail: None,
                };
                match outcome {
                    Ok(receipt) => {
                        info!(%run_id, channel = %record.channel, language = %record.language, "Delivered");
                        record.receipt = receipt.reference;
                    }
                    Err(err) => {
                        warn!(%run_id, channel = %record.channel, language = %record.language, error = %err, "Delivery failed");
                        record.status = DeliveryStatus::Failed;
                        record.error_detail = Some(err.to_string());
                    }
                }
                record
            })
            .collect();

        let delivered = records
            .iter()
            .filter(|r| r.status == DeliveryStatus::Delivered)
            .count();
        let excluded = ctx.exclusions.len();
        ctx.deliveries = records;

        match failure {
            Some(kind) => Err(StageError::Distribution(kind)),
            None => {
                let mut output = StageOutput::new(delivered);
                if excluded > 0 {
                    output = output.with_detail(format!("{excluded} document(s) excluded"));
                }
                Ok(output)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use newsdesk_core::{ChannelKind, Language, ProviderError, TranslatedDocument};
    use std::path::Path;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingSender {
        sent: Mutex<Vec<(String, String)>>,
        fail: bool,
    }

    #[async_trait]
    impl Sender for RecordingSender {
        async fn send(
            &self,
            document: &DocumentRef,
            channel: &ChannelConfig,
        ) -> Result<DeliveryReceipt, ProviderError> {
            self.sent
                .lock()
                .unwrap()
                .push((channel.name.clone(), document.path.display().to_string()));
            if self.fail {
                return Err(ProviderError::Http("429 too many requests".into()));
            }
            Ok(DeliveryReceipt::with_reference(format!("msg-{}", channel.name)))
        }
    }

    fn channel(name: &str, kind: ChannelKind) -> ChannelConfig {
        ChannelConfig {
            name: name.into(),
            kind,
            recipients: vec!["ops@example.com".into()],
        }
    }

    fn doc(code: &str) -> DocumentRef {
        DocumentRef {
            path: format!("/tmp/report_{code}.html").into(),
            mime: "text/html".into(),
            bytes: 42,
        }
    }

    fn ctx_with_documents() -> RunContext {
        let mut ctx = RunContext::new(Path::new("/tmp"), None);
        ctx.documents = vec![
            TranslatedDocument::rendered(Language::new("hi", "Hindi"), doc("hi")),
            TranslatedDocument::rendered(Language::new("ta", "Tamil"), doc("ta")),
            TranslatedDocument::failed(Language::new("he", "Hebrew"), ErrorKind::EmptyResult),
        ];
        ctx
    }

    fn stage(email: Arc<RecordingSender>, telegram: Arc<RecordingSender>) -> DistributeStage {
        let mut senders: HashMap<String, Arc<dyn Sender>> = HashMap::new();
        senders.insert("email".into(), email);
        senders.insert("telegram".into(), telegram);
        DistributeStage::new(
            vec![
                channel("email", ChannelKind::Email),
                channel("telegram", ChannelKind::Telegram),
            ],
            senders,
            FanOut::new(4, Duration::from_secs(5)),
            Duration::from_secs(5),
        )
    }

    #[tokio::test]
    async fn test_only_rendered_documents_are_sent() {
        let email = Arc::new(RecordingSender::default());
        let telegram = Arc::new(RecordingSender::default());
        let mut ctx = ctx_with_documents();

        let output = stage(Arc::clone(&email), Arc::clone(&telegram))
            .execute(&mut ctx)
            .await
            .unwrap();

        assert_eq!(output.items, 4);
        assert_eq!(ctx.deliveries.len(), 4);
        let order: Vec<_> = ctx
            .deliveries
            .iter()
            .map(|r| format!("{}:{}", r.language, r.channel))
            .collect();
        assert_eq!(order, ["hi:email", "hi:telegram", "ta:email", "ta:telegram"]);
        assert_eq!(email.sent.lock().unwrap().len(), 2);
        assert_eq!(ctx.exclusions.len(), 1);
        assert_eq!(ctx.exclusions[0].language, "he");
        assert_eq!(output.detail.as_deref(), Some("1 document(s) excluded"));
    }

    #[tokio::test]
    async fn test_failing_channel_is_recorded_per_attempt() {
        let email = Arc::new(RecordingSender::default());
        let telegram = Arc::new(RecordingSender {
            fail: true,
            ..RecordingSender::default()
        });
        let mut ctx = ctx_with_documents();

        let err = stage(email, telegram).execute(&mut ctx).await.unwrap_err();

        assert_eq!(
            err,
            StageError::Distribution(ErrorKind::PartialFailure { failed: 2, total: 4 })
        );
        let failed: Vec<_> = ctx
            .deliveries
            .iter()
            .filter(|r| r.status == DeliveryStatus::Failed)
            .collect();
        assert_eq!(failed.len(), 2);
        assert!(failed.iter().all(|r| r.channel == "telegram"));
        assert!(failed[0].error_detail.as_ref().unwrap().contains("429"));
        assert_eq!(ctx.deliveries[0].receipt.as_deref(), Some("msg-email"));
    }

    #[tokio::test]
    async fn test_missing_sender_fails_only_that_channel() {
        let mut senders: HashMap<String, Arc<dyn Sender>> = HashMap::new();
        senders.insert("email".into(), Arc::new(RecordingSender::default()));
        let stage = DistributeStage::new(
            vec![
                channel("email", ChannelKind::Email),
                channel("telegram", ChannelKind::Telegram),
            ],
            senders,
            FanOut::sequential(Duration::from_secs(5)),
            Duration::from_secs(5),
        );
        let mut ctx = ctx_with_documents();

        let err = stage.execute(&mut ctx).await.unwrap_err();
        assert_eq!(
            err,
            StageError::Distribution(ErrorKind::PartialFailure { failed: 2, total: 4 })
        );
        assert!(ctx.deliveries[1]
            .error_detail
            .as_ref()
            .unwrap()
            .contains("no sender registered for channel 'telegram'"));
    }

    #[tokio::test]
    async fn test_nothing_to_send_is_empty_result() {
        let mut ctx = RunContext::new(Path::new("/tmp"), None);
        ctx.documents = vec![TranslatedDocument::failed(
            Language::new("he", "Hebrew"),
            ErrorKind::Timeout(10),
        )];

        let err = stage(Arc::default(), Arc::default())
            .execute(&mut ctx)
            .await
            .unwrap_err();
        assert_eq!(err, StageError::Distribution(ErrorKind::EmptyResult));
        assert_eq!(ctx.exclusions.len(), 1);
        assert!(ctx.deliveries.is_empty());
    }
}
