//! Builds the HTTP collaborators from configuration.
use newsdesk_core::{ChannelKind, ProviderError, Sender};
use newsdesk_providers::{
    http_client, BrevoEmailSender, HttpLanguageModel, HttpNewsSource, TelegramSender,
};
use newsdesk_render::{HtmlRenderer, TemplatesFile};
use newsdesk_stages::Collaborators;
use std::collections::HashMap;
use std::sync::Arc;

use crate::config::DaemonConfig;

pub fn build_collaborators(config: &DaemonConfig) -> Result<Collaborators, ProviderError> {
    let client = http_client(config.providers.http_timeout())?;

    let templates = match &config.templates {
        Some(path) => TemplatesFile::load(path)?,
        None => TemplatesFile::builtin()?,
    };
    let renderer = HtmlRenderer::with_templates(config.pipeline.output_dir.clone(), templates)?;

    let email: Arc<dyn Sender> = Arc::new(BrevoEmailSender::new(
        client.clone(),
        config.providers.email.clone(),
    ));
    let telegram: Arc<dyn Sender> = Arc::new(TelegramSender::new(
        client.clone(),
        config.providers.telegram.clone(),
    ));

    let senders: HashMap<String, Arc<dyn Sender>> = config
        .pipeline
        .channels
        .iter()
        .map(|channel| {
            let sender = match channel.kind {
                ChannelKind::Email => Arc::clone(&email),
                ChannelKind::Telegram => Arc::clone(&telegram),
            };
            (channel.name.clone(), sender)
        })
        .collect();

    Ok(Collaborators {
        news: Arc::new(HttpNewsSource::new(
            client.clone(),
            config.providers.news.clone(),
        )),
        model: Arc::new(HttpLanguageModel::new(client, config.providers.llm.clone())),
        renderer: Arc::new(renderer),
        senders,
    })
}
