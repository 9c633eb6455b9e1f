use std::env;
use std::sync::Arc;

use anyhow::{bail, Context};

use ragloop::history::SessionHistory;
use ragloop::{
    AppConfig, ChromaRetriever, OpenAiProvider, RagWorkflow, SqliteHistoryStore, TerminalReason,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config_path =
        env::var("RAGLOOP_CONFIG").unwrap_or_else(|_| "ragloop.toml".to_string());
    let config = AppConfig::load(&config_path)
        .with_context(|| format!("failed to load config from {config_path}"))?;

    ragloop::logging::init(config.log_dir.as_deref());

    let query = env::args().skip(1).collect::<Vec<_>>().join(" ");
    if query.trim().is_empty() {
        bail!("usage: ragloop <question>");
    }

    let provider = Arc::new(OpenAiProvider::new(
        config.provider.base_url.as_str(),
        config.provider.api_key.clone(),
        config.provider.chat_model.as_str(),
        config.provider.embedding_model.as_str(),
    ));
    let retriever = Arc::new(ChromaRetriever::new(
        config.retriever.base_url.as_str(),
        config.retriever.collection.as_str(),
        provider.clone(),
    ));
    let workflow = RagWorkflow::new(provider, retriever, config.workflow.clone());

    let history = match &config.history_db {
        Some(path) => Some(
            SqliteHistoryStore::new(path)
                .await
                .context("failed to open history store")?,
        ),
        None => None,
    };

    let session_id = uuid::Uuid::new_v4().to_string();
    if let Some(store) = &history {
        store.append(&session_id, "user", &query).await?;
    }

    let outcome = workflow.answer(&session_id, &query).await?;

    match outcome.reason {
        TerminalReason::Answered => {
            let answer = outcome.answer().unwrap_or_default();
            println!("{answer}");
            if let Some(store) = &history {
                store.append(&session_id, "ai", answer).await?;
            }
        }
        TerminalReason::NoRelevantContext => {
            println!("No relevant documents were found for that question.");
        }
        TerminalReason::RetriesExhausted => {
            println!("Could not produce a grounded, helpful answer within the retry budget.");
            if let Some(last) = &outcome.state.answer {
                println!("Last attempt (unverified): {last}");
            }
        }
        TerminalReason::TimedOut => {
            println!("The request timed out before an answer was accepted.");
        }
    }

    Ok(())
}
