use std::sync::Arc;
use std::time::Instant;

use tracing::{error, info};

use crate::catalog::{seed_history, Catalog};
use crate::error::ChatError;
use crate::generator::Generator;
use crate::protocol::{Conversation, ConversationTurn};
use crate::telemetry::TelemetrySink;

/// Runs one seeded conversation per query. Everything it holds is built at
/// startup and shared read-only between requests.
pub struct Dispatcher {
    catalog: Catalog,
    system_instruction: Option<Arc<str>>,
    history: Arc<[ConversationTurn]>,
    generator: Arc<dyn Generator>,
    sink: Arc<dyn TelemetrySink>,
}

impl Dispatcher {
    pub fn new(
        catalog: Catalog,
        system_instruction: Option<String>,
        generator: Arc<dyn Generator>,
        sink: Arc<dyn TelemetrySink>,
    ) -> Self {
        Self {
            catalog,
            system_instruction: system_instruction.map(Arc::from),
            history: seed_history(&catalog).into(),
            generator,
            sink,
        }
    }

    pub fn conversation_for(&self, query: &str) -> Conversation {
        let mut turns = Vec::with_capacity(self.history.len() + 1);
        turns.extend(self.history.iter().cloned());
        turns.push(ConversationTurn::user(query));
        Conversation {
            system_instruction: self.system_instruction.as_deref().map(str::to_string),
            turns,
        }
    }

    pub async fn respond_to(&self, query: &str) -> Result<String, ChatError> {
        if query.is_empty() {
            return Err(ChatError::Validation("query is empty".to_string()));
        }

        let conversation = self.conversation_for(query);
        let started = Instant::now();
        let response = self
            .generator
            .generate(&conversation)
            .await
            .map_err(|error| {
                error!("generation failed: {error:#}");
                ChatError::Upstream(format!("{error:#}"))
            })?;

        info!(
            query_len = query.len(),
            response_len = response.len(),
            known_garment = self.catalog.lookup(query).is_some(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "generated response"
        );
        self.sink.record(&response);
        Ok(response)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::sync::Mutex;
    use std::time::Duration;

    use anyhow::{anyhow, Result};
    use async_trait::async_trait;

    use super::*;
    use crate::catalog::tests::InstructionFollowingModel;
    use crate::catalog::SENTINEL;
    use crate::protocol::Role;
    use crate::telemetry::NoopSink;

    pub(crate) struct FailingModel;

    #[async_trait]
    impl Generator for FailingModel {
        async fn generate(&self, _conversation: &Conversation) -> Result<String> {
            Err(anyhow!("quota exceeded"))
        }
    }

    /// Echoes the query after a delay that shrinks with query length, so
    /// concurrent calls finish out of order.
    struct EchoModel;

    #[async_trait]
    impl Generator for EchoModel {
        async fn generate(&self, conversation: &Conversation) -> Result<String> {
            let query = conversation.latest_user_text().unwrap_or_default().to_string();
            let delay = 50u64.saturating_sub(query.len() as u64 * 5);
            tokio::time::sleep(Duration::from_millis(delay)).await;
            Ok(format!("echo: {query}"))
        }
    }

    #[derive(Default)]
    pub(crate) struct RecordingSink {
        pub(crate) records: Mutex<Vec<String>>,
    }

    impl TelemetrySink for RecordingSink {
        fn record(&self, response: &str) {
            self.records.lock().unwrap().push(response.to_string());
        }
    }

    fn dispatcher_with(generator: Arc<dyn Generator>, sink: Arc<dyn TelemetrySink>) -> Dispatcher {
        Dispatcher::new(
            Catalog::builtin(),
            Some("You are a stylist.".to_string()),
            generator,
            sink,
        )
    }

    #[test]
    fn conversation_is_seed_history_then_query() {
        let dispatcher = dispatcher_with(Arc::new(FailingModel), Arc::new(NoopSink));
        let conversation = dispatcher.conversation_for("denim jacket");

        assert_eq!(conversation.system_instruction.as_deref(), Some("You are a stylist."));
        assert_eq!(conversation.turns.len(), 7);
        assert_eq!(
            &conversation.turns[..6],
            seed_history(&Catalog::builtin()).as_slice()
        );
        let last = conversation.turns.last().unwrap();
        assert_eq!(last.role, Role::User);
        assert_eq!(last.text, "denim jacket");
    }

    #[test]
    fn each_conversation_starts_fresh() {
        let dispatcher = dispatcher_with(Arc::new(FailingModel), Arc::new(NoopSink));
        let _ = dispatcher.conversation_for("first");
        let second = dispatcher.conversation_for("second");
        assert_eq!(second.turns.len(), 7);
        assert!(second.turns.iter().all(|turn| turn.text != "first"));
    }

    #[tokio::test]
    async fn returns_model_text_unmodified_and_records_it() {
        let sink = Arc::new(RecordingSink::default());
        let dispatcher = dispatcher_with(Arc::new(InstructionFollowingModel), sink.clone());

        let response = dispatcher.respond_to("khaki chinos").await.unwrap();
        assert!(response.starts_with("Khaki chinos match with:\n"));
        assert!(response.contains("* Brown leather loafers\n"));
        assert_eq!(sink.records.lock().unwrap().as_slice(), &[response]);
    }

    #[tokio::test]
    async fn unknown_item_gets_sentinel() {
        let dispatcher = dispatcher_with(Arc::new(InstructionFollowingModel), Arc::new(NoopSink));
        let response = dispatcher.respond_to("brown hoodie").await.unwrap();
        assert_eq!(response, SENTINEL);
    }

    #[tokio::test]
    async fn upstream_failure_is_reported_and_not_recorded() {
        let sink = Arc::new(RecordingSink::default());
        let dispatcher = dispatcher_with(Arc::new(FailingModel), sink.clone());

        let error = dispatcher.respond_to("blue jeans").await.unwrap_err();
        assert!(matches!(error, ChatError::Upstream(message) if message.contains("quota")));
        assert!(sink.records.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn empty_query_is_rejected() {
        let dispatcher = dispatcher_with(Arc::new(InstructionFollowingModel), Arc::new(NoopSink));
        let error = dispatcher.respond_to("").await.unwrap_err();
        assert!(matches!(error, ChatError::Validation(_)));
    }

    #[tokio::test]
    async fn whitespace_query_reaches_the_model() {
        let dispatcher = dispatcher_with(Arc::new(EchoModel), Arc::new(NoopSink));
        let response = dispatcher.respond_to("   ").await.unwrap();
        assert_eq!(response, "echo:    ");
    }

    #[tokio::test]
    async fn concurrent_queries_get_their_own_answers() {
        let dispatcher = Arc::new(dispatcher_with(Arc::new(EchoModel), Arc::new(NoopSink)));
        let queries: Vec<String> = (0..8).map(|i| format!("item {}", "x".repeat(i))).collect();

        let handles: Vec<_> = queries
            .iter()
            .cloned()
            .map(|query| {
                let dispatcher = dispatcher.clone();
                tokio::spawn(async move {
                    let response = dispatcher.respond_to(&query).await.unwrap();
                    (query, response)
                })
            })
            .collect();

        for handle in handles {
            let (query, response) = handle.await.unwrap();
            assert_eq!(response, format!("echo: {query}"));
        }
    }
}
