use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Mutex;

use super::error::LlmError;
use super::interface::{ChatMessage, ChatModel};

/// Scripted chat model for tests. Replies are returned in queue order and
/// every received conversation is recorded.
pub struct MockChatModel {
    responses: Mutex<VecDeque<Result<String, LlmError>>>,
    requests: Mutex<Vec<Vec<ChatMessage>>>,
}

impl MockChatModel {
    pub fn new() -> Self {
        Self {
            responses: Mutex::new(VecDeque::new()),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn with_replies<I, S>(replies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mock = Self::new();
        for reply in replies {
            mock.add_reply(reply);
        }
        mock
    }

    pub fn add_reply(&self, reply: impl Into<String>) {
        self.responses.lock().unwrap().push_back(Ok(reply.into()));
    }

    pub fn add_error(&self, error: LlmError) {
        self.responses.lock().unwrap().push_back(Err(error));
    }

    pub fn requests(&self) -> Vec<Vec<ChatMessage>> {
        self.requests.lock().unwrap().clone()
    }

    pub fn remaining_replies(&self) -> usize {
        self.responses.lock().unwrap().len()
    }
}

#[async_trait]
impl ChatModel for MockChatModel {
    async fn chat_completion(&self, messages: &[ChatMessage]) -> Result<String, LlmError> {
        self.requests.lock().unwrap().push(messages.to_vec());
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(LlmError::InvalidResponse("MockChatModel: no more replies".to_string())))
    }

    fn name(&self) -> &str {
        "mock"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_replies_in_order_and_records_requests() {
        let model = MockChatModel::with_replies(["first", "second"]);

        let a = model.chat_completion(&[ChatMessage::user("1")]).await.unwrap();
        let b = model.chat_completion(&[ChatMessage::user("2")]).await.unwrap();

        assert_eq!((a.as_str(), b.as_str()), ("first", "second"));
        assert_eq!(model.requests().len(), 2);
        assert!(model.chat_completion(&[]).await.is_err());
    }
}
