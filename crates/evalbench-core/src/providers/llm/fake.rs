use super::LlmClient;
use crate::errors::GenerationError;
use crate::model::LlmResponse;
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Mutex;

/// One recorded call to [`FakeClient`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FakeCall {
    pub prompt: String,
    pub system: Option<String>,
}

/// Scripted client for offline runs and tests.
///
/// Replies are consumed in order; once the script is exhausted every further
/// call returns the fallback reply.
pub struct FakeClient {
    script: Mutex<VecDeque<Result<String, GenerationError>>>,
    fallback: String,
    calls: Mutex<Vec<FakeCall>>,
}

impl FakeClient {
    pub fn new(fallback: impl Into<String>) -> Self {
        Self {
            script: Mutex::new(VecDeque::new()),
            fallback: fallback.into(),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn reply(self, text: impl Into<String>) -> Self {
        self.script.lock().unwrap().push_back(Ok(text.into()));
        self
    }

    pub fn fail(self, err: GenerationError) -> Self {
        self.script.lock().unwrap().push_back(Err(err));
        self
    }

    pub fn calls(&self) -> Vec<FakeCall> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl LlmClient for FakeClient {
    async fn complete(
        &self,
        prompt: &str,
        system: Option<&str>,
    ) -> Result<LlmResponse, GenerationError> {
        self.calls.lock().unwrap().push(FakeCall {
            prompt: prompt.to_string(),
            system: system.map(str::to_string),
        });
        let next = self.script.lock().unwrap().pop_front();
        let text = match next {
            Some(r) => r?,
            None => self.fallback.clone(),
        };
        Ok(LlmResponse {
            text,
            provider: "fake".to_string(),
            model: "fake".to_string(),
        })
    }

    fn provider_name(&self) -> &'static str {
        "fake"
    }
}
