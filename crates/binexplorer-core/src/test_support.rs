use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::{CoreError, QueryDescriptor, QueryResponse, RemoteQueryClient};

type ScriptedResult = Result<QueryResponse, CoreError>;

/// In-memory [`RemoteQueryClient`] returning queued responses per descriptor.
///
/// Descriptors with nothing queued get the fallback, which defaults to a
/// 404 with a null payload.
pub struct ScriptedQueryClient {
    scripted: Mutex<HashMap<QueryDescriptor, VecDeque<ScriptedResult>>>,
    fallback: ScriptedResult,
    issued: Mutex<Vec<QueryDescriptor>>,
}

impl Default for ScriptedQueryClient {
    fn default() -> Self {
        Self {
            scripted: Mutex::new(HashMap::new()),
            fallback: Ok(QueryResponse::not_found()),
            issued: Mutex::new(Vec::new()),
        }
    }
}

impl ScriptedQueryClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_fallback(mut self, fallback: ScriptedResult) -> Self {
        self.fallback = fallback;
        self
    }

    pub fn respond(self, descriptor: QueryDescriptor, result: ScriptedResult) -> Self {
        self.push(descriptor, result);
        self
    }

    pub fn push(&self, descriptor: QueryDescriptor, result: ScriptedResult) {
        self.scripted
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .entry(descriptor)
            .or_default()
            .push_back(result);
    }

    pub fn issued(&self) -> Vec<QueryDescriptor> {
        self.issued
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }
}

#[async_trait]
impl RemoteQueryClient for ScriptedQueryClient {
    async fn query(&self, descriptor: QueryDescriptor) -> Result<QueryResponse, CoreError> {
        self.issued
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(descriptor.clone());

        let scripted = self
            .scripted
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .get_mut(&descriptor)
            .and_then(VecDeque::pop_front);
        scripted.unwrap_or_else(|| self.fallback.clone())
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[tokio::test]
    async fn scripted_responses_are_consumed_in_order_then_fall_back() {
        let descriptor = QueryDescriptor::run_command("regs");
        let client = ScriptedQueryClient::new()
            .respond(descriptor.clone(), Ok(QueryResponse::ok(json!("rax=0"))))
            .respond(
                descriptor.clone(),
                Err(CoreError::DependencyUnavailable("down".to_owned())),
            );

        assert_eq!(
            client.query(descriptor.clone()).await,
            Ok(QueryResponse::ok(json!("rax=0")))
        );
        assert!(client.query(descriptor.clone()).await.is_err());
        assert_eq!(
            client.query(descriptor.clone()).await,
            Ok(QueryResponse::not_found())
        );
        assert_eq!(client.issued().len(), 3);
    }
}
