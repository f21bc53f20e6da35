use anyhow::Result;
use async_trait::async_trait;

use ai_client::Claude;

use super::Summarizer;

#[async_trait]
impl Summarizer for Claude {
    async fn complete(&self, system: &str, user: &str) -> Result<String> {
        self.chat_completion(system, user).await
    }
}
