//! Context providers: named text blocks prepended to every request.

use std::sync::Arc;

use async_trait::async_trait;
use futures::future::try_join_all;

use crate::error::StrandError;

/// Supplies a block of background text for each turn.
#[async_trait]
pub trait ContextProvider: Send + Sync {
    /// Display name, used as the block heading.
    fn name(&self) -> &str;

    /// Current content. Called once per turn.
    async fn content(&self) -> Result<String, StrandError>;

    /// Render fetched content as a block.
    fn render(&self, content: &str) -> String {
        format!("**{}:**\n```{}```", self.name(), content)
    }
}

/// A provider with fixed content.
#[derive(Debug, Clone)]
pub struct StaticContext {
    name: String,
    content: String,
}

impl StaticContext {
    pub fn new(name: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            content: content.into(),
        }
    }
}

#[async_trait]
impl ContextProvider for StaticContext {
    fn name(&self) -> &str {
        &self.name
    }

    async fn content(&self) -> Result<String, StrandError> {
        Ok(self.content.clone())
    }
}

/// Fetch all providers concurrently and join their rendered blocks with a
/// blank line, in registration order. `None` when there are no providers.
pub async fn gather_contexts(
    providers: &[Arc<dyn ContextProvider>],
) -> Result<Option<String>, StrandError> {
    if providers.is_empty() {
        return Ok(None);
    }
    let blocks = try_join_all(providers.iter().map(|provider| async move {
        match provider.content().await {
            Ok(content) => Ok(provider.render(&content)),
            Err(e @ StrandError::ContextProvider { .. }) => Err(e),
            Err(e) => Err(StrandError::ContextProvider {
                name: provider.name().to_string(),
                message: e.to_string(),
            }),
        }
    }))
    .await?;
    Ok(Some(blocks.join("\n\n")))
}
