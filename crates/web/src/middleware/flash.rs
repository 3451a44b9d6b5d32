//! One-shot flash messages carried in the session.

use axum::{extract::FromRequestParts, http::request::Parts};
use tower_sessions::Session;

use crate::models::{FlashLevel, FlashMessage, session_keys};

/// Queue a message for the next rendered page.
///
/// Failures are logged and otherwise ignored; a lost flash message never
/// fails the request that produced it.
pub async fn push_flash(session: &Session, level: FlashLevel, text: impl Into<String>) {
    let mut pending: Vec<FlashMessage> = session
        .get(session_keys::FLASH)
        .await
        .ok()
        .flatten()
        .unwrap_or_default();
    pending.push(FlashMessage {
        level,
        text: text.into(),
    });

    if let Err(e) = session.insert(session_keys::FLASH, pending).await {
        tracing::warn!(error = %e, "Failed to store flash message");
    }
}

/// Extractor that takes (and clears) pending flash messages.
pub struct Flashes(pub Vec<FlashMessage>);

impl<S> FromRequestParts<S> for Flashes
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let Some(session) = parts.extensions.get::<Session>() else {
            return Ok(Self(Vec::new()));
        };

        let messages = session
            .remove::<Vec<FlashMessage>>(session_keys::FLASH)
            .await
            .ok()
            .flatten()
            .unwrap_or_default();

        Ok(Self(messages))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;

    use tower_sessions::MemoryStore;

    use super::*;

    #[tokio::test]
    async fn test_flash_messages_accumulate_then_clear() {
        let session = Session::new(None, Arc::new(MemoryStore::default()), None);

        push_flash(&session, FlashLevel::Success, "Account has been created for dave").await;
        push_flash(&session, FlashLevel::Info, "second").await;

        let taken: Vec<FlashMessage> = session.remove(session_keys::FLASH).await.unwrap().unwrap();
        assert_eq!(taken.len(), 2);
        assert_eq!(taken[0].text, "Account has been created for dave");
        assert!(session.get::<Vec<FlashMessage>>(session_keys::FLASH).await.unwrap().is_none());
    }
}
