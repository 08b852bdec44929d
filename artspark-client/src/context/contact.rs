//! ContactContext - contact form submissions and the admin inbox

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use shared::models::{ContactMessage, ContactMessageCreate};
use tokio::sync::watch;

use super::{Refresh, load_into};
use crate::cache::{CacheStatus, EntityCache, provisional_id};
use crate::config::ClientConfig;
use crate::error::ClientResult;
use crate::gateway::Gateways;
use crate::session::SessionContext;

#[derive(Debug)]
pub struct ContactContext {
    gateways: Gateways,
    session: Arc<SessionContext>,
    cache: EntityCache<ContactMessage>,
}

impl ContactContext {
    pub fn new(config: &ClientConfig, gateways: Gateways, session: Arc<SessionContext>) -> Self {
        Self {
            gateways,
            session,
            cache: EntityCache::new("contact_messages", config.stale_after),
        }
    }

    pub fn cache(&self) -> &EntityCache<ContactMessage> {
        &self.cache
    }

    pub fn subscribe(&self) -> watch::Receiver<CacheStatus> {
        self.cache.subscribe()
    }

    /// Load the inbox (admin only)
    pub async fn load(&self) -> ClientResult<()> {
        self.session.require_admin()?;
        // visitors' addresses stay off the device
        load_into(&self.cache, None, || {
            self.gateways.primary.fetch_contact_messages()
        })
        .await
    }

    /// Send a contact form. Visitors never read the inbox, so the message
    /// only enters the cache when this session is an admin.
    pub async fn submit(&self, message: ContactMessageCreate) -> ClientResult<ContactMessage> {
        message.validate_fields()?;

        if !self.session.is_admin() {
            let sent = self.gateways.primary.create_contact_message(&message).await?;
            tracing::info!(id = %sent.id, "Contact message sent");
            return Ok(sent);
        }

        let pending = self
            .cache
            .apply_insert(message.to_message(provisional_id(), Utc::now()));
        self.cache
            .run(
                pending,
                self.gateways.primary.create_contact_message(&message),
                |m: &ContactMessage| Some(m.clone()),
            )
            .await
    }

    pub async fn mark_read(&self, id: &str) -> ClientResult<ContactMessage> {
        self.session.require_admin()?;

        let pending = self.cache.apply_update(id, |m| m.read = true);
        self.cache
            .run(
                pending,
                self.gateways.primary.mark_message_read(id),
                |m: &ContactMessage| Some(m.clone()),
            )
            .await
    }

    pub async fn delete(&self, id: &str) -> ClientResult<()> {
        self.session.require_admin()?;

        let pending = self.cache.apply_remove(id);
        self.cache
            .run(
                pending,
                self.gateways.primary.delete_contact_message(id),
                |_| None,
            )
            .await
    }

    /// Inbox, newest first
    pub fn messages(&self) -> Vec<ContactMessage> {
        self.cache.snapshot()
    }

    pub fn unread_count(&self) -> usize {
        self.cache
            .read(|items| items.iter().filter(|m| !m.read).count())
    }
}

#[async_trait]
impl Refresh for ContactContext {
    fn name(&self) -> &'static str {
        "contact_messages"
    }

    /// Only admins hold an inbox worth refreshing
    fn is_stale(&self) -> bool {
        self.session.is_admin() && self.cache.is_stale()
    }

    async fn refresh(&self) -> ClientResult<()> {
        self.load().await
    }
}
