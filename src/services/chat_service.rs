use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use chrono::Utc;
use sqlx::SqlitePool;
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::models::application::{Application, ApplicationStatus};
use crate::models::chat::{ChatEvent, ChatMessage};
use crate::models::user::AuthUser;

/// In-process fan-out: one broadcast sender per chat channel, created
/// lazily on first publish or subscribe. Once closed, every delivery
/// attempt reports `ChannelUnavailable`; the message store is not
/// affected.
#[derive(Clone)]
pub struct ChatHub {
    inner: Arc<Mutex<HubInner>>,
    capacity: usize,
}

struct HubInner {
    closed: bool,
    topics: HashMap<Uuid, broadcast::Sender<ChatEvent>>,
}

impl ChatHub {
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Arc::new(Mutex::new(HubInner {
                closed: false,
                topics: HashMap::new(),
            })),
            capacity: capacity.max(1),
        }
    }

    fn sender(&self, channel_id: Uuid) -> Result<broadcast::Sender<ChatEvent>> {
        let mut inner = self.inner.lock().expect("chat hub lock poisoned");
        if inner.closed {
            return Err(Error::ChannelUnavailable);
        }
        let sender = inner
            .topics
            .entry(channel_id)
            .or_insert_with(|| broadcast::channel(self.capacity).0);
        Ok(sender.clone())
    }

    pub fn close(&self) {
        let mut inner = self.inner.lock().expect("chat hub lock poisoned");
        inner.closed = true;
        inner.topics.clear();
    }
}

#[derive(Clone)]
pub struct ChatService {
    pool: SqlitePool,
    hub: ChatHub,
}

impl ChatService {
    pub fn new(pool: SqlitePool, hub: ChatHub) -> Self {
        Self { pool, hub }
    }

    pub fn hub(&self) -> &ChatHub {
        &self.hub
    }

    /// Idempotent channel provisioning. The application row is the lock:
    /// assignment happens through a compare-and-set on `chat_id IS NULL`,
    /// so concurrent callers agree on a single channel id.
    pub async fn ensure_channel(&self, actor: AuthUser, application_id: Uuid) -> Result<Uuid> {
        let app = self.application(application_id).await?;
        check_participant(&app, actor)?;

        if let Some(chat_id) = app.chat_id {
            return Ok(chat_id);
        }
        if app.status != ApplicationStatus::BothAccepted {
            return Err(Error::InvalidTransition(
                "chat opens only after both sides accept".to_string(),
            ));
        }

        let chat_id = Uuid::new_v4();
        let affected =
            sqlx::query("UPDATE applications SET chat_id = ? WHERE id = ? AND chat_id IS NULL")
                .bind(chat_id)
                .bind(application_id)
                .execute(&self.pool)
                .await?
                .rows_affected();

        if affected == 1 {
            tracing::info!(application_id = %application_id, channel_id = %chat_id, "chat channel provisioned");
            return Ok(chat_id);
        }

        // Lost the race: another caller assigned the id first.
        let app = self.application(application_id).await?;
        app.chat_id.ok_or(Error::ConcurrentModification)
    }

    /// Appends a message with a server-assigned timestamp and fans out
    /// `MessageReceived` plus the other side's new unread count. Fails
    /// before persisting anything when delivery is unavailable.
    pub async fn publish(
        &self,
        actor: AuthUser,
        channel_id: Uuid,
        content: String,
    ) -> Result<ChatMessage> {
        let app = self.channel_application(channel_id).await?;
        check_participant(&app, actor)?;

        let sender = self.hub.sender(channel_id)?;

        let sender_name: (String,) = sqlx::query_as("SELECT name FROM users WHERE id = ?")
            .bind(actor.id)
            .fetch_one(&self.pool)
            .await?;

        let message = sqlx::query_as::<_, ChatMessage>(
            r#"
            INSERT INTO chat_messages (id, channel_id, sender_id, sender_name, content, sent_at)
            VALUES (?, ?, ?, ?, ?, ?)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(channel_id)
        .bind(actor.id)
        .bind(&sender_name.0)
        .bind(&content)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await?;

        let recipient = other_participant(&app, actor.id);
        let unread = self.count_unread(channel_id, recipient).await?;

        // A send error only means nobody is subscribed right now.
        let _ = sender.send(ChatEvent::MessageReceived(message.clone()));
        let _ = sender.send(ChatEvent::UnreadCountChanged {
            participant_id: recipient,
            unread,
        });

        Ok(message)
    }

    /// Full history in send order. Stays reachable by channel id even
    /// after either party hides the application from their lists.
    pub async fn history(&self, actor: AuthUser, channel_id: Uuid) -> Result<Vec<ChatMessage>> {
        let app = self.channel_application(channel_id).await?;
        check_participant(&app, actor)?;

        let messages = sqlx::query_as::<_, ChatMessage>(
            r#"
            SELECT * FROM chat_messages
            WHERE channel_id = ?
            ORDER BY sent_at ASC, rowid ASC
            "#,
        )
        .bind(channel_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(messages)
    }

    pub async fn unread_count(&self, actor: AuthUser, channel_id: Uuid) -> Result<i64> {
        let app = self.channel_application(channel_id).await?;
        check_participant(&app, actor)?;
        self.count_unread(channel_id, actor.id).await
    }

    /// Moves the caller's read cursor to now. The guard keeps the cursor
    /// monotonic: a stale call never moves it backward.
    pub async fn mark_read(&self, actor: AuthUser, channel_id: Uuid) -> Result<()> {
        let app = self.channel_application(channel_id).await?;
        check_participant(&app, actor)?;

        sqlx::query(
            r#"
            INSERT INTO chat_reads (channel_id, participant_id, last_read_at)
            VALUES (?, ?, ?)
            ON CONFLICT (channel_id, participant_id)
            DO UPDATE SET last_read_at = excluded.last_read_at
            WHERE excluded.last_read_at > chat_reads.last_read_at
            "#,
        )
        .bind(channel_id)
        .bind(actor.id)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        if let Ok(sender) = self.hub.sender(channel_id) {
            let _ = sender.send(ChatEvent::UnreadCountChanged {
                participant_id: actor.id,
                unread: 0,
            });
        }

        Ok(())
    }

    /// Typed event stream for one channel; the presentation layer reacts
    /// to these instead of owning a socket callback.
    pub async fn subscribe(
        &self,
        actor: AuthUser,
        channel_id: Uuid,
    ) -> Result<broadcast::Receiver<ChatEvent>> {
        let app = self.channel_application(channel_id).await?;
        check_participant(&app, actor)?;
        Ok(self.hub.sender(channel_id)?.subscribe())
    }

    /// Display name of the other side of the conversation.
    pub async fn partner_name(&self, actor: AuthUser, channel_id: Uuid) -> Result<String> {
        let app = self.channel_application(channel_id).await?;
        check_participant(&app, actor)?;

        let partner = other_participant(&app, actor.id);
        let row: (String,) = sqlx::query_as("SELECT name FROM users WHERE id = ?")
            .bind(partner)
            .fetch_one(&self.pool)
            .await?;
        Ok(row.0)
    }

    async fn application(&self, application_id: Uuid) -> Result<Application> {
        sqlx::query_as::<_, Application>("SELECT * FROM applications WHERE id = ?")
            .bind(application_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| Error::NotFound("Application not found".to_string()))
    }

    async fn channel_application(&self, channel_id: Uuid) -> Result<Application> {
        sqlx::query_as::<_, Application>("SELECT * FROM applications WHERE chat_id = ?")
            .bind(channel_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| Error::NotFound("Chat channel not found".to_string()))
    }

    async fn count_unread(&self, channel_id: Uuid, participant_id: Uuid) -> Result<i64> {
        let count: (i64,) = sqlx::query_as(
            r#"
            SELECT COUNT(*) FROM chat_messages
            WHERE channel_id = ? AND sender_id <> ?
              AND sent_at > COALESCE(
                  (SELECT last_read_at FROM chat_reads
                   WHERE channel_id = ? AND participant_id = ?),
                  '')
            "#,
        )
        .bind(channel_id)
        .bind(participant_id)
        .bind(channel_id)
        .bind(participant_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(count.0)
    }
}

fn check_participant(app: &Application, actor: AuthUser) -> Result<()> {
    if app.seeker_id == actor.id || app.provider_id == actor.id {
        Ok(())
    } else {
        Err(Error::Forbidden(
            "you are not a participant in this chat".to_string(),
        ))
    }
}

fn other_participant(app: &Application, me: Uuid) -> Uuid {
    if app.seeker_id == me {
        app.provider_id
    } else {
        app.seeker_id
    }
}
