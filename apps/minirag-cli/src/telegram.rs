//! Telegram bot over the Bot API with long polling.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{Context, Result, bail};
use minirag_core::ports::{ChunkStore, CompletionClient, Embedder};
use minirag_core::services::RagPipeline;
use minirag_core::{Pipeline, Runtime, SessionHistory};
use serde::Deserialize;
use tokio::sync::Mutex as AsyncMutex;

use crate::replies::{self, Command};

const RETRY_DELAY: Duration = Duration::from_secs(5);

#[derive(Debug, Deserialize)]
struct ApiResponse<T> {
    ok: bool,
    result: Option<T>,
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Update {
    update_id: i64,
    message: Option<Message>,
}

#[derive(Debug, Deserialize)]
struct Message {
    chat: Chat,
    from: Option<User>,
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Chat {
    id: i64,
}

#[derive(Debug, Deserialize)]
struct User {
    id: i64,
}

struct BotApi {
    client: reqwest::Client,
    token: String,
    poll_timeout_secs: u64,
}

impl BotApi {
    fn new(token: String, poll_timeout_secs: u64) -> Result<Self> {
        // The HTTP timeout has to outlast the server-side long poll.
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(poll_timeout_secs + 10))
            .build()?;
        Ok(Self {
            client,
            token,
            poll_timeout_secs,
        })
    }

    fn url(&self, method: &str) -> String {
        format!("https://api.telegram.org/bot{}/{method}", self.token)
    }

    async fn get_updates(&self, offset: i64) -> Result<Vec<Update>> {
        let body: ApiResponse<Vec<Update>> = self
            .client
            .get(self.url("getUpdates"))
            .query(&[
                ("offset", offset.to_string()),
                ("timeout", self.poll_timeout_secs.to_string()),
                ("allowed_updates", "[\"message\"]".to_string()),
            ])
            .send()
            .await
            .context("Telegram getUpdates failed")?
            .json()
            .await
            .context("invalid Telegram response")?;
        into_result(body)
    }

    async fn send_message(&self, chat_id: i64, text: &str) -> Result<()> {
        let body: ApiResponse<serde_json::Value> = self
            .client
            .post(self.url("sendMessage"))
            .json(&serde_json::json!({ "chat_id": chat_id, "text": text }))
            .send()
            .await
            .context("Telegram sendMessage failed")?
            .json()
            .await
            .context("invalid Telegram response")?;
        into_result(body).map(|_| ())
    }
}

fn into_result<T>(body: ApiResponse<T>) -> Result<T> {
    if !body.ok {
        bail!("Telegram API error: {}", body.description.unwrap_or_default());
    }
    body.result.context("Telegram response had no result")
}

/// Histories keyed by Telegram user id, owned by the bot.
///
/// Each user's history sits behind its own async lock, held for the whole
/// exchange, so concurrent messages from one user are answered in turn and
/// every turn is recorded.
#[derive(Clone)]
struct Sessions {
    inner: Arc<Mutex<HashMap<i64, Arc<AsyncMutex<SessionHistory>>>>>,
    max_turns: usize,
}

impl Sessions {
    fn new(max_turns: usize) -> Self {
        Self {
            inner: Arc::new(Mutex::new(HashMap::new())),
            max_turns,
        }
    }

    fn for_user(&self, user_id: i64) -> Arc<AsyncMutex<SessionHistory>> {
        let mut sessions = self.inner.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        Arc::clone(
            sessions
                .entry(user_id)
                .or_insert_with(|| Arc::new(AsyncMutex::new(SessionHistory::new(self.max_turns)))),
        )
    }

    async fn converse<S, E, C>(
        &self,
        pipeline: &RagPipeline<S, E, C>,
        user_id: i64,
        command: Command,
    ) -> String
    where
        S: ChunkStore,
        E: Embedder,
        C: CompletionClient,
    {
        let session = self.for_user(user_id);
        let mut history = session.lock().await;
        replies::handle(pipeline, &mut history, command).await
    }
}

pub async fn run(runtime: &Runtime) -> Result<()> {
    let token = runtime
        .config
        .telegram
        .bot_token
        .clone()
        .filter(|t| !t.is_empty())
        .ok_or(minirag_core::RagError::MissingCredential("TELEGRAM_BOT_TOKEN"))?;

    runtime.index_on_start().await;

    let api = Arc::new(BotApi::new(token, runtime.config.telegram.poll_timeout_secs)?);
    let sessions = Sessions::new(runtime.config.session.history_turns);
    let mut offset = 0;

    tracing::info!("Bot starting...");
    loop {
        let updates = match api.get_updates(offset).await {
            Ok(updates) => updates,
            Err(e) => {
                tracing::error!("Telegram polling error: {e:#}");
                tokio::time::sleep(RETRY_DELAY).await;
                continue;
            }
        };

        for update in updates {
            offset = offset.max(update.update_id + 1);
            let Some(message) = update.message else { continue };
            let Some(command) = message.text.as_deref().and_then(Command::parse) else {
                continue;
            };
            let user_id = message.from.as_ref().map_or(message.chat.id, |u| u.id);

            let api = Arc::clone(&api);
            let pipeline = Arc::clone(&runtime.pipeline);
            let sessions = sessions.clone();
            tokio::spawn(async move {
                let chat_id = message.chat.id;
                if let Err(e) = respond(&api, &pipeline, &sessions, chat_id, user_id, command).await {
                    tracing::warn!(chat_id, "failed to reply: {e:#}");
                }
            });
        }
    }
}

async fn respond(
    api: &BotApi,
    pipeline: &Pipeline,
    sessions: &Sessions,
    chat_id: i64,
    user_id: i64,
    command: Command,
) -> Result<()> {
    if matches!(&command, Command::Ask(q) if !q.is_empty()) {
        api.send_message(chat_id, "Thinking… retrieving relevant info from docs...")
            .await?;
    }

    let reply = sessions.converse(pipeline, user_id, command).await;
    api.send_message(chat_id, &reply).await
}
