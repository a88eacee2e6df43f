use std::future::Future;
use std::pin::Pin;

use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

mod chat_history;

pub use chat_history::{ChatTurn, NewChatTurn};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("invalid persisted data: {0}")]
    InvalidData(String),
}

pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, StoreError>> + Send + 'a>>;

/// Persistence seam for the conversation log. The request handler only sees
/// this trait, so tests substitute an in-memory double for the Postgres
/// `Store`.
pub trait ConversationStore: Send + Sync {
    /// Inserts one turn. No uniqueness constraint, no upsert.
    fn append(&self, turn: NewChatTurn) -> StoreFuture<'_, ()>;

    /// Inserts a question/answer pair as a single unit: either both turns
    /// become visible or neither does.
    fn append_exchange(&self, question: NewChatTurn, answer: NewChatTurn) -> StoreFuture<'_, ()>;

    /// All turns for the user, ascending by timestamp. Empty for an unknown
    /// user. Unbounded.
    fn history(&self, user_id: String) -> StoreFuture<'_, Vec<ChatTurn>>;

    fn ping(&self) -> StoreFuture<'_, ()>;
}

#[derive(Clone)]
pub struct Store {
    pool: PgPool,
}

impl Store {
    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self, sqlx::Error> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await?;

        Ok(Self { pool })
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}
