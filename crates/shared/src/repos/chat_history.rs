use chrono::{DateTime, Utc};
use sqlx::Row;

use crate::models::TurnRole;

use super::{ConversationStore, Store, StoreError, StoreFuture};

const INSERT_TURN_SQL: &str = "INSERT INTO chat_history (user_id, role, message, timestamp)
     VALUES ($1, $2, $3, $4)";

/// One persisted turn as read back for prompt assembly.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatTurn {
    pub role: TurnRole,
    pub message: String,
    pub timestamp: DateTime<Utc>,
}

/// One turn about to be persisted.
#[derive(Debug, Clone)]
pub struct NewChatTurn {
    pub user_id: String,
    pub role: TurnRole,
    pub message: String,
    pub timestamp: DateTime<Utc>,
}

impl ConversationStore for Store {
    fn append(&self, turn: NewChatTurn) -> StoreFuture<'_, ()> {
        Box::pin(async move {
            sqlx::query(INSERT_TURN_SQL)
                .bind(&turn.user_id)
                .bind(role_to_db(turn.role))
                .bind(&turn.message)
                .bind(turn.timestamp)
                .execute(self.pool())
                .await?;

            Ok(())
        })
    }

    fn append_exchange(&self, question: NewChatTurn, answer: NewChatTurn) -> StoreFuture<'_, ()> {
        Box::pin(async move {
            let mut tx = self.pool().begin().await?;

            for turn in [&question, &answer] {
                sqlx::query(INSERT_TURN_SQL)
                    .bind(&turn.user_id)
                    .bind(role_to_db(turn.role))
                    .bind(&turn.message)
                    .bind(turn.timestamp)
                    .execute(&mut *tx)
                    .await?;
            }

            tx.commit().await?;
            Ok(())
        })
    }

    fn history(&self, user_id: String) -> StoreFuture<'_, Vec<ChatTurn>> {
        Box::pin(async move {
            // Secondary sort on id keeps a question/answer pair ordered even
            // when both turns carry the same timestamp.
            let rows = sqlx::query(
                "SELECT role, message, timestamp
                 FROM chat_history
                 WHERE user_id = $1
                 ORDER BY timestamp ASC, id ASC",
            )
            .bind(&user_id)
            .fetch_all(self.pool())
            .await?;

            rows.into_iter()
                .map(|row| {
                    let role_raw: String = row.try_get("role")?;

                    Ok(ChatTurn {
                        role: role_from_db(&role_raw)?,
                        message: row.try_get("message")?,
                        timestamp: row.try_get("timestamp")?,
                    })
                })
                .collect()
        })
    }

    fn ping(&self) -> StoreFuture<'_, ()> {
        Box::pin(async move {
            let _: i32 = sqlx::query_scalar("SELECT 1")
                .fetch_one(self.pool())
                .await?;
            Ok(())
        })
    }
}

fn role_to_db(role: TurnRole) -> &'static str {
    match role {
        TurnRole::Human => "human",
        TurnRole::Ai => "ai",
    }
}

fn role_from_db(value: &str) -> Result<TurnRole, StoreError> {
    match value {
        "human" => Ok(TurnRole::Human),
        "ai" => Ok(TurnRole::Ai),
        _ => Err(StoreError::InvalidData(format!(
            "unknown turn role persisted: {value}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_db_mapping_round_trips() {
        for role in [TurnRole::Human, TurnRole::Ai] {
            let persisted = role_to_db(role);
            let restored = role_from_db(persisted).expect("persisted role should map back");
            assert_eq!(restored, role);
        }
    }

    #[test]
    fn unknown_persisted_role_is_invalid_data() {
        let err = role_from_db("system").expect_err("unknown role should be rejected");
        assert!(matches!(err, StoreError::InvalidData(_)));
    }
}
