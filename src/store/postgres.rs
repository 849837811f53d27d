//! PostgreSQL state store.

use std::time::Duration;

use serenity::async_trait;
use serenity::model::id::{ChannelId, GuildId, MessageId, RoleId};
use sqlx::postgres::{PgPool, PgPoolOptions};
use tracing::{debug, info};

use crate::common::error::{StoreError, StoreResult};
use crate::config::types::DatabaseConfig;
use crate::store::{CountingState, ReactionRoleBinding, StateStore};

const CREATE_COUNTING_TABLE: &str = r#"
    CREATE TABLE IF NOT EXISTS counting (
        id INTEGER PRIMARY KEY,
        channel_id TEXT,
        next_number INTEGER
    )
"#;

// The emoji key column keeps its deployed name.
const CREATE_REACTION_ROLES_TABLE: &str = r#"
    CREATE TABLE IF NOT EXISTS reaction_roles (
        id SERIAL PRIMARY KEY,
        guild_id TEXT NOT NULL,
        message_id TEXT NOT NULL,
        channel_id TEXT NOT NULL,
        emoji_name TEXT NOT NULL,
        role_id TEXT NOT NULL,
        UNIQUE (message_id, emoji_name)
    )
"#;

/// Store backed by a small Postgres pool.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub async fn connect(config: &DatabaseConfig) -> StoreResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(Duration::from_secs(config.connect_timeout_secs))
            .connect(&config.url)
            .await?;
        info!("PostgreSQL database connected");
        Ok(Self { pool })
    }

    pub async fn ensure_schema(&self) -> StoreResult<()> {
        sqlx::query(CREATE_COUNTING_TABLE).execute(&self.pool).await?;
        sqlx::query(CREATE_REACTION_ROLES_TABLE)
            .execute(&self.pool)
            .await?;
        info!("Database tables ensured");
        Ok(())
    }
}

fn parse_snowflake(field: &'static str, value: &str) -> StoreResult<u64> {
    value
        .parse::<u64>()
        .ok()
        .filter(|id| *id != 0)
        .ok_or_else(|| StoreError::Corrupt {
            field,
            value: value.to_string(),
        })
}

#[async_trait]
impl StateStore for PgStore {
    async fn load_counting(&self) -> StoreResult<CountingState> {
        let row: Option<(Option<String>, Option<i32>)> =
            sqlx::query_as("SELECT channel_id, next_number FROM counting WHERE id = 1")
                .fetch_optional(&self.pool)
                .await?;

        let Some((channel_id, next_number)) = row else {
            sqlx::query(
                "INSERT INTO counting (id, channel_id, next_number) VALUES (1, NULL, 1) ON CONFLICT (id) DO NOTHING",
            )
            .execute(&self.pool)
            .await?;
            debug!("Created default counting row");
            return Ok(CountingState::default());
        };

        let active_channel = match channel_id.as_deref() {
            Some("") | None => None,
            Some(value) => Some(ChannelId::new(parse_snowflake("counting.channel_id", value)?)),
        };
        let next_expected = next_number
            .and_then(|n| u32::try_from(n).ok())
            .filter(|n| *n >= 1)
            .unwrap_or(1);

        Ok(CountingState {
            active_channel,
            next_expected,
        })
    }

    async fn save_counting(&self, state: &CountingState) -> StoreResult<()> {
        let next_number = i32::try_from(state.next_expected).map_err(|_| StoreError::Corrupt {
            field: "counting.next_number",
            value: state.next_expected.to_string(),
        })?;

        sqlx::query(
            r#"
            INSERT INTO counting (id, channel_id, next_number)
            VALUES (1, $1, $2)
            ON CONFLICT (id) DO UPDATE SET channel_id = $1, next_number = $2
            "#,
        )
        .bind(state.active_channel.map(|id| id.to_string()))
        .bind(next_number)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn upsert_binding(&self, binding: &ReactionRoleBinding) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO reaction_roles (guild_id, message_id, channel_id, emoji_name, role_id)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (message_id, emoji_name) DO UPDATE SET role_id = $5
            "#,
        )
        .bind(binding.guild_id.to_string())
        .bind(binding.message_id.to_string())
        .bind(binding.channel_id.to_string())
        .bind(&binding.emoji_key)
        .bind(binding.role_id.to_string())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn find_binding_role(
        &self,
        guild_id: GuildId,
        message_id: MessageId,
        emoji_key: &str,
    ) -> StoreResult<Option<RoleId>> {
        let role: Option<String> = sqlx::query_scalar(
            "SELECT role_id FROM reaction_roles WHERE message_id = $1 AND emoji_name = $2 AND guild_id = $3",
        )
        .bind(message_id.to_string())
        .bind(emoji_key)
        .bind(guild_id.to_string())
        .fetch_optional(&self.pool)
        .await?;

        role.map(|value| parse_snowflake("reaction_roles.role_id", &value).map(RoleId::new))
            .transpose()
    }

    async fn delete_bindings_for_message(
        &self,
        guild_id: GuildId,
        message_id: MessageId,
    ) -> StoreResult<u64> {
        let result = sqlx::query("DELETE FROM reaction_roles WHERE message_id = $1 AND guild_id = $2")
            .bind(message_id.to_string())
            .bind(guild_id.to_string())
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}
