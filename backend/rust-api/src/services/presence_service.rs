use chrono::{Duration, Utc};
use futures::stream::TryStreamExt;
use mongodb::bson::doc;
use mongodb::{Collection, Database};
use redis::aio::ConnectionManager;
use std::collections::HashSet;

use crate::error::ApiError;
use crate::metrics::HEARTBEATS_TOTAL;
use crate::models::{Duel, DuelStatus, ACTIVITY_STALENESS_SECONDS, DUEL_LENGTH};
use crate::utils::time::chrono_to_bson;

/// A heartbeat older than this is not trusted, regardless of the online flag.
pub const FRESHNESS_WINDOW_SECONDS: i64 = 300;

const HEARTBEAT_ZSET: &str = "presence:heartbeats";

fn online_key(user_id: &str) -> String {
    format!("presence:online:{}", user_id)
}

/// Liveness of candidate opponents, derived from heartbeats and duel
/// occupancy. A stale heartbeat simply ages out; there is no error path.
pub struct PresenceService {
    mongo: Database,
    redis: ConnectionManager,
}

impl PresenceService {
    pub fn new(mongo: Database, redis: ConnectionManager) -> Self {
        Self { mongo, redis }
    }

    fn duels(&self) -> Collection<Duel> {
        self.mongo.collection("duels")
    }

    pub async fn heartbeat(&self, user_id: &str) -> Result<(), ApiError> {
        let mut conn = self.redis.clone();
        let now = Utc::now().timestamp();

        redis::cmd("ZADD")
            .arg(HEARTBEAT_ZSET)
            .arg(now)
            .arg(user_id)
            .query_async::<()>(&mut conn)
            .await?;

        redis::cmd("SET")
            .arg(online_key(user_id))
            .arg(1)
            .query_async::<()>(&mut conn)
            .await?;

        // Opportunistic trim of entries nobody can match anymore.
        redis::cmd("ZREMRANGEBYSCORE")
            .arg(HEARTBEAT_ZSET)
            .arg(0)
            .arg(now - 86_400)
            .query_async::<()>(&mut conn)
            .await?;

        HEARTBEATS_TOTAL.inc();
        Ok(())
    }

    /// Users who are live (online flag set AND heartbeat within the freshness
    /// window) and not inside a genuinely active duel. A duel whose
    /// participants vanished mid-game stops blocking them once its last
    /// action falls outside the staleness window.
    pub async fn list_available_opponents(
        &self,
        exclude_user_id: &str,
    ) -> Result<Vec<String>, ApiError> {
        let mut conn = self.redis.clone();
        let cutoff = Utc::now().timestamp() - FRESHNESS_WINDOW_SECONDS;

        let fresh: Vec<String> = redis::cmd("ZRANGEBYSCORE")
            .arg(HEARTBEAT_ZSET)
            .arg(cutoff)
            .arg("+inf")
            .query_async(&mut conn)
            .await?;

        let mut candidates: Vec<String> = fresh
            .into_iter()
            .filter(|u| u != exclude_user_id)
            .collect();
        if candidates.is_empty() {
            return Ok(Vec::new());
        }

        // The flag alone is not authoritative, but a fresh heartbeat without
        // the flag means the user went explicitly offline.
        let mut mget = redis::cmd("MGET");
        for user in &candidates {
            mget.arg(online_key(user));
        }
        let flags: Vec<Option<String>> = mget.query_async(&mut conn).await?;
        candidates = candidates
            .into_iter()
            .zip(flags)
            .filter_map(|(user, flag)| flag.map(|_| user))
            .collect();
        if candidates.is_empty() {
            return Ok(Vec::new());
        }

        let busy = self.users_in_active_duels(&candidates).await?;
        let mut available: Vec<String> = candidates
            .into_iter()
            .filter(|u| !busy.contains(u))
            .collect();
        available.sort();
        Ok(available)
    }

    async fn users_in_active_duels(
        &self,
        candidates: &[String],
    ) -> Result<HashSet<String>, ApiError> {
        let activity_cutoff =
            chrono_to_bson(Utc::now() - Duration::seconds(ACTIVITY_STALENESS_SECONDS));

        let mut cursor = self
            .duels()
            .find(doc! {
                "status": DuelStatus::Active.as_str(),
                "current_index": { "$lt": DUEL_LENGTH },
                "last_action_at": { "$gte": activity_cutoff },
                "$or": [
                    { "participant_a": { "$in": candidates } },
                    { "participant_b": { "$in": candidates } },
                ],
            })
            .await?;

        let mut busy = HashSet::new();
        while let Some(duel) = cursor.try_next().await? {
            busy.insert(duel.participant_a);
            busy.insert(duel.participant_b);
        }
        Ok(busy)
    }
}
