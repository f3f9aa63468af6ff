use chrono::{DateTime, Utc};
use mongodb::bson::DateTime as BsonDateTime;
use serde::{Deserialize, Serialize};

use crate::utils::time::chrono_to_bson;

pub const SKILL_MIN: i32 = 1;
pub const SKILL_MAX: i32 = 100;
pub const SKILL_DEFAULT: i32 = 50;

/// EWMA smoothing factor: weight of the most recent session's accuracy.
pub const SKILL_SMOOTHING: f64 = 0.25;

/// Per (user, topic) adaptive state. One row, created lazily on first read.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SkillRecord {
    #[serde(rename = "_id")]
    pub id: String,
    pub user_id: String,
    pub topic: String,
    pub score: i32,
    pub updated_at: BsonDateTime,
}

impl SkillRecord {
    pub fn record_id(user_id: &str, topic: &str) -> String {
        format!("{}:{}", user_id, topic)
    }

    pub fn default_for(user_id: &str, topic: &str, now: DateTime<Utc>) -> Self {
        Self {
            id: Self::record_id(user_id, topic),
            user_id: user_id.to_string(),
            topic: topic.to_string(),
            score: SKILL_DEFAULT,
            updated_at: chrono_to_bson(now),
        }
    }
}

/// Exponentially-weighted update pulling the score toward the session's
/// accuracy. A session with no scored answers leaves the score unchanged.
pub fn next_score(old_score: i32, correct_count: u32, total_count: u32) -> i32 {
    if total_count == 0 {
        return old_score;
    }
    let accuracy = 100.0 * f64::from(correct_count) / f64::from(total_count);
    let blended = f64::from(old_score) * (1.0 - SKILL_SMOOTHING) + accuracy * SKILL_SMOOTHING;
    (blended.round() as i32).clamp(SKILL_MIN, SKILL_MAX)
}

#[derive(Debug, Serialize)]
pub struct SkillResponse {
    pub user_id: String,
    pub topic: String,
    pub score: i32,
    pub band: crate::models::Difficulty,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_total_is_a_no_op() {
        assert_eq!(next_score(50, 0, 0), 50);
        assert_eq!(next_score(87, 0, 0), 87);
    }

    #[test]
    fn perfect_session_from_default() {
        // round(50 * 0.75 + 100 * 0.25) = 63
        assert_eq!(next_score(50, 10, 10), 63);
    }

    #[test]
    fn pulls_toward_accuracy_from_both_sides() {
        assert!(next_score(50, 10, 10) > 50);
        assert!(next_score(50, 0, 10) < 50);
        assert!(next_score(80, 5, 10) < 80);
    }

    #[test]
    fn score_stays_in_bounds() {
        assert_eq!(next_score(1, 0, 10), 1);
        assert!(next_score(100, 10, 10) <= 100);
        assert!(next_score(2, 0, 10) >= 1);
    }
}
