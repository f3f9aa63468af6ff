use chrono::{Duration, Utc};
use futures::stream::TryStreamExt;
use mongodb::bson::{doc, Bson};
use mongodb::options::ReturnDocument;
use mongodb::{Collection, Database};
use std::sync::Arc;
use uuid::Uuid;

use crate::error::ApiError;
use crate::metrics::{record_answer_outcome, record_duel_event, DUELS_ACTIVE};
use crate::models::{
    terminal_status_for, AnswerOutcome, Duel, DuelQuestion, DuelQuestionView, DuelStateView,
    DuelStatus, DuelSummaryView, DuelView, PendingChallengeView, PollDirective,
    SubmitDuelAnswerResponse, CHALLENGE_TTL_SECONDS, DUEL_LENGTH,
};
use crate::services::question_provider::QuestionProvider;
use crate::services::reward_hooks::RewardHooks;
use crate::services::seen_filter::SeenFilter;
use crate::services::skill_service::SkillService;
use crate::utils::retry::{retry_async_with_config, RetryConfig};
use crate::utils::time::{bson_to_chrono, chrono_to_bson};

/// The duel state machine: creation, acceptance, per-question answer
/// arbitration, finalization. All coordination between the two polling
/// participants happens through conditional updates on the store; no
/// in-process shared state exists between them.
pub struct DuelService {
    mongo: Database,
    provider: Arc<dyn QuestionProvider>,
    hooks: Arc<dyn RewardHooks>,
}

impl DuelService {
    pub fn new(
        mongo: Database,
        provider: Arc<dyn QuestionProvider>,
        hooks: Arc<dyn RewardHooks>,
    ) -> Self {
        Self {
            mongo,
            provider,
            hooks,
        }
    }

    fn duels(&self) -> Collection<Duel> {
        self.mongo.collection("duels")
    }

    fn questions(&self) -> Collection<DuelQuestion> {
        self.mongo.collection("duel_questions")
    }

    /// Insert a pending duel. Question generation is deferred to acceptance
    /// so declined or expired challenges cost nothing.
    pub async fn create_challenge(
        &self,
        challenger_id: &str,
        opponent_id: &str,
        topic: &str,
    ) -> Result<String, ApiError> {
        if challenger_id == opponent_id {
            return Err(ApiError::bad_request("cannot challenge yourself"));
        }

        let now = chrono_to_bson(Utc::now());
        let duel = Duel {
            id: Uuid::new_v4().to_string(),
            participant_a: challenger_id.to_string(),
            participant_b: opponent_id.to_string(),
            topic: topic.to_string(),
            status: DuelStatus::Pending,
            score_a: 0,
            score_b: 0,
            current_index: 0,
            created_at: now,
            last_action_at: now,
            finished_at: None,
        };
        self.duels().insert_one(&duel).await?;

        record_duel_event("created");
        tracing::info!(
            "Challenge created: {} ({} vs {} on {})",
            duel.id,
            challenger_id,
            opponent_id,
            topic
        );
        Ok(duel.id)
    }

    /// Newest pending challenge targeting `opponent_id` that is still inside
    /// the TTL window. Older pendings read as already expired; no write.
    pub async fn get_pending_challenge(
        &self,
        opponent_id: &str,
    ) -> Result<Option<PendingChallengeView>, ApiError> {
        let cutoff = Utc::now() - Duration::seconds(CHALLENGE_TTL_SECONDS);
        let found = retry_async_with_config(RetryConfig::default(), || async {
            self.duels()
                .find_one(doc! {
                    "participant_b": opponent_id,
                    "status": DuelStatus::Pending.as_str(),
                    "created_at": { "$gte": chrono_to_bson(cutoff) },
                })
                .sort(doc! { "created_at": -1 })
                .await
        })
        .await?;

        Ok(found.map(|duel| {
            let created_at = bson_to_chrono(duel.created_at);
            PendingChallengeView {
                duel_id: duel.id,
                challenger_id: duel.participant_a,
                topic: duel.topic,
                created_at,
                expires_at: created_at + Duration::seconds(CHALLENGE_TTL_SECONDS),
            }
        }))
    }

    /// Two-phase accept. Phase 1 is a narrow conditional status flip so the
    /// accepting client never waits on question generation; phase 2
    /// provisions the ten question rows idempotently.
    pub async fn accept_challenge(&self, duel_id: &str) -> Result<DuelStateView, ApiError> {
        let now = Utc::now();
        let ttl_cutoff = chrono_to_bson(now - Duration::seconds(CHALLENGE_TTL_SECONDS));

        let flipped = self
            .duels()
            .find_one_and_update(
                doc! {
                    "_id": duel_id,
                    "status": DuelStatus::Pending.as_str(),
                    "created_at": { "$gte": ttl_cutoff },
                },
                doc! { "$set": {
                    "status": DuelStatus::Active.as_str(),
                    "last_action_at": chrono_to_bson(now),
                }},
            )
            .return_document(ReturnDocument::After)
            .await?;

        let duel = match flipped {
            Some(duel) => {
                record_duel_event("accepted");
                DUELS_ACTIVE.inc();
                tracing::info!("Challenge accepted: {}", duel.id);
                duel
            }
            None => {
                let duel = self
                    .duels()
                    .find_one(doc! { "_id": duel_id })
                    .await?
                    .ok_or_else(|| ApiError::not_found("duel not found"))?;
                match duel.status {
                    // Lost the accept race; provisioning below is idempotent,
                    // so finishing the other accepter's work is harmless.
                    DuelStatus::Active => duel,
                    DuelStatus::Pending => {
                        return Err(ApiError::conflict("challenge has expired"))
                    }
                    _ => return Err(ApiError::conflict("duel is not pending")),
                }
            }
        };

        self.ensure_questions(&duel).await?;
        self.get_duel_state(duel_id, None).await
    }

    /// Provision exactly `DUEL_LENGTH` question rows. Slots that already
    /// exist are skipped, so a re-accept heals a provisioning run that died
    /// partway. Deterministic row ids turn concurrent provisioning into
    /// duplicate-key no-ops, so a double accept can never write 20 rows.
    async fn ensure_questions(&self, duel: &Duel) -> Result<(), ApiError> {
        let mut existing = std::collections::HashSet::new();
        let mut cursor = self
            .questions()
            .find(doc! { "duel_id": &duel.id })
            .await?;
        while let Some(row) = cursor.try_next().await? {
            existing.insert(row.index);
        }
        if existing.len() >= DUEL_LENGTH as usize {
            tracing::debug!("Questions already provisioned for duel {}", duel.id);
            return Ok(());
        }

        let skill = SkillService::new(self.mongo.clone());
        let band = skill
            .band_for_pair(&duel.participant_a, &duel.participant_b, &duel.topic)
            .await?;

        // Seen-set bookkeeping runs against the challenger so solo play does
        // not re-serve this duel's content to them later.
        let seen = SeenFilter::new(self.mongo.clone());
        for index in 0..DUEL_LENGTH {
            if existing.contains(&index) {
                continue;
            }
            let question = seen
                .provision_unseen(
                    self.provider.as_ref(),
                    &duel.participant_a,
                    &duel.topic,
                    band,
                )
                .await?;

            let row = DuelQuestion {
                id: DuelQuestion::row_id(&duel.id, index),
                duel_id: duel.id.clone(),
                index,
                question,
                answered_by: None,
                is_correct: None,
                answered_at: None,
            };
            match self.questions().insert_one(&row).await {
                Ok(_) => {}
                Err(e) if crate::utils::mongo::is_duplicate_key(&e) => {
                    tracing::debug!("Slot {} of duel {} provisioned concurrently", index, duel.id);
                }
                Err(e) => return Err(e.into()),
            }
        }

        tracing::info!(
            "Provisioned {} questions for duel {} at band {}",
            DUEL_LENGTH,
            duel.id,
            band.as_str()
        );
        Ok(())
    }

    /// The single read every client poll is built on: the duel row plus, when
    /// active, the question row at the current index. A missing question row
    /// during the provisioning window is reported, not treated as an error.
    /// `viewer` feeds the poll directive; the challenged side of a pending
    /// duel is prompted to accept rather than to wait.
    pub async fn get_duel_state(
        &self,
        duel_id: &str,
        viewer: Option<&str>,
    ) -> Result<DuelStateView, ApiError> {
        let duel = retry_async_with_config(RetryConfig::default(), || async {
            self.duels().find_one(doc! { "_id": duel_id }).await
        })
        .await?
        .ok_or_else(|| ApiError::not_found("no active duel"))?;

        let status = duel.effective_status(Utc::now());
        let question = if status == DuelStatus::Active && duel.current_index < DUEL_LENGTH {
            self.questions()
                .find_one(doc! { "_id": DuelQuestion::row_id(&duel.id, duel.current_index) })
                .await?
        } else {
            None
        };

        let viewer_is_opponent = viewer == Some(duel.participant_b.as_str());
        let next = PollDirective::for_state(
            status,
            question.as_ref().map(|q| q.answered_by.is_some()),
            viewer_is_opponent,
        );
        Ok(DuelStateView {
            duel: DuelView::from_row(&duel, status),
            question: question.as_ref().map(DuelQuestionView::from_row),
            next,
        })
    }

    /// Full post-game projection: duel plus every question row in order.
    pub async fn get_duel_summary(&self, duel_id: &str) -> Result<DuelSummaryView, ApiError> {
        let duel = self
            .duels()
            .find_one(doc! { "_id": duel_id })
            .await?
            .ok_or_else(|| ApiError::not_found("no active duel"))?;

        let mut cursor = self
            .questions()
            .find(doc! { "duel_id": duel_id })
            .sort(doc! { "index": 1 })
            .await?;
        let mut questions = Vec::new();
        while let Some(row) = cursor.try_next().await? {
            questions.push(DuelQuestionView::from_row(&row));
        }

        let status = duel.effective_status(Utc::now());
        Ok(DuelSummaryView {
            duel: DuelView::from_row(&duel, status),
            questions,
        })
    }

    /// Race arbitration. The conditional update on `answered_by` is the sole
    /// tiebreak: whichever submission commits first claims the slot, the
    /// other gets a race-lost result and changes nothing. Deliberately not
    /// wrapped in retries.
    pub async fn submit_answer(
        &self,
        duel_id: &str,
        participant_id: &str,
        question_index: i32,
        correct: bool,
    ) -> Result<SubmitDuelAnswerResponse, ApiError> {
        let duel = self
            .duels()
            .find_one(doc! { "_id": duel_id })
            .await?
            .ok_or_else(|| ApiError::not_found("no active duel"))?;

        if !duel.is_participant(participant_id) {
            return Err(ApiError::bad_request("not a participant of this duel"));
        }
        if duel.status != DuelStatus::Active {
            return Err(ApiError::conflict("duel is not active"));
        }
        if question_index < 0 || question_index >= DUEL_LENGTH {
            return Err(ApiError::bad_request("question index out of range"));
        }
        if question_index > duel.current_index {
            return Err(ApiError::bad_request("question not yet presented"));
        }

        let now = Utc::now();
        let claimed = self
            .questions()
            .find_one_and_update(
                doc! {
                    "_id": DuelQuestion::row_id(duel_id, question_index),
                    "answered_by": Bson::Null,
                },
                doc! { "$set": {
                    "answered_by": participant_id,
                    "is_correct": correct,
                    "answered_at": chrono_to_bson(now),
                }},
            )
            .return_document(ReturnDocument::After)
            .await?;

        if claimed.is_none() {
            return self
                .race_lost_response(duel_id, participant_id, question_index, &duel)
                .await;
        }

        record_answer_outcome(if correct {
            "claimed_correct"
        } else {
            "claimed_incorrect"
        });

        // Index rows below current are always claimed, so a successful claim
        // implies question_index == current_index at claim time. Score
        // history through the previous index is therefore final in the row
        // read above.
        let is_a = participant_id == duel.participant_a;
        if question_index == DUEL_LENGTH - 1 {
            self.finalize(&duel, is_a, correct, now).await
        } else {
            self.advance(&duel, is_a, correct, now).await
        }
    }

    async fn race_lost_response(
        &self,
        duel_id: &str,
        participant_id: &str,
        question_index: i32,
        duel: &Duel,
    ) -> Result<SubmitDuelAnswerResponse, ApiError> {
        let row = self
            .questions()
            .find_one(doc! { "_id": DuelQuestion::row_id(duel_id, question_index) })
            .await?;

        match row {
            // Active duel whose rows are still being written: short-lived,
            // self-healing, the poll contract covers it.
            None => Err(ApiError::not_found("question not provisioned yet")),
            Some(row) => {
                record_answer_outcome("race_lost");
                tracing::info!(
                    "Race lost: duel {} index {} already claimed by {:?} (submitter {})",
                    duel_id,
                    question_index,
                    row.answered_by,
                    participant_id
                );
                // Re-read for current scores; the losing submission itself
                // changed nothing.
                let fresh = self
                    .duels()
                    .find_one(doc! { "_id": duel_id })
                    .await?
                    .unwrap_or_else(|| duel.clone());
                Ok(SubmitDuelAnswerResponse {
                    result: AnswerOutcome::RaceLost,
                    answered_by: row.answered_by,
                    is_correct: row.is_correct,
                    status: fresh.status,
                    score_a: fresh.score_a,
                    score_b: fresh.score_b,
                    current_index: fresh.current_index,
                })
            }
        }
    }

    /// Non-final claim: score credit and index advance land in one atomic
    /// document update so no observer sees score_a + score_b exceed the
    /// current index.
    async fn advance(
        &self,
        duel: &Duel,
        is_a: bool,
        correct: bool,
        now: chrono::DateTime<Utc>,
    ) -> Result<SubmitDuelAnswerResponse, ApiError> {
        let increment = i32::from(correct);
        let mut inc = mongodb::bson::Document::new();
        inc.insert(if is_a { "score_a" } else { "score_b" }, increment);
        inc.insert("current_index", 1);

        let result = self
            .duels()
            .update_one(
                doc! {
                    "_id": &duel.id,
                    "status": DuelStatus::Active.as_str(),
                    "current_index": duel.current_index,
                },
                doc! {
                    "$inc": inc,
                    "$set": { "last_action_at": chrono_to_bson(now) },
                },
            )
            .await?;
        if result.modified_count == 0 {
            // Only an administrative override can slip in here.
            tracing::warn!("Advance on duel {} raced with a status override", duel.id);
        }

        Ok(SubmitDuelAnswerResponse {
            result: AnswerOutcome::Claimed,
            answered_by: Some(if is_a {
                duel.participant_a.clone()
            } else {
                duel.participant_b.clone()
            }),
            is_correct: Some(correct),
            status: DuelStatus::Active,
            score_a: duel.score_a + if is_a { increment } else { 0 },
            score_b: duel.score_b + if is_a { 0 } else { increment },
            current_index: duel.current_index + 1,
        })
    }

    /// Last-index claim: set the terminal status, final scores and finish
    /// time in one conditional update, then fire the reward hooks. Hook
    /// failures are logged and swallowed; the sporting outcome stands.
    async fn finalize(
        &self,
        duel: &Duel,
        is_a: bool,
        correct: bool,
        now: chrono::DateTime<Utc>,
    ) -> Result<SubmitDuelAnswerResponse, ApiError> {
        let final_a = duel.score_a + i32::from(is_a && correct);
        let final_b = duel.score_b + i32::from(!is_a && correct);
        let terminal = terminal_status_for(final_a, final_b);

        let result = self
            .duels()
            .update_one(
                doc! {
                    "_id": &duel.id,
                    "status": DuelStatus::Active.as_str(),
                    "current_index": duel.current_index,
                },
                doc! { "$set": {
                    "status": terminal.as_str(),
                    "score_a": final_a,
                    "score_b": final_b,
                    "finished_at": chrono_to_bson(now),
                    "last_action_at": chrono_to_bson(now),
                }},
            )
            .await?;

        if result.modified_count == 0 {
            tracing::warn!("Finalize on duel {} raced with a status override", duel.id);
        } else {
            record_duel_event("finalized");
            DUELS_ACTIVE.dec();
            tracing::info!(
                "Duel {} finalized {} ({} - {})",
                duel.id,
                terminal.as_str(),
                final_a,
                final_b
            );
            self.spawn_reward_hooks(duel, terminal);
        }

        Ok(SubmitDuelAnswerResponse {
            result: AnswerOutcome::Claimed,
            answered_by: Some(if is_a {
                duel.participant_a.clone()
            } else {
                duel.participant_b.clone()
            }),
            is_correct: Some(correct),
            status: terminal,
            score_a: final_a,
            score_b: final_b,
            current_index: duel.current_index,
        })
    }

    fn spawn_reward_hooks(&self, duel: &Duel, terminal: DuelStatus) {
        let hooks = self.hooks.clone();
        let a = duel.participant_a.clone();
        let b = duel.participant_b.clone();
        let topic = duel.topic.clone();
        let duel_id = duel.id.clone();

        tokio::spawn(async move {
            let outcome = match terminal {
                DuelStatus::PlayerAWin => hooks.on_duel_win(&a, &b, &topic).await,
                DuelStatus::PlayerBWin => hooks.on_duel_win(&b, &a, &topic).await,
                DuelStatus::Draw => hooks.on_duel_draw(&a, &b, &topic).await,
                _ => Ok(()),
            };
            if let Err(e) = outcome {
                crate::metrics::REWARD_HOOK_FAILURES_TOTAL.inc();
                tracing::error!("Reward hook failed for duel {}: {:#}", duel_id, e);
            }
        });
    }

    /// Administrative override: active -> expired, freeing both participants
    /// for matchmaking. Surfaced to both on their next poll.
    pub async fn force_expire(&self, duel_id: &str) -> Result<(), ApiError> {
        let now = chrono_to_bson(Utc::now());
        let result = self
            .duels()
            .update_one(
                doc! { "_id": duel_id, "status": DuelStatus::Active.as_str() },
                doc! { "$set": {
                    "status": DuelStatus::Expired.as_str(),
                    "finished_at": now,
                    "last_action_at": now,
                }},
            )
            .await?;

        if result.modified_count == 0 {
            let duel = self
                .duels()
                .find_one(doc! { "_id": duel_id })
                .await?
                .ok_or_else(|| ApiError::not_found("duel not found"))?;
            return Err(ApiError::conflict(format!(
                "duel is {}, not active",
                duel.status.as_str()
            )));
        }

        record_duel_event("expired");
        DUELS_ACTIVE.dec();
        tracing::info!("Duel {} force-expired", duel_id);
        Ok(())
    }
}
