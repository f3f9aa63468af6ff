mod common;

use axum::http::StatusCode;
use common::{create_test_app, get_json, post_json, unique_user, TestContext};
use mongodb::bson::doc;
use serde_json::json;

const TOPIC: &str = "Algebra Basics";

async fn heartbeat(ctx: &TestContext, user_id: &str) {
    let (status, body) = post_json(
        &ctx.app,
        "/api/v1/presence/heartbeat",
        json!({ "user_id": user_id }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

async fn opponents_of(ctx: &TestContext, user_id: &str) -> Vec<String> {
    let (status, body) = get_json(
        &ctx.app,
        &format!("/api/v1/presence/opponents?user_id={}", user_id),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    body["opponents"]
        .as_array()
        .unwrap()
        .iter()
        .map(|v| v.as_str().unwrap().to_string())
        .collect()
}

#[tokio::test]
async fn heartbeat_makes_a_user_visible_to_others() {
    let ctx = create_test_app().await;
    let viewer = unique_user("viewer");
    let candidate = unique_user("candidate");

    heartbeat(&ctx, &candidate).await;
    heartbeat(&ctx, &viewer).await;

    let listed = opponents_of(&ctx, &viewer).await;
    assert!(listed.contains(&candidate));
    // Never offered to themselves.
    assert!(!listed.contains(&viewer));
}

#[tokio::test]
async fn stale_heartbeats_age_out() {
    let ctx = create_test_app().await;
    let viewer = unique_user("viewer");
    let ghost = unique_user("ghost");

    // Plant a six-minute-old heartbeat with the online flag still set.
    let mut conn = ctx
        .redis
        .get_multiplexed_async_connection()
        .await
        .unwrap();
    let stale = chrono::Utc::now().timestamp() - 360;
    redis::cmd("ZADD")
        .arg("presence:heartbeats")
        .arg(stale)
        .arg(&ghost)
        .query_async::<()>(&mut conn)
        .await
        .unwrap();
    redis::cmd("SET")
        .arg(format!("presence:online:{}", ghost))
        .arg(1)
        .query_async::<()>(&mut conn)
        .await
        .unwrap();

    let listed = opponents_of(&ctx, &viewer).await;
    assert!(!listed.contains(&ghost));
}

#[tokio::test]
async fn duel_participants_are_hidden_while_the_duel_is_live() {
    let ctx = create_test_app().await;
    let alice = unique_user("alice");
    let bob = unique_user("bob");
    let viewer = unique_user("viewer");

    heartbeat(&ctx, &alice).await;
    heartbeat(&ctx, &bob).await;

    let listed = opponents_of(&ctx, &viewer).await;
    assert!(listed.contains(&alice));
    assert!(listed.contains(&bob));

    let (status, body) = post_json(
        &ctx.app,
        "/api/v1/duels",
        json!({ "challenger_id": alice, "opponent_id": bob, "topic": TOPIC }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let duel_id = body["duel_id"].as_str().unwrap().to_string();

    // A pending challenge does not block anyone yet.
    let listed = opponents_of(&ctx, &viewer).await;
    assert!(listed.contains(&alice));
    assert!(listed.contains(&bob));

    let (status, _) = post_json(
        &ctx.app,
        &format!("/api/v1/duels/{}/accept", duel_id),
        json!({}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    // Once active, both participants disappear from matchmaking.
    let listed = opponents_of(&ctx, &viewer).await;
    assert!(!listed.contains(&alice));
    assert!(!listed.contains(&bob));

    // Clearing the duel brings them back.
    let (status, _) = post_json(
        &ctx.app,
        &format!("/admin/duels/{}/expire", duel_id),
        json!({}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let listed = opponents_of(&ctx, &viewer).await;
    assert!(listed.contains(&alice));
    assert!(listed.contains(&bob));
}

#[tokio::test]
async fn abandoned_duels_stop_blocking_their_participants() {
    let ctx = create_test_app().await;
    let alice = unique_user("alice");
    let bob = unique_user("bob");
    let viewer = unique_user("viewer");

    heartbeat(&ctx, &alice).await;
    heartbeat(&ctx, &bob).await;

    let (status, body) = post_json(
        &ctx.app,
        "/api/v1/duels",
        json!({ "challenger_id": alice, "opponent_id": bob, "topic": TOPIC }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let duel_id = body["duel_id"].as_str().unwrap().to_string();

    let (status, _) = post_json(
        &ctx.app,
        &format!("/api/v1/duels/{}/accept", duel_id),
        json!({}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    assert!(!opponents_of(&ctx, &viewer).await.contains(&alice));

    // Age the duel's last action past the staleness window: the row is still
    // active but no longer counts as occupying anyone.
    let old = mongodb::bson::DateTime::from_millis(
        (chrono::Utc::now() - chrono::Duration::seconds(600)).timestamp_millis(),
    );
    ctx.mongo
        .collection::<mongodb::bson::Document>("duels")
        .update_one(
            doc! { "_id": &duel_id },
            doc! { "$set": { "last_action_at": old } },
        )
        .await
        .unwrap();

    let listed = opponents_of(&ctx, &viewer).await;
    assert!(listed.contains(&alice));
    assert!(listed.contains(&bob));
}
