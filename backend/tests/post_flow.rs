//! Drafting, scheduling and publishing posts against the credit ledger.

use actix_web::http::StatusCode;
use actix_web::test;
use chrono::Duration;
use mockable::Clock;
use serde_json::json;

mod support;

use support::{
    ALICE, BOB, CRON_SECRET, Harness, SIGNUP_CREDITS, available_credits, call_json, create_draft,
    publish, sign_in,
};
use voicepost_backend::inbound::http::sweeps::CRON_SECRET_HEADER;
use voicepost_backend::server::build_app;

#[actix_web::test]
async fn publishing_consumes_one_credit() {
    let harness = Harness::new();
    let app = test::init_service(build_app(harness.dependencies())).await;
    let cookie = sign_in(&app, ALICE).await;
    let post_id = create_draft(&app, &cookie, "Shipping week notes").await;

    let (status, body) = publish(&app, &cookie, &post_id).await;

    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["success"], true);
    assert_eq!(body["post"]["status"], "published");
    assert!(body["linkedinPostId"].is_string());
    assert_eq!(harness.publisher.calls(), 1);
    assert_eq!(
        available_credits(&app, &cookie).await,
        u64::from(SIGNUP_CREDITS) - 1
    );
}

#[actix_web::test]
async fn exhausted_credits_block_publishing_before_the_webhook() {
    let harness = Harness::new();
    let app = test::init_service(build_app(harness.dependencies())).await;
    let cookie = sign_in(&app, ALICE).await;
    for n in 0..SIGNUP_CREDITS {
        let post_id = create_draft(&app, &cookie, &format!("Post {n}")).await;
        let (status, _) = publish(&app, &cookie, &post_id).await;
        assert_eq!(status, StatusCode::OK);
    }
    let blocked = create_draft(&app, &cookie, "One too many").await;

    let (status, body) = publish(&app, &cookie, &blocked).await;

    assert_eq!(status, StatusCode::PAYMENT_REQUIRED, "{body}");
    assert_eq!(body["code"], "insufficient_credits");
    assert_eq!(harness.publisher.calls(), usize::try_from(SIGNUP_CREDITS).expect("small"));
    let (_, post) = call_json(
        &app,
        test::TestRequest::get().uri(&format!("/api/v1/posts/{blocked}")),
        &cookie,
    )
    .await;
    assert_eq!(post["status"], "draft");
}

#[actix_web::test]
async fn administrators_publish_without_spending_credits() {
    let harness = Harness::new();
    let app = test::init_service(build_app(harness.dependencies())).await;
    let cookie = sign_in(&app, ALICE).await;
    let admin = voicepost_backend::domain::UserId::new(ALICE).expect("user id");
    harness.store.grant_admin(&admin).await;

    let post_id = create_draft(&app, &cookie, "Admin announcement").await;
    let (status, _) = publish(&app, &cookie, &post_id).await;
    assert_eq!(status, StatusCode::OK);

    let (_, credits) = call_json(&app, test::TestRequest::get().uri("/api/v1/credits"), &cookie).await;
    assert_eq!(credits["isAdmin"], true);
    assert_eq!(credits["availableCredits"], u64::from(SIGNUP_CREDITS));
}

#[actix_web::test]
async fn posts_are_private_to_their_author() {
    let harness = Harness::new();
    let app = test::init_service(build_app(harness.dependencies())).await;
    let alice = sign_in(&app, ALICE).await;
    let bob = sign_in(&app, BOB).await;
    let post_id = create_draft(&app, &alice, "Alice only").await;

    let (status, _) = publish(&app, &bob, &post_id).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(harness.publisher.calls(), 0);
    assert_eq!(available_credits(&app, &bob).await, u64::from(SIGNUP_CREDITS));
}

#[actix_web::test]
async fn generated_drafts_can_be_published() {
    let harness = Harness::new();
    let app = test::init_service(build_app(harness.dependencies())).await;
    let cookie = sign_in(&app, ALICE).await;

    let (status, generated) = call_json(
        &app,
        test::TestRequest::post()
            .uri("/api/v1/posts/generate")
            .set_json(json!({ "audioFileName": "standup.m4a" })),
        &cookie,
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{generated}");
    assert_eq!(generated["status"], "generated");
    assert_eq!(generated["audioFileName"], "standup.m4a");
    let post_id = generated["id"].as_str().expect("post id");

    let (status, body) = publish(&app, &cookie, post_id).await;
    assert_eq!(status, StatusCode::OK, "{body}");
}

#[actix_web::test]
async fn scheduled_posts_publish_once_due() {
    let harness = Harness::new();
    let app = test::init_service(build_app(harness.dependencies())).await;
    let cookie = sign_in(&app, ALICE).await;
    let post_id = create_draft(&app, &cookie, "Monday motivation").await;
    let scheduled_at = (harness.clock.utc() + Duration::hours(1)).to_rfc3339();

    let (status, scheduled) = call_json(
        &app,
        test::TestRequest::post()
            .uri(&format!("/api/v1/posts/{post_id}/schedule"))
            .set_json(json!({ "scheduledAt": scheduled_at })),
        &cookie,
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{scheduled}");
    assert_eq!(scheduled["status"], "scheduled");

    let sweep = || {
        test::TestRequest::post()
            .uri("/internal/sweeps/scheduled")
            .insert_header((CRON_SECRET_HEADER, CRON_SECRET))
            .to_request()
    };

    let early: serde_json::Value = test::call_and_read_body_json(&app, sweep()).await;
    assert_eq!(early["processed"], 0);

    harness.clock.advance(Duration::hours(2));
    let late: serde_json::Value = test::call_and_read_body_json(&app, sweep()).await;
    assert_eq!(late["processed"], 1);
    assert_eq!(late["results"][0]["postId"], post_id.as_str());
    assert_eq!(late["results"][0]["outcome"], "published");
    assert_eq!(
        available_credits(&app, &cookie).await,
        u64::from(SIGNUP_CREDITS) - 1
    );
}

#[actix_web::test]
async fn sweeps_require_the_cron_secret() {
    let harness = Harness::new();
    let app = test::init_service(build_app(harness.dependencies())).await;

    let response = test::call_service(
        &app,
        test::TestRequest::post()
            .uri("/internal/sweeps/scheduled")
            .insert_header((CRON_SECRET_HEADER, "guess"))
            .to_request(),
    )
    .await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}
