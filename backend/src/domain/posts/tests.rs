//! Unit tests for the post lifecycle service.

use std::sync::{Arc, Mutex};

use chrono::{DateTime, Duration, Local, TimeZone, Utc};
use mockable::Clock;
use rstest::{fixture, rstest};
use uuid::Uuid;

use super::*;
use crate::domain::ports::{
    CreateDraftRequest, MockContentGenerationWebhook, MockCreditLedgerRepository,
    MockPostRepository, MockPublishWebhook, PostCommand, PublishPostRequest, SchedulePostRequest,
    SweepCommand, SweepItemResult, VoiceMemoRequest, WebhookError,
};
use crate::domain::{CreditConsumptionGate, CreditLedgerService, ErrorCode, UserId};

struct FixtureClock;

impl Clock for FixtureClock {
    fn local(&self) -> DateTime<Local> {
        self.utc().with_timezone(&Local)
    }

    fn utc(&self) -> DateTime<Utc> {
        fixture_now()
    }
}

fn fixture_now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 5, 4, 9, 30, 0)
        .single()
        .expect("valid timestamp")
}

#[fixture]
fn owner() -> UserId {
    UserId::random()
}

fn stored(owner: &UserId, status: PostStatus, content: &str) -> Post {
    let mut post = Post::draft(owner.clone(), content, None, fixture_now());
    post.status = status;
    post
}

type SharedPost = Arc<Mutex<Post>>;

/// Repository mock applying transitions as a single-row compare-and-swap.
fn cas_repository_with_state(post: Post) -> (MockPostRepository, SharedPost) {
    let current = Arc::new(Mutex::new(post.clone()));
    let state = Arc::clone(&current);
    let mut repo = MockPostRepository::new();
    repo.expect_find()
        .returning(move |_, _| Ok(Some(post.clone())));
    repo.expect_insert().returning(|_| Ok(()));
    repo.expect_transition().returning(move |transition| {
        let mut guard = current.lock().expect("lock");
        if !transition.from.contains(&guard.status) {
            return Ok(None);
        }
        guard.status = transition.to;
        transition.patch.apply_to(&mut guard);
        guard.updated_at = transition.at;
        Ok(Some(guard.clone()))
    });
    (repo, state)
}

fn cas_repository(post: Post) -> MockPostRepository {
    cas_repository_with_state(post).0
}

fn ledger(charged: bool) -> MockCreditLedgerRepository {
    let mut ledger = MockCreditLedgerRepository::new();
    ledger.expect_is_admin().returning(|_| Ok(false));
    ledger
        .expect_consume_one()
        .returning(move |_| Ok(charged.then(Uuid::new_v4)));
    ledger
}

fn service(
    repo: MockPostRepository,
    ledger: MockCreditLedgerRepository,
    generator: MockContentGenerationWebhook,
    publisher: MockPublishWebhook,
) -> PostLifecycleService<MockPostRepository, MockCreditLedgerRepository> {
    PostLifecycleService::new(
        Arc::new(repo),
        CreditConsumptionGate::new(CreditLedgerService::new(Arc::new(ledger), 3)),
        Arc::new(generator),
        Arc::new(publisher),
        Arc::new(FixtureClock),
        PostLifecycleConfig::default(),
    )
}

#[rstest]
#[case(PostStatus::Draft, PostStatus::Scheduled, true)]
#[case(PostStatus::Generated, PostStatus::Publishing, true)]
#[case(PostStatus::Failed, PostStatus::Publishing, true)]
#[case(PostStatus::Publishing, PostStatus::Published, true)]
#[case(PostStatus::Scheduled, PostStatus::Failed, true)]
#[case(PostStatus::Failed, PostStatus::Generated, false)]
#[case(PostStatus::Published, PostStatus::Publishing, false)]
#[case(PostStatus::Generating, PostStatus::Publishing, false)]
#[case(PostStatus::Draft, PostStatus::Generating, false)]
fn lifecycle_edges(#[case] from: PostStatus, #[case] to: PostStatus, #[case] allowed: bool) {
    assert_eq!(from.can_transition_to(to), allowed);
}

#[rstest]
fn status_round_trips_through_persisted_form() {
    for status in [
        PostStatus::Generating,
        PostStatus::Generated,
        PostStatus::Publishing,
        PostStatus::Published,
        PostStatus::Failed,
        PostStatus::Draft,
        PostStatus::Scheduled,
    ] {
        assert_eq!(status.as_str().parse::<PostStatus>(), Ok(status));
    }
    assert!("archived".parse::<PostStatus>().is_err());
}

#[rstest]
#[tokio::test]
async fn publish_without_credit_never_calls_webhook(owner: UserId) {
    let post = stored(&owner, PostStatus::Draft, "Hello network");
    let mut publisher = MockPublishWebhook::new();
    publisher.expect_publish().never();
    let (repo, seen) = cas_repository_with_state(post.clone());

    let err = service(repo, ledger(false), MockContentGenerationWebhook::new(), publisher)
        .publish(PublishPostRequest {
            user_id: owner,
            post_id: post.id,
            content: None,
            image: None,
        })
        .await
        .expect_err("insufficient credits");
    assert_eq!(err.code(), ErrorCode::InsufficientCredits);
    assert_eq!(seen.lock().expect("lock").status, PostStatus::Draft);
}

#[rstest]
#[tokio::test]
async fn losing_the_claim_charges_nothing(owner: UserId) {
    let post = stored(&owner, PostStatus::Draft, "Double click");
    // Both attempts load the draft before either claims it.
    let (repo, seen) = cas_repository_with_state(post.clone());
    let mut ledger = MockCreditLedgerRepository::new();
    ledger.expect_is_admin().returning(|_| Ok(false));
    ledger
        .expect_consume_one()
        .times(1)
        .returning(|_| Ok(Some(Uuid::new_v4())));
    let mut publisher = MockPublishWebhook::new();
    publisher.expect_publish().times(1).returning(|_| {
        Ok(PublishReceipt {
            external_post_id: "urn:li:share:1".into(),
            post_url: None,
        })
    });
    let lifecycle = service(repo, ledger, MockContentGenerationWebhook::new(), publisher);
    let request = PublishPostRequest {
        user_id: owner,
        post_id: post.id,
        content: None,
        image: None,
    };

    let (first, second) = tokio::join!(
        lifecycle.publish(request.clone()),
        lifecycle.publish(request)
    );

    let errors: Vec<_> = [first, second].into_iter().filter_map(Result::err).collect();
    assert_eq!(errors.len(), 1);
    assert!(errors.iter().all(|err| err.code() == ErrorCode::Conflict));
    assert_eq!(seen.lock().expect("lock").status, PostStatus::Published);
}

#[rstest]
#[tokio::test]
async fn successful_publish_stores_external_id(owner: UserId) {
    let post = stored(&owner, PostStatus::Generated, "Stored text");
    let mut publisher = MockPublishWebhook::new();
    publisher
        .expect_publish()
        .withf(|request| request.content == "Edited text")
        .times(1)
        .returning(|_| {
            Ok(PublishReceipt {
                external_post_id: "urn:li:share:42".into(),
                post_url: Some("https://www.linkedin.com/feed/update/urn:li:share:42".into()),
            })
        });

    let published = service(
        cas_repository(post.clone()),
        ledger(true),
        MockContentGenerationWebhook::new(),
        publisher,
    )
    .publish(PublishPostRequest {
        user_id: owner,
        post_id: post.id,
        content: Some("Edited text".into()),
        image: None,
    })
    .await
    .expect("published");

    assert_eq!(published.post.status, PostStatus::Published);
    assert_eq!(published.post.content, "Edited text");
    assert_eq!(published.post.linkedin_post_id.as_deref(), Some("urn:li:share:42"));
    assert!(published.post_url.is_some());
}

#[rstest]
#[tokio::test]
async fn webhook_failure_marks_post_failed(owner: UserId) {
    let post = stored(&owner, PostStatus::Draft, "Hello");
    let mut publisher = MockPublishWebhook::new();
    publisher
        .expect_publish()
        .returning(|_| Err(WebhookError::status(500_u16, "boom")));
    let (repo, seen) = cas_repository_with_state(post.clone());

    let err = service(repo, ledger(true), MockContentGenerationWebhook::new(), publisher)
        .publish(PublishPostRequest {
            user_id: owner,
            post_id: post.id,
            content: None,
            image: None,
        })
        .await
        .expect_err("webhook failure");

    assert_eq!(err.code(), ErrorCode::ExternalService);
    assert_eq!(seen.lock().expect("lock").status, PostStatus::Failed);
}

#[rstest]
#[case(PostStatus::Published)]
#[case(PostStatus::Publishing)]
#[case(PostStatus::Generating)]
#[tokio::test]
async fn publish_rejects_non_publishable_status(owner: UserId, #[case] status: PostStatus) {
    let post = stored(&owner, status, "text");
    let mut ledger = MockCreditLedgerRepository::new();
    ledger.expect_consume_one().never();
    ledger.expect_is_admin().never();

    let err = service(
        cas_repository(post.clone()),
        ledger,
        MockContentGenerationWebhook::new(),
        MockPublishWebhook::new(),
    )
    .publish(PublishPostRequest {
        user_id: owner,
        post_id: post.id,
        content: None,
        image: None,
    })
    .await
    .expect_err("not publishable");
    assert_eq!(err.code(), ErrorCode::Conflict);
}

#[rstest]
#[tokio::test]
async fn generation_success_moves_post_to_generated(owner: UserId) {
    let mut generator = MockContentGenerationWebhook::new();
    generator.expect_generate().returning(|_| {
        Ok(GeneratedDraft {
            content: "Generated draft".into(),
            image: Some(PostImage::Remote("https://cdn.example/x.png".into())),
        })
    });
    let seed = Post::generating(owner.clone(), "memo.webm", fixture_now());

    let post = service(
        cas_repository(seed),
        ledger(true),
        generator,
        MockPublishWebhook::new(),
    )
    .submit_voice_memo(VoiceMemoRequest {
        user_id: owner,
        audio_file_name: "memo.webm".into(),
    })
    .await
    .expect("generated");

    assert_eq!(post.status, PostStatus::Generated);
    assert_eq!(post.content, "Generated draft");
    assert_eq!(post.image_source_type.as_deref(), Some("url"));
}

#[rstest]
#[tokio::test]
async fn generation_failure_marks_post_failed(owner: UserId) {
    let mut generator = MockContentGenerationWebhook::new();
    generator
        .expect_generate()
        .returning(|_| Err(WebhookError::transport("timed out")));
    let seed = Post::generating(owner.clone(), "memo.webm", fixture_now());
    let mut repo = MockPostRepository::new();
    repo.expect_insert().returning(|_| Ok(()));
    repo.expect_transition()
        .withf(|transition| {
            transition.to == PostStatus::Failed && transition.from == vec![PostStatus::Generating]
        })
        .times(1)
        .returning(move |_| {
            let mut failed = seed.clone();
            failed.status = PostStatus::Failed;
            Ok(Some(failed))
        });

    let err = service(repo, ledger(true), generator, MockPublishWebhook::new())
        .submit_voice_memo(VoiceMemoRequest {
            user_id: owner,
            audio_file_name: "memo.webm".into(),
        })
        .await
        .expect_err("generation failure");
    assert_eq!(err.code(), ErrorCode::ExternalService);
}

#[rstest]
#[tokio::test]
async fn late_generation_does_not_resurrect_failed_post(owner: UserId) {
    let mut generator = MockContentGenerationWebhook::new();
    generator.expect_generate().returning(|_| {
        Ok(GeneratedDraft {
            content: "Too late".into(),
            image: None,
        })
    });
    let mut repo = MockPostRepository::new();
    repo.expect_insert().returning(|_| Ok(()));
    // The watchdog already failed the post, so the CAS finds no match.
    repo.expect_transition().times(1).returning(|_| Ok(None));

    let err = service(repo, ledger(true), generator, MockPublishWebhook::new())
        .submit_voice_memo(VoiceMemoRequest {
            user_id: owner,
            audio_file_name: "memo.webm".into(),
        })
        .await
        .expect_err("expired");
    assert_eq!(err.code(), ErrorCode::Conflict);
}

#[rstest]
#[tokio::test]
async fn blank_draft_is_rejected(owner: UserId) {
    let mut repo = MockPostRepository::new();
    repo.expect_insert().never();
    let err = service(
        repo,
        ledger(true),
        MockContentGenerationWebhook::new(),
        MockPublishWebhook::new(),
    )
    .create_draft(CreateDraftRequest {
        user_id: owner,
        content: "   ".into(),
        image: None,
    })
    .await
    .expect_err("blank");
    assert_eq!(err.code(), ErrorCode::InvalidRequest);
}

#[rstest]
#[tokio::test]
async fn schedule_in_the_past_is_rejected(owner: UserId) {
    let mut repo = MockPostRepository::new();
    repo.expect_find().never();
    let err = service(
        repo,
        ledger(true),
        MockContentGenerationWebhook::new(),
        MockPublishWebhook::new(),
    )
    .schedule(SchedulePostRequest {
        user_id: owner,
        post_id: Uuid::new_v4(),
        scheduled_at: fixture_now() - Duration::minutes(1),
    })
    .await
    .expect_err("past schedule");
    assert_eq!(err.code(), ErrorCode::InvalidRequest);
}

#[rstest]
#[tokio::test]
async fn schedule_stores_time(owner: UserId) {
    let post = stored(&owner, PostStatus::Draft, "Later");
    let when = fixture_now() + Duration::hours(2);
    let scheduled = service(
        cas_repository(post.clone()),
        ledger(true),
        MockContentGenerationWebhook::new(),
        MockPublishWebhook::new(),
    )
    .schedule(SchedulePostRequest {
        user_id: owner,
        post_id: post.id,
        scheduled_at: when,
    })
    .await
    .expect("scheduled");
    assert_eq!(scheduled.status, PostStatus::Scheduled);
    assert_eq!(scheduled.scheduled_at, Some(when));
}

#[tokio::test]
async fn stale_sweep_uses_fifteen_minute_cutoff() {
    let mut repo = MockPostRepository::new();
    let expected_cutoff = fixture_now() - Duration::minutes(15);
    let stale = Uuid::new_v4();
    repo.expect_fail_stale_in_flight()
        .withf(move |cutoff, now| *cutoff == expected_cutoff && *now == fixture_now())
        .times(1)
        .returning(move |_, _| Ok(vec![stale]));

    let summary = service(
        repo,
        ledger(true),
        MockContentGenerationWebhook::new(),
        MockPublishWebhook::new(),
    )
    .sweep_stale_generations()
    .await
    .expect("sweep");
    assert_eq!(summary.failed_post_ids, vec![stale]);
}

#[rstest]
#[tokio::test]
async fn scheduled_sweep_publishes_due_posts_within_limit(owner: UserId) {
    let mut post = stored(&owner, PostStatus::Publishing, "Due now");
    post.scheduled_at = Some(fixture_now() - Duration::minutes(1));
    let mut repo = cas_repository(post.clone());
    let due = post.clone();
    repo.expect_claim_due_scheduled()
        .withf(|now, limit| *now == fixture_now() && *limit == 10)
        .times(1)
        .returning(move |_, _| Ok(vec![due.clone()]));
    let mut publisher = MockPublishWebhook::new();
    publisher.expect_publish().times(1).returning(|_| {
        Ok(PublishReceipt {
            external_post_id: "urn:li:share:7".into(),
            post_url: None,
        })
    });

    let summary = service(repo, ledger(true), MockContentGenerationWebhook::new(), publisher)
        .sweep_scheduled()
        .await
        .expect("sweep");

    assert_eq!(summary.processed, 1);
    assert_eq!(
        summary.results,
        vec![SweepItemResult::Published {
            post_id: post.id,
            linkedin_post_id: "urn:li:share:7".into(),
        }]
    );
}

#[rstest]
#[tokio::test]
async fn scheduled_sweep_fails_unfunded_posts(owner: UserId) {
    let mut post = stored(&owner, PostStatus::Publishing, "Due now");
    post.scheduled_at = Some(fixture_now() - Duration::minutes(1));
    let (mut repo, seen) = cas_repository_with_state(post.clone());
    let due = post.clone();
    repo.expect_claim_due_scheduled()
        .returning(move |_, _| Ok(vec![due.clone()]));
    let mut publisher = MockPublishWebhook::new();
    publisher.expect_publish().never();

    let summary = service(repo, ledger(false), MockContentGenerationWebhook::new(), publisher)
        .sweep_scheduled()
        .await
        .expect("sweep");

    assert_eq!(seen.lock().expect("lock").status, PostStatus::Failed);

    assert_eq!(summary.processed, 1);
    assert!(matches!(
        summary.results.first(),
        Some(SweepItemResult::Failed { post_id, .. }) if *post_id == post.id
    ));
}
