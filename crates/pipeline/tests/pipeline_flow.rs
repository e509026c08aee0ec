//! End-to-end pipeline tests against a real database, with the external
//! seams (detector, queue, chat, image model, blob store) faked.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use assert_matches::assert_matches;
use async_trait::async_trait;
use sqlx::PgPool;

use quoteframe_chat::api::{ChatApi, ChatError, MessageReceipt, PickerStyle, UserDisplay};
use quoteframe_core::event::ChatEvent;
use quoteframe_core::status::{GenerationStatus, CONTENT_POLICY_DECLINED};
use quoteframe_core::types::DbId;
use quoteframe_db::models::workspace::InstallWorkspace;
use quoteframe_db::repositories::generation_repo::GenerationRepo;
use quoteframe_db::repositories::quote_repo::QuoteRepo;
use quoteframe_db::repositories::usage_repo::UsageRepo;
use quoteframe_db::repositories::workspace_repo::WorkspaceRepo;
use quoteframe_events::EventBus;
use quoteframe_imagen::model::{ImageModel, ImageModelError, ImageOutput, ImageRequest};
use quoteframe_pipeline::blob::{BlobError, BlobStore};
use quoteframe_pipeline::detector::{Detection, DetectorError, QuoteDetector, StyleCandidate};
use quoteframe_pipeline::intake::{IntakeOutcome, PipelineIntake};
use quoteframe_pipeline::payload::GenerationJob;
use quoteframe_pipeline::queue::{JobQueue, QueueError};
use quoteframe_pipeline::regrant::MentionOutcome;
use quoteframe_pipeline::worker::{JobWorker, WorkerOutcome};

// ---------------------------------------------------------------------------
// Fakes
// ---------------------------------------------------------------------------

/// Detector that always answers the same way and counts calls.
struct FakeDetector {
    is_quote: bool,
    attribution: Option<String>,
    calls: AtomicUsize,
}

impl FakeDetector {
    fn accepting() -> Self {
        Self {
            is_quote: true,
            attribution: Some("someone".to_string()),
            calls: AtomicUsize::new(0),
        }
    }

    fn accepting_unattributed() -> Self {
        Self {
            attribution: None,
            ..Self::accepting()
        }
    }

    fn rejecting() -> Self {
        Self {
            is_quote: false,
            attribution: None,
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl QuoteDetector for &FakeDetector {
    async fn classify(
        &self,
        text: &str,
        _candidates: &[StyleCandidate],
    ) -> Result<Detection, DetectorError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(Detection {
            is_quote: self.is_quote,
            quote_text: text.to_string(),
            attributed_to: self.attribution.clone(),
            confidence: 0.9,
            style_hint: None,
        })
    }
}

/// Queue that collects payloads in memory; optionally fails.
struct FakeQueue {
    jobs: Mutex<Vec<GenerationJob>>,
    fail: bool,
}

impl FakeQueue {
    fn working() -> Self {
        Self {
            jobs: Mutex::new(Vec::new()),
            fail: false,
        }
    }

    fn broken() -> Self {
        Self {
            jobs: Mutex::new(Vec::new()),
            fail: true,
        }
    }

    fn take_last(&self) -> GenerationJob {
        self.jobs.lock().unwrap().last().cloned().expect("a job was enqueued")
    }
}

#[async_trait]
impl JobQueue for &FakeQueue {
    async fn enqueue(&self, job: &GenerationJob) -> Result<DbId, QueueError> {
        if self.fail {
            return Err(QueueError::Database(sqlx::Error::PoolClosed));
        }
        let mut jobs = self.jobs.lock().unwrap();
        jobs.push(job.clone());
        Ok(jobs.len() as DbId)
    }
}

#[derive(Debug, Clone)]
struct PostedReply {
    channel_id: String,
    root_id: String,
    text: String,
    image_url: Option<String>,
}

/// Records every outbound chat call.
#[derive(Default)]
struct FakeChat {
    replies: Mutex<Vec<PostedReply>>,
    ephemerals: Mutex<Vec<String>>,
    reactions: Mutex<Vec<String>>,
    pickers: Mutex<Vec<Vec<PickerStyle>>>,
    root_text: Mutex<Option<String>>,
}

#[async_trait]
impl ChatApi for &FakeChat {
    async fn post_thread_reply(
        &self,
        _token: &str,
        channel_id: &str,
        root_id: &str,
        text: &str,
        image_url: Option<&str>,
    ) -> Result<MessageReceipt, ChatError> {
        self.replies.lock().unwrap().push(PostedReply {
            channel_id: channel_id.to_string(),
            root_id: root_id.to_string(),
            text: text.to_string(),
            image_url: image_url.map(String::from),
        });
        Ok(MessageReceipt {
            channel_id: channel_id.to_string(),
            message_id: "9999.0001".to_string(),
        })
    }

    async fn post_ephemeral(
        &self,
        _token: &str,
        _channel_id: &str,
        _user_id: &str,
        text: &str,
    ) -> Result<(), ChatError> {
        self.ephemerals.lock().unwrap().push(text.to_string());
        Ok(())
    }

    async fn add_reaction(
        &self,
        _token: &str,
        _channel_id: &str,
        _message_id: &str,
        name: &str,
    ) -> Result<(), ChatError> {
        self.reactions.lock().unwrap().push(format!("+{name}"));
        Ok(())
    }

    async fn remove_reaction(
        &self,
        _token: &str,
        _channel_id: &str,
        _message_id: &str,
        name: &str,
    ) -> Result<(), ChatError> {
        self.reactions.lock().unwrap().push(format!("-{name}"));
        Ok(())
    }

    async fn read_message(
        &self,
        _token: &str,
        _channel_id: &str,
        _message_id: &str,
    ) -> Result<String, ChatError> {
        self.root_text
            .lock()
            .unwrap()
            .clone()
            .ok_or_else(|| ChatError::Api("message_not_found".to_string()))
    }

    async fn resolve_user_display(
        &self,
        _token: &str,
        _user_id: &str,
    ) -> Result<UserDisplay, ChatError> {
        Ok(UserDisplay {
            name: "Sam Porter".to_string(),
            avatar_url: None,
        })
    }

    async fn post_style_picker(
        &self,
        _token: &str,
        _channel_id: &str,
        _root_id: &str,
        _user_id: &str,
        styles: &[PickerStyle],
    ) -> Result<(), ChatError> {
        self.pickers.lock().unwrap().push(styles.to_vec());
        Ok(())
    }
}

/// Image model that pops one scripted response per call.
struct FakeModel {
    responses: Mutex<Vec<Result<ImageOutput, ImageModelError>>>,
}

impl FakeModel {
    fn returning_png() -> Self {
        Self {
            responses: Mutex::new(vec![Ok(ImageOutput::Bytes(tiny_png()))]),
        }
    }

    fn always_declining() -> Self {
        let policy = || ImageModelError::ContentPolicy {
            code: "content_policy_violation".to_string(),
        };
        Self {
            responses: Mutex::new(vec![Err(policy()), Err(policy())]),
        }
    }
}

#[async_trait]
impl ImageModel for &FakeModel {
    async fn generate(&self, _request: &ImageRequest) -> Result<ImageOutput, ImageModelError> {
        let mut responses = self.responses.lock().unwrap();
        if responses.is_empty() {
            // Redelivered jobs must never reach the model again.
            panic!("image model called more times than scripted");
        }
        responses.remove(0)
    }
}

/// Blob store that remembers uploads and hands back a fixed URL shape.
#[derive(Default)]
struct FakeBlob {
    uploads: AtomicUsize,
}

#[async_trait]
impl BlobStore for &FakeBlob {
    async fn upload(
        &self,
        _bytes: &[u8],
        workspace_id: DbId,
        quote_id: DbId,
    ) -> Result<String, BlobError> {
        self.uploads.fetch_add(1, Ordering::SeqCst);
        Ok(format!("https://cdn.test/artifacts/{workspace_id}/{quote_id}.png"))
    }
}

/// A real 4x4 PNG so the crop/resize/encode path runs for real.
fn tiny_png() -> Vec<u8> {
    let img = image::RgbImage::from_pixel(4, 4, image::Rgb([200, 60, 20]));
    let mut out = std::io::Cursor::new(Vec::new());
    image::DynamicImage::ImageRgb8(img)
        .write_to(&mut out, image::ImageFormat::Png)
        .expect("encode test png");
    out.into_inner()
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

async fn install_workspace(pool: &PgPool, quota: i32) -> quoteframe_db::models::workspace::Workspace {
    WorkspaceRepo::install(
        pool,
        &InstallWorkspace {
            team_id: "T_TEST".to_string(),
            bot_token: "xoxb-test".to_string(),
            bot_user_id: "U_BOT".to_string(),
            plan_tier: "free".to_string(),
            monthly_quota: quota,
        },
    )
    .await
    .expect("install workspace")
}

fn message(text: &str) -> ChatEvent {
    ChatEvent {
        team_id: "T_TEST".to_string(),
        channel_id: "C_GENERAL".to_string(),
        message_id: "1700000000.000100".to_string(),
        user_id: "U_HUMAN".to_string(),
        text: text.to_string(),
        thread_root_id: None,
        subtype: None,
    }
}

fn intake<'a>(
    pool: &PgPool,
    detector: &'a FakeDetector,
    queue: &'a FakeQueue,
    chat: &'a FakeChat,
) -> PipelineIntake<&'a FakeDetector, &'a FakeQueue, &'a FakeChat> {
    PipelineIntake::new(
        pool.clone(),
        detector,
        queue,
        chat,
        Arc::new(EventBus::default()),
    )
}

// ---------------------------------------------------------------------------
// Intake
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../db/migrations")]
async fn quote_is_detected_and_enqueued(pool: PgPool) {
    install_workspace(&pool, 10).await;
    let (detector, queue, chat) = (FakeDetector::accepting(), FakeQueue::working(), FakeChat::default());
    let intake = intake(&pool, &detector, &queue, &chat);

    let outcome = intake.handle(&message("less is more")).await.unwrap();

    let (quote_id, generation_id) = match outcome {
        IntakeOutcome::Enqueued {
            quote_id,
            generation_id,
            ..
        } => (quote_id, generation_id),
        other => panic!("expected Enqueued, got {other:?}"),
    };

    let job = queue.take_last();
    assert_eq!(job.quote_id, quote_id);
    assert_eq!(job.generation_id, generation_id);
    assert_eq!(job.output_size, 1024);
    assert_eq!(job.quality, "standard");
    assert!(job.style_id.is_some(), "random selection over seeded styles");

    // In-flight reaction was added.
    assert_eq!(
        chat.reactions.lock().unwrap().as_slice(),
        ["+hourglass_flowing_sand"]
    );
}

#[sqlx::test(migrations = "../db/migrations")]
async fn quota_denial_never_reaches_the_detector(pool: PgPool) {
    install_workspace(&pool, 0).await;
    let (detector, queue, chat) = (FakeDetector::accepting(), FakeQueue::working(), FakeChat::default());
    let intake = intake(&pool, &detector, &queue, &chat);

    let outcome = intake.handle(&message("brilliant words")).await.unwrap();

    assert_matches!(outcome, IntakeOutcome::QuotaExhausted);
    assert_eq!(detector.calls.load(Ordering::SeqCst), 0);
    assert!(queue.jobs.lock().unwrap().is_empty());
    assert_eq!(chat.ephemerals.lock().unwrap().len(), 1);
}

#[sqlx::test(migrations = "../db/migrations")]
async fn non_quote_creates_nothing(pool: PgPool) {
    let workspace = install_workspace(&pool, 10).await;
    let (detector, queue, chat) = (FakeDetector::rejecting(), FakeQueue::working(), FakeChat::default());
    let intake = intake(&pool, &detector, &queue, &chat);

    let outcome = intake.handle(&message("what time is standup?")).await.unwrap();

    assert_matches!(outcome, IntakeOutcome::NotAQuote);
    let existing = QuoteRepo::find_by_source(&pool, workspace.id, "1700000000.000100")
        .await
        .unwrap();
    assert!(existing.is_none());
}

#[sqlx::test(migrations = "../db/migrations")]
async fn redelivered_event_is_already_handled(pool: PgPool) {
    install_workspace(&pool, 10).await;
    let (detector, queue, chat) = (FakeDetector::accepting(), FakeQueue::working(), FakeChat::default());
    let intake = intake(&pool, &detector, &queue, &chat);

    let event = message("less is more");
    assert_matches!(
        intake.handle(&event).await.unwrap(),
        IntakeOutcome::Enqueued { .. }
    );
    assert_matches!(
        intake.handle(&event).await.unwrap(),
        IntakeOutcome::AlreadyHandled
    );
    assert_eq!(queue.jobs.lock().unwrap().len(), 1);
}

#[sqlx::test(migrations = "../db/migrations")]
async fn reconnection_flagged_workspace_is_silently_dropped(pool: PgPool) {
    let workspace = install_workspace(&pool, 10).await;
    WorkspaceRepo::set_needs_reconnection(&pool, workspace.id, true)
        .await
        .unwrap();
    let (detector, queue, chat) = (FakeDetector::accepting(), FakeQueue::working(), FakeChat::default());
    let intake = intake(&pool, &detector, &queue, &chat);

    let outcome = intake.handle(&message("less is more")).await.unwrap();

    // A revoked credential is a filter, not work: no detector spend,
    // no records, no job.
    assert_matches!(outcome, IntakeOutcome::UnknownWorkspace);
    assert_eq!(detector.calls.load(Ordering::SeqCst), 0);
    assert!(queue.jobs.lock().unwrap().is_empty());
    let existing = QuoteRepo::find_by_source(&pool, workspace.id, "1700000000.000100")
        .await
        .unwrap();
    assert!(existing.is_none());
}

#[sqlx::test(migrations = "../db/migrations")]
async fn unattributed_quote_falls_back_to_the_author_display_name(pool: PgPool) {
    let workspace = install_workspace(&pool, 10).await;
    let (detector, queue, chat) =
        (FakeDetector::accepting_unattributed(), FakeQueue::working(), FakeChat::default());
    let intake = intake(&pool, &detector, &queue, &chat);

    assert_matches!(
        intake.handle(&message("less is more")).await.unwrap(),
        IntakeOutcome::Enqueued { .. }
    );

    let quote = QuoteRepo::find_by_source(&pool, workspace.id, "1700000000.000100")
        .await
        .unwrap()
        .expect("quote row exists");
    assert_eq!(quote.attributed_to.as_deref(), Some("Sam Porter"));
    assert_eq!(queue.take_last().attributed_to.as_deref(), Some("Sam Porter"));
}

#[sqlx::test(migrations = "../db/migrations")]
async fn channel_ceiling_is_fail_closed(pool: PgPool) {
    // Free tier monitors at most 2 channels.
    install_workspace(&pool, 10).await;
    let (detector, queue, chat) = (FakeDetector::accepting(), FakeQueue::working(), FakeChat::default());
    let intake = intake(&pool, &detector, &queue, &chat);

    for channel in ["C_ONE", "C_TWO"] {
        let mut event = message("quotable thing");
        event.channel_id = channel.to_string();
        event.message_id = format!("{channel}-msg");
        assert_matches!(
            intake.handle(&event).await.unwrap(),
            IntakeOutcome::Enqueued { .. }
        );
    }

    let mut third = message("one too many");
    third.channel_id = "C_THREE".to_string();
    third.message_id = "C_THREE-msg".to_string();
    assert_matches!(
        intake.handle(&third).await.unwrap(),
        IntakeOutcome::ChannelCeilingReached
    );
}

#[sqlx::test(migrations = "../db/migrations")]
async fn enqueue_failure_fails_both_records(pool: PgPool) {
    let workspace = install_workspace(&pool, 10).await;
    let (detector, queue, chat) = (FakeDetector::accepting(), FakeQueue::broken(), FakeChat::default());
    let intake = intake(&pool, &detector, &queue, &chat);

    let result = intake.handle(&message("less is more")).await;
    assert!(result.is_err());

    let quote = QuoteRepo::find_by_source(&pool, workspace.id, "1700000000.000100")
        .await
        .unwrap()
        .expect("quote row exists");
    assert_eq!(quote.status, GenerationStatus::Failed.as_str());

    let generations = GenerationRepo::list_for_quote(&pool, quote.id).await.unwrap();
    assert_eq!(generations.len(), 1);
    assert_eq!(generations[0].status, GenerationStatus::Failed.as_str());
    assert!(generations[0].processing_error.is_some());
}

// ---------------------------------------------------------------------------
// Worker
// ---------------------------------------------------------------------------

async fn enqueue_one(pool: &PgPool, queue: &FakeQueue) -> GenerationJob {
    let detector = FakeDetector::accepting();
    let chat = FakeChat::default();
    let intake = intake(pool, &detector, queue, &chat);
    assert_matches!(
        intake.handle(&message("less is more")).await.unwrap(),
        IntakeOutcome::Enqueued { .. }
    );
    queue.take_last()
}

#[sqlx::test(migrations = "../db/migrations")]
async fn successful_delivery_posts_once_and_commits_quota(pool: PgPool) {
    let workspace = install_workspace(&pool, 10).await;
    let queue = FakeQueue::working();
    let job = enqueue_one(&pool, &queue).await;

    let (model, chat, blob) = (FakeModel::returning_png(), FakeChat::default(), FakeBlob::default());
    let worker = JobWorker::new(
        pool.clone(),
        &model,
        &chat,
        &blob,
        Arc::new(EventBus::default()),
    );

    let outcome = worker.process(&job).await.unwrap();
    assert_eq!(outcome, WorkerOutcome::Completed);

    let replies = chat.replies.lock().unwrap();
    assert_eq!(replies.len(), 1);
    assert_eq!(replies[0].channel_id, "C_GENERAL");
    assert_eq!(replies[0].root_id, job.source_message_id);
    assert!(replies[0].image_url.is_some());
    assert!(replies[0].text.contains("less is more"));
    drop(replies);

    assert_eq!(blob.uploads.load(Ordering::SeqCst), 1);

    let generation = GenerationRepo::find_by_id(&pool, job.generation_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(generation.status, GenerationStatus::Completed.as_str());
    assert!(generation.image_url.is_some());
    assert!(generation.prompt.is_some());

    let quote = QuoteRepo::find_by_id(&pool, job.quote_id).await.unwrap().unwrap();
    assert_eq!(quote.status, GenerationStatus::Completed.as_str());
    assert_eq!(quote.latest_image_url, generation.image_url);

    let period = quoteframe_core::entitlement::period_start(chrono::Utc::now());
    let used = UsageRepo::quotes_used(&pool, workspace.id, period).await.unwrap();
    assert_eq!(used, 1);
}

#[sqlx::test(migrations = "../db/migrations")]
async fn redelivered_job_is_a_noop(pool: PgPool) {
    let workspace = install_workspace(&pool, 10).await;
    let queue = FakeQueue::working();
    let job = enqueue_one(&pool, &queue).await;

    let (model, chat, blob) = (FakeModel::returning_png(), FakeChat::default(), FakeBlob::default());
    let worker = JobWorker::new(
        pool.clone(),
        &model,
        &chat,
        &blob,
        Arc::new(EventBus::default()),
    );

    assert_eq!(worker.process(&job).await.unwrap(), WorkerOutcome::Completed);
    // Second delivery: the model is out of scripted responses, so any
    // call would panic. The idempotency guard must prevent it.
    assert_eq!(worker.process(&job).await.unwrap(), WorkerOutcome::Skipped);

    assert_eq!(chat.replies.lock().unwrap().len(), 1);
    let period = quoteframe_core::entitlement::period_start(chrono::Utc::now());
    let used = UsageRepo::quotes_used(&pool, workspace.id, period).await.unwrap();
    assert_eq!(used, 1);
}

#[sqlx::test(migrations = "../db/migrations")]
async fn double_decline_posts_text_only_and_consumes_no_quota(pool: PgPool) {
    let workspace = install_workspace(&pool, 10).await;
    let queue = FakeQueue::working();
    let job = enqueue_one(&pool, &queue).await;

    let (model, chat, blob) = (FakeModel::always_declining(), FakeChat::default(), FakeBlob::default());
    let worker = JobWorker::new(
        pool.clone(),
        &model,
        &chat,
        &blob,
        Arc::new(EventBus::default()),
    );

    let outcome = worker.process(&job).await.unwrap();
    assert_eq!(outcome, WorkerOutcome::Declined);

    let replies = chat.replies.lock().unwrap();
    assert_eq!(replies.len(), 1);
    assert!(replies[0].image_url.is_none());
    assert!(replies[0].text.contains("less is more"));
    drop(replies);

    let generation = GenerationRepo::find_by_id(&pool, job.generation_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(generation.status, GenerationStatus::Failed.as_str());
    assert_eq!(
        generation.processing_error.as_deref(),
        Some(CONTENT_POLICY_DECLINED)
    );

    let period = quoteframe_core::entitlement::period_start(chrono::Utc::now());
    let used = UsageRepo::quotes_used(&pool, workspace.id, period).await.unwrap();
    assert_eq!(used, 0);
    assert_eq!(blob.uploads.load(Ordering::SeqCst), 0);
}

#[sqlx::test(migrations = "../db/migrations")]
async fn failed_later_attempt_leaves_a_completed_quote_completed(pool: PgPool) {
    install_workspace(&pool, 10).await;
    let queue = FakeQueue::working();
    let first = enqueue_one(&pool, &queue).await;

    let (model, chat, blob) = (FakeModel::returning_png(), FakeChat::default(), FakeBlob::default());
    let worker = JobWorker::new(
        pool.clone(),
        &model,
        &chat,
        &blob,
        Arc::new(EventBus::default()),
    );
    assert_eq!(worker.process(&first).await.unwrap(), WorkerOutcome::Completed);

    let second = GenerationRepo::create_attempt(&pool, first.quote_id, first.style_id, None)
        .await
        .unwrap();
    let retry_job = GenerationJob {
        generation_id: second.id,
        ..first.clone()
    };

    let (model, chat, blob) = (FakeModel::always_declining(), FakeChat::default(), FakeBlob::default());
    let worker = JobWorker::new(
        pool.clone(),
        &model,
        &chat,
        &blob,
        Arc::new(EventBus::default()),
    );
    assert_eq!(worker.process(&retry_job).await.unwrap(), WorkerOutcome::Declined);

    // The second attempt fails on its own; the quote keeps the artifact
    // it already has.
    let generation = GenerationRepo::find_by_id(&pool, second.id).await.unwrap().unwrap();
    assert_eq!(generation.status, GenerationStatus::Failed.as_str());

    let quote = QuoteRepo::find_by_id(&pool, first.quote_id).await.unwrap().unwrap();
    assert_eq!(quote.status, GenerationStatus::Completed.as_str());
    assert!(quote.latest_image_url.is_some());
}

// ---------------------------------------------------------------------------
// Mention regrant
// ---------------------------------------------------------------------------

fn mention_reply(root_id: &str, text: &str) -> ChatEvent {
    ChatEvent {
        team_id: "T_TEST".to_string(),
        channel_id: "C_GENERAL".to_string(),
        message_id: "1700000001.000500".to_string(),
        user_id: "U_HUMAN".to_string(),
        text: format!("<@U_BOT> {text}"),
        thread_root_id: Some(root_id.to_string()),
        subtype: None,
    }
}

#[sqlx::test(migrations = "../db/migrations")]
async fn mention_creates_a_second_attempt(pool: PgPool) {
    install_workspace(&pool, 10).await;
    let queue = FakeQueue::working();
    let first = enqueue_one(&pool, &queue).await;

    let (detector, chat) = (FakeDetector::accepting(), FakeChat::default());
    let intake = intake(&pool, &detector, &queue, &chat);

    let outcome = intake
        .handle(&mention_reply(&first.source_message_id, "another one"))
        .await
        .unwrap();

    let generation_id = match outcome {
        IntakeOutcome::Mention(MentionOutcome::Regranted {
            quote_id,
            generation_id,
            ..
        }) => {
            assert_eq!(quote_id, first.quote_id);
            generation_id
        }
        other => panic!("expected Regranted, got {other:?}"),
    };

    let generation = GenerationRepo::find_by_id(&pool, generation_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(generation.attempt_number, 2);

    // The anti-repeat policy avoided attempt 1's style (5 seeded styles,
    // 4 enabled, so an unused one must exist).
    assert_ne!(generation.style_id, first.style_id);

    let job = queue.take_last();
    assert_eq!(job.generation_id, generation_id);
    assert_eq!(job.quote_id, first.quote_id);
}

#[sqlx::test(migrations = "../db/migrations")]
async fn retry_keyword_opens_the_picker(pool: PgPool) {
    install_workspace(&pool, 10).await;
    let queue = FakeQueue::working();
    let first = enqueue_one(&pool, &queue).await;

    let (detector, chat) = (FakeDetector::accepting(), FakeChat::default());
    let intake = intake(&pool, &detector, &queue, &chat);

    let outcome = intake
        .handle(&mention_reply(&first.source_message_id, "retry please"))
        .await
        .unwrap();

    assert_matches!(outcome, IntakeOutcome::Mention(MentionOutcome::PickerShown));
    assert_eq!(queue.jobs.lock().unwrap().len(), 1, "no new job yet");

    let pickers = chat.pickers.lock().unwrap();
    assert_eq!(pickers.len(), 1);
    let used: Vec<_> = pickers[0].iter().filter(|s| s.already_used).collect();
    assert_eq!(used.len(), 1);
    assert_eq!(Some(used[0].style_id), first.style_id);
}

#[sqlx::test(migrations = "../db/migrations")]
async fn picker_selection_creates_exactly_one_attempt(pool: PgPool) {
    install_workspace(&pool, 10).await;
    let queue = FakeQueue::working();
    let first = enqueue_one(&pool, &queue).await;
    let chosen = first.style_id.expect("first attempt had a style");

    let (detector, chat) = (FakeDetector::accepting(), FakeChat::default());
    let intake = intake(&pool, &detector, &queue, &chat);

    let outcome = intake
        .complete_picker_selection(
            "T_TEST",
            "C_GENERAL",
            &first.source_message_id,
            "U_HUMAN",
            chosen,
        )
        .await
        .unwrap();

    let generation_id = match outcome {
        MentionOutcome::Regranted { generation_id, .. } => generation_id,
        other => panic!("expected Regranted, got {other:?}"),
    };

    let generation = GenerationRepo::find_by_id(&pool, generation_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(generation.attempt_number, 2);
    assert_eq!(generation.style_id, Some(chosen));
    assert_eq!(queue.jobs.lock().unwrap().len(), 2);
}

#[sqlx::test(migrations = "../db/migrations")]
async fn mention_on_unprocessed_root_materializes_the_quote(pool: PgPool) {
    let workspace = install_workspace(&pool, 10).await;
    // Get the channel created so the mention path finds it active.
    let queue = FakeQueue::working();
    enqueue_one(&pool, &queue).await;

    let (detector, chat) = (FakeDetector::accepting(), FakeChat::default());
    *chat.root_text.lock().unwrap() = Some("ship it and see".to_string());
    let intake = intake(&pool, &detector, &queue, &chat);

    let outcome = intake
        .handle(&mention_reply("1690000000.000009", "frame this"))
        .await
        .unwrap();

    let quote_id = match outcome {
        IntakeOutcome::Mention(MentionOutcome::Regranted { quote_id, .. }) => quote_id,
        other => panic!("expected Regranted, got {other:?}"),
    };

    let quote = QuoteRepo::find_by_id(&pool, quote_id).await.unwrap().unwrap();
    assert_eq!(quote.workspace_id, workspace.id);
    assert_eq!(quote.source_message_id, "1690000000.000009");
    assert_eq!(quote.quote_text, "ship it and see");
}
