use async_trait::async_trait;
use lookout_browser::mock::{MockContext, ScriptResponse};
use lookout_browser::{BrowserContext, HumanTiming, StealthSession};
use lookout_core::{
    AppConfig, BrowserSettings, Credentials, DelayRange, IntentAssessment, IntentLevel,
    IntentPipeline, LeadRecord, LeadSink, LookoutError, Platform, Post, PostKind, TimingConfig,
};
use lookout_scanner::extraction::EXTRACT_MARKER;
use lookout_scanner::{
    DefinitionAdapter, Discovery, LoginFailure, PlatformDefinition, RunStatus, ScanError,
    ScanOrchestrator, SiteAdapter,
};
use serde_json::json;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::Instant;

/// How a fake adapter's login behaves.
#[derive(Clone, Copy)]
enum LoginBehaviour {
    Succeed,
    Fail(LoginFailure),
    NoBrowser,
}

struct FakeAdapter {
    platform: Platform,
    login: LoginBehaviour,
    posts: Vec<Post>,
    rate_limited: bool,
    timing: Arc<HumanTiming>,
    discover_calls: AtomicUsize,
}

impl FakeAdapter {
    fn new(platform: Platform, posts: Vec<Post>) -> Self {
        Self {
            platform,
            login: LoginBehaviour::Succeed,
            posts,
            rate_limited: false,
            timing: instant_timing(),
            discover_calls: AtomicUsize::new(0),
        }
    }

    fn failing(platform: Platform, failure: LoginFailure) -> Self {
        Self {
            login: LoginBehaviour::Fail(failure),
            ..Self::new(platform, Vec::new())
        }
    }

    fn rate_limited(mut self) -> Self {
        self.rate_limited = true;
        self
    }
}

#[async_trait]
impl SiteAdapter for FakeAdapter {
    fn platform(&self) -> Platform {
        self.platform
    }

    async fn login(&self, context: &dyn BrowserContext) -> lookout_scanner::Result<StealthSession> {
        if let LoginBehaviour::NoBrowser = self.login {
            return Err(ScanError::Init("browser crashed".to_string()));
        }
        let mut session = StealthSession::open(
            context,
            self.platform,
            &BrowserSettings::default(),
            Arc::clone(&self.timing),
        )
        .await?;
        match self.login {
            LoginBehaviour::Fail(failure) => {
                session.close().await;
                Err(ScanError::login(self.platform, failure, "fake"))
            }
            _ => {
                session.mark_logged_in();
                Ok(session)
            }
        }
    }

    async fn discover(&self, _session: &mut StealthSession) -> Discovery {
        self.discover_calls.fetch_add(1, Ordering::SeqCst);
        Discovery {
            posts: self.posts.clone(),
            rate_limited: self.rate_limited,
        }
    }
}

/// Accepts posts mentioning "need"; fails on posts mentioning "explode".
#[derive(Default)]
struct KeywordPipeline {
    calls: AtomicUsize,
}

#[async_trait]
impl IntentPipeline for KeywordPipeline {
    async fn assess(&self, post: &Post) -> lookout_core::Result<IntentAssessment> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if post.content().contains("explode") {
            return Err(LookoutError::Pipeline("provider returned 500".to_string()));
        }
        if post.content().contains("need") {
            Ok(IntentAssessment {
                high_intent: true,
                intent_level: IntentLevel::Strong,
                confidence: 0.9,
                reasoning: "explicit need".to_string(),
                response: Some("Happy to help.".to_string()),
            })
        } else {
            Ok(IntentAssessment::rejected("no need expressed"))
        }
    }
}

#[derive(Default)]
struct MemorySink {
    records: Mutex<Vec<LeadRecord>>,
}

impl MemorySink {
    fn len(&self) -> usize {
        self.records.lock().unwrap().len()
    }
}

#[async_trait]
impl LeadSink for MemorySink {
    async fn append(&self, record: LeadRecord) -> lookout_core::Result<()> {
        self.records.lock().unwrap().push(record);
        Ok(())
    }
}

fn instant_timing() -> Arc<HumanTiming> {
    Arc::new(HumanTiming::seeded(TimingConfig::instant(), 42))
}

fn post(platform: Platform, n: u32, content: &str) -> Post {
    Post::new(
        content,
        &format!("https://{platform}.example.com/posts/{n}"),
        "",
        platform,
        PostKind::Post,
        10,
    )
    .unwrap()
}

fn orchestrator(
    adapters: Vec<Arc<dyn SiteAdapter>>,
    pipeline: &Arc<KeywordPipeline>,
    sink: &Arc<MemorySink>,
    timing: Arc<HumanTiming>,
) -> ScanOrchestrator {
    ScanOrchestrator::new(
        adapters,
        Arc::clone(pipeline) as Arc<dyn IntentPipeline>,
        Arc::clone(sink) as Arc<dyn LeadSink>,
        timing,
    )
}

#[tokio::test(start_paused = true)]
async fn test_only_high_intent_posts_are_counted_and_stored() {
    let context = MockContext::new();
    let pipeline = Arc::new(KeywordPipeline::default());
    let sink = Arc::new(MemorySink::default());
    let adapter = FakeAdapter::new(
        Platform::Reddit,
        vec![
            post(Platform::Reddit, 1, "we need a new website asap"),
            post(Platform::Reddit, 2, "just sharing my weekend photos"),
            post(Platform::Reddit, 3, "need recommendations for a CRM"),
        ],
    );

    let result = orchestrator(vec![Arc::new(adapter)], &pipeline, &sink, instant_timing())
        .run(&context)
        .await
        .expect("run");

    let reddit = &result.per_platform[&Platform::Reddit];
    assert_eq!(reddit.candidates, 3);
    assert_eq!(reddit.posts_found, 2);
    assert_eq!(sink.len(), 2);
    assert_eq!(pipeline.calls.load(Ordering::SeqCst), 3);
    assert_eq!(result.total_posts, 2);
    assert_eq!(result.status(), RunStatus::Completed);
}

#[tokio::test(start_paused = true)]
async fn test_verification_required_does_not_abort_run() {
    let context = MockContext::new();
    let pipeline = Arc::new(KeywordPipeline::default());
    let sink = Arc::new(MemorySink::default());
    let adapters: Vec<Arc<dyn SiteAdapter>> = vec![
        Arc::new(FakeAdapter::failing(
            Platform::LinkedIn,
            LoginFailure::VerificationRequired,
        )),
        Arc::new(FakeAdapter::new(
            Platform::Twitter,
            vec![post(Platform::Twitter, 1, "need a freelance designer")],
        )),
    ];

    let result = orchestrator(adapters, &pipeline, &sink, instant_timing())
        .run(&context)
        .await
        .expect("run");

    let linkedin = &result.per_platform[&Platform::LinkedIn];
    assert_eq!(linkedin.posts_found, 0);
    assert_eq!(linkedin.error.as_deref(), Some("verification_required"));
    assert_eq!(result.per_platform[&Platform::Twitter].posts_found, 1);
    assert_eq!(result.status(), RunStatus::PartiallyFailed);
    assert_eq!(result.failed_platforms(), vec![Platform::LinkedIn]);
}

#[tokio::test(start_paused = true)]
async fn test_total_is_sum_of_platforms_and_sessions_are_released() {
    let context = MockContext::new();
    let pipeline = Arc::new(KeywordPipeline::default());
    let sink = Arc::new(MemorySink::default());
    let adapters: Vec<Arc<dyn SiteAdapter>> = vec![
        Arc::new(FakeAdapter::new(
            Platform::Facebook,
            vec![
                post(Platform::Facebook, 1, "need a plumber in Austin"),
                post(Platform::Facebook, 2, "need a bookkeeper for my shop"),
            ],
        )),
        Arc::new(FakeAdapter::failing(
            Platform::LinkedIn,
            LoginFailure::CredentialsRejected,
        )),
        Arc::new(FakeAdapter::new(
            Platform::YouTube,
            vec![post(Platform::YouTube, 1, "need someone to edit my videos")],
        )),
    ];

    let result = orchestrator(adapters, &pipeline, &sink, instant_timing())
        .run(&context)
        .await
        .expect("run");

    let sum: usize = result.per_platform.values().map(|r| r.posts_found).sum();
    assert_eq!(result.total_posts, sum);
    assert_eq!(result.total_posts, 3);
    assert_eq!(result.per_platform.len(), 3);
    assert_eq!(context.pages_opened(), 3);
    assert_eq!(context.close_count(), 3);
}

#[tokio::test(start_paused = true)]
async fn test_unavailable_browser_aborts_before_any_platform() {
    let context = MockContext::unavailable();
    let pipeline = Arc::new(KeywordPipeline::default());
    let sink = Arc::new(MemorySink::default());
    let adapter = Arc::new(FakeAdapter::new(Platform::Reddit, Vec::new()));

    let result = orchestrator(
        vec![Arc::clone(&adapter) as Arc<dyn SiteAdapter>],
        &pipeline,
        &sink,
        instant_timing(),
    )
    .run(&context)
    .await;

    assert!(matches!(result, Err(ScanError::Init(_))));
    assert_eq!(context.pages_opened(), 0);
    assert_eq!(adapter.discover_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test(start_paused = true)]
async fn test_init_error_on_first_platform_aborts_run() {
    let context = MockContext::new();
    let pipeline = Arc::new(KeywordPipeline::default());
    let sink = Arc::new(MemorySink::default());
    let crashed = FakeAdapter {
        login: LoginBehaviour::NoBrowser,
        ..FakeAdapter::new(Platform::Facebook, Vec::new())
    };
    let later = Arc::new(FakeAdapter::new(Platform::Reddit, Vec::new()));

    let result = orchestrator(
        vec![Arc::new(crashed), Arc::clone(&later) as Arc<dyn SiteAdapter>],
        &pipeline,
        &sink,
        instant_timing(),
    )
    .run(&context)
    .await;

    assert!(matches!(result, Err(ScanError::Init(_))));
    assert_eq!(later.discover_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test(start_paused = true)]
async fn test_browser_lost_mid_run_keeps_earlier_results() {
    let context = MockContext::new();
    let pipeline = Arc::new(KeywordPipeline::default());
    let sink = Arc::new(MemorySink::default());
    let first = FakeAdapter::new(
        Platform::Facebook,
        vec![post(Platform::Facebook, 1, "we need a new CRM before Q3")],
    );
    let crashed = FakeAdapter {
        login: LoginBehaviour::NoBrowser,
        ..FakeAdapter::new(Platform::Reddit, Vec::new())
    };
    let later = Arc::new(FakeAdapter::new(
        Platform::YouTube,
        vec![post(Platform::YouTube, 2, "need a video editor asap")],
    ));

    let result = orchestrator(
        vec![
            Arc::new(first),
            Arc::new(crashed),
            Arc::clone(&later) as Arc<dyn SiteAdapter>,
        ],
        &pipeline,
        &sink,
        instant_timing(),
    )
    .run(&context)
    .await
    .expect("partial result is returned");

    assert_eq!(sink.len(), 1);
    assert_eq!(result.total_posts, 1);
    assert_eq!(result.status(), RunStatus::PartiallyFailed);
    assert!(result.per_platform[&Platform::Facebook].is_success());

    let reddit = &result.per_platform[&Platform::Reddit];
    assert!(reddit.error.as_deref().is_some_and(|e| e.contains("browser crashed")));
    let youtube = &result.per_platform[&Platform::YouTube];
    assert_eq!(youtube.error, reddit.error);
    assert_eq!(youtube.posts_found, 0);
    assert_eq!(later.discover_calls.load(Ordering::SeqCst), 0);
    assert_eq!(
        result.failed_platforms(),
        vec![Platform::Reddit, Platform::YouTube]
    );
}

#[tokio::test(start_paused = true)]
async fn test_halt_on_rate_limit_skips_remaining_platforms() {
    let context = MockContext::new();
    let pipeline = Arc::new(KeywordPipeline::default());
    let sink = Arc::new(MemorySink::default());
    let adapters: Vec<Arc<dyn SiteAdapter>> = vec![
        Arc::new(
            FakeAdapter::new(
                Platform::Facebook,
                vec![post(Platform::Facebook, 1, "need a caterer for friday")],
            )
            .rate_limited(),
        ),
        Arc::new(FakeAdapter::new(Platform::Twitter, Vec::new())),
    ];

    let result = orchestrator(adapters, &pipeline, &sink, instant_timing())
        .with_halt_on_rate_limit(true)
        .run(&context)
        .await
        .expect("run");

    let facebook = &result.per_platform[&Platform::Facebook];
    assert!(facebook.rate_limited);
    assert!(facebook.error.is_none());
    assert_eq!(facebook.posts_found, 1);
    assert_eq!(
        result.per_platform[&Platform::Twitter].error.as_deref(),
        Some("skipped: rate limit detected on facebook")
    );
    assert_eq!(context.pages_opened(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_rate_limit_without_halt_continues() {
    let context = MockContext::new();
    let pipeline = Arc::new(KeywordPipeline::default());
    let sink = Arc::new(MemorySink::default());
    let adapters: Vec<Arc<dyn SiteAdapter>> = vec![
        Arc::new(FakeAdapter::new(Platform::Facebook, Vec::new()).rate_limited()),
        Arc::new(FakeAdapter::new(Platform::Twitter, Vec::new())),
    ];

    let result = orchestrator(adapters, &pipeline, &sink, instant_timing())
        .run(&context)
        .await
        .expect("run");

    assert!(result.per_platform[&Platform::Twitter].is_success());
    assert_eq!(result.status(), RunStatus::Completed);
    assert_eq!(context.pages_opened(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_cooldown_only_after_posts_found() {
    let mut config = TimingConfig::instant();
    config.cooldown = DelayRange::new(600_000, 600_000);
    let timing = Arc::new(HumanTiming::seeded(config, 1));

    let context = MockContext::new();
    let pipeline = Arc::new(KeywordPipeline::default());
    let sink = Arc::new(MemorySink::default());

    let quiet: Vec<Arc<dyn SiteAdapter>> = vec![
        Arc::new(FakeAdapter::new(Platform::Facebook, Vec::new())),
        Arc::new(FakeAdapter::new(Platform::Twitter, Vec::new())),
    ];
    let started = Instant::now();
    orchestrator(quiet, &pipeline, &sink, Arc::clone(&timing))
        .run(&context)
        .await
        .expect("run");
    assert!(started.elapsed() < Duration::from_secs(600));

    let busy: Vec<Arc<dyn SiteAdapter>> = vec![
        Arc::new(FakeAdapter::new(
            Platform::Facebook,
            vec![post(Platform::Facebook, 1, "need a wedding photographer")],
        )),
        Arc::new(FakeAdapter::new(Platform::Twitter, Vec::new())),
        Arc::new(FakeAdapter::new(Platform::Reddit, Vec::new())),
    ];
    let started = Instant::now();
    orchestrator(busy, &pipeline, &sink, timing)
        .run(&context)
        .await
        .expect("run");
    let elapsed = started.elapsed();
    assert!(elapsed >= Duration::from_secs(1200));
    assert!(elapsed < Duration::from_secs(1800));
}

#[tokio::test(start_paused = true)]
async fn test_pipeline_errors_skip_single_post() {
    let context = MockContext::new();
    let pipeline = Arc::new(KeywordPipeline::default());
    let sink = Arc::new(MemorySink::default());
    let adapter = FakeAdapter::new(
        Platform::Reddit,
        vec![
            post(Platform::Reddit, 1, "this one will explode the model"),
            post(Platform::Reddit, 2, "need help migrating to Shopify"),
        ],
    );

    let result = orchestrator(vec![Arc::new(adapter)], &pipeline, &sink, instant_timing())
        .run(&context)
        .await
        .expect("run");

    let reddit = &result.per_platform[&Platform::Reddit];
    assert_eq!(reddit.posts_found, 1);
    assert!(reddit.error.is_none());
}

#[tokio::test(start_paused = true)]
async fn test_duplicate_adapters_and_item_cap() {
    let context = MockContext::new();
    let pipeline = Arc::new(KeywordPipeline::default());
    let sink = Arc::new(MemorySink::default());
    let posts: Vec<Post> = (1..=5)
        .map(|n| post(Platform::Reddit, n, "need a logo designer"))
        .collect();
    let adapters: Vec<Arc<dyn SiteAdapter>> = vec![
        Arc::new(FakeAdapter::new(Platform::Reddit, posts.clone())),
        Arc::new(FakeAdapter::new(Platform::Reddit, posts)),
    ];

    let orchestrator = orchestrator(adapters, &pipeline, &sink, instant_timing())
        .with_max_items_per_platform(Some(3));
    assert_eq!(orchestrator.platforms(), vec![Platform::Reddit]);

    let result = orchestrator.run(&context).await.expect("run");
    assert_eq!(result.per_platform[&Platform::Reddit].candidates, 5);
    assert_eq!(result.total_posts, 3);
    assert_eq!(sink.len(), 3);
}

const FEED_DEFINITION: &str = r##"
[platform]
id = "twitter"
name = "Twitter"
login_url = "https://x.com/i/flow/login"
home_url = "https://x.com/home"

[login]
success_selector = '[data-testid="primaryColumn"]'
steps = [
  { action = "type", selector = 'input[name="password"]', field = "password" },
]

[extractions.timeline]
item_selector = '[data-testid="tweet"]'
content_selectors = ['[data-testid="tweetText"]']
link_selectors = ["time"]

[[sources]]
url = "https://x.com/home"
extraction = "timeline"
scroll_budget = 6
"##;

#[tokio::test(start_paused = true)]
async fn test_discovery_failure_keeps_collected_posts() {
    let context = MockContext::new();
    context.set_present(r#"input[name="password"]"#);
    context.set_present(r#"[data-testid="primaryColumn"]"#);
    context.on_script(
        EXTRACT_MARKER,
        vec![
            ScriptResponse::Value(json!([
                {"content": "need a VA for inbox triage", "link": "https://x.com/a/status/1"},
                {"content": "need a video editor this week", "link": "https://x.com/b/status/2"},
            ])),
            ScriptResponse::Value(json!([
                {"content": "need a video editor this week", "link": "https://x.com/b/status/2"},
                {"content": "need a copywriter for launch", "link": "https://x.com/c/status/3"},
                {"content": "need a lawyer for incorporation", "link": "https://x.com/d/status/4"},
            ])),
            ScriptResponse::Fail("Target closed".to_string()),
        ],
    );

    let definition: PlatformDefinition = toml::from_str(FEED_DEFINITION).unwrap();
    let mut config = AppConfig::default();
    config.timing = TimingConfig::instant();
    let adapter = DefinitionAdapter::new(
        Arc::new(definition),
        Some(Credentials::new("someone", "secret")),
        &config,
        instant_timing(),
    );

    let pipeline = Arc::new(KeywordPipeline::default());
    let sink = Arc::new(MemorySink::default());
    let result = orchestrator(vec![Arc::new(adapter)], &pipeline, &sink, instant_timing())
        .run(&context)
        .await
        .expect("run");

    let twitter = &result.per_platform[&Platform::Twitter];
    assert_eq!(twitter.candidates, 4);
    assert_eq!(twitter.posts_found, 4);
    assert!(twitter.error.is_none());
    assert_eq!(context.evaluations_matching(EXTRACT_MARKER), 3);
    assert_eq!(context.close_count(), 1);
}
