//! Scroll-and-accumulate content collection.
//!
//! [`PaginationCollector`] runs a fixed number of extract, filter, merge,
//! scroll and settle iterations over one page. There is no convergence
//! detection: the loop always stops after the configured budget, even
//! while new content is still appearing. This caps the time spent per
//! source at the price of missing whatever lies further down.

use crate::definition::ExtractionSpec;
use crate::extraction::{build_extraction_script, parse_items, RawItem};
use lookout_browser::StealthSession;
use lookout_core::{DelayRange, Platform, Post, PostKind};
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, trace, warn};

/// Extra acceptance test supplied by an adapter.
pub type PostPredicate = Arc<dyn Fn(&Post) -> bool + Send + Sync>;

/// Decides which extracted items become posts.
#[derive(Clone)]
pub struct PostFilter {
    min_content_len: usize,
    promotional_markers: Vec<String>,
    skip_prefixes: Vec<String>,
    strip_suffixes: Vec<String>,
    predicate: Option<PostPredicate>,
}

impl PostFilter {
    #[must_use]
    pub fn new(min_content_len: usize) -> Self {
        Self {
            min_content_len,
            promotional_markers: Vec::new(),
            skip_prefixes: Vec::new(),
            strip_suffixes: Vec::new(),
            predicate: None,
        }
    }

    /// Filter configured from an extraction recipe.
    #[must_use]
    pub fn from_spec(spec: &ExtractionSpec, min_content_len: usize) -> Self {
        Self {
            min_content_len,
            promotional_markers: spec
                .promotional_markers
                .iter()
                .map(|m| m.to_lowercase())
                .collect(),
            skip_prefixes: spec.skip_prefixes.clone(),
            strip_suffixes: spec.strip_suffixes.clone(),
            predicate: None,
        }
    }

    #[must_use]
    pub fn with_markers<I, S>(mut self, markers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.promotional_markers = markers
            .into_iter()
            .map(|m| m.as_ref().to_lowercase())
            .collect();
        self
    }

    #[must_use]
    pub fn with_predicate(mut self, predicate: PostPredicate) -> Self {
        self.predicate = Some(predicate);
        self
    }

    /// Turn one raw item into a post, or `None` if it should be dropped.
    pub fn accept(&self, item: RawItem, platform: Platform, default_kind: PostKind) -> Option<Post> {
        if item.promoted {
            trace!(%platform, link = %item.link, "Dropped promoted item");
            return None;
        }

        let content = self.strip_suffixes(item.content.trim());
        if self
            .skip_prefixes
            .iter()
            .any(|prefix| content.starts_with(prefix.as_str()))
        {
            return None;
        }

        let lowered = content.to_lowercase();
        if self
            .promotional_markers
            .iter()
            .any(|marker| lowered.contains(marker.as_str()))
        {
            trace!(%platform, link = %item.link, "Dropped promotional content");
            return None;
        }

        let post = match Post::new(
            content,
            &item.link,
            &item.profile_link,
            platform,
            item.kind.unwrap_or(default_kind),
            self.min_content_len,
        ) {
            Ok(post) => post,
            Err(e) => {
                trace!(%platform, "Rejected item: {}", e);
                return None;
            }
        };

        match &self.predicate {
            Some(predicate) if !predicate(&post) => None,
            _ => Some(post),
        }
    }

    fn strip_suffixes<'a>(&self, content: &'a str) -> &'a str {
        let mut content = content;
        for suffix in &self.strip_suffixes {
            let lowered_suffix = suffix.to_lowercase();
            if content.len() >= suffix.len() {
                let split = content.len() - suffix.len();
                if content.is_char_boundary(split)
                    && content[split..].to_lowercase() == lowered_suffix
                {
                    content = content[..split].trim_end();
                }
            }
        }
        content
    }
}

impl fmt::Debug for PostFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PostFilter")
            .field("min_content_len", &self.min_content_len)
            .field("promotional_markers", &self.promotional_markers)
            .field("skip_prefixes", &self.skip_prefixes)
            .field("strip_suffixes", &self.strip_suffixes)
            .field("predicate", &self.predicate.is_some())
            .finish()
    }
}

/// Ordered, link-deduplicated post buffer.
///
/// The first post seen for a link wins and keeps its position.
#[derive(Debug, Default)]
pub struct PostAccumulator {
    posts: Vec<Post>,
    links: HashSet<String>,
}

impl PostAccumulator {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add posts whose link has not been seen; returns how many were added.
    pub fn merge<I>(&mut self, posts: I) -> usize
    where
        I: IntoIterator<Item = Post>,
    {
        let mut added = 0;
        for post in posts {
            if self.links.insert(post.link().to_string()) {
                self.posts.push(post);
                added += 1;
            }
        }
        added
    }

    #[must_use]
    pub fn contains(&self, link: &str) -> bool {
        self.links.contains(link)
    }

    #[must_use]
    pub fn posts(&self) -> &[Post] {
        &self.posts
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.posts.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.posts.is_empty()
    }

    #[must_use]
    pub fn into_posts(self) -> Vec<Post> {
        self.posts
    }
}

/// What one collection pass did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CollectOutcome {
    /// Extraction iterations started
    pub iterations: u32,
    /// Posts newly added to the accumulator
    pub added: usize,
    /// The page showed throttling text
    pub rate_limited: bool,
    /// Error that ended the loop early
    pub error: Option<String>,
}

/// Bounded scroll-paginated collector for one extraction recipe.
#[derive(Debug, Clone)]
pub struct PaginationCollector {
    spec: ExtractionSpec,
    script: String,
    filter: PostFilter,
    budget: u32,
    settle: DelayRange,
    scroll_viewports: f64,
}

impl PaginationCollector {
    #[must_use]
    pub fn new(spec: ExtractionSpec, filter: PostFilter, budget: u32, settle: DelayRange) -> Self {
        let script = build_extraction_script(&spec);
        Self {
            spec,
            script,
            filter,
            budget,
            settle,
            scroll_viewports: 2.0,
        }
    }

    /// Scroll distance per iteration, in viewport heights.
    #[must_use]
    pub fn with_scroll_viewports(mut self, viewports: f64) -> Self {
        self.scroll_viewports = viewports;
        self
    }

    #[must_use]
    pub fn budget(&self) -> u32 {
        self.budget
    }

    /// Run exactly `budget` iterations unless extraction fails or a rate
    /// limit shows up. Whatever was merged before an early stop is kept.
    pub async fn collect(
        &self,
        session: &StealthSession,
        accumulator: &mut PostAccumulator,
    ) -> CollectOutcome {
        let platform = session.platform();
        let mut outcome = CollectOutcome::default();

        for iteration in 1..=self.budget {
            outcome.iterations = iteration;

            let items = match session.evaluate(&self.script).await {
                Ok(value) => match parse_items(value) {
                    Ok(items) => items,
                    Err(e) => {
                        warn!(%platform, iteration, "Unreadable extraction result: {}", e);
                        outcome.error = Some(format!("unreadable extraction result: {e}"));
                        break;
                    }
                },
                Err(e) => {
                    warn!(%platform, iteration, "Extraction failed: {}", e);
                    outcome.error = Some(e.to_string());
                    break;
                }
            };

            let seen = items.len();
            let posts: Vec<Post> = items
                .into_iter()
                .filter_map(|mut item| {
                    item.normalize(&self.spec);
                    self.filter.accept(item, platform, self.spec.kind)
                })
                .collect();
            let added = accumulator.merge(posts);
            outcome.added += added;

            debug!(
                %platform,
                iteration,
                budget = self.budget,
                seen,
                added,
                total = accumulator.len(),
                "Extracted items"
            );

            let distance = self.scroll_distance(session);
            if let Err(e) = session.scroll(distance).await {
                warn!(%platform, iteration, "Scroll failed: {}", e);
                outcome.error = Some(e.to_string());
                break;
            }
            session.timing().pause_range(self.settle).await;

            if session.detect_rate_limit().await {
                outcome.rate_limited = true;
                break;
            }
        }

        outcome
    }

    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    fn scroll_distance(&self, session: &StealthSession) -> u32 {
        let height = f64::from(session.fingerprint().viewport_height);
        (height * self.scroll_viewports).round().max(1.0) as u32
    }
}
