//! The keyword pipeline.
//!
//! One run reads a listing page, then handles its entries strictly one after
//! another:
//! 1. **Fetch** the article page (retried by the article source)
//! 2. **Extract** the body text; a page without body is reported and skipped
//! 3. **Ask** the model for keywords (no retry, a failure ends the run)
//! 4. **Emit** the finished item to the [`ItemSink`] right away
//!
//! The listing page is fetched once, without retries. If it answers with an
//! error status the run ends early with no items; every other fetch failure
//! ends the run with an error.

use crate::api::{CompletionError, CompletionService};
use crate::fetch::{FetchError, PageSource};
use crate::keywords::KeywordRequester;
use crate::models::{DedupPolicy, ItemError, Keywords, NewsItem};
use crate::scrapers::article::{extract_article, extract_joined};
use crate::scrapers::listing::{DEFAULT_BASE_URL, ListingStrategy, extract_listing};
use scraper::{Html, Selector};
use std::io;
use thiserror::Error;
use tracing::{debug, error, info, instrument, warn};

/// Errors that stop a run.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("failed to fetch listing page {url}: {source}")]
    Listing {
        url: String,
        #[source]
        source: FetchError,
    },

    #[error("failed to fetch article {url}: {source}")]
    Article {
        url: String,
        #[source]
        source: FetchError,
    },

    #[error("keyword request failed for {url}: {source}")]
    Keywords {
        url: String,
        #[source]
        source: CompletionError,
    },

    #[error(transparent)]
    Item(#[from] ItemError),

    #[error("failed to render output: {0}")]
    Sink(#[from] io::Error),
}

/// Receives run progress as it happens.
pub trait ItemSink {
    /// The listing page answered with a non-success status.
    fn listing_failed(&mut self, url: &str, status: u16) -> io::Result<()>;

    /// The listing page had no entries.
    fn listing_empty(&mut self, url: &str) -> io::Result<()>;

    /// An item is done. `index` counts from zero in listing order.
    fn item(&mut self, index: usize, item: &NewsItem) -> io::Result<()>;
}

/// Knobs of a run that are not part of the listing choice.
#[derive(Debug, Clone)]
pub struct PipelineOptions {
    /// Portal root the listing URL templates are expanded against.
    pub base_url: String,
    pub delimiter: String,
    pub dedup: DedupPolicy,
    /// Only the first `limit` listing entries are processed.
    pub limit: Option<usize>,
    /// Read the body from every element matching this selector instead of
    /// the single `#dic_area` container.
    pub content_selector: Option<Selector>,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            delimiter: ",".to_string(),
            dedup: DedupPolicy::default(),
            limit: None,
            content_selector: None,
        }
    }
}

/// One listing run. `L` reads the listing page, `S` the article pages.
#[derive(Debug)]
pub struct Pipeline<L, S, C> {
    listing_source: L,
    article_source: S,
    requester: KeywordRequester<C>,
    options: PipelineOptions,
}

impl<L, S, C> Pipeline<L, S, C>
where
    L: PageSource,
    S: PageSource,
    C: CompletionService,
{
    pub fn new(
        listing_source: L,
        article_source: S,
        requester: KeywordRequester<C>,
        options: PipelineOptions,
    ) -> Self {
        Self {
            listing_source,
            article_source,
            requester,
            options,
        }
    }

    /// Run the pipeline for one listing and return the processed items.
    #[instrument(level = "info", skip(self, sink))]
    pub async fn run<K: ItemSink>(
        &self,
        strategy: &ListingStrategy,
        sink: &mut K,
    ) -> Result<Vec<NewsItem>, PipelineError> {
        let listing_url = strategy.listing_url(&self.options.base_url);

        let page = match self.listing_source.get(&listing_url).await {
            Ok(page) => page,
            Err(source) => match source.status() {
                Some(status) => {
                    error!(url = %listing_url, status, "Listing page returned an error status");
                    sink.listing_failed(&listing_url, status)?;
                    return Ok(Vec::new());
                }
                None => {
                    return Err(PipelineError::Listing {
                        url: listing_url,
                        source,
                    });
                }
            },
        };

        let mut entries = {
            let document = Html::parse_document(&page.body);
            extract_listing(&document, &page.url, strategy.layout())
        };
        if let Some(limit) = self.options.limit {
            entries.truncate(limit);
        }
        if entries.is_empty() {
            warn!(url = %listing_url, "Listing page has no headlines");
            sink.listing_empty(&listing_url)?;
            return Ok(Vec::new());
        }

        info!(count = entries.len(), "Processing listing entries");
        let mut items = Vec::with_capacity(entries.len());
        for (index, entry) in entries.into_iter().enumerate() {
            let item = self.process(index, entry.into()).await?;
            sink.item(index, &item)?;
            items.push(item);
        }

        info!(count = items.len(), "Run complete");
        Ok(items)
    }

    #[instrument(level = "info", skip_all, fields(index = index, url = %item.url()))]
    async fn process(&self, index: usize, mut item: NewsItem) -> Result<NewsItem, PipelineError> {
        let page = self
            .article_source
            .get(item.url())
            .await
            .map_err(|source| PipelineError::Article {
                url: item.url().to_string(),
                source,
            })?;

        debug!(status = page.status, bytes = page.body.len(), "Fetched article page");

        let content = {
            let document = Html::parse_document(&page.body);
            match &self.options.content_selector {
                Some(selector) => extract_joined(&document, selector),
                None => extract_article(&document),
            }
        };
        let Some(content) = content else {
            warn!("Article content not found; skipping keyword extraction");
            return Ok(item);
        };
        debug!(bytes = content.len(), "Extracted article content");

        let raw = self
            .requester
            .request_keywords(&content)
            .await
            .map_err(|source| PipelineError::Keywords {
                url: item.url().to_string(),
                source,
            })?;

        let keywords = Keywords::parse_answer(
            raw,
            self.requester.template().answer_format(),
            &self.options.delimiter,
            self.options.dedup,
        );
        item.set_content(content);
        item.set_keywords(keywords)?;
        Ok(item)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::ChatMessage;
    use crate::fetch::{Page, RetryFetch, RetryPolicy, Sleeper};
    use crate::outputs::terminal::TerminalSink;
    use crate::prompts::PromptTemplate;
    use crate::scrapers::listing::Section;
    use std::cell::RefCell;
    use std::collections::HashMap;
    use std::time::Duration;

    enum Reply {
        Body(&'static str),
        Status(u16),
    }

    /// Serves canned pages by URL and remembers what was asked for.
    #[derive(Default)]
    struct FakePortal {
        pages: HashMap<String, Reply>,
        requested: RefCell<Vec<String>>,
    }

    impl FakePortal {
        fn with(mut self, url: &str, reply: Reply) -> Self {
            self.pages.insert(url.to_string(), reply);
            self
        }
    }

    impl PageSource for FakePortal {
        async fn get(&self, url: &str) -> Result<Page, FetchError> {
            self.requested.borrow_mut().push(url.to_string());
            match self.pages.get(url) {
                Some(Reply::Body(body)) => Ok(Page {
                    url: url.to_string(),
                    status: 200,
                    body: body.to_string(),
                }),
                Some(Reply::Status(status)) => Err(FetchError::Status {
                    status: *status,
                    url: url.to_string(),
                }),
                None => Err(FetchError::Status {
                    status: 404,
                    url: url.to_string(),
                }),
            }
        }
    }

    /// Answers every completion with the same text, or fails every call.
    struct FakeModel {
        answer: Option<&'static str>,
        prompts: RefCell<Vec<Vec<ChatMessage>>>,
    }

    impl FakeModel {
        fn answering(answer: &'static str) -> Self {
            Self {
                answer: Some(answer),
                prompts: RefCell::new(Vec::new()),
            }
        }

        fn failing() -> Self {
            Self {
                answer: None,
                prompts: RefCell::new(Vec::new()),
            }
        }
    }

    impl CompletionService for FakeModel {
        async fn complete(
            &self,
            _model: &str,
            messages: &[ChatMessage],
        ) -> Result<String, CompletionError> {
            self.prompts.borrow_mut().push(messages.to_vec());
            self.answer
                .map(str::to_string)
                .ok_or(CompletionError::Status {
                    status: 500,
                    body: "model unavailable".to_string(),
                })
        }
    }

    #[derive(Default)]
    struct Recorder {
        failed: Vec<(String, u16)>,
        empty: Vec<String>,
        items: Vec<(usize, NewsItem)>,
    }

    impl ItemSink for Recorder {
        fn listing_failed(&mut self, url: &str, status: u16) -> io::Result<()> {
            self.failed.push((url.to_string(), status));
            Ok(())
        }

        fn listing_empty(&mut self, url: &str) -> io::Result<()> {
            self.empty.push(url.to_string());
            Ok(())
        }

        fn item(&mut self, index: usize, item: &NewsItem) -> io::Result<()> {
            self.items.push((index, item.clone()));
            Ok(())
        }
    }

    const STRATEGY: ListingStrategy = ListingStrategy::ByCategory(Section::ItScience);
    const LISTING_URL: &str = "https://news.naver.com/main/main.nhn?mode=LSD&mid=shm&sid1=105";
    const ARTICLE_1: &str = "https://n.news.naver.com/article/001/1";
    const ARTICLE_2: &str = "https://n.news.naver.com/article/002/2";

    const ONE_ITEM_LISTING: &str = r#"
        <div class="sh_text"><a href="https://n.news.naver.com/article/001/1">Apple unveils headset</a></div>"#;

    const TWO_ITEM_LISTING: &str = r#"
        <div class="sh_text"><a href="https://n.news.naver.com/article/001/1">Apple unveils headset</a></div>
        <div class="sh_text"><a href="https://n.news.naver.com/article/002/2">Chip exports rise</a></div>"#;

    const VISION_PRO_ARTICLE: &str = r#"
        <div id="dic_area">Apple launched Vision Pro<span class="caption">Photo: Apple</span></div>"#;

    const NO_BODY_ARTICLE: &str = r#"<div class="video_player">video only</div>"#;

    fn pipeline<'a>(
        portal: &'a FakePortal,
        model: &'a FakeModel,
        options: PipelineOptions,
    ) -> Pipeline<&'a FakePortal, &'a FakePortal, &'a FakeModel> {
        let requester = KeywordRequester::new(model, "gpt-3.5-turbo", PromptTemplate::GenericKeywords);
        Pipeline::new(portal, portal, requester, options)
    }

    /// Returns immediately so retry tests run without waiting.
    struct NoWait;

    impl Sleeper for NoWait {
        async fn sleep(&self, _delay: Duration) {}
    }

    #[tokio::test]
    async fn test_end_to_end_renders_deduplicated_keywords() {
        let portal = FakePortal::default()
            .with(LISTING_URL, Reply::Body(ONE_ITEM_LISTING))
            .with(ARTICLE_1, Reply::Body(VISION_PRO_ARTICLE));
        let model = FakeModel::answering("Vision Pro, Apple, Vision Pro");
        let mut out = Vec::new();

        let items = {
            let mut sink = TerminalSink::new(&mut out, false);
            pipeline(&portal, &model, PipelineOptions::default())
                .run(&STRATEGY, &mut sink)
                .await
                .unwrap()
        };

        assert_eq!(items.len(), 1);
        assert_eq!(items[0].content(), Some("Apple launched Vision Pro"));
        let keywords = items[0].keywords().unwrap();
        assert_eq!(keywords.raw, "Vision Pro, Apple, Vision Pro");
        assert_eq!(keywords.terms, vec!["Vision Pro", "Apple"]);

        let prompts = model.prompts.borrow();
        assert_eq!(prompts.len(), 1);
        assert!(prompts[0][1].content.contains("Apple launched Vision Pro"));

        let rendered = String::from_utf8(out).unwrap();
        assert!(rendered.contains("1. Apple unveils headset"));
        assert!(rendered.contains("Keywords: Vision Pro | Apple\n"));
        assert_eq!(rendered.matches("Vision Pro |").count(), 1);
    }

    #[tokio::test]
    async fn test_listing_error_status_returns_empty() {
        let portal = FakePortal::default().with(LISTING_URL, Reply::Status(503));
        let model = FakeModel::answering("unused");
        let mut sink = Recorder::default();

        let items = pipeline(&portal, &model, PipelineOptions::default())
            .run(&STRATEGY, &mut sink)
            .await
            .unwrap();

        assert!(items.is_empty());
        assert_eq!(sink.failed, vec![(LISTING_URL.to_string(), 503)]);
        assert!(model.prompts.borrow().is_empty());
        assert_eq!(*portal.requested.borrow(), vec![LISTING_URL.to_string()]);
    }

    #[tokio::test]
    async fn test_empty_listing_is_reported() {
        let portal = FakePortal::default().with(LISTING_URL, Reply::Body("<p>maintenance</p>"));
        let model = FakeModel::answering("unused");
        let mut sink = Recorder::default();

        let items = pipeline(&portal, &model, PipelineOptions::default())
            .run(&STRATEGY, &mut sink)
            .await
            .unwrap();

        assert!(items.is_empty());
        assert_eq!(sink.empty, vec![LISTING_URL.to_string()]);
    }

    #[tokio::test]
    async fn test_missing_content_skips_keywords_and_continues() {
        let portal = FakePortal::default()
            .with(LISTING_URL, Reply::Body(TWO_ITEM_LISTING))
            .with(ARTICLE_1, Reply::Body(NO_BODY_ARTICLE))
            .with(ARTICLE_2, Reply::Body(VISION_PRO_ARTICLE));
        let model = FakeModel::answering("Apple");
        let mut sink = Recorder::default();

        let items = pipeline(&portal, &model, PipelineOptions::default())
            .run(&STRATEGY, &mut sink)
            .await
            .unwrap();

        assert_eq!(items.len(), 2);
        assert_eq!(items[0].content(), None);
        assert!(items[0].keywords().is_none());
        assert!(items[1].keywords().is_some());
        assert_eq!(model.prompts.borrow().len(), 1);
        let indexes: Vec<usize> = sink.items.iter().map(|(i, _)| *i).collect();
        assert_eq!(indexes, vec![0, 1]);
    }

    #[tokio::test]
    async fn test_article_fetch_failure_ends_run() {
        let portal = FakePortal::default()
            .with(LISTING_URL, Reply::Body(TWO_ITEM_LISTING))
            .with(ARTICLE_1, Reply::Status(500))
            .with(ARTICLE_2, Reply::Body(VISION_PRO_ARTICLE));
        let model = FakeModel::answering("Apple");
        let mut sink = Recorder::default();

        let err = pipeline(&portal, &model, PipelineOptions::default())
            .run(&STRATEGY, &mut sink)
            .await
            .unwrap_err();

        match err {
            PipelineError::Article { url, source } => {
                assert_eq!(url, ARTICLE_1);
                assert_eq!(source.status(), Some(500));
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(sink.items.is_empty());
        assert!(!portal.requested.borrow().contains(&ARTICLE_2.to_string()));
    }

    #[tokio::test]
    async fn test_completion_failure_halts_run() {
        let portal = FakePortal::default()
            .with(LISTING_URL, Reply::Body(TWO_ITEM_LISTING))
            .with(ARTICLE_1, Reply::Body(VISION_PRO_ARTICLE))
            .with(ARTICLE_2, Reply::Body(VISION_PRO_ARTICLE));
        let model = FakeModel::failing();
        let mut sink = Recorder::default();

        let err = pipeline(&portal, &model, PipelineOptions::default())
            .run(&STRATEGY, &mut sink)
            .await
            .unwrap_err();

        assert!(matches!(err, PipelineError::Keywords { ref url, .. } if url == ARTICLE_1));
        assert_eq!(model.prompts.borrow().len(), 1);
        assert!(!portal.requested.borrow().contains(&ARTICLE_2.to_string()));
    }

    #[tokio::test]
    async fn test_limit_caps_processed_entries() {
        let portal = FakePortal::default()
            .with(LISTING_URL, Reply::Body(TWO_ITEM_LISTING))
            .with(ARTICLE_1, Reply::Body(VISION_PRO_ARTICLE));
        let model = FakeModel::answering("Apple");
        let mut sink = Recorder::default();
        let options = PipelineOptions {
            limit: Some(1),
            ..PipelineOptions::default()
        };

        let items = pipeline(&portal, &model, options)
            .run(&STRATEGY, &mut sink)
            .await
            .unwrap();

        assert_eq!(items.len(), 1);
        assert_eq!(items[0].url(), ARTICLE_1);
    }

    #[tokio::test]
    async fn test_dated_listing_uses_base_url() {
        let date = chrono::NaiveDate::from_ymd_opt(2024, 5, 1).unwrap();
        let strategy = ListingStrategy::ByDate(date);
        let listing = r#"
            <div class="list_body newsflash_body"><ul><li><dl>
              <dt class="photo"><a href="https://n.news.naver.com/article/001/1"><img></a></dt>
              <dt><a href="https://n.news.naver.com/article/001/1">Apple unveils headset</a></dt>
            </dl></li></ul></div>"#;
        let portal = FakePortal::default()
            .with(
                "http://portal.test/main/list.naver?mode=LSD&mid=sec&sid1=105&date=20240501",
                Reply::Body(listing),
            )
            .with(ARTICLE_1, Reply::Body(VISION_PRO_ARTICLE));
        let model = FakeModel::answering("Vision Pro; Apple");
        let mut sink = Recorder::default();
        let options = PipelineOptions {
            base_url: "http://portal.test".to_string(),
            delimiter: ";".to_string(),
            ..PipelineOptions::default()
        };

        let items = pipeline(&portal, &model, options)
            .run(&strategy, &mut sink)
            .await
            .unwrap();

        assert_eq!(items.len(), 1);
        assert_eq!(items[0].keywords().unwrap().terms, vec!["Vision Pro", "Apple"]);
    }

    #[tokio::test]
    async fn test_content_selector_joins_containers() {
        let article = r#"
            <div class="article_part">First half.</div>
            <div class="article_part">Second <a href="/x">link</a>half.</div>"#;
        let portal = FakePortal::default()
            .with(LISTING_URL, Reply::Body(ONE_ITEM_LISTING))
            .with(ARTICLE_1, Reply::Body(article));
        let model = FakeModel::answering("halves");
        let mut sink = Recorder::default();
        let options = PipelineOptions {
            content_selector: Some(Selector::parse("div.article_part").unwrap()),
            ..PipelineOptions::default()
        };

        let items = pipeline(&portal, &model, options)
            .run(&STRATEGY, &mut sink)
            .await
            .unwrap();

        assert_eq!(items[0].content(), Some("First half. Second half."));
    }

    #[tokio::test]
    async fn test_listing_fetched_once_while_articles_are_retried() {
        let portal = FakePortal::default().with(LISTING_URL, Reply::Status(503));
        let model = FakeModel::answering("unused");
        let articles = RetryFetch::with_sleeper(&portal, RetryPolicy::default(), NoWait);
        let requester = KeywordRequester::new(&model, "m", PromptTemplate::GenericKeywords);
        let mut sink = Recorder::default();

        let items = Pipeline::new(&portal, &articles, requester, PipelineOptions::default())
            .run(&STRATEGY, &mut sink)
            .await
            .unwrap();

        assert!(items.is_empty());
        assert_eq!(sink.failed, vec![(LISTING_URL.to_string(), 503)]);
        assert_eq!(*portal.requested.borrow(), vec![LISTING_URL.to_string()]);

        let portal = FakePortal::default()
            .with(LISTING_URL, Reply::Body(ONE_ITEM_LISTING))
            .with(ARTICLE_1, Reply::Status(502));
        let articles = RetryFetch::with_sleeper(&portal, RetryPolicy::default(), NoWait);
        let requester = KeywordRequester::new(&model, "m", PromptTemplate::GenericKeywords);

        let err = Pipeline::new(&portal, &articles, requester, PipelineOptions::default())
            .run(&STRATEGY, &mut Recorder::default())
            .await
            .unwrap_err();

        assert!(matches!(err, PipelineError::Article { .. }));
        let requested = portal.requested.borrow();
        assert_eq!(requested.iter().filter(|u| *u == LISTING_URL).count(), 1);
        assert_eq!(requested.iter().filter(|u| *u == ARTICLE_1).count(), 3);
    }

    #[tokio::test]
    async fn test_labelled_answer_renders_on_one_line() {
        let portal = FakePortal::default()
            .with(LISTING_URL, Reply::Body(ONE_ITEM_LISTING))
            .with(ARTICLE_1, Reply::Body(VISION_PRO_ARTICLE));
        let model = FakeModel::answering("기업: 애플\n기술: 혼합현실 헤드셋, 비전 프로");
        let requester = KeywordRequester::new(&model, "m", PromptTemplate::CompanyTech);
        let mut out = Vec::new();

        let items = {
            let mut sink = TerminalSink::new(&mut out, false);
            Pipeline::new(&portal, &portal, requester, PipelineOptions::default())
                .run(&STRATEGY, &mut sink)
                .await
                .unwrap()
        };

        let keywords = items[0].keywords().unwrap();
        assert_eq!(keywords.terms, vec!["애플", "혼합현실 헤드셋", "비전 프로"]);
        let rendered = String::from_utf8(out).unwrap();
        assert!(rendered.contains("   Keywords: 기업: 애플; 기술: 혼합현실 헤드셋 | 비전 프로\n"));
    }
}
