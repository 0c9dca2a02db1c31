use crate::CrawlError;
use crate::config::CrawlConfig;
use crate::crawlers::http::HttpFetch;
use crate::crawlers::renderer::PageRenderer;
use crate::filter::{SkipReason, UrlFilter};
use crate::media::MediaFetcher;
use crate::output;
use crate::parsers::{self, ExtractOptions};
use crate::politeness::PolitenessGate;
use crate::results::{CrawlSummary, CrawlTask, FailedPage, FailureReason, LinkRecord};
use crate::utils::slug_for;
use crate::visited::VisitedSet;
use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::{Mutex, mpsc, watch};
use url::Url;

/// Requests an early, orderly end of a running crawl
///
/// In-flight pages finish; queued pages are reported as skipped.
#[derive(Clone)]
pub struct StopHandle(Arc<watch::Sender<bool>>);

impl StopHandle {
    pub fn stop(&self) {
        self.0.send_replace(true);
    }
}

/// Drives a crawl from the seed to exhaustion of the task queue
pub struct Orchestrator {
    config: CrawlConfig,
    seed: Url,
    filter: UrlFilter,
    visited: Arc<VisitedSet>,
    renderer: Arc<dyn PageRenderer>,
    fetcher: Arc<dyn HttpFetch>,
    stop_tx: Arc<watch::Sender<bool>>,
}

impl Orchestrator {
    /// Validates the configuration and prepares a crawl
    pub fn new(
        config: CrawlConfig,
        renderer: Arc<dyn PageRenderer>,
        fetcher: Arc<dyn HttpFetch>,
    ) -> Result<Self, CrawlError> {
        config.validate()?;
        let seed = config.seed()?;
        let filter = UrlFilter::for_crawl(&seed, &config)
            .map_err(|e| CrawlError::Config(e.into()))?;
        let (stop_tx, _) = watch::channel(false);

        Ok(Self {
            config,
            seed,
            filter,
            visited: Arc::new(VisitedSet::new()),
            renderer,
            fetcher,
            stop_tx: Arc::new(stop_tx),
        })
    }

    /// Shares an existing visited set, e.g. one seeded with pages done earlier
    pub fn with_visited(mut self, visited: Arc<VisitedSet>) -> Self {
        self.visited = visited;
        self
    }

    pub fn stop_handle(&self) -> StopHandle {
        StopHandle(Arc::clone(&self.stop_tx))
    }

    /// Runs the crawl and writes the summary to the output root
    ///
    /// Only an unusable output root aborts the run; page problems are recorded
    /// as failures in the returned summary.
    pub async fn run(self) -> Result<CrawlSummary, CrawlError> {
        output::ensure_output_root(&self.config.output_dir)?;

        let start = std::time::Instant::now();
        ::log::info!(
            "Starting crawl of {} (max depth {}, {} workers)",
            self.seed,
            self.config.max_depth,
            self.config.max_concurrency
        );

        let (queue_tx, queue_rx) = mpsc::unbounded_channel::<CrawlTask>();
        let (finished_tx, _) = watch::channel(false);
        let num_workers = self.config.max_concurrency;
        let renderer = Arc::clone(&self.renderer);
        let output_root = self.config.output_dir.clone();

        let shared = Arc::new(Shared {
            gate: PolitenessGate::new(
                Arc::clone(&self.fetcher),
                self.config.user_agent.clone(),
                self.config.delay(),
                self.config.respect_robots,
            ),
            media: MediaFetcher::new(Arc::clone(&self.fetcher)),
            options: ExtractOptions::from_config(&self.config),
            stop: self.stop_tx.subscribe(),
            stop_tx: self.stop_tx,
            config: self.config,
            filter: self.filter,
            visited: self.visited,
            renderer: self.renderer,
            queue_tx,
            finished_tx,
            outstanding: AtomicUsize::new(0),
            dispatched: AtomicUsize::new(0),
            nodes: Mutex::new(HashSet::new()),
            progress: Mutex::new(Progress::default()),
        });

        if shared.visited.try_claim(&self.seed).await {
            shared.enqueue(CrawlTask::seed(self.seed.clone()));
        } else {
            ::log::info!("Seed {} was already visited, nothing to crawl", self.seed);
        }

        if shared.outstanding.load(Ordering::SeqCst) > 0 {
            spawn_workers(num_workers, &shared, queue_rx).await;
        }
        renderer.shutdown().await;

        let summary = shared.summary(&self.seed).await;
        let path = output::write_summary(&output_root, &summary).await?;
        ::log::info!(
            "Crawl complete in {:.2} seconds: {} completed, {} failed, {} skipped (summary in {})",
            start.elapsed().as_secs_f64(),
            summary.completed,
            summary.failed,
            summary.skipped,
            path.display()
        );

        Ok(summary)
    }
}

/// Tallies of a running crawl
#[derive(Debug, Default)]
struct Progress {
    completed: usize,
    skipped: usize,
    nodes: Vec<PathBuf>,
    failures: Vec<FailedPage>,
}

/// State shared by every worker of one run
struct Shared {
    config: CrawlConfig,
    filter: UrlFilter,
    visited: Arc<VisitedSet>,
    gate: PolitenessGate,
    renderer: Arc<dyn PageRenderer>,
    media: MediaFetcher,
    options: ExtractOptions,
    queue_tx: mpsc::UnboundedSender<CrawlTask>,
    /// Tasks queued or in flight; the crawl is over when this drops to zero
    outstanding: AtomicUsize,
    dispatched: AtomicUsize,
    finished_tx: watch::Sender<bool>,
    stop: watch::Receiver<bool>,
    stop_tx: Arc<watch::Sender<bool>>,
    /// Node paths handed out so far, to keep sibling directories distinct
    nodes: Mutex<HashSet<Vec<String>>>,
    progress: Mutex<Progress>,
}

/// Spawns the worker pool and waits until the queue is exhausted
async fn spawn_workers(
    num_workers: usize,
    shared: &Arc<Shared>,
    queue_rx: mpsc::UnboundedReceiver<CrawlTask>,
) {
    let queue_rx = Arc::new(Mutex::new(queue_rx));
    let handles: Vec<_> = (0..num_workers)
        .map(|worker_id| spawn_worker(worker_id, Arc::clone(shared), Arc::clone(&queue_rx)))
        .collect();

    for (worker_id, handle) in handles.into_iter().enumerate() {
        if let Err(e) = handle.await {
            ::log::error!("Worker {} panicked: {}", worker_id, e);
        }
    }
    ::log::debug!("All {} workers have completed", num_workers);
}

fn spawn_worker(
    worker_id: usize,
    shared: Arc<Shared>,
    queue_rx: Arc<Mutex<mpsc::UnboundedReceiver<CrawlTask>>>,
) -> tokio::task::JoinHandle<()> {
    ::log::trace!("Spawning worker {}", worker_id);

    tokio::spawn(async move {
        let mut finished = shared.finished_tx.subscribe();

        while let Some(task) = next_task(&queue_rx, &mut finished).await {
            ::log::trace!("Worker {} processing: {}", worker_id, task.url());
            shared.run_isolated(task).await;
            shared.task_done();
        }

        ::log::debug!("Worker {} shutting down, no more tasks", worker_id);
    })
}

/// Waits for the next queued task, or `None` once the crawl has finished
async fn next_task(
    queue_rx: &Mutex<mpsc::UnboundedReceiver<CrawlTask>>,
    finished: &mut watch::Receiver<bool>,
) -> Option<CrawlTask> {
    let mut rx = queue_rx.lock().await;
    tokio::select! {
        task = rx.recv() => task,
        _ = finished.wait_for(|done| *done) => None,
    }
}

impl Shared {
    fn enqueue(&self, task: CrawlTask) {
        self.outstanding.fetch_add(1, Ordering::SeqCst);
        if let Err(e) = self.queue_tx.send(task) {
            ::log::error!("Failed to queue {}", e.0.url());
            self.task_done();
        }
    }

    fn task_done(&self) {
        if self.outstanding.fetch_sub(1, Ordering::SeqCst) == 1 {
            ::log::debug!("Task queue exhausted");
            self.finished_tx.send_replace(true);
        }
    }

    fn is_stopped(&self) -> bool {
        *self.stop.borrow()
    }

    /// Whether the page budget allows one more dispatch
    fn take_budget(&self) -> bool {
        let Some(max_pages) = self.config.max_pages else {
            return true;
        };
        let n = self.dispatched.fetch_add(1, Ordering::SeqCst) + 1;
        if n >= max_pages {
            if !self.is_stopped() {
                ::log::info!("Reached max_pages of {}, stopping", max_pages);
            }
            self.stop_tx.send_replace(true);
        }
        n <= max_pages
    }

    /// Runs a task on its own tokio task, so a panic fails only that page
    async fn run_isolated(self: &Arc<Self>, task: CrawlTask) {
        let url = task.url().clone();
        let depth = task.depth();
        let shared = Arc::clone(self);

        if let Err(e) = tokio::spawn(async move { shared.run_task(task).await }).await {
            ::log::error!("Processing {} panicked: {}", url, e);
            self.visited.mark_failed(&url).await;
            self.progress.lock().await.failures.push(FailedPage {
                url: url.to_string(),
                depth,
                reason: FailureReason::Internal(e.to_string()),
            });
        }
    }

    async fn run_task(&self, task: CrawlTask) {
        if self.is_stopped() || !self.take_budget() {
            ::log::debug!("Skipping queued {}, crawl is stopping", task.url());
            self.visited.mark_failed(task.url()).await;
            self.progress.lock().await.skipped += 1;
            return;
        }

        match self.crawl_page(&task).await {
            Ok((node_path, links)) => {
                self.visited.mark_done(task.url()).await;
                {
                    let mut progress = self.progress.lock().await;
                    progress.completed += 1;
                    progress.nodes.push(node_path.iter().collect());
                }
                self.enqueue_children(&task, &node_path, &links).await;
            }
            Err(reason) => {
                self.visited.mark_failed(task.url()).await;
                ::log::warn!("Failed {} (depth {}): {}", task.url(), task.depth(), reason);
                self.progress.lock().await.failures.push(FailedPage {
                    url: task.url().to_string(),
                    depth: task.depth(),
                    reason,
                });
            }
        }
    }

    /// Renders, extracts and persists one page; returns its node path and links
    async fn crawl_page(&self, task: &CrawlTask) -> Result<(Vec<String>, LinkRecord), FailureReason> {
        let url = task.url();
        if task.depth() > self.config.max_depth {
            return Err(FailureReason::DepthExceeded);
        }

        if !self.gate.permitted(url).await {
            return Err(FailureReason::RobotsDenied);
        }
        if let Some(host) = url.host_str() {
            self.gate.throttle(host).await;
        }

        ::log::info!("Crawling {} (depth {})", url, task.depth());
        let page = self
            .renderer
            .render(url)
            .await
            .map_err(|e| FailureReason::Render(e.to_string()))?;

        let mut extract = parsers::extract(
            &page.html,
            url,
            page.title.as_deref(),
            &page.network_log,
            &self.options,
        );

        let node_path = self.reserve_node(task.parent_path(), slug_for(url)).await;
        let dir = output::node_dir(&self.config.output_dir, &node_path);

        let saved = self.media.fetch_all(&mut extract.content.images, &dir).await;
        ::log::debug!(
            "Saved {} of {} media files for {}",
            saved,
            extract.content.images.len(),
            url
        );

        if let Err(e) = output::write_node(&dir, &extract.content, &extract.links).await {
            output::discard_node(&dir).await;
            return Err(FailureReason::Persist(e.to_string()));
        }

        ::log::info!(
            "Stored {} ({} blocks, {} images, {} links)",
            dir.display(),
            extract.content.blocks.len(),
            extract.content.images.len(),
            extract.links.links.len()
        );
        Ok((node_path, extract.links))
    }

    /// Hands out `parent/slug`, or `parent/slug_N` when a sibling already took it
    ///
    /// `images` is never handed out, since every node keeps its media there.
    async fn reserve_node(&self, parent: &[String], slug: String) -> Vec<String> {
        let mut nodes = self.nodes.lock().await;
        let mut name = slug.clone();
        let mut n = 1;
        loop {
            let reserved = name == output::IMAGES_DIR;
            let mut path = parent.to_vec();
            path.push(name);
            if !reserved && nodes.insert(path.clone()) {
                return path;
            }
            n += 1;
            name = format!("{}_{}", slug, n);
        }
    }

    async fn enqueue_children(&self, task: &CrawlTask, node_path: &[String], links: &LinkRecord) {
        let depth = task.depth() + 1;
        let mut queued = 0;

        for link in &links.links {
            if self.is_stopped() {
                ::log::debug!("Crawl is stopping, not following links of {}", task.url());
                break;
            }
            let Ok(url) = Url::parse(&link.url) else {
                continue;
            };
            match self.admit(&url, depth).await {
                Ok(()) => {
                    ::log::debug!("Queuing link for crawling: {}", url);
                    self.enqueue(CrawlTask::child(url, depth, node_path.to_vec()));
                    queued += 1;
                }
                Err(reason) => ::log::trace!("Not following {}: {}", url, reason),
            }
        }

        ::log::debug!(
            "Queued {} of {} links from {}",
            queued,
            links.links.len(),
            task.url()
        );
    }

    /// Applies scope, patterns, depth and the visited claim, in that order
    async fn admit(&self, url: &Url, depth: usize) -> Result<(), SkipReason> {
        self.filter.check(url)?;
        if depth > self.config.max_depth {
            return Err(SkipReason::DepthExceeded);
        }
        if !self.visited.try_claim(url).await {
            return Err(SkipReason::AlreadyVisited);
        }
        Ok(())
    }

    async fn summary(&self, seed: &Url) -> CrawlSummary {
        let mut progress = self.progress.lock().await;
        progress.nodes.sort();
        progress.failures.sort_by(|a, b| a.url.cmp(&b.url));

        CrawlSummary {
            seed_url: seed.to_string(),
            completed: progress.completed,
            failed: progress.failures.len(),
            skipped: progress.skipped,
            nodes: progress.nodes.clone(),
            failures: progress.failures.clone(),
        }
    }
}
