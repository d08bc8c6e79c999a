//! Ship sprite cache.
//!
//! Sprites decode on background threads and are memoized by the asset each
//! ticker's fallback chain resolves to, so every ticker landing on the same
//! file shares one decoded image.
//! Handles never block: draw code asks [`SpriteHandle::decoded`] and falls
//! back to a procedural shape while the image is still loading or failed.

use std::collections::HashMap;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::sync::{Arc, Mutex, RwLock};
use std::task::{Context, Poll, Waker};

use image::RgbaImage;
use thiserror::Error;

/// Default sprite used for tickers without a table entry.
pub const DEFAULT_SHIP_URL: &str = "ships/default.png";

/// A decoded RGBA sprite.
#[derive(Debug, Clone)]
pub struct SpriteImage {
    pixels: RgbaImage,
}

impl SpriteImage {
    pub fn from_rgba(pixels: RgbaImage) -> Self {
        Self { pixels }
    }

    /// Single-color sprite, handy for placeholders and tests.
    pub fn solid(width: u32, height: u32, rgba: [u8; 4]) -> Self {
        Self {
            pixels: RgbaImage::from_pixel(width, height, image::Rgba(rgba)),
        }
    }

    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    pub fn height(&self) -> u32 {
        self.pixels.height()
    }

    pub fn pixel(&self, x: u32, y: u32) -> [u8; 4] {
        self.pixels.get_pixel(x, y).0
    }

    pub fn pixels(&self) -> &RgbaImage {
        &self.pixels
    }
}

#[derive(Debug, Clone, Error)]
pub enum SpriteError {
    #[error("sprite {url} unavailable after trying {tried} path(s): {reason}")]
    Unavailable {
        url: String,
        tried: usize,
        reason: String,
    },
    #[error("sprite decoder for {0} could not be started")]
    DecoderUnavailable(String),
}

enum SlotState {
    Loading,
    Ready(Arc<SpriteImage>),
    Failed(SpriteError),
}

struct SlotInner {
    state: SlotState,
    wakers: Vec<Waker>,
}

struct Slot {
    url: String,
    inner: Mutex<SlotInner>,
}

/// Shared, possibly still loading, image for one URL.
#[derive(Clone)]
pub struct SpriteHandle {
    slot: Arc<Slot>,
}

impl std::fmt::Debug for SpriteHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SpriteHandle")
            .field("url", &self.slot.url)
            .field("decoded", &self.decoded().is_some())
            .finish()
    }
}

impl SpriteHandle {
    fn with_state(url: &str, state: SlotState) -> Self {
        Self {
            slot: Arc::new(Slot {
                url: url.to_string(),
                inner: Mutex::new(SlotInner {
                    state,
                    wakers: Vec::new(),
                }),
            }),
        }
    }

    fn loading(url: &str) -> Self {
        Self::with_state(url, SlotState::Loading)
    }

    /// Handle that is already decoded.
    pub fn ready(url: &str, image: SpriteImage) -> Self {
        Self::with_state(url, SlotState::Ready(Arc::new(image)))
    }

    pub fn url(&self) -> &str {
        &self.slot.url
    }

    /// The decoded image, if decoding finished successfully.
    pub fn decoded(&self) -> Option<Arc<SpriteImage>> {
        match &self.lock().state {
            SlotState::Ready(image) => Some(image.clone()),
            _ => None,
        }
    }

    /// True once the image has either decoded or failed.
    pub fn is_settled(&self) -> bool {
        !matches!(self.lock().state, SlotState::Loading)
    }

    /// Future resolving when decoding finishes.
    pub fn await_decoded(&self) -> Decoded {
        Decoded {
            handle: self.clone(),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, SlotInner> {
        self.slot.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn complete(&self, result: Result<SpriteImage, SpriteError>) {
        let wakers = {
            let mut inner = self.lock();
            if !matches!(inner.state, SlotState::Loading) {
                return;
            }
            inner.state = match result {
                Ok(image) => SlotState::Ready(Arc::new(image)),
                Err(e) => SlotState::Failed(e),
            };
            std::mem::take(&mut inner.wakers)
        };
        for waker in wakers {
            waker.wake();
        }
    }
}

/// Future returned by [`SpriteHandle::await_decoded`].
pub struct Decoded {
    handle: SpriteHandle,
}

impl Future for Decoded {
    type Output = Result<Arc<SpriteImage>, SpriteError>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let mut inner = self.handle.lock();
        let settled = match &inner.state {
            SlotState::Ready(image) => Some(Ok(image.clone())),
            SlotState::Failed(e) => Some(Err(e.clone())),
            SlotState::Loading => None,
        };
        match settled {
            Some(result) => Poll::Ready(result),
            None => {
                if !inner.wakers.iter().any(|w| w.will_wake(cx.waker())) {
                    inner.wakers.push(cx.waker().clone());
                }
                Poll::Pending
            }
        }
    }
}

/// Outcome of a preload pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PreloadReport {
    pub loaded: usize,
    pub failed: usize,
}

/// Process-wide (per engine) sprite cache keyed by resolved asset URL.
pub struct SpriteCache {
    asset_root: PathBuf,
    fallback_url: String,
    table: RwLock<HashMap<String, String>>,
    images: Mutex<HashMap<String, SpriteHandle>>,
}

impl SpriteCache {
    pub fn new(asset_root: impl Into<PathBuf>, fallback_url: impl Into<String>) -> Self {
        Self {
            asset_root: asset_root.into(),
            fallback_url: fallback_url.into(),
            table: RwLock::new(HashMap::new()),
            images: Mutex::new(HashMap::new()),
        }
    }

    /// Seed the ticker → URL table.
    pub fn with_table<I, K, V>(self, entries: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        {
            let mut table = self.table.write().unwrap_or_else(|e| e.into_inner());
            for (ticker, url) in entries {
                table.insert(ticker.into(), url.into());
            }
        }
        self
    }

    pub fn set_url(&self, ticker: &str, url: &str) {
        self.table
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(ticker.to_string(), url.to_string());
    }

    pub fn fallback_url(&self) -> &str {
        &self.fallback_url
    }

    /// URL the ticker's sprite is cached under.
    pub fn resolve_url(&self, ticker: &str) -> String {
        self.table
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(ticker)
            .cloned()
            .unwrap_or_else(|| self.fallback_url.clone())
    }

    /// Cached (possibly loading) sprite for a ticker. Never blocks on decode.
    ///
    /// The ticker's fallback chain is walked first, and the handle is cached
    /// under the first link that is already cached or present on disk. Tickers
    /// that land on the same file share one image; a missing table URL never
    /// hands one ticker's static sprite to another.
    pub fn get_ship_sprite(&self, ticker: &str) -> SpriteHandle {
        let url = self.resolve_url(ticker);
        let chain = self.candidate_urls(ticker, &url);
        let mut images = self.images.lock().unwrap_or_else(|e| e.into_inner());
        let source = chain
            .iter()
            .find(|u| images.contains_key(u.as_str()) || self.asset_root.join(u.as_str()).is_file())
            .cloned()
            .unwrap_or_else(|| self.fallback_url.clone());
        if let Some(handle) = images.get(&source) {
            return handle.clone();
        }
        let handle = SpriteHandle::loading(&source);
        images.insert(source.clone(), handle.clone());
        drop(images);

        if source != url {
            log::debug!("Sprite for {} resolved to {} instead of {}", ticker, source, url);
        }
        spawn_decode(handle.clone(), self.decode_paths(&source));
        handle
    }

    /// Register an already decoded image under `url`, replacing any cached entry.
    pub fn insert_decoded(&self, url: &str, image: SpriteImage) -> SpriteHandle {
        let handle = SpriteHandle::ready(url, image);
        self.images
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(url.to_string(), handle.clone());
        handle
    }

    /// Number of distinct URLs in the cache.
    pub fn len(&self) -> usize {
        self.images.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Resolve once every sprite the tickers reference has loaded or failed.
    pub async fn preload_sprites_for_tickers<I, S>(&self, tickers: I) -> PreloadReport
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut handles: Vec<SpriteHandle> = Vec::new();
        for ticker in tickers {
            let handle = self.get_ship_sprite(ticker.as_ref());
            if !handles.iter().any(|h| h.url() == handle.url()) {
                handles.push(handle);
            }
        }

        let mut report = PreloadReport::default();
        for handle in handles {
            match handle.await_decoded().await {
                Ok(_) => report.loaded += 1,
                Err(e) => {
                    log::warn!("Sprite preload failed: {}", e);
                    report.failed += 1;
                }
            }
        }
        log::debug!("Sprite preload: {} loaded, {} failed", report.loaded, report.failed);
        report
    }

    /// Requested URL, then animated base, then static, then the generic fallback.
    fn candidate_urls(&self, ticker: &str, url: &str) -> Vec<String> {
        let mut urls = vec![url.to_string()];
        if url != self.fallback_url {
            for u in [
                format!("ships/animated/{ticker}/base.png"),
                format!("ships/{ticker}.png"),
                self.fallback_url.clone(),
            ] {
                if !urls.contains(&u) {
                    urls.push(u);
                }
            }
        }
        urls
    }

    /// The resolved source, then the generic fallback if that file turns out
    /// to be undecodable. Depends only on the source, never on the ticker.
    fn decode_paths(&self, source: &str) -> Vec<PathBuf> {
        let mut paths = vec![self.asset_root.join(source)];
        if source != self.fallback_url {
            paths.push(self.asset_root.join(&self.fallback_url));
        }
        paths
    }
}

fn spawn_decode(handle: SpriteHandle, candidates: Vec<PathBuf>) {
    let worker = handle.clone();
    let spawned = std::thread::Builder::new()
        .name(format!("sprite-decode:{}", handle.url()))
        .spawn(move || {
            let outcome = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
                decode_first(worker.url(), &candidates)
            }));
            let result = outcome.unwrap_or_else(|_| {
                Err(SpriteError::Unavailable {
                    url: worker.url().to_string(),
                    tried: candidates.len(),
                    reason: "decoder panicked".to_string(),
                })
            });
            worker.complete(result);
        });
    if let Err(e) = spawned {
        log::warn!("Could not spawn sprite decoder for {}: {}", handle.url(), e);
        handle.complete(Err(SpriteError::DecoderUnavailable(handle.url().to_string())));
    }
}

fn decode_first(url: &str, candidates: &[PathBuf]) -> Result<SpriteImage, SpriteError> {
    let mut last_reason = String::from("no candidate paths");
    for (i, path) in candidates.iter().enumerate() {
        match decode_path(path) {
            Ok(image) => {
                if i > 0 {
                    log::debug!("Sprite {} fell back to {:?}", url, path);
                }
                return Ok(image);
            }
            Err(reason) => last_reason = reason,
        }
    }
    Err(SpriteError::Unavailable {
        url: url.to_string(),
        tried: candidates.len(),
        reason: last_reason,
    })
}

fn decode_path(path: &Path) -> Result<SpriteImage, String> {
    let decoded = image::open(path).map_err(|e| format!("{}: {}", path.display(), e))?;
    Ok(SpriteImage::from_rgba(decoded.to_rgba8()))
}
