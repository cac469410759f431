mod web;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use reqwest::StatusCode;
use serde_json::{json, Value};

use crate::app::VideoService;
use crate::cache::{tests::ManualClock, VideoCache};
use crate::metadata::{FetchError, VideoFetcher};
use crate::storage::BackendMemory;

pub const CDN: &str = "https://img.mlbstatic.com/mlb-images/image/upload/t_16x9/t_w1536/mlb";

pub fn payload(title: &str) -> Value {
    json!({
        "title": format!("{title} (extended cut)"),
        "description": "Big inning! #MLB #Highlights",
        "duration": "00:01:30",
        "date": "2024-06-01T02:13:00Z",
        "feeds": [{
            "playbacks": [{ "url": format!("https://cuts.mlb.com/{title}.mp4") }],
            "image": { "cuts": [{ "src": "a" }, { "src": "b" }, { "src": "https://img/x/poster01" }] }
        }]
    })
}

/// What the stub should answer with.
pub enum Reply {
    Payload(Value),
    Status(StatusCode),
}

/// In-process fetcher that records every slug it was asked for.
pub struct StubFetcher {
    reply: Mutex<Reply>,
    calls: AtomicUsize,
    slugs: Mutex<Vec<String>>,
}

impl StubFetcher {
    pub fn new(reply: Reply) -> Arc<Self> {
        Arc::new(Self {
            reply: Mutex::new(reply),
            calls: AtomicUsize::new(0),
            slugs: Mutex::new(Vec::new()),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn slugs(&self) -> Vec<String> {
        self.slugs.lock().unwrap().clone()
    }

    pub fn set_reply(&self, reply: Reply) {
        *self.reply.lock().unwrap() = reply;
    }
}

impl VideoFetcher for StubFetcher {
    fn fetch(&self, slug: &str) -> Result<Value, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.slugs.lock().unwrap().push(slug.to_string());

        match &*self.reply.lock().unwrap() {
            Reply::Payload(value) => Ok(value.clone()),
            Reply::Status(status) => Err(FetchError::Status {
                slug: slug.to_string(),
                status: *status,
            }),
        }
    }

    fn name(&self) -> &'static str {
        "stub"
    }
}

pub struct Harness {
    pub service: VideoService,
    pub fetcher: Arc<StubFetcher>,
    pub storage: Arc<BackendMemory>,
    pub clock: Arc<ManualClock>,
}

pub fn harness(reply: Reply) -> Harness {
    let fetcher = StubFetcher::new(reply);
    let storage = Arc::new(BackendMemory::new());
    let clock = Arc::new(ManualClock::default());
    let cache = VideoCache::with_clock(storage.clone(), clock.clone());
    let service = VideoService::new(cache, fetcher.clone(), Duration::from_secs(3600), CDN);

    Harness {
        service,
        fetcher,
        storage,
        clock,
    }
}
