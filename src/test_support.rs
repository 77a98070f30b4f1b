//! Fakes shared by unit tests.

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use anyhow::{Result, anyhow};
use async_trait::async_trait;
use serde_json::Value;

use crate::error::StoreError;
use crate::services::{
    PhotoSearch, PlaceCandidate, PlaceSearch, ThroughputDirection, ThroughputMetrics,
    ThroughputQuery,
};
use crate::store::{Document, DocumentPath, DocumentStore, MemoryStore, Query, Write};

/// A [`MemoryStore`] whose commits fail on demand.
pub struct FlakyStore {
    inner: MemoryStore,
    succeed_first: usize,
    failures: Mutex<usize>,
    attempts: AtomicUsize,
    successes: AtomicUsize,
}

impl FlakyStore {
    /// Fails the first `failures` commits.
    pub fn failing(failures: usize) -> Self {
        Self::failing_after(0, failures)
    }

    /// Lets `succeed_first` commits through, then fails the next `failures`.
    pub fn failing_after(succeed_first: usize, failures: usize) -> Self {
        Self {
            inner: MemoryStore::new(),
            succeed_first,
            failures: Mutex::new(failures),
            attempts: AtomicUsize::new(0),
            successes: AtomicUsize::new(0),
        }
    }

    pub fn inner(&self) -> &MemoryStore {
        &self.inner
    }

    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }

    pub fn successful_commits(&self) -> usize {
        self.successes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DocumentStore for FlakyStore {
    async fn get(&self, path: &DocumentPath) -> Result<Option<Value>, StoreError> {
        self.inner.get(path).await
    }

    async fn query(&self, collection: &str, query: &Query) -> Result<Vec<Document>, StoreError> {
        self.inner.query(collection, query).await
    }

    async fn commit(&self, writes: &[Write]) -> Result<(), StoreError> {
        let attempt = self.attempts.fetch_add(1, Ordering::SeqCst);
        if attempt >= self.succeed_first {
            let mut remaining = self.failures.lock().unwrap();
            if *remaining > 0 {
                *remaining -= 1;
                return Err(StoreError::Backend("injected commit failure".to_string()));
            }
        }
        self.inner.commit(writes).await?;
        self.successes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Place search answering from a fixed table keyed by input text.
#[derive(Default)]
pub struct FakePlaces {
    answers: HashMap<String, Vec<PlaceCandidate>>,
    failing: bool,
    calls: Mutex<Vec<String>>,
}

impl FakePlaces {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self {
            failing: true,
            ..Self::default()
        }
    }

    pub fn with(mut self, input: &str, candidates: Vec<PlaceCandidate>) -> Self {
        self.answers.insert(input.to_string(), candidates);
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl PlaceSearch for FakePlaces {
    async fn find_place(&self, input: &str) -> Result<Vec<PlaceCandidate>> {
        self.calls.lock().unwrap().push(input.to_string());
        if self.failing {
            return Err(anyhow!("place search unavailable"));
        }
        Ok(self.answers.get(input).cloned().unwrap_or_default())
    }
}

/// Builds a candidate the way the place search would return a city.
pub fn candidate(name: &str, address: &str, types: &[&str]) -> PlaceCandidate {
    PlaceCandidate {
        place_id: format!("place-{}", name.to_lowercase()),
        name: name.to_string(),
        formatted_address: address.to_string(),
        latitude: 10.0,
        longitude: 20.0,
        types: types.iter().map(|t| t.to_string()).collect(),
    }
}

/// Throughput provider with fixed answers per direction and an optional delay.
pub struct FakeThroughput {
    download: Option<f64>,
    upload: Option<f64>,
    delay: Duration,
    calls: AtomicUsize,
}

impl FakeThroughput {
    pub fn new(download: Option<f64>, upload: Option<f64>) -> Self {
        Self {
            download,
            upload,
            delay: Duration::ZERO,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ThroughputMetrics for FakeThroughput {
    async fn average_throughput(&self, query: &ThroughputQuery) -> Result<f64> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        let answer = match query.direction {
            ThroughputDirection::Download => self.download,
            ThroughputDirection::Upload => self.upload,
        };
        answer.ok_or_else(|| anyhow!("no results found"))
    }
}

/// Photo provider returning `count` numbered URLs, or failing when `count`
/// is below two.
pub struct FakePhotos {
    count: usize,
    calls: Mutex<Vec<String>>,
}

impl FakePhotos {
    pub fn new(count: usize) -> Self {
        Self {
            count,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl PhotoSearch for FakePhotos {
    async fn search_photos(&self, query: &str) -> Result<Vec<String>> {
        self.calls.lock().unwrap().push(query.to_string());
        if self.count < 2 {
            return Err(anyhow!("not enough photos returned"));
        }
        Ok((1..=self.count)
            .map(|i| format!("https://images.example/{i}.jpeg"))
            .collect())
    }
}
