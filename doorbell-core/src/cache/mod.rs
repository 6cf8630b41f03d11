//! Content cache
//!
//! Resolves asset names to classified content through three tiers: the
//! in-memory table, a conditional remote fetch, and a one-time read of the
//! local store. Stale content is always preferred over no content.
//!
//! Resolution is split so that no lock is held across I/O:
//!
//! 1. [`ContentCache::plan`] decides what I/O, if any, is needed.
//! 2. The caller performs the fetch or read with no lock held.
//! 3. [`ContentCache::complete_fetch`] / [`ContentCache::complete_load`]
//!    fold the result back into the table.
//!
//! [`ContentCache::resolve`] runs all three steps for callers that own the
//! cache outright.

pub mod probe;

use alloc::string::String;
use alloc::vec::Vec;

use crate::asset::AssetName;
use crate::calendar::{http_date, Now};
use crate::config::Settings;
use crate::events::{label, Event, EventLog};
use crate::traits::{FetchResponse, Storage, StorageError, Transport, TransportError};

pub use probe::{classify, Classified, Content, ImageFormat, ImageMeta, PanelSize, TextPanel};

/// Where assets come from and how long they are trusted
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachePolicy {
    /// Remote base URL, empty disables fetching
    pub base: String,
    pub ext: String,
    pub mount: String,
    /// Seconds a validated entry is trusted
    pub refetch: u32,
    /// Seconds to wait after a failure
    pub retry: u32,
    pub panel: PanelSize,
}

impl CachePolicy {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            base: settings.image_url.clone(),
            ext: settings.image_ext.clone(),
            mount: settings.mount.clone(),
            refetch: settings.refetch,
            retry: settings.retry,
            panel: PanelSize {
                width: settings.panel_width,
                height: settings.panel_height,
            },
        }
    }
}

/// One cached asset
#[derive(Debug, Clone)]
pub struct CacheEntry {
    /// Remote URL, also the table key
    key: String,
    /// Local store path
    path: String,
    content: Option<Content>,
    /// Wall time of the last 200 or 304
    validated: Option<i64>,
    /// Uptime before which the entry is not revalidated
    horizon: u32,
    /// Local store already consulted
    local_tried: bool,
}

impl CacheEntry {
    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn content(&self) -> Option<&Content> {
        self.content.as_ref()
    }

    pub fn validated(&self) -> Option<i64> {
        self.validated
    }

    pub fn horizon(&self) -> u32 {
        self.horizon
    }
}

/// Conditional GET to perform
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchJob {
    pub key: String,
    pub url: String,
    /// HTTP-date for `If-Modified-Since`
    pub since: Option<String>,
}

/// Local store read to perform
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadJob {
    pub key: String,
    pub path: String,
}

/// Local store write to perform
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersistJob {
    pub path: String,
    pub bytes: Vec<u8>,
}

/// I/O needed before the entry is up to date
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Plan {
    /// Nothing to do, the entry is as good as it gets
    Ready,
    Fetch(FetchJob),
    Load(LoadJob),
}

/// Follow-up I/O after a fetch
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    Done,
    Persist(PersistJob),
    Load(LoadJob),
}

/// Append-only table of cached assets
#[derive(Debug, Clone)]
pub struct ContentCache {
    policy: CachePolicy,
    entries: Vec<CacheEntry>,
}

impl ContentCache {
    pub fn new(policy: CachePolicy) -> Self {
        Self {
            policy,
            entries: Vec::new(),
        }
    }

    pub fn policy(&self) -> &CachePolicy {
        &self.policy
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entry for an asset name, if it has been referenced
    pub fn entry(&self, name: &str) -> Option<&CacheEntry> {
        let asset = AssetName::parse(name);
        let key = asset.url(&self.policy.base, &self.policy.ext);
        self.find(&key)
    }

    /// Cached content for an asset name
    pub fn get(&self, name: &str) -> Option<&Content> {
        self.entry(name).and_then(CacheEntry::content)
    }

    fn find(&self, key: &str) -> Option<&CacheEntry> {
        self.entries.iter().find(|e| e.key == key)
    }

    fn find_mut(&mut self, key: &str) -> Option<&mut CacheEntry> {
        self.entries.iter_mut().find(|e| e.key == key)
    }

    /// Decide what I/O `name` needs
    ///
    /// Creates the entry on first reference. A new entry's horizon is `now`,
    /// so the first resolution fetches.
    pub fn plan(&mut self, name: &str, now: Now, online: bool) -> Plan {
        let asset = AssetName::parse(name);
        if asset.is_empty() {
            return Plan::Ready;
        }

        let key = asset.url(&self.policy.base, &self.policy.ext);
        let remote = !self.policy.base.is_empty();
        let index = match self.entries.iter().position(|e| e.key == key) {
            Some(index) => index,
            None => {
                self.entries.push(CacheEntry {
                    path: asset.local_path(&self.policy.mount, &self.policy.ext),
                    key,
                    content: None,
                    validated: None,
                    horizon: now.uptime,
                    local_tried: false,
                });
                self.entries.len() - 1
            }
        };
        let entry = &mut self.entries[index];

        if remote && online && (asset.force || now.uptime >= entry.horizon) {
            let since = if asset.force {
                None
            } else {
                entry.validated.map(http_date)
            };
            return Plan::Fetch(FetchJob {
                key: entry.key.clone(),
                url: entry.key.clone(),
                since,
            });
        }

        match take_local(entry) {
            Some(job) => Plan::Load(job),
            None => Plan::Ready,
        }
    }

    /// Fold a fetch result into the table
    pub fn complete_fetch(
        &mut self,
        job: &FetchJob,
        result: Result<FetchResponse, TransportError>,
        now: Now,
        log: &mut EventLog,
    ) -> FetchOutcome {
        let (refetch, retry, panel) = (self.policy.refetch, self.policy.retry, self.policy.panel);
        let Some(entry) = self.find_mut(&job.key) else {
            return FetchOutcome::Done;
        };

        match result {
            Ok(FetchResponse::NotModified) => {
                entry.horizon = now.uptime.saturating_add(refetch);
                entry.validated = now.wall.or(entry.validated);
                log.push(Event::NotModified {
                    key: label(&entry.key),
                });
                FetchOutcome::Done
            }
            Ok(FetchResponse::Ok(bytes)) => {
                entry.horizon = now.uptime.saturating_add(refetch);
                entry.validated = now.wall.or(entry.validated);

                if entry.content.as_ref().is_some_and(|c| c.bytes() == bytes) {
                    return FetchOutcome::Done;
                }

                let len = bytes.len() as u32;
                match Content::new(bytes, panel) {
                    Ok(content) => {
                        let persist = PersistJob {
                            path: entry.path.clone(),
                            bytes: content.bytes().to_vec(),
                        };
                        entry.content = Some(content);
                        log.push(Event::AssetChanged {
                            key: label(&entry.key),
                            len,
                        });
                        FetchOutcome::Persist(persist)
                    }
                    Err(_) => {
                        entry.content = None;
                        log.push(Event::Unrecognized {
                            key: label(&entry.key),
                            len,
                        });
                        FetchOutcome::Done
                    }
                }
            }
            Err(error) => {
                entry.horizon = now.uptime.saturating_add(retry);
                log.push(Event::FetchFailed {
                    key: label(&entry.key),
                    error,
                });
                match take_local(entry) {
                    Some(job) => FetchOutcome::Load(job),
                    None => FetchOutcome::Done,
                }
            }
        }
    }

    /// Fold a local store read into the table
    ///
    /// Loaded bytes are only accepted while the entry is still empty; a fetch
    /// that completed in the meantime wins.
    pub fn complete_load(
        &mut self,
        job: &LoadJob,
        result: Result<Vec<u8>, StorageError>,
        log: &mut EventLog,
    ) {
        let panel = self.policy.panel;
        let Some(entry) = self.find_mut(&job.key) else {
            return;
        };

        match result {
            Ok(bytes) => {
                let len = bytes.len() as u32;
                if entry.content.is_some() {
                    return;
                }
                match Content::new(bytes, panel) {
                    Ok(content) => {
                        entry.content = Some(content);
                        log.push(Event::LocalLoaded {
                            path: label(&job.path),
                            len,
                        });
                    }
                    Err(_) => log.push(Event::Unrecognized {
                        key: label(&job.path),
                        len,
                    }),
                }
            }
            Err(error) => log.push(Event::LocalFailed {
                path: label(&job.path),
                error,
            }),
        }
    }

    /// Resolve `name`, performing any I/O inline
    pub async fn resolve<T: Transport, S: Storage>(
        &mut self,
        transport: &mut T,
        storage: &mut S,
        name: &str,
        now: Now,
        log: &mut EventLog,
    ) -> Option<&Content> {
        match self.plan(name, now, transport.is_online()) {
            Plan::Ready => {}
            Plan::Fetch(job) => {
                let result = transport.get(&job.url, job.since.as_deref()).await;
                match self.complete_fetch(&job, result, now, log) {
                    FetchOutcome::Done => {}
                    FetchOutcome::Persist(persist) => {
                        let result = storage.write(&persist.path, &persist.bytes).await;
                        record_persist(&persist, result, log);
                    }
                    FetchOutcome::Load(load) => {
                        let result = storage.read(&load.path).await;
                        self.complete_load(&load, result, log);
                    }
                }
            }
            Plan::Load(load) => {
                let result = storage.read(&load.path).await;
                self.complete_load(&load, result, log);
            }
        }
        self.get(name)
    }
}

/// Claim the one-time local read if the entry is still empty
fn take_local(entry: &mut CacheEntry) -> Option<LoadJob> {
    if entry.content.is_some() || entry.local_tried {
        return None;
    }
    entry.local_tried = true;
    Some(LoadJob {
        key: entry.key.clone(),
        path: entry.path.clone(),
    })
}

/// Log the outcome of a persist write
pub fn record_persist(job: &PersistJob, result: Result<(), StorageError>, log: &mut EventLog) {
    match result {
        Ok(()) => log.push(Event::Persisted {
            path: label(&job.path),
            len: job.bytes.len() as u32,
        }),
        Err(error) => log.push(Event::PersistFailed {
            path: label(&job.path),
            error,
        }),
    }
}
