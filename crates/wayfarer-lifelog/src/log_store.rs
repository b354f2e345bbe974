//! Append-only, per-identity page log persisted as one whole blob.
//!
//! Every write loads the full store, mutates the decoded copy, and saves it
//! back. No lock is held across that cycle: two writers that interleave lose
//! one of their updates at whole-blob granularity. The store assumes a single
//! writer driving ingestion serially.

use std::collections::BTreeMap;
use std::marker::PhantomData;

use chrono::TimeZone;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::clock;
use crate::storage::BlobBackend;
use crate::time::Timestamp;
use crate::types::{LifeLogError, LifeLogResult, LogPage};

/// Pages of one identity, in append order.
pub type LifeLog<T> = Vec<LogPage<T>>;

/// Decoded form of the persisted blob: `{ [identity]: LogPage[] }`.
pub type LifeLogs<T> = BTreeMap<String, LifeLog<T>>;

/// What an append did to the identity's log.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageWrite {
    /// The last page held identical data; its `end` was extended.
    Merged,
    /// A new single-instant page was pushed.
    Appended,
}

/// Source of the pages bucketed on one calendar day.
pub trait DayPages<T> {
    fn pages_for_day<Tz: TimeZone>(
        &self,
        id: &str,
        day: Timestamp,
        zone: &Tz,
    ) -> LifeLogResult<Vec<LogPage<T>>>;
}

/// Keyed page log over a blob backend.
pub struct LogStore<T, B> {
    backend: B,
    _data: PhantomData<fn() -> T>,
}

impl<T, B> LogStore<T, B>
where
    T: Serialize + DeserializeOwned,
    B: BlobBackend,
{
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            _data: PhantomData,
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn into_backend(self) -> B {
        self.backend
    }

    /// Record `data` for `id` at `timestamp`, merging into the last page when
    /// the data is unchanged.
    pub fn append_page(
        &mut self,
        id: &str,
        timestamp: Timestamp,
        data: T,
    ) -> LifeLogResult<PageWrite> {
        let mut logs = self.load()?;
        let write = append_page_to(&mut logs, id, timestamp, data)?;
        self.save(&logs)?;
        tracing::debug!("{write:?} page for {id} at {timestamp}");
        Ok(write)
    }

    /// [`LogStore::append_page`] stamped with the active clock.
    pub fn append_page_now(&mut self, id: &str, data: T) -> LifeLogResult<PageWrite> {
        self.append_page(id, clock::now(), data)
    }

    /// Pages of `id` whose start or end falls on the calendar day of `day` in
    /// `zone`, in append order.
    pub fn get_pages_for_day<Tz: TimeZone>(
        &self,
        id: &str,
        day: Timestamp,
        zone: &Tz,
    ) -> LifeLogResult<Vec<LogPage<T>>> {
        let mut logs = self.load()?;
        let bucket = day.start_of_day(zone);
        let pages = logs.remove(id).unwrap_or_default();
        Ok(pages
            .into_iter()
            .filter(|page| {
                page.start.start_of_day(zone) == bucket || page.end.start_of_day(zone) == bucket
            })
            .collect())
    }

    /// Enumerate every identity and its pages from a freshly loaded copy.
    pub fn logs(&self) -> LifeLogResult<Logs<T>> {
        Ok(Logs {
            inner: self.load()?.into_iter(),
        })
    }

    /// The whole decoded store.
    pub fn snapshot(&self) -> LifeLogResult<LifeLogs<T>> {
        self.load()
    }

    /// Replace the whole store.
    pub fn restore(&mut self, logs: &LifeLogs<T>) -> LifeLogResult<()> {
        self.save(logs)
    }

    fn load(&self) -> LifeLogResult<LifeLogs<T>> {
        match self.backend.load_blob()? {
            Some(json) => serde_json::from_str(&json).map_err(LifeLogError::MalformedBlob),
            None => Ok(LifeLogs::new()),
        }
    }

    fn save(&mut self, logs: &LifeLogs<T>) -> LifeLogResult<()> {
        let json = serde_json::to_string(logs)
            .map_err(|e| LifeLogError::Serialization(e.to_string()))?;
        self.backend.save_blob(&json)
    }
}

impl<T, B> DayPages<T> for LogStore<T, B>
where
    T: Serialize + DeserializeOwned,
    B: BlobBackend,
{
    fn pages_for_day<Tz: TimeZone>(
        &self,
        id: &str,
        day: Timestamp,
        zone: &Tz,
    ) -> LifeLogResult<Vec<LogPage<T>>> {
        self.get_pages_for_day(id, day, zone)
    }
}

/// Merge-or-append on an already decoded store.
///
/// Data is compared by its serialized JSON text, so any field change opens a
/// new page, including a bare `version` bump. A timestamp earlier than the
/// last page's start leaves that page's end at its start.
pub fn append_page_to<T: Serialize>(
    logs: &mut LifeLogs<T>,
    id: &str,
    timestamp: Timestamp,
    data: T,
) -> LifeLogResult<PageWrite> {
    let log = logs.entry(id.to_string()).or_default();

    if let Some(last) = log.last_mut() {
        if same_data(&last.data, &data)? {
            last.end = timestamp.max(last.start);
            return Ok(PageWrite::Merged);
        }
    }

    log.push(LogPage::at(timestamp, data));
    Ok(PageWrite::Appended)
}

fn same_data<T: Serialize>(a: &T, b: &T) -> LifeLogResult<bool> {
    let encode = |value: &T| {
        serde_json::to_string(value).map_err(|e| LifeLogError::Serialization(e.to_string()))
    };
    Ok(encode(a)? == encode(b)?)
}

/// One identity and its pages.
pub struct IdentityLog<T> {
    pub id: String,
    pub pages: std::vec::IntoIter<LogPage<T>>,
}

/// Iterator over every identity in a loaded store.
pub struct Logs<T> {
    inner: std::collections::btree_map::IntoIter<String, LifeLog<T>>,
}

impl<T> Iterator for Logs<T> {
    type Item = IdentityLog<T>;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|(id, pages)| IdentityLog {
            id,
            pages: pages.into_iter(),
        })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<T> ExactSizeIterator for Logs<T> {}
