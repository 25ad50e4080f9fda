#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use krill::{FetchedDocument, ItemSink, StreamItem, Transport};
use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, Once};
use std::time::Duration;
use tokio::time::Instant;

static INIT: Once = Once::new();

pub fn init_tracing() {
    INIT.call_once(|| {
        tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .with_test_writer()
            .try_init()
            .ok();
    });
}

/// One scripted answer to a fetch.
#[derive(Debug, Clone)]
pub enum Reply {
    Body(String),
    Fail(String),
    Delayed(Duration, String),
}

/// Transport that answers each locator from a queue of replies, one per call.
#[derive(Default)]
pub struct ScriptedTransport {
    scripts: Mutex<HashMap<String, VecDeque<Reply>>>,
    calls: Mutex<Vec<(String, Instant)>>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn script(self, locator: &str, replies: Vec<Reply>) -> Self {
        self.scripts
            .lock()
            .unwrap()
            .insert(locator.to_string(), replies.into_iter().collect());
        self
    }

    pub fn calls(&self) -> Vec<(String, Instant)> {
        self.calls.lock().unwrap().clone()
    }

    pub fn calls_for(&self, locator: &str) -> Vec<Instant> {
        self.calls()
            .into_iter()
            .filter(|(l, _)| l == locator)
            .map(|(_, at)| at)
            .collect()
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn fetch(&self, locator: &str) -> anyhow::Result<FetchedDocument> {
        self.calls.lock().unwrap().push((locator.to_string(), Instant::now()));
        let reply = self
            .scripts
            .lock()
            .unwrap()
            .get_mut(locator)
            .and_then(|queue| queue.pop_front())
            .unwrap_or_else(|| Reply::Fail(format!("no reply scripted for {}", locator)));

        match reply {
            Reply::Body(body) => Ok(FetchedDocument::new(body)),
            Reply::Fail(message) => Err(anyhow::anyhow!(message)),
            Reply::Delayed(delay, body) => {
                tokio::time::sleep(delay).await;
                Ok(FetchedDocument::new(body))
            }
        }
    }
}

/// Sink that keeps everything it is given.
#[derive(Default)]
pub struct RecordingSink {
    pub items: Vec<StreamItem>,
    pub cycles: usize,
}

impl RecordingSink {
    pub fn identities(&self) -> Vec<String> {
        self.items.iter().map(|i| i.identity.clone()).collect()
    }
}

impl ItemSink for RecordingSink {
    fn emit(&mut self, item: &StreamItem) -> anyhow::Result<()> {
        self.items.push(item.clone());
        Ok(())
    }

    fn end_cycle(&mut self) -> anyhow::Result<()> {
        self.cycles += 1;
        Ok(())
    }
}

/// Entry for `rss`: (guid, title, published).
pub type Entry<'a> = (&'a str, &'a str, Option<DateTime<Utc>>);

pub fn rss(title: &str, entries: &[Entry]) -> String {
    let items: String = entries
        .iter()
        .map(|(guid, item_title, published)| {
            let date = published
                .map(|d| format!("<pubDate>{}</pubDate>", d.to_rfc2822()))
                .unwrap_or_default();
            format!(
                "<item><title>{}</title><link>https://feeds.example/{}</link><guid>{}</guid>{}</item>",
                item_title, guid, guid, date
            )
        })
        .collect();
    format!(
        r#"<?xml version="1.0"?><rss version="2.0"><channel><title>{}</title><link>https://feeds.example</link><description>test</description>{}</channel></rss>"#,
        title, items
    )
}

pub fn at(minute: u32) -> DateTime<Utc> {
    use chrono::TimeZone;
    Utc.with_ymd_and_hms(2026, 10, 14, 8, minute, 0).unwrap()
}
