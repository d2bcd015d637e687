//! Shared helpers for integration tests: a stub `NwisSource` serving fixture
//! payloads, so nothing here touches the network.

#![allow(dead_code)]

use std::cell::{Cell, RefCell};

use chrono::NaiveDate;
use nwis_bmi::{NwisError, NwisSource, Service};

pub const IV_TWO_SITES: &str = include_str!("../fixtures/iv_two_sites.json");
pub const DV_ONE_SITE: &str = include_str!("../fixtures/dv_one_site.json");
pub const EMPTY: &str = include_str!("../fixtures/empty.json");
pub const IV_SINGLE_POINT: &str = include_str!("../fixtures/iv_single_point.json");

/// What the stub saw on its last call.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedQuery {
    pub sites: Vec<String>,
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub service: Service,
}

pub enum Reply {
    Body(&'static str),
    ConnectionRefused,
    Status(u16),
}

pub struct StubSource {
    reply: Reply,
    calls: Cell<usize>,
    last: RefCell<Option<RecordedQuery>>,
}

impl StubSource {
    pub fn new(body: &'static str) -> Self {
        Self::replying(Reply::Body(body))
    }

    pub fn replying(reply: Reply) -> Self {
        Self {
            reply,
            calls: Cell::new(0),
            last: RefCell::new(None),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.get()
    }

    pub fn last_query(&self) -> Option<RecordedQuery> {
        self.last.borrow().clone()
    }
}

impl NwisSource for StubSource {
    fn fetch(
        &self,
        sites: &[String],
        start: NaiveDate,
        end: NaiveDate,
        service: Service,
    ) -> Result<String, NwisError> {
        self.calls.set(self.calls.get() + 1);
        *self.last.borrow_mut() = Some(RecordedQuery {
            sites: sites.to_vec(),
            start,
            end,
            service,
        });
        match &self.reply {
            Reply::Body(body) => Ok(body.to_string()),
            Reply::ConnectionRefused => Err(NwisError::Transport(Box::new(std::io::Error::new(
                std::io::ErrorKind::ConnectionRefused,
                "connection refused",
            )))),
            Reply::Status(code) => Err(NwisError::HttpError(*code)),
        }
    }
}

/// Writes a TOML config into `dir` and returns its path as a string.
pub fn write_config(dir: &std::path::Path, body: &str) -> String {
    let path = dir.join("nwis.toml");
    std::fs::write(&path, body).expect("config should be writable");
    path.to_string_lossy().into_owned()
}
