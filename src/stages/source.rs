// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use crate::observability::messages::request::RequestEmitted;
use crate::observability::messages::StructuredLog;
use crate::protocol::RequestId;

/// Generates `request_count` fresh requests, cycling through the root
/// vertices in order.
///
/// Ids are `<prefix>-<seq>`. The default prefix is derived from the wall clock
/// so that two runs never share ids.
#[derive(Debug, Clone)]
pub struct RequestSource {
    roots: Vec<String>,
    request_count: usize,
    interval: Duration,
    prefix: String,
    next: usize,
}

impl RequestSource {
    pub fn new(roots: Vec<String>, request_count: usize, interval: Duration) -> Self {
        let nonce = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos())
            .unwrap_or_default();
        Self {
            roots,
            request_count,
            interval,
            prefix: format!("{:x}", nonce),
            next: 0,
        }
    }

    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    /// Delay between two requests in parallel release mode.
    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn request_count(&self) -> usize {
        self.request_count
    }
}

impl Iterator for RequestSource {
    type Item = (RequestId, String);

    fn next(&mut self) -> Option<Self::Item> {
        if self.next >= self.request_count || self.roots.is_empty() {
            return None;
        }
        let root = self.roots[self.next % self.roots.len()].clone();
        let request_id = RequestId::new(format!("{}-{}", self.prefix, self.next));
        self.next += 1;

        RequestEmitted {
            request_id: request_id.as_str(),
            root: &root,
        }
        .log();
        Some((request_id, root))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cycles_through_roots() {
        let source = RequestSource::new(
            vec!["a".to_string(), "b".to_string()],
            5,
            Duration::ZERO,
        )
        .with_prefix("run");

        let requests: Vec<(RequestId, String)> = source.collect();
        let roots: Vec<&str> = requests.iter().map(|(_, root)| root.as_str()).collect();
        assert_eq!(roots, vec!["a", "b", "a", "b", "a"]);
        assert_eq!(requests[4].0, RequestId::from("run-4"));
    }

    #[test]
    fn test_ids_are_unique_across_sources() {
        let a: Vec<_> = RequestSource::new(vec!["v".into()], 3, Duration::ZERO).collect();
        let b: Vec<_> = RequestSource::new(vec!["v".into()], 3, Duration::ZERO)
            .with_prefix("other")
            .collect();
        for (id, _) in &a {
            assert!(b.iter().all(|(other, _)| other != id));
        }
    }

    #[test]
    fn test_no_roots_yields_nothing() {
        let mut source = RequestSource::new(Vec::new(), 3, Duration::ZERO);
        assert!(source.next().is_none());
    }
}
