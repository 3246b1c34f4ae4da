// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use async_trait::async_trait;
use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use crate::backends::montage_key;
use crate::errors::BackendError;
use crate::traits::ComputeBackend;

fn owned<T: AsRef<str>>(items: &[T]) -> HashSet<String> {
    items.iter().map(|item| item.as_ref().to_string()).collect()
}

/// A backend whose every answer is scripted per key, for driving stages
/// through exact scenarios.
///
/// Unscripted keys answer with an empty set (or zero features). The montage
/// defaults to the content-derived key the real backends use.
#[derive(Default)]
pub struct ScriptedBackend {
    children: HashMap<String, Result<HashSet<String>, BackendError>>,
    images: HashMap<String, Result<HashSet<String>, BackendError>>,
    features: HashMap<String, BackendError>,
    montage: Option<Result<String, BackendError>>,
    crash_once: Mutex<HashSet<String>>,
    children_calls: AtomicUsize,
    images_of_calls: AtomicUsize,
    extract_calls: AtomicUsize,
    montage_inputs: Mutex<Vec<Vec<String>>>,
}

impl ScriptedBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_children<T: AsRef<str>>(mut self, vertex: &str, children: &[T]) -> Self {
        self.children.insert(vertex.to_string(), Ok(owned(children)));
        self
    }

    pub fn failing_children(mut self, vertex: &str, error: BackendError) -> Self {
        self.children.insert(vertex.to_string(), Err(error));
        self
    }

    /// The first `children` call for this vertex fails unrecoverably; later
    /// calls answer as scripted.
    pub fn crash_once_on_children(self, vertex: &str) -> Self {
        if let Ok(mut pending) = self.crash_once.lock() {
            pending.insert(vertex.to_string());
        }
        self
    }

    pub fn with_images<T: AsRef<str>>(mut self, vertex: &str, images: &[T]) -> Self {
        self.images.insert(vertex.to_string(), Ok(owned(images)));
        self
    }

    pub fn failing_images(mut self, vertex: &str, error: BackendError) -> Self {
        self.images.insert(vertex.to_string(), Err(error));
        self
    }

    pub fn failing_features(mut self, image: &str, error: BackendError) -> Self {
        self.features.insert(image.to_string(), error);
        self
    }

    pub fn montage_returns(mut self, result: &str) -> Self {
        self.montage = Some(Ok(result.to_string()));
        self
    }

    pub fn montage_fails(mut self, error: BackendError) -> Self {
        self.montage = Some(Err(error));
        self
    }

    pub fn children_calls(&self) -> usize {
        self.children_calls.load(Ordering::SeqCst)
    }

    pub fn images_of_calls(&self) -> usize {
        self.images_of_calls.load(Ordering::SeqCst)
    }

    pub fn extract_calls(&self) -> usize {
        self.extract_calls.load(Ordering::SeqCst)
    }

    /// Image sets handed to `montage`, in call order.
    pub fn montage_inputs(&self) -> Vec<Vec<String>> {
        self.montage_inputs.lock().map(|inputs| inputs.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl ComputeBackend for ScriptedBackend {
    async fn children(&self, vertex: &str) -> Result<HashSet<String>, BackendError> {
        self.children_calls.fetch_add(1, Ordering::SeqCst);
        let crash = self
            .crash_once
            .lock()
            .map(|mut pending| pending.remove(vertex))
            .unwrap_or(false);
        if crash {
            return Err(BackendError::Unrecoverable(format!("scripted crash on '{}'", vertex)));
        }
        self.children.get(vertex).cloned().unwrap_or_else(|| Ok(HashSet::new()))
    }

    async fn images_of(&self, vertex: &str) -> Result<HashSet<String>, BackendError> {
        self.images_of_calls.fetch_add(1, Ordering::SeqCst);
        self.images.get(vertex).cloned().unwrap_or_else(|| Ok(HashSet::new()))
    }

    async fn extract_features(&self, image: &str) -> Result<usize, BackendError> {
        self.extract_calls.fetch_add(1, Ordering::SeqCst);
        match self.features.get(image) {
            Some(error) => Err(error.clone()),
            None => Ok(0),
        }
    }

    async fn montage(&self, images: &BTreeSet<String>) -> Result<String, BackendError> {
        if let Ok(mut inputs) = self.montage_inputs.lock() {
            inputs.push(images.iter().cloned().collect());
        }
        match &self.montage {
            Some(scripted) => scripted.clone(),
            None => Ok(montage_key(images)),
        }
    }

    fn name(&self) -> &'static str {
        "scripted"
    }
}
