//! Fan-out / fan-in execution with partial failure.
//!
//! Every entity is handed to the processor concurrently (bounded by
//! `max_concurrent`), successes are collected in completion order, and every
//! failure is kept together with the identity of the entity that produced it.
//! A batch is never failed as a whole: callers always get the successes back
//! alongside the merged error.

use crate::error::{AppError, Result};
use futures::stream::{self, StreamExt};
use std::fmt;
use std::future::Future;
use std::sync::Arc;

/// An entity that can be identified in a merged batch error
pub trait BatchItem {
    fn batch_label(&self) -> String;
}

impl<T: BatchItem + ?Sized> BatchItem for Arc<T> {
    fn batch_label(&self) -> String {
        (**self).batch_label()
    }
}

/// One failed unit of a batch
#[derive(Debug)]
pub struct Failure {
    /// Identity of the entity that failed (plugin name, delivery label, ...)
    pub source: String,
    pub error: AppError,
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.source, self.error)
    }
}

/// Every failure of a batch, in completion order
#[derive(Debug, Default)]
pub struct BatchError {
    failures: Vec<Failure>,
}

impl BatchError {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, source: impl Into<String>, error: AppError) {
        self.failures.push(Failure {
            source: source.into(),
            error,
        });
    }

    pub fn failures(&self) -> &[Failure] {
        &self.failures
    }

    pub fn len(&self) -> usize {
        self.failures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.failures.is_empty()
    }

    /// Sources of every failure, e.g. the names of failed plugins
    pub fn sources(&self) -> Vec<&str> {
        self.failures.iter().map(|f| f.source.as_str()).collect()
    }

    /// `None` when nothing failed
    pub fn into_option(self) -> Option<Self> {
        if self.is_empty() {
            None
        } else {
            Some(self)
        }
    }
}

impl fmt::Display for BatchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, failure) in self.failures.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{}", failure)?;
        }
        Ok(())
    }
}

impl std::error::Error for BatchError {}

/// Successes of a batch plus the merged error (if anything failed)
#[derive(Debug)]
pub struct BatchOutcome<R> {
    pub successes: Vec<R>,
    pub error: Option<BatchError>,
}

impl<R> BatchOutcome<R> {
    pub fn failed_count(&self) -> usize {
        self.error.as_ref().map_or(0, BatchError::len)
    }
}

/// Bounded parallel map with partial failure
#[derive(Debug, Clone, Copy)]
pub struct FanOut {
    max_concurrent: usize,
}

impl FanOut {
    /// `max_concurrent == 0` gives every entity its own slot
    pub fn new(max_concurrent: usize) -> Self {
        Self { max_concurrent }
    }

    pub fn unbounded() -> Self {
        Self::new(0)
    }

    fn limit(&self, entity_count: usize) -> usize {
        if self.max_concurrent == 0 {
            entity_count.max(1)
        } else {
            self.max_concurrent
        }
    }

    /// Run `processor(entity, input)` for every entity and wait for all of them
    pub async fn execute<E, I, R, F, Fut>(
        &self,
        input: I,
        entities: Vec<E>,
        processor: F,
    ) -> BatchOutcome<R>
    where
        E: BatchItem,
        I: Clone,
        F: Fn(E, I) -> Fut,
        Fut: Future<Output = Result<R>>,
    {
        let limit = self.limit(entities.len());

        let outcomes: Vec<(String, Result<R>)> = stream::iter(entities)
            .map(|entity| {
                let label = entity.batch_label();
                let call = processor(entity, input.clone());
                async move { (label, call.await) }
            })
            .buffer_unordered(limit)
            .collect()
            .await;

        let mut successes = Vec::with_capacity(outcomes.len());
        let mut errors = BatchError::new();

        for (label, outcome) in outcomes {
            match outcome {
                Ok(result) => successes.push(result),
                Err(e) => errors.push(label, e),
            }
        }

        BatchOutcome {
            successes,
            error: errors.into_option(),
        }
    }
}

impl Default for FanOut {
    fn default() -> Self {
        Self::unbounded()
    }
}
