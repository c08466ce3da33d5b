//! Lazy frame pipeline and the cross-chunk merger.
//!
//! Parsing is expressed as operations over a lazy sequence of
//! `Result<Frame, IngestError>`: the pipeline does no work until it is driven,
//! either one item at a time through [`Iterator`] or all at once through
//! [`FrameStream::force`]. Abandoning the stream stops all further
//! segmentation and parsing. Deduplication is the only cross-chunk coupling:
//! restart boundaries commonly re-emit the last timestep of the previous
//! chunk, and the merger collapses those to the first occurrence seen in
//! ascending chunk order.

use std::collections::HashSet;

use crate::frame::{BondFrame, SpeciesFrame, TrajectoryFrame};
use crate::ingest::error::IngestError;

/// Frames that carry a simulation timestep, the dedup key of the merger.
pub trait Timestamped {
    /// The simulation step this frame describes.
    fn timestep(&self) -> i64;
}

impl Timestamped for TrajectoryFrame {
    fn timestep(&self) -> i64 {
        self.timestep
    }
}

impl Timestamped for BondFrame {
    fn timestep(&self) -> i64 {
        self.timestep
    }
}

impl Timestamped for SpeciesFrame {
    fn timestep(&self) -> i64 {
        self.timestep
    }
}

/// A lazy, fallible sequence of frames.
///
/// Wraps the chunk-ordered segment/parse pipeline for one data kind. Errors
/// flow through untouched and surface wherever the caller drives the stream.
pub struct FrameStream<T> {
    inner: Box<dyn Iterator<Item = Result<T, IngestError>>>,
}

impl<T: 'static> FrameStream<T> {
    /// Wrap an iterator of parse results.
    pub fn new<I>(inner: I) -> Self
    where
        I: Iterator<Item = Result<T, IngestError>> + 'static,
    {
        Self {
            inner: Box::new(inner),
        }
    }

    /// Lazily transform each frame; errors pass through.
    pub fn map_frames<U: 'static, F>(self, mut f: F) -> FrameStream<U>
    where
        F: FnMut(T) -> U + 'static,
    {
        FrameStream::new(self.inner.map(move |item| item.map(&mut f)))
    }

    /// Lazily drop frames the predicate rejects; errors pass through.
    pub fn filter_frames<F>(self, mut predicate: F) -> FrameStream<T>
    where
        F: FnMut(&T) -> bool + 'static,
    {
        FrameStream::new(self.inner.filter(move |item| match item {
            Ok(frame) => predicate(frame),
            Err(_) => true,
        }))
    }

    /// Drive the pipeline to completion, materializing every frame.
    ///
    /// Stops at the first error; frames parsed before it are discarded, per
    /// the no-partial-salvage policy.
    pub fn force(self) -> Result<Vec<T>, IngestError> {
        self.inner.collect()
    }
}

impl<T: Timestamped + 'static> FrameStream<T> {
    /// Collapse duplicate timesteps to their first occurrence.
    ///
    /// Idempotent on series that are already unique. Holds one seen-set
    /// entry per distinct timestep, which is why trajectory ingestion can
    /// opt out for ultra-high-frequency dumps.
    pub fn dedup_by_timestep(self) -> FrameStream<T> {
        let mut seen: HashSet<i64> = HashSet::new();
        FrameStream::new(self.inner.filter(move |item| match item {
            Ok(frame) => seen.insert(frame.timestep()),
            Err(_) => true,
        }))
    }
}

impl<T> Iterator for FrameStream<T> {
    type Item = Result<T, IngestError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next()
    }
}

/// Merge eagerly-parsed per-chunk frame lists into one series.
///
/// Chunks must arrive in ascending chunk order; within the result, frame
/// order follows chunk order and then file order. With `dedup` set,
/// duplicate timesteps collapse first-seen-wins.
pub fn merge_chunks<T: Timestamped>(per_chunk: Vec<Vec<T>>, dedup: bool) -> Vec<T> {
    let mut seen: HashSet<i64> = HashSet::new();
    let mut merged = Vec::with_capacity(per_chunk.iter().map(Vec::len).sum());
    for chunk in per_chunk {
        for frame in chunk {
            if dedup && !seen.insert(frame.timestep()) {
                continue;
            }
            merged.push(frame);
        }
    }
    merged
}
