//! Texture decoding and readiness handles.
//!
//! Decoding runs on a small pool of worker threads fed through a
//! `crossbeam-channel` queue. Every request hands back a [`Pending`] handle;
//! [`join_all`] waits for a set of them and fails on the first error.
//!
//! The worker is only an optimisation. When it is disabled, or no thread can
//! be spawned, requests decode synchronously and return an already-resolved
//! handle.

use crate::config::AssetConfig;
use crate::error::{Error, Result};
use crate::texture::pitted_metal;
use crossbeam_channel::{Receiver, Select, Sender};
use image::RgbaImage;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};

/// Where a texture comes from.
#[derive(Clone, Debug, PartialEq)]
pub enum TextureSource {
    /// An image file, relative to the asset root unless absolute.
    File(PathBuf),
    /// A generated pitted-metal surface.
    Procedural { label: String, size: u32, seed: u32 },
}

impl TextureSource {
    pub fn label(&self) -> String {
        match self {
            TextureSource::File(path) => path.display().to_string(),
            TextureSource::Procedural { label, .. } => label.clone(),
        }
    }

    fn resolve(self, root: &Path) -> Self {
        match self {
            TextureSource::File(path) if path.is_relative() => TextureSource::File(root.join(path)),
            other => other,
        }
    }
}

/// A decoded RGBA8 image ready for upload.
#[derive(Clone, Debug)]
pub struct DecodedImage {
    pub label: String,
    pub image: RgbaImage,
}

/// Decode one source on the calling thread.
pub fn decode(source: &TextureSource) -> Result<DecodedImage> {
    match source {
        TextureSource::File(path) => {
            let image = image::open(path)
                .map_err(|source| Error::Asset {
                    path: path.clone(),
                    source,
                })?
                .to_rgba8();
            log::debug!(
                "decoded {} ({}x{})",
                path.display(),
                image.width(),
                image.height()
            );
            Ok(DecodedImage {
                label: source.label(),
                image,
            })
        }
        TextureSource::Procedural { label, size, seed } => Ok(DecodedImage {
            label: label.clone(),
            image: pitted_metal(*size, *seed),
        }),
    }
}

/// A value that may still be in flight.
pub struct Pending<T> {
    label: String,
    state: PendingState<T>,
}

enum PendingState<T> {
    Ready(Result<T>),
    Waiting(Receiver<Result<T>>),
}

impl<T> Pending<T> {
    /// A handle that is already resolved.
    pub fn ready(label: impl Into<String>, value: Result<T>) -> Self {
        Self {
            label: label.into(),
            state: PendingState::Ready(value),
        }
    }

    /// A handle resolved by the first message on `receiver`.
    pub fn from_receiver(label: impl Into<String>, receiver: Receiver<Result<T>>) -> Self {
        Self {
            label: label.into(),
            state: PendingState::Waiting(receiver),
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    /// Block until the value arrives.
    ///
    /// # Errors
    ///
    /// The producer's error, or [`Error::LoadInterrupted`] if the producer
    /// went away without answering.
    pub fn wait(self) -> Result<T> {
        match self.state {
            PendingState::Ready(value) => value,
            PendingState::Waiting(receiver) => receiver
                .recv()
                .map_err(|_| Error::LoadInterrupted(self.label))?,
        }
    }
}

/// Wait for every handle, preserving order.
///
/// Returns the first error observed without waiting for the handles that are
/// still outstanding.
pub fn join_all<T>(pending: Vec<Pending<T>>) -> Result<Vec<T>> {
    let mut results: Vec<Option<T>> = Vec::with_capacity(pending.len());
    let mut waiting: Vec<(usize, String, Receiver<Result<T>>)> = Vec::new();

    for (i, handle) in pending.into_iter().enumerate() {
        match handle.state {
            PendingState::Ready(value) => results.push(Some(value?)),
            PendingState::Waiting(receiver) => {
                results.push(None);
                waiting.push((i, handle.label, receiver));
            }
        }
    }

    {
        let mut select = Select::new();
        for (_, _, receiver) in &waiting {
            select.recv(receiver);
        }

        for _ in 0..waiting.len() {
            let operation = select.select();
            let index = operation.index();
            let (slot, label, receiver) = &waiting[index];
            let value = operation
                .recv(receiver)
                .map_err(|_| Error::LoadInterrupted(label.clone()))??;
            results[*slot] = Some(value);
            select.remove(index);
        }
    }

    results
        .into_iter()
        .zip(0..)
        .map(|(value, i)| value.ok_or_else(|| Error::LoadInterrupted(format!("request {i}"))))
        .collect()
}

struct DecodeJob {
    source: TextureSource,
    reply: Sender<Result<DecodedImage>>,
}

/// Decode until the queue closes. Once `cancelled` is set, remaining jobs
/// are dropped unstarted, which disconnects their reply channels.
fn run_jobs(jobs: &Receiver<DecodeJob>, cancelled: &AtomicBool) {
    for job in jobs.iter() {
        if cancelled.load(Ordering::Acquire) {
            continue;
        }
        // The requester may have given up already.
        let _ = job.reply.send(decode(&job.source));
    }
}

/// Background decode threads.
pub struct DecodeWorker {
    jobs: Option<Sender<DecodeJob>>,
    cancelled: Arc<AtomicBool>,
    threads: Vec<JoinHandle<()>>,
}

impl DecodeWorker {
    /// Start `threads` decode threads.
    ///
    /// Returns `None` when no thread could be spawned.
    pub fn spawn(threads: usize) -> Option<Self> {
        let (sender, receiver) = crossbeam_channel::unbounded::<DecodeJob>();
        let cancelled = Arc::new(AtomicBool::new(false));
        let mut handles = Vec::new();

        for i in 0..threads.max(1) {
            let jobs = receiver.clone();
            let cancelled = Arc::clone(&cancelled);
            let spawned = thread::Builder::new()
                .name(format!("strata-decode-{i}"))
                .spawn(move || run_jobs(&jobs, &cancelled));
            match spawned {
                Ok(handle) => handles.push(handle),
                Err(e) => log::warn!("could not spawn decode thread {i}: {e}"),
            }
        }

        if handles.is_empty() {
            return None;
        }
        log::debug!("decode worker running with {} thread(s)", handles.len());
        Some(Self {
            jobs: Some(sender),
            cancelled,
            threads: handles,
        })
    }

    /// Skip every job not yet started. Their handles resolve to
    /// [`Error::LoadInterrupted`].
    pub fn cancel(&self) {
        if !self.cancelled.swap(true, Ordering::AcqRel) {
            log::debug!("decode worker cancelled");
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }

    /// Queue a decode. Hands the source back if the worker has shut down.
    fn submit(&self, source: TextureSource) -> std::result::Result<Pending<DecodedImage>, TextureSource> {
        let Some(jobs) = &self.jobs else {
            return Err(source);
        };
        if self.is_cancelled() {
            return Err(source);
        }
        let label = source.label();
        let (reply, receiver) = crossbeam_channel::bounded(1);
        jobs.send(DecodeJob { source, reply })
            .map(|()| Pending::from_receiver(label, receiver))
            .map_err(|e| e.into_inner().source)
    }
}

impl Drop for DecodeWorker {
    fn drop(&mut self) {
        // Queued jobs are skipped, then closing the queue ends each loop.
        self.cancel();
        self.jobs.take();
        for handle in self.threads.drain(..) {
            let _ = handle.join();
        }
    }
}

/// Resolves texture requests against the asset root.
pub struct AssetLoader {
    root: PathBuf,
    worker: Option<DecodeWorker>,
}

impl AssetLoader {
    pub fn new(config: &AssetConfig) -> Self {
        let worker = if config.decode_worker {
            let worker = DecodeWorker::spawn(config.decode_threads);
            if worker.is_none() {
                log::warn!("decode worker unavailable, decoding on the main thread");
            }
            worker
        } else {
            None
        };
        Self {
            root: config.root.clone(),
            worker,
        }
    }

    /// A loader that always decodes on the calling thread.
    pub fn synchronous(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            worker: None,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn is_threaded(&self) -> bool {
        self.worker.is_some()
    }

    /// Abandon queued background decodes after a failure. Later requests
    /// decode synchronously.
    pub fn cancel(&self) {
        if let Some(worker) = &self.worker {
            worker.cancel();
        }
    }

    /// Start decoding `source`.
    pub fn request(&self, source: TextureSource) -> Pending<DecodedImage> {
        let source = source.resolve(&self.root);
        let source = match &self.worker {
            Some(worker) => match worker.submit(source) {
                Ok(pending) => return pending,
                Err(source) => source,
            },
            None => source,
        };
        let label = source.label();
        Pending::ready(label, decode(&source))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn procedural(seed: u32) -> TextureSource {
        TextureSource::Procedural {
            label: format!("metal-{seed}"),
            size: 16,
            seed,
        }
    }

    #[test]
    fn missing_file_is_an_asset_error() {
        let err = decode(&TextureSource::File("does/not/exist.png".into())).unwrap_err();
        match err {
            Error::Asset { path, .. } => assert_eq!(path, PathBuf::from("does/not/exist.png")),
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn relative_paths_resolve_against_root() {
        let source = TextureSource::File("maps/a.png".into()).resolve(Path::new("assets"));
        assert_eq!(source, TextureSource::File(PathBuf::from("assets/maps/a.png")));

        let source = procedural(1).resolve(Path::new("assets"));
        assert_eq!(source, procedural(1));
    }

    #[test]
    fn synchronous_loader_resolves_immediately() {
        let loader = AssetLoader::synchronous("assets");
        assert!(!loader.is_threaded());
        let image = loader.request(procedural(3)).wait().unwrap();
        assert_eq!(image.label, "metal-3");
        assert_eq!(image.image.dimensions(), (16, 16));
    }

    #[test]
    fn worker_decodes_in_order() {
        let config = AssetConfig {
            decode_threads: 2,
            ..AssetConfig::default()
        };
        let loader = AssetLoader::new(&config);
        let pending: Vec<_> = (0..6).map(|i| loader.request(procedural(i))).collect();
        let images = join_all(pending).unwrap();
        let labels: Vec<_> = images.iter().map(|i| i.label.as_str()).collect();
        assert_eq!(labels, ["metal-0", "metal-1", "metal-2", "metal-3", "metal-4", "metal-5"]);
    }

    #[test]
    fn cancelled_jobs_are_skipped() {
        let (jobs, queue) = crossbeam_channel::unbounded();
        let handles: Vec<_> = (0..3)
            .map(|seed| {
                let (reply, receiver) = crossbeam_channel::bounded(1);
                jobs.send(DecodeJob {
                    source: procedural(seed),
                    reply,
                })
                .unwrap();
                Pending::from_receiver(format!("metal-{seed}"), receiver)
            })
            .collect();
        drop(jobs);

        run_jobs(&queue, &AtomicBool::new(true));

        for pending in handles {
            assert!(matches!(pending.wait(), Err(Error::LoadInterrupted(_))));
        }
    }

    #[test]
    fn uncancelled_jobs_run() {
        let (jobs, queue) = crossbeam_channel::unbounded();
        let (reply, receiver) = crossbeam_channel::bounded(1);
        jobs.send(DecodeJob {
            source: procedural(7),
            reply,
        })
        .unwrap();
        drop(jobs);

        run_jobs(&queue, &AtomicBool::new(false));
        let image = Pending::from_receiver("metal-7", receiver).wait().unwrap();
        assert_eq!(image.label, "metal-7");
    }

    #[test]
    fn cancelled_loader_falls_back_to_synchronous() {
        let config = AssetConfig {
            decode_worker: true,
            decode_threads: 1,
            ..AssetConfig::default()
        };
        let loader = AssetLoader::new(&config);
        loader.cancel();
        let image = loader.request(procedural(4)).wait().unwrap();
        assert_eq!(image.label, "metal-4");
        // Dropping a cancelled loader joins its threads without waiting on work.
        drop(loader);
    }

    #[test]
    fn join_all_fails_fast() {
        // `_stalled` is never answered; join_all must not wait for it.
        let (_stalled, stalled_rx) = crossbeam_channel::bounded::<Result<u32>>(1);
        let (failing, failing_rx) = crossbeam_channel::bounded::<Result<u32>>(1);

        let sender = thread::spawn(move || {
            thread::sleep(Duration::from_millis(10));
            let _ = failing.send(Err(Error::TooFewSections(0)));
        });

        let result = join_all(vec![
            Pending::from_receiver("stalled", stalled_rx),
            Pending::from_receiver("failing", failing_rx),
        ]);
        assert!(matches!(result, Err(Error::TooFewSections(0))));
        sender.join().unwrap();
    }

    #[test]
    fn ready_error_short_circuits() {
        let result = join_all(vec![
            Pending::ready("ok", Ok(1)),
            Pending::ready("bad", Err(Error::LoadInterrupted("bad".into()))),
        ]);
        assert!(matches!(result, Err(Error::LoadInterrupted(label)) if label == "bad"));
    }

    #[test]
    fn dropped_producer_interrupts() {
        let (sender, receiver) = crossbeam_channel::bounded::<Result<u32>>(1);
        drop(sender);
        let result = join_all(vec![Pending::ready("a", Ok(1)), Pending::from_receiver("b", receiver)]);
        assert!(matches!(result, Err(Error::LoadInterrupted(label)) if label == "b"));
    }

    #[test]
    fn join_all_of_nothing_is_empty() {
        assert!(join_all::<u32>(Vec::new()).unwrap().is_empty());
    }
}
