//! Message pipeline: decode, reconcile, encode, forward
//!
//! One inbound message produces at most one outbound message: the stored
//! record after the merge. Per-message failures (decode, reconcile, encode)
//! follow the configured [`ErrorPolicy`]; source and sink failures always
//! end the run.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::{error, info, warn};

use docmerge_concurrency::{ReconcileStats, Reconciler};
use docmerge_core::{Decoder, Encoder, Result, Store};

use crate::config::{DocmergeConfig, ErrorPolicy};
use crate::framing::{Sink, Source};
use crate::store::open_store;

/// Counters for one [`Pipeline::run`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PipelineStats {
    /// Messages read from the source
    pub received: u64,
    /// Merged records written to the sink
    pub forwarded: u64,
    /// Messages dropped under `ErrorPolicy::Skip`
    pub skipped: u64,
}

/// Reconciler plus the codecs on either side of it
pub struct Pipeline<S: Store + ?Sized> {
    reconciler: Reconciler<S>,
    decoder: Arc<dyn Decoder>,
    encoder: Arc<dyn Encoder>,
    on_error: ErrorPolicy,
}

impl Pipeline<dyn Store> {
    /// Open the configured store and codecs
    ///
    /// # Errors
    ///
    /// Invalid settings or an unreachable backend.
    pub fn from_config(config: &DocmergeConfig, init_schema: bool) -> Result<Self> {
        let codec = config.codec_kind()?;
        let store = open_store(config, init_schema)?;
        Ok(Self::new(
            Reconciler::new(store),
            codec.decoder(),
            codec.encoder(),
            config.error_policy()?,
        ))
    }
}

impl<S: Store + ?Sized> Pipeline<S> {
    /// Assemble a pipeline from its parts
    pub fn new(
        reconciler: Reconciler<S>,
        decoder: Arc<dyn Decoder>,
        encoder: Arc<dyn Encoder>,
        on_error: ErrorPolicy,
    ) -> Self {
        Self {
            reconciler,
            decoder,
            encoder,
            on_error,
        }
    }

    /// The reconciler this pipeline drives
    pub fn reconciler(&self) -> &Reconciler<S> {
        &self.reconciler
    }

    /// Reconcile counters
    pub fn stats(&self) -> ReconcileStats {
        self.reconciler.stats()
    }

    /// Handle one inbound message and return the outbound one
    pub fn process_message(&self, message: &[u8]) -> Result<Vec<u8>> {
        let incoming = self.decoder.decode(message)?;
        let merged = self.reconciler.process(incoming)?;
        self.encoder.encode(&merged)
    }

    /// Drain `source` into `sink` until end of stream or `stop` is set
    ///
    /// `stop` is checked between messages, so the message in flight always
    /// completes.
    ///
    /// # Errors
    ///
    /// Source or sink failures, and the first per-message failure under
    /// `ErrorPolicy::Abort`.
    pub fn run(
        &self,
        source: &mut dyn Source,
        sink: &mut dyn Sink,
        stop: &AtomicBool,
    ) -> Result<PipelineStats> {
        let mut stats = PipelineStats::default();

        loop {
            if stop.load(Ordering::Relaxed) {
                info!("stop requested");
                break;
            }
            let Some(message) = source.next_message()? else {
                break;
            };
            stats.received += 1;

            match self.process_message(&message) {
                Ok(outbound) => {
                    sink.send(&outbound)?;
                    stats.forwarded += 1;
                }
                Err(e) => match self.on_error {
                    ErrorPolicy::Abort => {
                        error!(message = stats.received, error = %e, "message failed, aborting");
                        sink.flush()?;
                        return Err(e);
                    }
                    ErrorPolicy::Skip => {
                        warn!(message = stats.received, error = %e, "message skipped");
                        stats.skipped += 1;
                    }
                },
            }
        }

        sink.flush()?;
        info!(
            received = stats.received,
            forwarded = stats.forwarded,
            skipped = stats.skipped,
            "pipeline finished"
        );
        Ok(stats)
    }
}

impl<S: Store + ?Sized> std::fmt::Debug for Pipeline<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("reconciler", &self.reconciler)
            .field("on_error", &self.on_error)
            .finish_non_exhaustive()
    }
}
