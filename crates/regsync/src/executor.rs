//! End-to-end sync: plan the source, then copy every planned image.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{info, info_span, Instrument};
use uuid::Uuid;

use crate::context::ConnectionContext;
use crate::destination::{destination_reference, destination_suffix, join_destination};
use crate::error::{Result, SyncError};
use crate::plan::{RepoDescriptor, RepositoryResolver, SyncPlan};
use crate::progress::{LogProgress, ProgressReporter, SyncEvent};
use crate::registry::{HttpTagLister, TagLister};
use crate::retry::{retry_if_necessary, RetryPolicy};
use crate::transfer::{CommandTransfer, ImageTransfer, TransferError, TransferOptions, TransferRequest};
use crate::transport::{validate_combination, DestinationTransport, SourceTransport};

/// Settings for one sync run.
#[derive(Debug, Clone)]
pub struct SyncOptions {
    pub source_transport: SourceTransport,
    pub destination_transport: DestinationTransport,
    /// Keep the full source path in destination names.
    pub scoped: bool,
    pub transfer: TransferOptions,
    pub retry: RetryPolicy,
    /// Base context for the source; declarative configs derive per-registry copies.
    pub source_context: ConnectionContext,
    pub destination_context: ConnectionContext,
}

impl SyncOptions {
    pub fn new(source_transport: SourceTransport, destination_transport: DestinationTransport) -> Self {
        Self {
            source_transport,
            destination_transport,
            scoped: false,
            transfer: TransferOptions::default(),
            retry: RetryPolicy::default(),
            source_context: ConnectionContext::default(),
            destination_context: ConnectionContext::default(),
        }
    }
}

/// Outcome of a completed run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncSummary {
    pub images_copied: usize,
    /// Number of repository descriptors processed.
    pub sources: usize,
}

pub struct SyncExecutor {
    tag_lister: Arc<dyn TagLister>,
    transfer: Arc<dyn ImageTransfer>,
    progress: Arc<dyn ProgressReporter>,
}

impl SyncExecutor {
    pub fn new(
        tag_lister: Arc<dyn TagLister>,
        transfer: Arc<dyn ImageTransfer>,
        progress: Arc<dyn ProgressReporter>,
    ) -> Self {
        Self {
            tag_lister,
            transfer,
            progress,
        }
    }

    /// Production wiring: HTTP tag listing, the external copy tool, and
    /// progress forwarded to `tracing`.
    pub fn with_copy_command(program: impl Into<String>) -> Self {
        Self::new(
            Arc::new(HttpTagLister::new()),
            Arc::new(CommandTransfer::new(program)),
            Arc::new(LogProgress),
        )
    }

    /// Plans `source` and copies every planned image to `destination`.
    pub async fn run(
        &self,
        source: &str,
        destination: &str,
        options: &SyncOptions,
        cancel: &CancellationToken,
    ) -> Result<SyncSummary> {
        validate_combination(options.source_transport, options.destination_transport)?;

        let run_id = Uuid::new_v4();
        let span = info_span!("sync",
            run_id = %run_id,
            src = %options.source_transport,
            dest = %options.destination_transport,
        );

        async {
            let plan = self.plan(source, options, cancel).await?;
            self.execute(plan, destination, options, cancel).await
        }
        .instrument(span)
        .await
    }

    /// Resolves the whole source, retrying the resolution as one unit.
    pub async fn plan(
        &self,
        source: &str,
        options: &SyncOptions,
        cancel: &CancellationToken,
    ) -> Result<SyncPlan> {
        let resolver = RepositoryResolver::new(self.tag_lister.as_ref(), self.progress.as_ref());
        let resolver = &resolver;
        let transport = options.source_transport;
        let ctx = &options.source_context;

        retry_if_necessary(cancel, &options.retry, "Planning sync", move || {
            resolver.resolve(source, transport, ctx)
        })
        .await
    }

    /// Copies every image of `plan`, in order, stopping at the first failure.
    ///
    /// Images copied before a failure stay copied.
    pub async fn execute(
        &self,
        plan: SyncPlan,
        destination: &str,
        options: &SyncOptions,
        cancel: &CancellationToken,
    ) -> Result<SyncSummary> {
        validate_combination(options.source_transport, options.destination_transport)?;

        let sources = plan.len();
        let mut images_copied = 0;

        for (index, descriptor) in plan.into_iter().enumerate() {
            let span = info_span!("descriptor", index, images = descriptor.len());
            images_copied += self
                .execute_descriptor(&descriptor, destination, options, cancel)
                .instrument(span)
                .await?;
        }

        self.progress.report(SyncEvent::Finished {
            images: images_copied,
            sources,
        });
        Ok(SyncSummary {
            images_copied,
            sources,
        })
    }

    async fn execute_descriptor(
        &self,
        descriptor: &RepoDescriptor,
        destination: &str,
        options: &SyncOptions,
        cancel: &CancellationToken,
    ) -> Result<usize> {
        let total = descriptor.len();

        for (counter, source) in descriptor.image_refs.iter().enumerate() {
            if cancel.is_cancelled() {
                return Err(SyncError::Cancelled);
            }

            let suffix = destination_suffix(source, descriptor, options.scoped);
            let dest_ref = destination_reference(
                &join_destination(destination, &suffix),
                options.destination_transport,
            )?;

            self.progress.report(SyncEvent::Copying {
                index: counter + 1,
                total,
                from: source.to_string(),
                to: dest_ref.to_string(),
            });

            let request = TransferRequest {
                source,
                destination: &dest_ref,
                source_context: &descriptor.context,
                destination_context: &options.destination_context,
                options: &options.transfer,
            };
            let request = &request;
            let transfer = self.transfer.as_ref();
            let what = format!("Copying {}", source);

            retry_if_necessary(cancel, &options.retry, &what, move || {
                transfer.transfer(request)
            })
            .await
            .map_err(|e| match e {
                TransferError::Cancelled => SyncError::Cancelled,
                e => SyncError::Transfer {
                    reference: source.to_string(),
                    source: e,
                },
            })?;
        }

        info!(count = total, "Descriptor synced");
        Ok(total)
    }
}
