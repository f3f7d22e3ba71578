// THEORY:
// `ParallelPipeline` runs the per-block half of `SheetPipeline` on a bounded pool
// of blocking tasks. Image work is CPU-bound and synchronous, so every unit runs
// under `tokio::task::spawn_blocking`; the async side only schedules and
// collects.
//
// Key architectural principles:
// 1.  **Shared, immutable inputs**: the sheet, its guide mask, the pipeline and
//     the exporter are wrapped in `Arc` once and cloned into each task. No task
//     holds a lock or mutates anything another task can see.
// 2.  **Bounded fan-out**: `buffered(workers)` keeps at most `workers` blocks in
//     flight, one per CPU by default.
// 3.  **Validate before writing**: every block is processed first and the
//     exporter checks the whole run before the export pass starts, so a
//     rejected frames map leaves no partial output behind.
// 4.  **Order preservation**: `buffered` yields results in dispatch order, so the
//     manifest lists blocks in reading order no matter which worker finishes
//     first.

use crate::core_modules::sprite_sheet::SpriteSheet;
use crate::error::{SlicerError, SlicerResult};
use crate::exporter::BlockExporter;
use crate::manifest::{Manifest, ManifestBlock};
use crate::pipeline::{finish_run, validate_run, ProcessedBlock, SheetPipeline};
use futures::stream::{self, StreamExt};
use std::path::Path;
use std::sync::Arc;
use tokio::task::JoinError;
use tracing::info;

fn worker_error(error: JoinError) -> SlicerError {
    SlicerError::Worker {
        message: error.to_string(),
    }
}

pub struct ParallelPipeline {
    pipeline: Arc<SheetPipeline>,
    workers: usize,
}

impl ParallelPipeline {
    pub fn new(pipeline: SheetPipeline) -> Self {
        let workers = pipeline.config().effective_workers();
        Self {
            pipeline: Arc::new(pipeline),
            workers,
        }
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Same result as `SheetPipeline::run`, with blocks processed concurrently.
    pub async fn run(
        &self,
        sheet: Arc<SpriteSheet>,
        source: &Path,
        exporter: Arc<BlockExporter>,
    ) -> SlicerResult<Manifest> {
        let analysis = {
            let pipeline = Arc::clone(&self.pipeline);
            let sheet = Arc::clone(&sheet);
            tokio::task::spawn_blocking(move || pipeline.analyze(&sheet))
                .await
                .map_err(worker_error)?
        };
        let guide = Arc::new(analysis.guide);
        info!(blocks = analysis.boxes.len(), workers = self.workers, "dispatching blocks");

        let processed: Vec<Result<ProcessedBlock, JoinError>> = stream::iter(analysis.boxes.into_iter().enumerate())
            .map(|(index, bounds)| {
                let pipeline = Arc::clone(&self.pipeline);
                let sheet = Arc::clone(&sheet);
                let guide = Arc::clone(&guide);
                tokio::task::spawn_blocking(move || pipeline.process_block(&sheet, &guide, index, bounds))
            })
            .buffered(self.workers)
            .collect()
            .await;
        let processed = processed
            .into_iter()
            .collect::<Result<Vec<_>, _>>()
            .map_err(worker_error)?;
        validate_run(&processed, &exporter)?;

        let results: Vec<Result<SlicerResult<ManifestBlock>, JoinError>> = stream::iter(processed)
            .map(|block| {
                let exporter = Arc::clone(&exporter);
                tokio::task::spawn_blocking(move || {
                    exporter.export(&block.info, &block.image, block.has_alpha, block.label)
                })
            })
            .buffered(self.workers)
            .collect()
            .await;

        let mut blocks = Vec::with_capacity(results.len());
        for result in results {
            blocks.push(result.map_err(worker_error)??);
        }
        finish_run(source, blocks, &exporter)
    }
}
