use sharpframe_producer::FrameSource;
use tracing::{debug, info};

use crate::filter::FrameClassifier;
use crate::storage::{FrameSink, StorageError};

/// Counters for one run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PipelineStats {
    pub processed: u64,
    pub saved: u64,
    pub blurry: u64,
}

/// Pull every frame from `source`, classify it, and save the sharp ones.
///
/// The sink's directory is prepared before the first frame is read. The loop
/// ends when the source is exhausted; a failed save aborts the run. The
/// source stays owned by the caller and is released when it is dropped.
pub fn run(
    source: &mut dyn FrameSource,
    classifier: &dyn FrameClassifier,
    sink: &mut dyn FrameSink,
) -> Result<PipelineStats, StorageError> {
    sink.ensure_directory()?;

    info!(
        source = source.name(),
        classifier = classifier.name(),
        "entering frame loop"
    );

    let mut stats = PipelineStats::default();
    while let Some(frame) = source.next_frame() {
        let decision = classifier.classify(&frame);
        stats.processed += 1;

        if decision.is_blurry {
            stats.blurry += 1;
            debug!(index = frame.index(), score = decision.score, "blurry, skipping");
        } else {
            sink.save(&frame)?;
            stats.saved += 1;
            debug!(index = frame.index(), score = decision.score, "sharp, saved");
        }

        if stats.processed % 100 == 0 {
            debug!(processed = stats.processed, saved = stats.saved, "frames processed");
        }
    }

    info!(
        processed = stats.processed,
        saved = stats.saved,
        blurry = stats.blurry,
        "frame source exhausted"
    );
    Ok(stats)
}
