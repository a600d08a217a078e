//! Frame processing pipeline
//!
//! landmark frame → finger state → classifier → stabilizer → (on change)
//! resolver → actuation controller. The pipeline runs as a single task fed
//! by a command channel, so configuration edits and frames never interleave
//! mid-resolution.

mod gate;
mod handle;
mod processor;

pub use gate::FrameGate;
pub use handle::{FrameOutcome, PipelineHandle};
pub use processor::{GesturePipeline, PipelineStatus};
