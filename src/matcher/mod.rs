// Matcher module - back half of the detection pipeline
//
// Closed tone events are buffered in a time-indexed ring and periodically
// searched with a sliding window per profile. The windowed search replaces a
// sequential state machine: leading and interleaved noise events are simply
// skipped when looking for the best cycle run.

pub mod buffer;
pub mod windowed;

pub use buffer::EventBuffer;
pub use windowed::{WindowConfig, WindowedMatcher};
