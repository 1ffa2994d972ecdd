mod post_processor;

pub use post_processor::{PostProcessor, HACKER_CONFIDENCE, HACKER_VALUE};
