pub mod normalize;
mod preview;
mod version;

pub use preview::preview_compact;
pub use version::first_version_segment;
