pub mod generation;
pub mod playback;

pub use generation::GenerationQueue;
pub use playback::PlaybackQueue;
