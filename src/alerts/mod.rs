mod classifier;
mod detector;

pub use detector::AlertDetector;
