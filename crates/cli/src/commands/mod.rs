pub mod build;
pub mod extractors;
pub mod progress;
pub mod scan;
pub mod stats;
pub mod util;

pub use build::*;
pub use extractors::*;
pub use progress::*;
pub use scan::*;
pub use stats::*;
pub use util::*;
