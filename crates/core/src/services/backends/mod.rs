#[cfg(feature = "rizin-backend")]
pub mod rizin;
pub mod sidecar;

#[cfg(feature = "rizin-backend")]
pub use rizin::RizinExtractor;
pub use sidecar::{sidecar_path, SidecarExtractor, SIDECAR_SUFFIX};
