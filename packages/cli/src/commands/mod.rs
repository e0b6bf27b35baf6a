pub mod apply;
pub mod format;

pub use apply::{apply, ApplyArgs};
pub use format::{format, FormatArgs};
