mod entry;
mod link;
pub mod timestamp;

pub use entry::{WorkDate, WorkLogEntry};
pub use link::{LinkMetadata, ShareableLink, UpdatedMetadata};
