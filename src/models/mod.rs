//! Domain model module declarations.

pub mod action_file;
pub mod dispatch;
pub mod work_item;

pub use action_file::{ActionFile, FileType, FrontMatter};
pub use dispatch::{DispatchOutcome, DispatchRequest, DispatchResult};
pub use work_item::{WorkItem, WorkPayload};
