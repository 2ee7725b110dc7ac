mod decoder;
mod nms;
mod result;

pub use decoder::{decode, resolve_layout, OutputLayout, UNKNOWN_LABEL};
pub use nms::suppress;
pub use result::{BoundingBox, Detection};
