//! @ai:module:intent Exact arithmetic and typed result values
//! @ai:module:layer domain
//! @ai:module:public_api ExactValue, ReferenceResult, ToolResult

pub mod exact;
pub mod reference;

pub use exact::ExactValue;
pub use reference::{ReferenceResult, ToolResult};
