pub mod requests;
pub mod responses;

pub use requests::{ClearQuery, IntervalRequest};
pub use responses::*;
