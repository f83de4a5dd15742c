//! Data types shared by the decoder, the classifier and the stream controller.

mod message;
mod mrt;
mod query;

pub use message::*;
pub use mrt::*;
pub use query::*;
