pub mod domain;
pub mod error;
pub mod matching;
pub mod normalize;
pub mod time;

pub use domain::*;
pub use error::CoreError;
