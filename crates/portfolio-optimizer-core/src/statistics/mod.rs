pub mod descriptive;
pub mod returns;

pub use returns::{ReturnSeries, ReturnStatistics};
