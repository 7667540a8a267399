pub mod dates;
pub mod output;
pub mod parallel;
pub mod progress;
