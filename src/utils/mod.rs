pub mod percentile;
pub mod utils_time;
