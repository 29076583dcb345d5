pub mod job;
pub mod pool;
pub mod retry;

pub use job::{JobOutcome, Stage, StageJob};
pub use pool::WorkerPool;
pub use retry::RetryPolicy;
