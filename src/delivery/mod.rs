pub mod creator;
pub mod processor;
pub mod status;

/// How many queue rows a single fan-out insert writes. Fixed so one request
/// never turns into an unbounded write, regardless of recipient count.
pub const FANOUT_CHUNK_SIZE: usize = 50;

/// Default items-per-pass bound for the processor.
pub const DEFAULT_PASS_SIZE: i64 = 50;

/// Delivery attempts per item before it is marked failed for good.
pub const DEFAULT_MAX_ATTEMPTS: i32 = 3;

/// Job type used when the caller does not name one.
pub const DEFAULT_JOB_TYPE: &str = "general";
