/// Number of backup successors kept besides the immediate one.
pub static SUCCESSOR_COUNT: usize = 2;

pub static MAINTENANCE_SLEEP_MILLIS: u64 = 20;
pub static SUCCESSOR_RETRY_SLEEP_MILLIS: u64 = 50;
pub static PREDECESSOR_RETRY_SLEEP_MILLIS: u64 = 20;
pub static REQUEST_TIMEOUT_MILLIS: u64 = 500;

pub static BOOTSTRAP_FILES_DEFAULT: usize = 100;
