pub mod thread_pool;
pub mod worker;
