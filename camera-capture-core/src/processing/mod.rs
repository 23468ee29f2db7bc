pub mod frame_pool;
pub mod negotiator;
