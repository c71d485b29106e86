pub mod simple_scheduler;

pub use simple_scheduler::SimpleTaskManager;
