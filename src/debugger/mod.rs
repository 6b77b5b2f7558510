pub mod breakpoint;
pub mod context;
pub mod error;
pub mod history;
pub mod kind;
pub mod pool;
pub mod session;
pub mod stack;
pub mod status;
