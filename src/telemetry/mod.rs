pub mod config;
pub mod ctx;
pub mod emit;
pub mod ops;

use ctx::LogCtx;

// Factory helpers, one per CLI op
pub fn extract() -> LogCtx<ops::extract::Extract> { LogCtx { json: config::logs_are_json(), _marker: std::marker::PhantomData } }
pub fn inspect() -> LogCtx<ops::inspect::Inspect> { LogCtx { json: config::logs_are_json(), _marker: std::marker::PhantomData } }
