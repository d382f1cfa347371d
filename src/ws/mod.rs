pub mod broker;
pub mod connctx;
pub mod presence;
