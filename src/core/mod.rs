pub mod actions;
pub mod batch;
pub mod notice;
pub mod timefmt;
