mod bootstrap;
mod demo;
mod host;
mod loop_runner;
mod metrics;
mod scenario;

pub(crate) use bootstrap::build_app;
pub(crate) use loop_runner::run;
