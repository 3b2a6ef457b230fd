pub(crate) mod autopilot;
pub(crate) mod bootstrap;
pub(crate) mod loop_runner;
pub(crate) mod maps;
pub(crate) mod presentation;
