//! Cross-module tests and shared fakes.

pub(crate) mod support;

mod pipeline_scenarios;
