//! Cross-module pipeline tests.

mod pipeline_flow;
