//! Step definitions for the Cucumber runner.

mod chunking_steps;
