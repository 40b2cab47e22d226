//! Scenario tests for the geometry handle

mod handle_scenarios;
