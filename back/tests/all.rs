// Single integration test binary that aggregates all test modules.
mod suite;
