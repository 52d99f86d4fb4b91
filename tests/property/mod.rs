//! Property-based tests for rate formulas and tracker invariants
