//! Pure rotation-scheduling logic: pair enumeration and the greedy
//! continuity-preserving sequence builder. No I/O, no shared state, so the
//! whole module is exercised by plain unit tests.

pub mod builder;
pub mod pairs;
