//! Structural dataflow analyses and counter instrumentation for a MATLAB-like
//! language.

pub mod cli;
pub mod commons;
pub mod front_end;
pub mod middle_end;
