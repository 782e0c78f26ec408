pub mod analysis;
pub mod instrumentation;
