mod flow;
mod liveness;
mod reaching_defs;
