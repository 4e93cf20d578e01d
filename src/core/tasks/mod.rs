// src/core/tasks/mod.rs

//! Long-running background tasks that support the gateway: the periodic
//! latency-probe sweep and supervision of the network helper process.

pub mod helper_process;
pub mod ping_pruner;
