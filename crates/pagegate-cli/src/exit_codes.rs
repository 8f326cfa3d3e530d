//! Process exit codes. Part of the public contract for CI pipelines.

pub const SUCCESS: i32 = 0;
pub const GATE_FAILED: i32 = 1; // Verdict was Failed, or validation found bad rules
pub const CONFIG_ERROR: i32 = 2; // Config, input or infrastructure error
