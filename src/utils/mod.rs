pub mod start_gate;
