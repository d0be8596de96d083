//! # Player library
//!
//! Gait generation and behaviour control for the biped player. The executable in `main.rs` wires
//! these modules together, the library split exists so that the benchmarks and tests can reach
//! the same code.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

pub mod fsm;
pub mod mech_client;
pub mod params;
pub mod player;
pub mod sim;
pub mod skill;
pub mod task;
pub mod walk_ctrl;
pub mod world_model;
