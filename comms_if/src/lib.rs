//! # Communications interface crate.
//!
//! Provides the interface types shared between the player executable and the equipment it drives.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

/// Command definitions for equipment (like the joint actuators)
pub mod eqpt;
