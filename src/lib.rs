//! Sortie - battle sessions launched from a persistent campaign
//!
//! `session` launches a battle on an external game engine with the player's
//! units and any bot forces. `outcome` reconciles what the engine reports
//! afterwards back into the `campaign`.

pub mod campaign;
pub mod core;
pub mod engine;
pub mod outcome;
pub mod session;
