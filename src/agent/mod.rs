//! Agent module — the turn controller and the run loop around it.

pub mod agent_loop;
pub mod turn;

pub use agent_loop::Agent;
pub use turn::TurnController;
