pub mod display;
pub mod hibernation;

pub use display::{DisplayState, PowerActions, ShellPowerActions};
pub use hibernation::{HibernationController, HibernationState, ToggleOutcome};

#[cfg(test)]
pub(crate) use display::FakePower;
