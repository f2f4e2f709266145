//! TUI screens

mod dashboard;
mod practice;

pub use dashboard::{DashboardAction, DashboardScreen};
pub use practice::{PracticeAction, PracticeScreen};
