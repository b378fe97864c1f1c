//! Day-1 / Day-2 scenario drivers (C6, C7), layered on top of the
//! simulation engine and the static analysis components.

pub mod day1;
pub mod day2;
pub mod report;

pub use day1::{bring_up_interfaces, Day1Report};
pub use day2::Day2Report;
