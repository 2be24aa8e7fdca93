//! Vehicle Cost Engine library crate.
//!
//! This crate compares buying a vehicle outright, financing it with an
//! amortising loan and salary-packaging it through a novated lease, under
//! Australian income tax, GST and FBT rules.  External applications may
//! depend on the `vehicle_cost_engine` crate and call
//! [`engine::compute_comparison`] directly or embed the API via
//! [`api::build_router`].
//!
//! Every calculator is a pure function of a [`models::UserInputs`]
//! snapshot and a [`policy::Policy`]; none of them can fail.

pub mod api;
pub mod config;
pub mod engine;
pub mod error;
pub mod format;
pub mod loan;
pub mod models;
pub mod novated;
pub mod outright;
pub mod policy;
pub mod running_costs;
pub mod safe_math;
pub mod tax;

pub use engine::{compare, compare_batch, compute_comparison};
pub use loan::compute_loan_finance;
pub use novated::compute_novated_lease;
pub use outright::compute_outright;
pub use running_costs::compute_running_costs;
pub use tax::compute_tax;
