//! `tillpoint-loans` — customer loan ledger and oldest-first payment
//! allocation.

pub mod ledger;

pub use ledger::{AllocationOutcome, LoanEntry, LoanLedger, LoanPayment, LoanStatus};
