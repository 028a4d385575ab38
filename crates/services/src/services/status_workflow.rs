//! Allowed status transitions for invoices and estimates, and which of them
//! need an explicit confirmation from the user.

use std::fmt::Display;

use db::models::{estimate::EstimateStatus, invoice::InvoiceStatus};

use super::error::ServiceError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Allowed,
    NeedsConfirmation,
    Forbidden,
}

pub trait Workflow: Copy + PartialEq + Display {
    fn transition_to(self, next: Self) -> Transition;
}

impl Workflow for InvoiceStatus {
    fn transition_to(self, next: Self) -> Transition {
        use InvoiceStatus::*;
        match (self, next) {
            (Draft, Sent) | (Sent, Paid) | (Sent, Overdue) | (Overdue, Paid) => Transition::Allowed,
            (Draft, Cancelled)
            | (Sent, Draft)
            | (Sent, Cancelled)
            | (Overdue, Cancelled)
            | (Paid, Sent) => Transition::NeedsConfirmation,
            _ => Transition::Forbidden,
        }
    }
}

impl Workflow for EstimateStatus {
    fn transition_to(self, next: Self) -> Transition {
        use EstimateStatus::*;
        match (self, next) {
            (Draft, Sent) | (Sent, Accepted) | (Sent, Expired) => Transition::Allowed,
            (Sent, Rejected)
            | (Sent, Draft)
            | (Accepted, Sent)
            | (Rejected, Draft)
            | (Expired, Draft) => Transition::NeedsConfirmation,
            // Converted is only reachable through conversion
            _ => Transition::Forbidden,
        }
    }
}

/// Checks `from -> to`, honouring `confirmed` for guarded transitions.
pub fn check<S: Workflow>(from: S, to: S, confirmed: bool) -> Result<(), ServiceError> {
    match from.transition_to(to) {
        Transition::Allowed => Ok(()),
        Transition::NeedsConfirmation if confirmed => Ok(()),
        Transition::NeedsConfirmation => Err(ServiceError::ConfirmationRequired {
            from: from.to_string(),
            to: to.to_string(),
        }),
        Transition::Forbidden => Err(ServiceError::InvalidTransition {
            from: from.to_string(),
            to: to.to_string(),
        }),
    }
}
