//! Workflow rules for RNC status transitions
//!
//! | action | from                     | to          |
//! |--------|--------------------------|-------------|
//! | close  | open                     | closed      |
//! | reopen | closed                   | in_progress |
//! | cancel | open, in_progress, closed| cancelled   |
//!
//! Nothing else is reachable. Each accepted action yields an [`RncEvent`]
//! recording who did it, when, and the operator's note.

use chrono::{DateTime, Utc};
use miette::Diagnostic;
use thiserror::Error;

use crate::entities::rnc::{RncAction, RncEvent, RncStatus};

/// Errors that can occur during workflow operations
#[derive(Debug, Clone, PartialEq, Eq, Error, Diagnostic)]
pub enum WorkflowError {
    #[error("cannot {action} an RNC that is {from}")]
    #[diagnostic(
        code(rnc::workflow::invalid_transition),
        help("close applies to open RNCs, reopen to closed RNCs, cancel to anything not already cancelled")
    )]
    InvalidTransition { action: RncAction, from: RncStatus },
}

/// Status reached by applying `action` to an RNC in `from`
pub fn target_status(action: RncAction, from: RncStatus) -> Result<RncStatus, WorkflowError> {
    let to = match (action, from) {
        (RncAction::Close, RncStatus::Open) => RncStatus::Closed,
        (RncAction::Reopen, RncStatus::Closed) => RncStatus::InProgress,
        (RncAction::Cancel, RncStatus::Open | RncStatus::InProgress | RncStatus::Closed) => {
            RncStatus::Cancelled
        }
        _ => return Err(WorkflowError::InvalidTransition { action, from }),
    };
    Ok(to)
}

/// Check if a status transition is valid
pub fn is_valid_transition(from: RncStatus, to: RncStatus) -> bool {
    allowed_actions(from)
        .iter()
        .any(|&a| target_status(a, from) == Ok(to))
}

/// Actions available from the current status
pub fn allowed_actions(current: RncStatus) -> Vec<RncAction> {
    match current {
        RncStatus::Open => vec![RncAction::Close, RncAction::Cancel],
        RncStatus::InProgress => vec![RncAction::Cancel],
        RncStatus::Closed => vec![RncAction::Reopen, RncAction::Cancel],
        RncStatus::Cancelled => vec![],
    }
}

/// Validate `action` and build the history entry for it
pub fn transition(
    action: RncAction,
    from: RncStatus,
    note: &str,
    actor: &str,
    at: DateTime<Utc>,
) -> Result<RncEvent, WorkflowError> {
    let to = target_status(action, from)?;
    Ok(RncEvent {
        action,
        from,
        to,
        note: note.trim().to_string(),
        actor: actor.to_string(),
        at,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_close_only_from_open() {
        assert_eq!(
            target_status(RncAction::Close, RncStatus::Open),
            Ok(RncStatus::Closed)
        );
        for from in [RncStatus::InProgress, RncStatus::Closed, RncStatus::Cancelled] {
            assert!(target_status(RncAction::Close, from).is_err());
        }
    }

    #[test]
    fn test_reopen_only_from_closed() {
        assert_eq!(
            target_status(RncAction::Reopen, RncStatus::Closed),
            Ok(RncStatus::InProgress)
        );
        for from in [RncStatus::Open, RncStatus::InProgress, RncStatus::Cancelled] {
            assert!(target_status(RncAction::Reopen, from).is_err());
        }
    }

    #[test]
    fn test_cancel_from_anything_but_cancelled() {
        for from in [RncStatus::Open, RncStatus::InProgress, RncStatus::Closed] {
            assert_eq!(
                target_status(RncAction::Cancel, from),
                Ok(RncStatus::Cancelled)
            );
        }
        assert_eq!(
            target_status(RncAction::Cancel, RncStatus::Cancelled),
            Err(WorkflowError::InvalidTransition {
                action: RncAction::Cancel,
                from: RncStatus::Cancelled
            })
        );
    }

    #[test]
    fn test_reachable_transitions_are_exactly_the_table() {
        let mut reachable = Vec::new();
        for from in RncStatus::ALL {
            for to in RncStatus::ALL {
                if is_valid_transition(from, to) {
                    reachable.push((from, to));
                }
            }
        }
        assert_eq!(
            reachable,
            vec![
                (RncStatus::Open, RncStatus::Closed),
                (RncStatus::Open, RncStatus::Cancelled),
                (RncStatus::InProgress, RncStatus::Cancelled),
                (RncStatus::Closed, RncStatus::InProgress),
                (RncStatus::Closed, RncStatus::Cancelled),
            ]
        );
    }

    #[test]
    fn test_transition_builds_event() {
        let at = Utc::now();
        let event = transition(RncAction::Close, RncStatus::Open, "  fixed weld  ", "ana", at)
            .unwrap();
        assert_eq!(event.from, RncStatus::Open);
        assert_eq!(event.to, RncStatus::Closed);
        assert_eq!(event.note, "fixed weld");
        assert_eq!(event.actor, "ana");
        assert_eq!(event.at, at);
    }

    #[test]
    fn test_error_message_names_action_and_status() {
        let err = target_status(RncAction::Reopen, RncStatus::Open).unwrap_err();
        assert_eq!(err.to_string(), "cannot reopen an RNC that is open");
    }
}
