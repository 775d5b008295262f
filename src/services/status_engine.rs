use crate::error::{Error, Result};
use crate::models::application::ApplicationStatus;
use crate::models::user::Role;

/// Actions an actor can take on an existing application. `apply` is not
/// listed: it creates the record (always in `Pending`) rather than
/// transitioning one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplicationAction {
    SeekerAccept,
    ProviderAccept,
    ProviderReject,
    Withdraw,
    SeekerHide,
    ProviderHide,
}

impl ApplicationAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            ApplicationAction::SeekerAccept => "seeker_accept",
            ApplicationAction::ProviderAccept => "provider_accept",
            ApplicationAction::ProviderReject => "provider_reject",
            ApplicationAction::Withdraw => "withdraw",
            ApplicationAction::SeekerHide => "seeker_hide",
            ApplicationAction::ProviderHide => "provider_hide",
        }
    }
}

/// Outcome of a legal action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// Status moves to `next`. `unlocks_chat` is set on the single
    /// transition that first reaches `BothAccepted`; the caller must
    /// provision the chat channel in the same atomic store update.
    Move {
        next: ApplicationStatus,
        unlocks_chat: bool,
    },
    /// The record is hard-removed. Only legal before either terminal
    /// state is reached.
    Delete,
    /// Only the given role's hidden flag is set; status and chat are
    /// untouched.
    Hide(Role),
}

/// Pure transition table: maps (current status, acting role, action) to
/// an outcome without touching any store. Everything illegal is an
/// `InvalidTransition`; the caller's state stays as it was.
pub fn transition(
    current: ApplicationStatus,
    actor: Role,
    action: ApplicationAction,
) -> Result<Transition> {
    use crate::models::application::ApplicationStatus as S;

    match (actor, action) {
        (Role::Seeker, ApplicationAction::SeekerAccept) => match current {
            S::Pending => Ok(Transition::Move {
                next: S::SeekerAccepted,
                unlocks_chat: false,
            }),
            S::ProviderAccepted => Ok(Transition::Move {
                next: S::BothAccepted,
                unlocks_chat: true,
            }),
            S::SeekerAccepted | S::BothAccepted | S::Rejected => Err(illegal(current, action)),
        },

        (Role::Provider, ApplicationAction::ProviderAccept) => match current {
            S::Pending => Ok(Transition::Move {
                next: S::ProviderAccepted,
                unlocks_chat: false,
            }),
            S::SeekerAccepted => Ok(Transition::Move {
                next: S::BothAccepted,
                unlocks_chat: true,
            }),
            S::ProviderAccepted | S::BothAccepted | S::Rejected => Err(illegal(current, action)),
        },

        (Role::Provider, ApplicationAction::ProviderReject) => match current {
            S::Pending | S::SeekerAccepted | S::ProviderAccepted => Ok(Transition::Move {
                next: S::Rejected,
                unlocks_chat: false,
            }),
            S::BothAccepted | S::Rejected => Err(illegal(current, action)),
        },

        (Role::Seeker, ApplicationAction::Withdraw) => match current {
            S::Pending | S::SeekerAccepted | S::ProviderAccepted => Ok(Transition::Delete),
            // Finished applications can only be hidden from the list,
            // never removed from the record store.
            S::BothAccepted | S::Rejected => Err(Error::InvalidTransition(format!(
                "cannot withdraw a {} application; remove it from your list instead",
                current.as_str()
            ))),
        },

        (Role::Seeker, ApplicationAction::SeekerHide) => match current {
            S::BothAccepted | S::Rejected => Ok(Transition::Hide(Role::Seeker)),
            S::Pending | S::SeekerAccepted | S::ProviderAccepted => {
                Err(Error::InvalidTransition(format!(
                    "a {} application is withdrawn, not hidden",
                    current.as_str()
                )))
            }
        },

        (Role::Provider, ApplicationAction::ProviderHide) => match current {
            S::BothAccepted => Ok(Transition::Hide(Role::Provider)),
            S::Pending | S::SeekerAccepted | S::ProviderAccepted | S::Rejected => {
                Err(illegal(current, action))
            }
        },

        (actor, action) => Err(Error::InvalidTransition(format!(
            "a {} cannot perform {}",
            actor.as_str(),
            action.as_str()
        ))),
    }
}

fn illegal(current: ApplicationStatus, action: ApplicationAction) -> Error {
    Error::InvalidTransition(format!(
        "{} is not allowed while the application is {}",
        action.as_str(),
        current.as_str()
    ))
}
