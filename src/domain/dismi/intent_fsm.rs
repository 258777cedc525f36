use serde::{Deserialize, Serialize};
use std::fmt;

/// Internal lifecycle state of a client intent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum InternalState {
    Submit,
    Update,
    Validating,
    ValidationFailure,
    Validated,
    Compiling,
    CompilationFailure,
    Compiled,
    Installing,
    Negotiation,
    InstallationFailed,
    Installed,
    WithdrawalRequest,
    Withdrawing,
    Withdrawn,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IntentStateEvent {
    SubmitForValidation,
    ValidationSuccess,
    ValidationFailure,
    SubmitForCompilation,
    CompilationSuccess,
    CompilationFailure,
    SubmitForInstallation,
    InstallationSuccess,
    InstallationFailure,
    Negotiation,
    UpdateRequest,
    WithdrawalRequest,
    SubmitForWithdrawal,
    WithdrawalSuccess,
}

/// State reported to clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UserState {
    Processing,
    ProcessingFailed,
    Installing,
    Negotiation,
    Failed,
    Installed,
    Withdrawing,
    Withdrawn,
    Unknown,
}

impl fmt::Display for UserState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            UserState::Processing => "PROCESSING",
            UserState::ProcessingFailed => "PROCESSING_FAILED",
            UserState::Installing => "INSTALLING",
            UserState::Negotiation => "NEGOTIATION",
            UserState::Failed => "FAILED",
            UserState::Installed => "INSTALLED",
            UserState::Withdrawing => "WITHDRAWING",
            UserState::Withdrawn => "WITHDRAWN",
            UserState::Unknown => "UNKNOWN",
        };
        f.write_str(s)
    }
}

impl InternalState {
    /// Successor of `self` on `event`, if the transition is legal.
    pub fn next(self, event: IntentStateEvent) -> Option<InternalState> {
        use IntentStateEvent as E;
        use InternalState as S;

        match (self, event) {
            (S::Submit | S::Update, E::SubmitForValidation) => Some(S::Validating),
            (S::Validating, E::ValidationSuccess) => Some(S::Validated),
            (S::Validating, E::ValidationFailure) => Some(S::ValidationFailure),
            (S::ValidationFailure | S::CompilationFailure | S::InstallationFailed | S::Installed, E::UpdateRequest) => Some(S::Update),
            (S::Validated, E::SubmitForCompilation) => Some(S::Compiling),
            (S::Compiling, E::CompilationSuccess) => Some(S::Compiled),
            (S::Compiling, E::CompilationFailure) => Some(S::CompilationFailure),
            (S::Compiled, E::SubmitForInstallation) => Some(S::Installing),
            (S::Installing, E::InstallationSuccess) => Some(S::Installed),
            (S::Installing, E::InstallationFailure) => Some(S::InstallationFailed),
            (S::Installing, E::Negotiation) => Some(S::Negotiation),
            (S::Negotiation, E::UpdateRequest) => Some(S::Update),
            (S::Negotiation, E::SubmitForWithdrawal) => Some(S::Withdrawing),
            (S::InstallationFailed, E::SubmitForInstallation) => Some(S::Installing),
            (S::InstallationFailed, E::WithdrawalRequest) => Some(S::WithdrawalRequest),
            (S::Installed, E::InstallationFailure) => Some(S::InstallationFailed),
            (S::Installed, E::WithdrawalRequest) => Some(S::WithdrawalRequest),
            (S::Installed, E::SubmitForWithdrawal) => Some(S::Withdrawing),
            (S::WithdrawalRequest, E::SubmitForWithdrawal) => Some(S::Withdrawing),
            (S::Withdrawing, E::WithdrawalSuccess) => Some(S::Withdrawn),
            _ => None,
        }
    }

    pub fn user_state(self) -> UserState {
        match self {
            InternalState::Submit
            | InternalState::Update
            | InternalState::Validating
            | InternalState::Validated
            | InternalState::Compiling
            | InternalState::Compiled => UserState::Processing,
            InternalState::ValidationFailure | InternalState::CompilationFailure => UserState::ProcessingFailed,
            InternalState::Installing => UserState::Installing,
            InternalState::Negotiation => UserState::Negotiation,
            InternalState::InstallationFailed => UserState::Failed,
            InternalState::Installed => UserState::Installed,
            InternalState::WithdrawalRequest | InternalState::Withdrawing => UserState::Withdrawing,
            InternalState::Withdrawn => UserState::Withdrawn,
        }
    }
}

/// Guarded state holder. Illegal events leave the state unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntentStateMachine {
    state: InternalState,
}

impl Default for IntentStateMachine {
    fn default() -> Self {
        Self { state: InternalState::Submit }
    }
}

impl IntentStateMachine {
    pub fn new(state: InternalState) -> Self {
        Self { state }
    }

    pub fn state(&self) -> InternalState {
        self.state
    }

    pub fn user_state(&self) -> UserState {
        self.state.user_state()
    }

    pub fn can_transition(&self, event: IntentStateEvent) -> bool {
        self.state.next(event).is_some()
    }

    /// Applies `event` if legal.
    ///
    /// # Returns
    /// Returns true if the state changed.
    pub fn transition(&mut self, event: IntentStateEvent) -> bool {
        match self.state.next(event) {
            Some(next) => {
                log::debug!("Intent state {:?} -> {:?} on {:?}.", self.state, next, event);
                self.state = next;
                true
            }
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn happy_path_reaches_installed() {
        let mut fsm = IntentStateMachine::default();
        for event in [
            IntentStateEvent::SubmitForValidation,
            IntentStateEvent::ValidationSuccess,
            IntentStateEvent::SubmitForCompilation,
            IntentStateEvent::CompilationSuccess,
            IntentStateEvent::SubmitForInstallation,
            IntentStateEvent::InstallationSuccess,
        ] {
            assert!(fsm.transition(event), "Should accept {:?}", event);
        }
        assert_eq!(fsm.user_state(), UserState::Installed);
    }

    #[test]
    fn illegal_event_is_ignored() {
        let mut fsm = IntentStateMachine::default();
        assert!(!fsm.transition(IntentStateEvent::InstallationSuccess));
        assert_eq!(fsm.state(), InternalState::Submit);
    }

    #[test]
    fn failed_installation_can_be_retried() {
        let mut fsm = IntentStateMachine::new(InternalState::Installing);
        assert!(fsm.transition(IntentStateEvent::InstallationFailure));
        assert_eq!(fsm.user_state(), UserState::Failed);
        assert!(fsm.can_transition(IntentStateEvent::SubmitForInstallation));
    }
}
