use std::fmt::{Display, Formatter};

use crate::controller::ControllerState;
use crate::model::ModelState;
use crate::ui::UiState;

#[derive(Debug)]
pub enum Error {
    AppControllerTaskFailed(String),
    ControllerChannelClosed,
    ControllerMissingChannels,
    ControllerMissingStateReceiver,
    ControllerStateSenderClosed,
    InvalidControllerStateTransition(ControllerState, ControllerState),
    InvalidModelStateTransition(ModelState, ModelState),
    InvalidUiStateTransition(UiState, UiState),
    ModelChannelClosed,
    ModelMissingChannels,
    ModelMissingStateReceiver,
    UiMissingChannels,
    UiMissingStateReceiver,
    UiStateSenderClosed,
}

impl Display for Error {
    fn fmt(&self, f: &mut Formatter) -> Result<(), std::fmt::Error> {
        match &*self {
            Self::AppControllerTaskFailed(msg) => {
                write!(f, "An application task failed: {}", msg)
            }
            Self::ControllerChannelClosed => {
                write!(f, "Controller is no longer receiving messages")
            }
            Self::ControllerMissingChannels => {
                write!(f, "Controller was polled without its channels")
            }
            Self::ControllerMissingStateReceiver => {
                write!(f, "Controller is missing the state receiver")
            }
            Self::ControllerStateSenderClosed => {
                write!(f, "Controller state sender is already closed")
            }
            Self::InvalidControllerStateTransition(from, to) => write!(
                f,
                "Invalid ControllerState transition from {:?} to {:?}",
                from, to
            ),
            Self::InvalidModelStateTransition(from, to) => write!(
                f,
                "Invalid ModelState transition from {:?} to {:?}",
                from, to
            ),
            Self::InvalidUiStateTransition(from, to) => {
                write!(f, "Invalid UiState transition from {:?} to {:?}", from, to)
            }
            Self::ModelChannelClosed => {
                write!(f, "Model is no longer receiving messages")
            }
            Self::ModelMissingChannels => {
                write!(f, "Model was polled without its channels")
            }
            Self::ModelMissingStateReceiver => {
                write!(f, "Model is missing the state receiver")
            }
            Self::UiMissingChannels => {
                write!(f, "Ui was polled without its channels")
            }
            Self::UiMissingStateReceiver => {
                write!(f, "Ui is missing the state receiver")
            }
            Self::UiStateSenderClosed => {
                write!(f, "Ui state sender is already closed")
            }
        }?;
        Ok(())
    }
}

impl std::error::Error for Error {}
