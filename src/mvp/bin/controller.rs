use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use clientes::screen::Mutation;

use crate::app_controller::AppControllerMessages;
use crate::error::Error;
use crate::model::{ModelMessages, Responder};
use crate::ui::UiMessages;

#[derive(Debug)]
pub struct ControllerChannels {
    pub receiver: tokio::sync::mpsc::Receiver<ControllerMessages>,
    pub to_app_controller: tokio::sync::mpsc::Sender<AppControllerMessages>,
    pub to_model: crossbeam_channel::Sender<ModelMessages>,
    pub to_ui: tokio::sync::mpsc::Sender<UiMessages>,
}

#[derive(Debug)]
pub enum ControllerMessages {
    GetCustomers(u64, Responder),
    SendMutation(Mutation, Responder),
    UiRequestsQuit,
}

#[derive(Clone, Debug, PartialEq)]
pub enum ControllerState {
    New,
    Running,
    Finished,
}

pub struct Controller {
    channels: Option<ControllerChannels>,
    state: ControllerState,
    state_receiver: Option<tokio::sync::mpsc::Receiver<ControllerState>>,
}

impl Controller {
    pub fn new(channels: ControllerChannels) -> Result<Self, Error> {
        Ok(Self {
            channels: Some(channels),
            state: ControllerState::New,
            state_receiver: None,
        })
    }

    fn run(
        channels: ControllerChannels,
        state_sender: tokio::sync::mpsc::Sender<ControllerState>,
    ) -> tokio::task::JoinHandle<Result<(), Error>> {
        tokio::spawn(async move {
            let result = Self::forward(channels, state_sender).await;
            if let Err(error) = &result {
                error!("Controller stopped: {}", error);
            }
            result
        })
    }

    async fn forward(
        channels: ControllerChannels,
        state_sender: tokio::sync::mpsc::Sender<ControllerState>,
    ) -> Result<(), Error> {
        let ControllerChannels {
            mut receiver,
            to_app_controller,
            to_model,
            to_ui,
        } = channels;
        loop {
            match receiver.recv().await {
                Some(ControllerMessages::GetCustomers(generation, responder)) => {
                    to_model
                        .send(ModelMessages::GetCustomers(generation, responder))
                        .map_err(|_| Error::ModelChannelClosed)?;
                }
                Some(ControllerMessages::SendMutation(mutation, responder)) => {
                    debug!("Forwarding {:?} to Model", mutation);
                    to_model
                        .send(ModelMessages::SendMutation(mutation, responder))
                        .map_err(|_| Error::ModelChannelClosed)?;
                }
                Some(ControllerMessages::UiRequestsQuit) => {
                    if to_model.send(ModelMessages::UiRequestsQuit).is_err() {
                        warn!("Model was already gone at quit");
                    }
                    if to_ui.send(UiMessages::UiRequestsQuit).await.is_err() {
                        warn!("Ui was already gone at quit");
                    }
                    if to_app_controller
                        .send(AppControllerMessages::UiRequestsQuit)
                        .await
                        .is_err()
                    {
                        warn!("AppController was already gone at quit");
                    }
                    state_sender
                        .send(ControllerState::Finished)
                        .await
                        .map_err(|_| Error::ControllerStateSenderClosed)?;
                    return Ok(());
                }
                None => {
                    return Err(Error::ControllerChannelClosed);
                }
            }
        }
    }
}

impl Future for Controller {
    type Output = Result<(), Error>;

    fn poll(self: Pin<&mut Self>, context: &mut Context<'_>) -> Poll<Result<(), Error>> {
        let this = self.get_mut();
        if this.state == ControllerState::New {
            let channels = match this.channels.take() {
                Some(channels) => channels,
                None => return Poll::Ready(Err(Error::ControllerMissingChannels)),
            };
            let (tx, rx) = tokio::sync::mpsc::channel(1);
            this.state_receiver = Some(rx);
            Self::run(channels, tx);
            this.state = ControllerState::Running;
        }
        loop {
            let receiver = match this.state_receiver.as_mut() {
                Some(receiver) => receiver,
                None => return Poll::Ready(Err(Error::ControllerMissingStateReceiver)),
            };
            match receiver.poll_recv(context) {
                Poll::Pending => return Poll::Pending,
                Poll::Ready(Some(ControllerState::New)) => {
                    return Poll::Ready(Err(Error::InvalidControllerStateTransition(
                        this.state.clone(),
                        ControllerState::New,
                    )));
                }
                Poll::Ready(Some(next_state)) => {
                    this.state = next_state;
                    if this.state == ControllerState::Finished {
                        return Poll::Ready(Ok(()));
                    }
                }
                Poll::Ready(None) => {
                    return Poll::Ready(Err(Error::ControllerStateSenderClosed));
                }
            }
        }
    }
}
