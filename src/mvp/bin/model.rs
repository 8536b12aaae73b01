use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll, Waker};

use clientes::api::{ApiClient, ApiError};
use clientes::model::{Customer, StoreAck};
use clientes::screen::Mutation;

use crate::controller::ControllerMessages;
use crate::error::Error;

pub type Responder = tokio::sync::oneshot::Sender<Result<ModelValues, Error>>;

#[derive(Debug)]
pub struct ModelChannels {
    pub receiver: crossbeam_channel::Receiver<ModelMessages>,
    pub to_controller: tokio::sync::mpsc::Sender<ControllerMessages>,
}

#[derive(Debug)]
pub enum ModelMessages {
    GetCustomers(u64, Responder),
    SendMutation(Mutation, Responder),
    UiRequestsQuit,
}

#[derive(Clone, Debug, PartialEq)]
pub enum ModelState {
    New,
    Running,
    Finished,
}

#[derive(Debug)]
pub enum ModelValues {
    Customers {
        generation: u64,
        result: Result<Vec<Customer>, ApiError>,
    },
    Completed {
        mutation: Mutation,
        result: Result<StoreAck, ApiError>,
    },
}

/// Owns the gateway client. Requests run on the tokio runtime so a slow
/// reload never holds up a save.
pub struct Model {
    channels: Option<ModelChannels>,
    client: ApiClient,
    state: ModelState,
    state_receiver: Option<crossbeam_channel::Receiver<ModelState>>,
    thread_handle: Option<std::thread::JoinHandle<()>>,
}

impl Model {
    pub fn new(channels: ModelChannels, client: ApiClient) -> Result<Self, Error> {
        Ok(Self {
            channels: Some(channels),
            client,
            state: ModelState::New,
            state_receiver: None,
            thread_handle: None,
        })
    }

    fn run(
        channels: ModelChannels,
        client: ApiClient,
        runtime: tokio::runtime::Handle,
        state_sender: crossbeam_channel::Sender<ModelState>,
        waker: Waker,
    ) -> std::thread::JoinHandle<()> {
        let ModelChannels {
            receiver,
            to_controller: _to_controller,
        } = channels;

        std::thread::spawn(move || {
            info!("Model talking to {}", client.base_url());
            loop {
                match receiver.recv() {
                    Ok(ModelMessages::GetCustomers(generation, responder)) => {
                        let client = client.clone();
                        runtime.spawn(async move {
                            let result = client.list().await;
                            if responder
                                .send(Ok(ModelValues::Customers { generation, result }))
                                .is_err()
                            {
                                warn!("GetCustomers response had nobody waiting for it");
                            }
                        });
                    }
                    Ok(ModelMessages::SendMutation(mutation, responder)) => {
                        let client = client.clone();
                        runtime.spawn(async move {
                            let result = Self::perform(&client, &mutation).await;
                            if responder
                                .send(Ok(ModelValues::Completed { mutation, result }))
                                .is_err()
                            {
                                warn!("SendMutation response had nobody waiting for it");
                            }
                        });
                    }
                    // Err means that there will be no more messages
                    Ok(ModelMessages::UiRequestsQuit) | Err(_) => {
                        if state_sender.send(ModelState::Finished).is_err() {
                            error!("Model state receiver went away before Finished");
                        }
                        waker.wake();
                        return;
                    }
                }
            }
        })
    }

    async fn perform(client: &ApiClient, mutation: &Mutation) -> Result<StoreAck, ApiError> {
        match mutation {
            Mutation::Create(draft) => client.create(draft).await,
            Mutation::Update(id, draft) => client.update(*id, draft).await,
            Mutation::Delete(id) => client.delete(*id).await,
        }
    }
}

impl Future for Model {
    type Output = Result<(), Error>;

    fn poll(self: Pin<&mut Self>, context: &mut Context<'_>) -> Poll<Result<(), Error>> {
        let this = self.get_mut();
        if this.state == ModelState::New {
            let channels = match this.channels.take() {
                Some(channels) => channels,
                None => return Poll::Ready(Err(Error::ModelMissingChannels)),
            };
            let (tx, rx) = crossbeam_channel::bounded(1);
            this.state_receiver = Some(rx);
            this.thread_handle = Some(Self::run(
                channels,
                this.client.clone(),
                tokio::runtime::Handle::current(),
                tx,
                context.waker().clone(),
            ));
            this.state = ModelState::Running;
        } else {
            match &this.state_receiver {
                Some(receiver) => match receiver.try_recv() {
                    Ok(ModelState::New) => {
                        return Poll::Ready(Err(Error::InvalidModelStateTransition(
                            this.state.clone(),
                            ModelState::New,
                        )));
                    }
                    Ok(new_state) => {
                        this.state = new_state;
                    }
                    _ => {}
                },
                None => {
                    return Poll::Ready(Err(Error::ModelMissingStateReceiver));
                }
            }
        }
        if this.state == ModelState::Finished {
            if let Some(handle) = this.thread_handle.take() {
                if handle.join().is_err() {
                    error!("Model thread panicked");
                }
            }
            return Poll::Ready(Ok(()));
        }
        Poll::Pending
    }
}
