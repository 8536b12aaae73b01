use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use clientes::api::ApiClient;

use crate::controller::{Controller, ControllerChannels, ControllerMessages};
use crate::error::Error;
use crate::model::{Model, ModelChannels, ModelMessages};
use crate::ui::{Ui, UiChannels, UiMessages};

#[derive(Debug)]
pub enum AppControllerMessages {
    UiRequestsQuit,
}

#[derive(Debug, PartialEq)]
enum AppControllerState {
    New,
    Running,
}

type TaskHandle = tokio::task::JoinHandle<Result<(), Error>>;

/// Wires the Controller, Model and Ui together and resolves once all of them have finished.
pub struct AppController {
    client: ApiClient,
    state: AppControllerState,
    tasks: Option<tokio::task::JoinHandle<Result<(), Error>>>,
}

impl AppController {
    pub fn new(client: ApiClient) -> Result<Self, Error> {
        Ok(Self {
            client,
            state: AppControllerState::New,
            tasks: None,
        })
    }

    fn spawn_app_controller(
        mut receiver: tokio::sync::mpsc::Receiver<AppControllerMessages>,
    ) -> TaskHandle {
        tokio::spawn(async move {
            match receiver.recv().await {
                Some(AppControllerMessages::UiRequestsQuit) => {
                    debug!("AppController received UiRequestsQuit");
                    receiver.close();
                }
                None => {
                    warn!("AppController receiver closed without a quit request");
                }
            }
            Ok(())
        })
    }

    fn spawn_controller(
        receiver: tokio::sync::mpsc::Receiver<ControllerMessages>,
        to_app_controller: tokio::sync::mpsc::Sender<AppControllerMessages>,
        to_model: crossbeam_channel::Sender<ModelMessages>,
        to_ui: tokio::sync::mpsc::Sender<UiMessages>,
    ) -> Result<TaskHandle, Error> {
        let controller = Controller::new(ControllerChannels {
            receiver,
            to_app_controller,
            to_model,
            to_ui,
        })?;
        Ok(tokio::spawn(controller))
    }

    fn spawn_model(
        receiver: crossbeam_channel::Receiver<ModelMessages>,
        to_controller: tokio::sync::mpsc::Sender<ControllerMessages>,
        client: ApiClient,
    ) -> Result<TaskHandle, Error> {
        let model = Model::new(
            ModelChannels {
                receiver,
                to_controller,
            },
            client,
        )?;
        Ok(tokio::spawn(model))
    }

    fn spawn_ui(
        receiver: tokio::sync::mpsc::Receiver<UiMessages>,
        to_controller: tokio::sync::mpsc::Sender<ControllerMessages>,
    ) -> Result<TaskHandle, Error> {
        let ui = Ui::new(UiChannels {
            receiver,
            to_controller,
        })?;
        Ok(tokio::spawn(ui))
    }

    fn start(client: ApiClient) -> Result<TaskHandle, Error> {
        let (app_controller_sender, app_controller_receiver) = tokio::sync::mpsc::channel(1);
        let (controller_sender, controller_receiver) = tokio::sync::mpsc::channel(1);
        let (model_sender, model_receiver) = crossbeam_channel::unbounded();
        let (ui_sender, ui_receiver) = tokio::sync::mpsc::channel(1);

        let app_controller_task = Self::spawn_app_controller(app_controller_receiver);
        let controller_task = Self::spawn_controller(
            controller_receiver,
            app_controller_sender,
            model_sender,
            ui_sender,
        )?;
        let model_task = Self::spawn_model(model_receiver, controller_sender.clone(), client)?;
        let ui_task = Self::spawn_ui(ui_receiver, controller_sender)?;

        Ok(Self::wait_for_tasks(
            app_controller_task,
            controller_task,
            model_task,
            ui_task,
        ))
    }

    fn wait_for_tasks(
        app_controller_task: TaskHandle,
        controller_task: TaskHandle,
        model_task: TaskHandle,
        ui_task: TaskHandle,
    ) -> TaskHandle {
        tokio::spawn(async move {
            let (app_controller_result, controller_result, model_result, ui_result) =
                tokio::join!(app_controller_task, controller_task, model_task, ui_task);
            for (name, result) in [
                ("AppController", app_controller_result),
                ("Controller", controller_result),
                ("Model", model_result),
                ("Ui", ui_result),
            ] {
                match result {
                    Ok(Ok(())) => {}
                    Ok(Err(error)) => {
                        return Err(Error::AppControllerTaskFailed(format!(
                            "{} task failed: {}",
                            name, error
                        )));
                    }
                    Err(join_error) => {
                        return Err(Error::AppControllerTaskFailed(format!(
                            "{} task panicked: {}",
                            name, join_error
                        )));
                    }
                }
            }
            Ok(())
        })
    }
}

impl Future for AppController {
    type Output = Result<(), Error>;

    fn poll(self: Pin<&mut Self>, context: &mut Context<'_>) -> Poll<Result<(), Error>> {
        let this = self.get_mut();
        if this.state == AppControllerState::New {
            this.tasks = Some(Self::start(this.client.clone())?);
            this.state = AppControllerState::Running;
        }
        match this.tasks.as_mut() {
            Some(tasks) => match Pin::new(tasks).poll(context) {
                Poll::Pending => Poll::Pending,
                Poll::Ready(Ok(result)) => Poll::Ready(result),
                Poll::Ready(Err(join_error)) => Poll::Ready(Err(Error::AppControllerTaskFailed(
                    join_error.to_string(),
                ))),
            },
            None => Poll::Ready(Ok(())),
        }
    }
}
