use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use cursive::views::{Button, Dialog, EditView, LinearLayout, ScrollView, TextView};
use cursive_core::view::{Nameable, Resizable};

use clientes::model::Customer;
use clientes::screen::{Action, Alert, Draft, Effect, Field, Modal, RowView, Screen};

use crate::controller::ControllerMessages;
use crate::error::Error;
use crate::model::{ModelValues, Responder};

const CUSTOMER_LIST: &str = "customer_list";
const STATUS_LINE: &str = "status_line";
const FORM_LAYER: &str = "customer_form";
const CONFIRM_LAYER: &str = "confirm_delete";

type ResponseReceiver = tokio::sync::oneshot::Receiver<Result<ModelValues, Error>>;

#[derive(Debug)]
pub struct UiChannels {
    pub receiver: tokio::sync::mpsc::Receiver<UiMessages>,
    pub to_controller: tokio::sync::mpsc::Sender<ControllerMessages>,
}

#[derive(Debug)]
pub enum UiMessages {
    UiRequestsQuit,
}

#[derive(Clone, Debug, PartialEq)]
pub enum UiState {
    New,
    Running,
    Finished,
}

/// Which modal layer is currently on screen, so it is only rebuilt when it changes.
#[derive(Clone, Debug, PartialEq)]
enum ShownModal {
    None,
    Form(Option<i64>),
    ConfirmDelete(Option<i64>),
}

impl From<&Modal> for ShownModal {
    fn from(modal: &Modal) -> Self {
        match modal {
            Modal::Closed => Self::None,
            Modal::Form { editing, .. } => Self::Form(editing.as_ref().and_then(|c| c.id)),
            Modal::ConfirmDelete(customer) => Self::ConfirmDelete(customer.id),
        }
    }
}

/// Lives in the cursive user data so every callback can reach it.
struct UiData {
    screen: Screen,
    shown_modal: ShownModal,
    pending: Vec<ResponseReceiver>,
    to_controller: tokio::sync::mpsc::Sender<ControllerMessages>,
}

pub struct Ui {
    channels: Option<UiChannels>,
    state: UiState,
    state_receiver: Option<tokio::sync::mpsc::Receiver<UiState>>,
    thread_handle: Option<std::thread::JoinHandle<()>>,
}

impl Ui {
    pub fn new(channels: UiChannels) -> Result<Self, Error> {
        Ok(Self {
            channels: Some(channels),
            state: UiState::New,
            state_receiver: None,
            thread_handle: None,
        })
    }

    fn add_global_callbacks(cur: &mut cursive::Cursive) {
        cur.add_global_callback('q', |cur| {
            Ui::quit_callback(cur);
        });
    }

    fn first_screen(cur: &mut cursive::Cursive) {
        cur.add_layer(
            Dialog::around(
                LinearLayout::vertical()
                    .child(
                        LinearLayout::horizontal()
                            .child(Button::new("+ Novo Cliente", |cur| {
                                Ui::dispatch(cur, Action::NewRequested);
                            }))
                            .child(Button::new("Atualizar Lista", |cur| {
                                Ui::dispatch(cur, Action::RefreshRequested);
                            }))
                            .child(Button::new("Sair", |cur| {
                                Ui::quit_callback(cur);
                            })),
                    )
                    .child(TextView::new("").with_name(STATUS_LINE))
                    .child(ScrollView::new(
                        LinearLayout::vertical().with_name(CUSTOMER_LIST),
                    )),
            )
            .title("Clientes")
            .full_screen(),
        );
    }

    /// Single entry point for state changes: reduce, run the effects, redraw.
    fn dispatch(cur: &mut cursive::Cursive, action: Action) {
        let effects = match cur.user_data::<UiData>() {
            Some(data) => data.screen.apply(action),
            None => {
                error!("Ui data missing; dropping {:?}", action);
                return;
            }
        };
        for effect in effects {
            Ui::run_effect(cur, effect);
        }
        Ui::render(cur);
    }

    fn run_effect(cur: &mut cursive::Cursive, effect: Effect) {
        match effect {
            Effect::Fetch { generation } => {
                Ui::request(cur, |tx| ControllerMessages::GetCustomers(generation, tx));
            }
            Effect::Send(mutation) => {
                Ui::request(cur, |tx| ControllerMessages::SendMutation(mutation, tx));
            }
            Effect::Alert(alert) => Ui::show_alert(cur, alert),
        }
    }

    fn request(
        cur: &mut cursive::Cursive,
        message: impl FnOnce(Responder) -> ControllerMessages,
    ) {
        let data = match cur.user_data::<UiData>() {
            Some(data) => data,
            None => return,
        };
        let (tx, rx) = tokio::sync::oneshot::channel();
        if data.to_controller.blocking_send(message(tx)).is_err() {
            error!("Controller is gone; request dropped");
            return;
        }
        data.pending.push(rx);
    }

    fn show_alert(cur: &mut cursive::Cursive, alert: Alert) {
        cur.add_layer(
            Dialog::text(alert.message)
                .title(alert.title)
                .button("OK", |cur| {
                    cur.pop_layer();
                }),
        );
    }

    fn render(cur: &mut cursive::Cursive) {
        let (rows, customers, empty_message, loading, modal, shown_modal) =
            match cur.user_data::<UiData>() {
                Some(data) => (
                    data.screen.rows(),
                    data.screen.customers().to_vec(),
                    data.screen.empty_message(),
                    data.screen.is_loading(),
                    data.screen.modal().clone(),
                    data.shown_modal.clone(),
                ),
                None => return,
            };

        cur.call_on_name(STATUS_LINE, |view: &mut TextView| {
            view.set_content(if loading { "Carregando..." } else { "" });
        });
        cur.call_on_name(CUSTOMER_LIST, |list: &mut LinearLayout| {
            while list.len() > 0 {
                list.remove_child(0);
            }
            if let Some(message) = empty_message {
                list.add_child(TextView::new(message));
            }
            for (row, customer) in rows.iter().zip(customers) {
                list.add_child(Ui::customer_row(row, customer));
            }
        });

        let wanted = ShownModal::from(&modal);
        if wanted != shown_modal {
            Ui::remove_layer_named(cur, FORM_LAYER);
            Ui::remove_layer_named(cur, CONFIRM_LAYER);
            match &modal {
                Modal::Closed => {}
                Modal::Form { editing, draft } => {
                    let form = Ui::form_dialog(editing, draft);
                    cur.add_layer(form);
                }
                Modal::ConfirmDelete(customer) => {
                    cur.add_layer(Ui::confirm_dialog(customer));
                }
            }
            if let Some(data) = cur.user_data::<UiData>() {
                data.shown_modal = wanted;
            }
        } else if let Modal::Form { draft, .. } = &modal {
            // Keep the UF field in step with the upper-cased draft.
            let uf = draft.uf.clone();
            cur.call_on_name("field_uf", move |view: &mut EditView| {
                if view.get_content().as_str() != uf {
                    view.set_content(uf);
                }
            });
        }
    }

    fn remove_layer_named(cur: &mut cursive::Cursive, name: &str) {
        let screen = cur.screen_mut();
        if let Some(position) = screen.find_layer_from_name(name) {
            screen.remove_layer(position);
        }
    }

    fn customer_row(row: &RowView, customer: Customer) -> LinearLayout {
        let edit_target = customer.clone();
        let mut edit = Button::new("Editar", move |cur| {
            Ui::dispatch(cur, Action::EditRequested(edit_target.clone()));
        });
        edit.set_enabled(row.actionable);
        let mut delete = Button::new("Excluir", move |cur| {
            Ui::dispatch(cur, Action::DeleteRequested(customer.clone()));
        });
        delete.set_enabled(row.actionable);

        LinearLayout::horizontal()
            .child(
                LinearLayout::vertical()
                    .child(TextView::new(row.nome.clone()))
                    .child(TextView::new(row.details()))
                    .child(TextView::new(format!("ID: {}", row.id)))
                    .min_width(40),
            )
            .child(edit)
            .child(delete)
    }

    fn field(label: &str, name: &str, field: Field, value: &str, max: Option<usize>) -> LinearLayout {
        let mut input = EditView::new()
            .content(value)
            .on_edit(move |cur, text, _cursor| {
                Ui::dispatch(cur, Action::DraftChanged(field, text.to_string()));
            });
        if let Some(max) = max {
            input.set_max_content_width(Some(max));
        }
        LinearLayout::vertical()
            .child(TextView::new(label))
            .child(input.with_name(name).min_width(30))
    }

    fn form_dialog(editing: &Option<Customer>, draft: &Draft) -> impl cursive::View {
        Dialog::around(
            LinearLayout::vertical()
                .child(Ui::field("Nome:", "field_nome", Field::Nome, &draft.nome, None))
                .child(Ui::field("Idade:", "field_idade", Field::Idade, &draft.idade, None))
                .child(Ui::field("UF:", "field_uf", Field::Uf, &draft.uf, Some(2))),
        )
        .title(Modal::form_title(editing))
        .button("Cancelar", |cur| {
            Ui::dispatch(cur, Action::Cancelled);
        })
        .button(Modal::save_label(editing), |cur| {
            Ui::dispatch(cur, Action::SaveRequested);
        })
        .with_name(FORM_LAYER)
    }

    fn confirm_dialog(customer: &Customer) -> impl cursive::View {
        let nome = customer.nome.clone().unwrap_or_default();
        Dialog::around(TextView::new(format!(
            "Tem certeza que deseja excluir o cliente\n{}?\n\nEsta ação não poderá ser desfeita.",
            nome
        )))
        .title("Confirmar Exclusão")
        .button("Cancelar", |cur| {
            Ui::dispatch(cur, Action::Cancelled);
        })
        .button("Excluir", |cur| {
            Ui::dispatch(cur, Action::DeleteConfirmed);
        })
        .with_name(CONFIRM_LAYER)
    }

    fn quit_callback(cur: &mut cursive::Cursive) {
        if let Some(data) = cur.user_data::<UiData>() {
            if data
                .to_controller
                .blocking_send(ControllerMessages::UiRequestsQuit)
                .is_err()
            {
                error!("Controller is gone; quitting directly");
                cur.quit();
            }
        }
    }

    /// Drains quit requests and finished responses without blocking the draw loop.
    fn handle_messages(
        cur: &mut cursive::Cursive,
        uimessages_receiver: &mut tokio::sync::mpsc::Receiver<UiMessages>,
        state_sender: &tokio::sync::mpsc::Sender<UiState>,
        finish_after: std::time::Instant,
        wait_time: std::time::Duration,
    ) -> Result<(), Error> {
        loop {
            match uimessages_receiver.try_recv() {
                Ok(UiMessages::UiRequestsQuit) => {
                    cur.quit();
                    state_sender
                        .blocking_send(UiState::Finished)
                        .map_err(|_| Error::UiStateSenderClosed)?;
                    return Ok(());
                }
                Err(tokio::sync::mpsc::error::TryRecvError::Empty) => {}
                Err(tokio::sync::mpsc::error::TryRecvError::Disconnected) => {
                    error!("Ui receiver has become disconnected.");
                    cur.quit();
                    // It's an error, but the result is the same: program exit
                    state_sender
                        .blocking_send(UiState::Finished)
                        .map_err(|_| Error::UiStateSenderClosed)?;
                    return Ok(());
                }
            }

            let mut actions = Vec::new();
            if let Some(data) = cur.user_data::<UiData>() {
                data.pending.retain_mut(|oneshot| match oneshot.try_recv() {
                    Ok(Ok(ModelValues::Customers { generation, result })) => {
                        actions.push(Action::Loaded { generation, result });
                        false
                    }
                    Ok(Ok(ModelValues::Completed { mutation, result })) => {
                        actions.push(Action::Completed { mutation, result });
                        false
                    }
                    Ok(Err(error)) => {
                        error!("Message response oneshot error: {}", error);
                        false
                    }
                    Err(tokio::sync::oneshot::error::TryRecvError::Empty) => true,
                    Err(tokio::sync::oneshot::error::TryRecvError::Closed) => {
                        error!("Response oneshot was closed");
                        false
                    }
                });
            }
            for action in actions {
                Ui::dispatch(cur, action);
            }

            let now = std::time::Instant::now();
            if now > finish_after {
                return Ok(());
            }
            std::thread::sleep(wait_time);
        }
    }

    fn run(
        channels: UiChannels,
        state_sender: tokio::sync::mpsc::Sender<UiState>,
    ) -> std::thread::JoinHandle<()> {
        let UiChannels {
            receiver: mut uimessages_receiver,
            to_controller,
        } = channels;

        std::thread::spawn(move || {
            let mut cur = cursive::default();
            cur.set_user_data(UiData {
                screen: Screen::new(),
                shown_modal: ShownModal::None,
                pending: Vec::new(),
                to_controller,
            });

            Ui::add_global_callbacks(&mut cur);
            Ui::first_screen(&mut cur);
            Ui::dispatch(&mut cur, Action::Mounted);

            // Getting started
            let mut runner = cur.into_runner();
            let frame = std::time::Duration::from_millis(33);
            let mut last_frame = std::time::Instant::now();
            let no_wait = std::time::Duration::new(0, 0);
            let mut refresh_this_iteration = true;
            let mut timeout: std::time::Duration = frame;
            while runner.is_running() {
                let something_happened = runner.process_events();
                if something_happened || refresh_this_iteration {
                    if refresh_this_iteration {
                        runner.on_event(cursive_core::event::Event::Refresh);
                    }
                    runner.refresh();
                }
                if something_happened {
                    timeout = no_wait;
                }
                let next_frame = last_frame + timeout;
                if let Err(error) = Ui::handle_messages(
                    &mut runner,
                    &mut uimessages_receiver,
                    &state_sender,
                    next_frame,
                    frame,
                ) {
                    error!("Ui stopped: {}", error);
                    runner.quit();
                    return;
                }
                let now = std::time::Instant::now();
                if now >= next_frame {
                    last_frame = now;
                    refresh_this_iteration = true;
                    timeout = frame;
                } else {
                    refresh_this_iteration = false;
                    timeout = next_frame - now;
                }
            }
        })
    }
}

impl Future for Ui {
    type Output = Result<(), Error>;

    fn poll(self: Pin<&mut Self>, context: &mut Context<'_>) -> Poll<Result<(), Error>> {
        let this = self.get_mut();
        if this.state == UiState::New {
            let channels = match this.channels.take() {
                Some(channels) => channels,
                None => return Poll::Ready(Err(Error::UiMissingChannels)),
            };
            let (tx, rx) = tokio::sync::mpsc::channel(1);
            this.state_receiver = Some(rx);
            this.thread_handle = Some(Self::run(channels, tx));
            this.state = UiState::Running;
        }
        loop {
            let receiver = match this.state_receiver.as_mut() {
                Some(receiver) => receiver,
                None => return Poll::Ready(Err(Error::UiMissingStateReceiver)),
            };
            match receiver.poll_recv(context) {
                Poll::Pending => return Poll::Pending,
                Poll::Ready(Some(UiState::New)) => {
                    return Poll::Ready(Err(Error::InvalidUiStateTransition(
                        this.state.clone(),
                        UiState::New,
                    )));
                }
                Poll::Ready(Some(next_state)) => {
                    this.state = next_state;
                    if this.state == UiState::Finished {
                        return Poll::Ready(Ok(()));
                    }
                }
                Poll::Ready(None) => {
                    return Poll::Ready(Err(Error::UiStateSenderClosed));
                }
            }
        }
    }
}
