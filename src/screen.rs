//! State of the single customer screen.
//!
//! [`Screen`] is the only owner of the list, the open modal and the loading
//! flag. Every user action and every network completion goes through
//! [`Screen::apply`], which mutates the state and returns the [`Effect`]s the
//! caller must carry out (requests to send, alerts to show). Nothing here
//! touches the network or the terminal.

use crate::api::ApiError;
use crate::model::{Age, Customer, CustomerDraft, StoreAck};

pub const NAME_FALLBACK: &str = "Nome não informado";
pub const VALUE_FALLBACK: &str = "N/A";
pub const LOADING_MESSAGE: &str = "Carregando...";
pub const EMPTY_MESSAGE: &str = "Nenhum cliente encontrado";

const UF_LENGTH: usize = 2;

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Field {
    Nome,
    Idade,
    Uf,
}

/// Form contents while a create or edit modal is open.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Draft {
    pub nome: String,
    pub idade: String,
    pub uf: String,
}

impl Draft {
    pub fn from_customer(customer: &Customer) -> Self {
        Self {
            nome: customer.nome.clone().unwrap_or_default(),
            idade: customer
                .idade
                .as_ref()
                .map(Age::to_string)
                .unwrap_or_default(),
            uf: customer.uf.clone().unwrap_or_default(),
        }
    }

    /// UF is kept upper-case and at most two characters long, as it is typed.
    pub fn set(&mut self, field: Field, text: &str) {
        match field {
            Field::Nome => self.nome = text.to_string(),
            Field::Idade => self.idade = text.to_string(),
            Field::Uf => self.uf = text.to_uppercase().chars().take(UF_LENGTH).collect(),
        }
    }

    pub fn get(&self, field: Field) -> &str {
        match field {
            Field::Nome => &self.nome,
            Field::Idade => &self.idade,
            Field::Uf => &self.uf,
        }
    }

    pub fn is_complete(&self) -> bool {
        !self.nome.is_empty() && !self.idade.is_empty() && !self.uf.is_empty()
    }

    pub fn to_customer_draft(&self) -> CustomerDraft {
        CustomerDraft {
            nome: Some(self.nome.clone()),
            idade: Some(Age::Text(self.idade.clone())),
            uf: Some(self.uf.clone()),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum Modal {
    Closed,
    /// `editing` is `None` when creating.
    Form {
        editing: Option<Customer>,
        draft: Draft,
    },
    ConfirmDelete(Customer),
}

impl Modal {
    pub fn form_title(editing: &Option<Customer>) -> &'static str {
        match editing {
            Some(_) => "Editar Cliente",
            None => "Novo Cliente",
        }
    }

    pub fn save_label(editing: &Option<Customer>) -> &'static str {
        match editing {
            Some(_) => "Atualizar",
            None => "Salvar",
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Alert {
    pub title: &'static str,
    pub message: String,
}

impl Alert {
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            title: "Erro",
            message: message.into(),
        }
    }

    pub fn success(message: impl Into<String>) -> Self {
        Self {
            title: "Sucesso",
            message: message.into(),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum Mutation {
    Create(CustomerDraft),
    Update(i64, CustomerDraft),
    Delete(i64),
}

#[derive(Clone, Debug, PartialEq)]
pub enum Action {
    Mounted,
    RefreshRequested,
    NewRequested,
    EditRequested(Customer),
    DeleteRequested(Customer),
    DraftChanged(Field, String),
    SaveRequested,
    DeleteConfirmed,
    Cancelled,
    Loaded {
        generation: u64,
        result: Result<Vec<Customer>, ApiError>,
    },
    Completed {
        mutation: Mutation,
        result: Result<StoreAck, ApiError>,
    },
}

#[derive(Clone, Debug, PartialEq)]
pub enum Effect {
    /// Reload the whole list; the answer must come back as `Loaded` with the same generation.
    Fetch { generation: u64 },
    Send(Mutation),
    Alert(Alert),
}

/// How one customer is shown in the list.
#[derive(Clone, Debug, PartialEq)]
pub struct RowView {
    pub id: String,
    pub nome: String,
    pub idade: String,
    pub uf: String,
    pub actionable: bool,
}

impl RowView {
    pub fn details(&self) -> String {
        format!("Idade: {} | UF: {}", self.idade, self.uf)
    }
}

impl From<&Customer> for RowView {
    fn from(customer: &Customer) -> Self {
        let non_empty = |value: &Option<String>, fallback: &str| match value {
            Some(text) if !text.is_empty() => text.clone(),
            _ => fallback.to_string(),
        };
        Self {
            id: customer.id.map(|id| id.to_string()).unwrap_or_default(),
            nome: non_empty(&customer.nome, NAME_FALLBACK),
            idade: customer
                .idade
                .as_ref()
                .map(Age::to_string)
                .unwrap_or_else(|| VALUE_FALLBACK.to_string()),
            uf: non_empty(&customer.uf, VALUE_FALLBACK),
            actionable: customer.actionable_id().is_some(),
        }
    }
}

#[derive(Debug)]
pub struct Screen {
    customers: Vec<Customer>,
    loading: bool,
    modal: Modal,
    generation: u64,
}

impl Default for Screen {
    fn default() -> Self {
        Self::new()
    }
}

impl Screen {
    pub fn new() -> Self {
        Self {
            customers: Vec::new(),
            loading: false,
            modal: Modal::Closed,
            generation: 0,
        }
    }

    pub fn customers(&self) -> &[Customer] {
        &self.customers
    }

    pub fn rows(&self) -> Vec<RowView> {
        self.customers.iter().map(RowView::from).collect()
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn modal(&self) -> &Modal {
        &self.modal
    }

    /// Placeholder text for an empty list, `None` when there is something to show.
    pub fn empty_message(&self) -> Option<&'static str> {
        if !self.customers.is_empty() {
            None
        } else if self.loading {
            Some(LOADING_MESSAGE)
        } else {
            Some(EMPTY_MESSAGE)
        }
    }

    pub fn apply(&mut self, action: Action) -> Vec<Effect> {
        match action {
            Action::Mounted | Action::RefreshRequested => vec![self.begin_fetch()],
            Action::NewRequested => {
                self.modal = Modal::Form {
                    editing: None,
                    draft: Draft::default(),
                };
                vec![]
            }
            Action::EditRequested(customer) => {
                if customer.actionable_id().is_none() {
                    warn!("Ignoring edit of a customer without a valid ID: {:?}", customer);
                    return vec![];
                }
                self.modal = Modal::Form {
                    draft: Draft::from_customer(&customer),
                    editing: Some(customer),
                };
                vec![]
            }
            Action::DeleteRequested(customer) => {
                if customer.actionable_id().is_none() {
                    warn!("Ignoring delete of a customer without a valid ID: {:?}", customer);
                    return vec![];
                }
                self.modal = Modal::ConfirmDelete(customer);
                vec![]
            }
            Action::DraftChanged(field, text) => {
                if let Modal::Form { draft, .. } = &mut self.modal {
                    draft.set(field, &text);
                }
                vec![]
            }
            Action::SaveRequested => self.save(),
            Action::DeleteConfirmed => {
                let target = match &self.modal {
                    Modal::ConfirmDelete(customer) => customer.actionable_id(),
                    _ => return vec![],
                };
                match target {
                    Some(id) => vec![Effect::Send(Mutation::Delete(id))],
                    None => {
                        self.modal = Modal::Closed;
                        vec![]
                    }
                }
            }
            Action::Cancelled => {
                self.modal = Modal::Closed;
                vec![]
            }
            Action::Loaded { generation, result } => self.loaded(generation, result),
            Action::Completed { mutation, result } => self.completed(mutation, result),
        }
    }

    fn begin_fetch(&mut self) -> Effect {
        self.generation += 1;
        self.loading = true;
        Effect::Fetch {
            generation: self.generation,
        }
    }

    fn save(&mut self) -> Vec<Effect> {
        let (editing, draft) = match &self.modal {
            Modal::Form { editing, draft } => (editing, draft),
            _ => return vec![],
        };
        if !draft.is_complete() {
            return vec![Effect::Alert(Alert::error("Preencha todos os campos"))];
        }
        let mutation = match editing {
            None => Mutation::Create(draft.to_customer_draft()),
            Some(customer) => match customer.actionable_id() {
                Some(id) => Mutation::Update(id, draft.to_customer_draft()),
                None => {
                    return vec![Effect::Alert(Alert::error(
                        "ID do cliente inválido para edição",
                    ))]
                }
            },
        };
        vec![Effect::Send(mutation)]
    }

    fn loaded(&mut self, generation: u64, result: Result<Vec<Customer>, ApiError>) -> Vec<Effect> {
        if generation != self.generation {
            debug!(
                "Discarding list generation {} (latest is {})",
                generation, self.generation
            );
            return vec![];
        }
        self.loading = false;
        match result {
            Ok(customers) => {
                self.customers = customers;
                vec![]
            }
            Err(error) => {
                error!("Erro ao carregar clientes: {}", error);
                self.customers.clear();
                vec![Effect::Alert(Alert::error(format!(
                    "Falha ao carregar clientes: {}",
                    error
                )))]
            }
        }
    }

    fn completed(&mut self, mutation: Mutation, result: Result<StoreAck, ApiError>) -> Vec<Effect> {
        let is_delete = matches!(mutation, Mutation::Delete(_));
        if is_delete && matches!(self.modal, Modal::ConfirmDelete(_)) {
            // The confirmation closes whatever the outcome.
            self.modal = Modal::Closed;
        }

        let ack = match result {
            Ok(ack) => ack,
            Err(ApiError::Status(status)) => {
                let message = if is_delete {
                    format!("Falha ao excluir cliente ({})", status)
                } else {
                    format!("Falha ao salvar cliente ({})", status)
                };
                return vec![Effect::Alert(Alert::error(message))];
            }
            Err(error) => {
                error!("Erro de conexão: {}", error);
                return vec![Effect::Alert(Alert::error(format!(
                    "Erro de conexão: {}",
                    error
                )))];
            }
        };

        let message = match &mutation {
            Mutation::Create(_) => "Cliente criado!",
            Mutation::Update(..) => "Cliente atualizado!",
            Mutation::Delete(_) => "Cliente excluído com sucesso!",
        };
        if self.is_form_for(&mutation) {
            self.modal = Modal::Closed;
        }
        self.merge(mutation, &ack);
        vec![
            Effect::Alert(Alert::success(message)),
            self.begin_fetch(),
        ]
    }

    // A form opened after this request went out keeps its draft.
    fn is_form_for(&self, mutation: &Mutation) -> bool {
        let (editing, draft) = match &self.modal {
            Modal::Form { editing, draft } => (editing, draft),
            _ => return false,
        };
        let sent = match mutation {
            Mutation::Create(sent) if editing.is_none() => sent,
            Mutation::Update(id, sent)
                if editing.as_ref().and_then(Customer::actionable_id) == Some(*id) =>
            {
                sent
            }
            _ => return false,
        };
        draft.to_customer_draft() == *sent
    }

    // Apply an acknowledged mutation locally so the list is right before the reload lands.
    fn merge(&mut self, mutation: Mutation, ack: &StoreAck) {
        match mutation {
            Mutation::Create(draft) => {
                if let Some(id) = ack.insert_id {
                    if !self.customers.iter().any(|c| c.id == Some(id)) {
                        self.customers.push(Customer::from_draft(id, draft));
                    }
                }
            }
            Mutation::Update(id, draft) => {
                if ack.affected_rows > 0 {
                    if let Some(existing) = self.customers.iter_mut().find(|c| c.id == Some(id)) {
                        *existing = Customer::from_draft(id, draft);
                    }
                }
            }
            Mutation::Delete(id) => self.customers.retain(|c| c.id != Some(id)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn customer(id: Option<i64>, nome: &str) -> Customer {
        Customer {
            id,
            nome: Some(nome.to_string()),
            idade: Some(Age::Number(30)),
            uf: Some("SP".to_string()),
        }
    }

    fn loaded_screen(customers: Vec<Customer>) -> Screen {
        let mut screen = Screen::new();
        let effects = screen.apply(Action::Mounted);
        assert_eq!(effects, vec![Effect::Fetch { generation: 1 }]);
        screen.apply(Action::Loaded {
            generation: 1,
            result: Ok(customers),
        });
        screen
    }

    fn fill(screen: &mut Screen, nome: &str, idade: &str, uf: &str) {
        screen.apply(Action::DraftChanged(Field::Nome, nome.to_string()));
        screen.apply(Action::DraftChanged(Field::Idade, idade.to_string()));
        screen.apply(Action::DraftChanged(Field::Uf, uf.to_string()));
    }

    #[test]
    fn mount_loads_and_shows_placeholder_while_waiting() {
        let mut screen = Screen::new();
        screen.apply(Action::Mounted);
        assert!(screen.is_loading());
        assert_eq!(screen.empty_message(), Some(LOADING_MESSAGE));

        screen.apply(Action::Loaded {
            generation: 1,
            result: Ok(vec![]),
        });
        assert!(!screen.is_loading());
        assert_eq!(screen.empty_message(), Some(EMPTY_MESSAGE));
    }

    #[test]
    fn failed_load_clears_the_list_and_alerts() {
        let mut screen = loaded_screen(vec![customer(Some(1), "Ana")]);
        screen.apply(Action::RefreshRequested);
        let effects = screen.apply(Action::Loaded {
            generation: 2,
            result: Err(ApiError::Status(500)),
        });
        assert!(screen.customers().is_empty());
        assert_eq!(
            effects,
            vec![Effect::Alert(Alert::error(
                "Falha ao carregar clientes: HTTP error! status: 500"
            ))]
        );
    }

    #[test]
    fn stale_loads_are_discarded() {
        let mut screen = Screen::new();
        screen.apply(Action::Mounted);
        screen.apply(Action::RefreshRequested);
        screen.apply(Action::Loaded {
            generation: 2,
            result: Ok(vec![customer(Some(2), "Novo")]),
        });
        let effects = screen.apply(Action::Loaded {
            generation: 1,
            result: Ok(vec![customer(Some(1), "Velho")]),
        });
        assert!(effects.is_empty());
        assert_eq!(screen.customers(), &[customer(Some(2), "Novo")][..]);
    }

    #[test]
    fn incomplete_draft_is_not_sent() {
        let mut screen = loaded_screen(vec![]);
        screen.apply(Action::NewRequested);
        fill(&mut screen, "Ana", "", "SP");
        let effects = screen.apply(Action::SaveRequested);
        assert_eq!(
            effects,
            vec![Effect::Alert(Alert::error("Preencha todos os campos"))]
        );
        assert!(matches!(screen.modal(), Modal::Form { .. }));
    }

    #[test]
    fn uf_is_uppercased_and_truncated() {
        let mut draft = Draft::default();
        draft.set(Field::Uf, "spx");
        assert_eq!(draft.uf, "SP");
    }

    #[test]
    fn create_sends_the_draft_then_merges_and_reloads() {
        let mut screen = loaded_screen(vec![customer(Some(1), "Ana")]);
        screen.apply(Action::NewRequested);
        fill(&mut screen, "Bruno", "25", "rj");

        let effects = screen.apply(Action::SaveRequested);
        let sent = CustomerDraft {
            nome: Some("Bruno".to_string()),
            idade: Some(Age::Text("25".to_string())),
            uf: Some("RJ".to_string()),
        };
        assert_eq!(effects, vec![Effect::Send(Mutation::Create(sent.clone()))]);

        let effects = screen.apply(Action::Completed {
            mutation: Mutation::Create(sent),
            result: Ok(StoreAck {
                affected_rows: 1,
                insert_id: Some(2),
            }),
        });
        assert_eq!(
            effects,
            vec![
                Effect::Alert(Alert::success("Cliente criado!")),
                Effect::Fetch { generation: 2 },
            ]
        );
        assert_eq!(screen.modal(), &Modal::Closed);
        assert_eq!(screen.customers().len(), 2);
        assert_eq!(screen.customers()[1].id, Some(2));
    }

    #[test]
    fn late_ack_leaves_a_newer_form_open() {
        let mut screen = loaded_screen(vec![]);
        screen.apply(Action::NewRequested);
        fill(&mut screen, "Ana", "30", "SP");
        let mutation = match screen.apply(Action::SaveRequested).pop() {
            Some(Effect::Send(mutation)) => mutation,
            other => panic!("expected a request, got {:?}", other),
        };

        screen.apply(Action::Cancelled);
        screen.apply(Action::NewRequested);
        fill(&mut screen, "Bruno", "", "");

        screen.apply(Action::Completed {
            mutation,
            result: Ok(StoreAck {
                affected_rows: 1,
                insert_id: Some(1),
            }),
        });
        match screen.modal() {
            Modal::Form { editing: None, draft } => assert_eq!(draft.nome, "Bruno"),
            other => panic!("expected the new form to stay open, got {:?}", other),
        }
        assert_eq!(screen.customers().len(), 1);
    }

    #[test]
    fn failed_save_keeps_the_modal_open() {
        let mut screen = loaded_screen(vec![]);
        screen.apply(Action::NewRequested);
        fill(&mut screen, "Ana", "30", "SP");
        let mutation = match screen.apply(Action::SaveRequested).pop() {
            Some(Effect::Send(mutation)) => mutation,
            other => panic!("expected a request, got {:?}", other),
        };

        let effects = screen.apply(Action::Completed {
            mutation: mutation.clone(),
            result: Err(ApiError::Status(500)),
        });
        assert_eq!(
            effects,
            vec![Effect::Alert(Alert::error("Falha ao salvar cliente (500)"))]
        );
        assert!(matches!(screen.modal(), Modal::Form { .. }));

        let effects = screen.apply(Action::Completed {
            mutation,
            result: Err(ApiError::Network("connection refused".to_string())),
        });
        assert_eq!(
            effects,
            vec![Effect::Alert(Alert::error(
                "Erro de conexão: connection refused"
            ))]
        );
        assert!(matches!(screen.modal(), Modal::Form { .. }));
    }

    #[test]
    fn edit_prefills_the_draft_and_updates_in_place() {
        let ana = customer(Some(7), "Ana");
        let mut screen = loaded_screen(vec![ana.clone()]);
        screen.apply(Action::EditRequested(ana.clone()));
        match screen.modal() {
            Modal::Form { editing, draft } => {
                assert_eq!(editing.as_ref(), Some(&ana));
                assert_eq!(draft.idade, "30");
                assert_eq!(Modal::form_title(editing), "Editar Cliente");
            }
            other => panic!("expected the form, got {:?}", other),
        }

        screen.apply(Action::DraftChanged(Field::Nome, "Ana Maria".to_string()));
        let mutation = match screen.apply(Action::SaveRequested).pop() {
            Some(Effect::Send(mutation @ Mutation::Update(7, _))) => mutation,
            other => panic!("expected an update, got {:?}", other),
        };
        screen.apply(Action::Completed {
            mutation,
            result: Ok(StoreAck {
                affected_rows: 1,
                insert_id: None,
            }),
        });
        assert_eq!(screen.customers()[0].nome.as_deref(), Some("Ana Maria"));
    }

    #[test]
    fn rows_without_a_valid_id_cannot_be_edited_or_deleted() {
        let mut screen = loaded_screen(vec![
            customer(None, "Sem ID"),
            customer(Some(0), "Zero"),
            customer(Some(-3), "Negativo"),
        ]);
        assert!(screen.rows().iter().all(|row| !row.actionable));

        for customer in screen.customers().to_vec() {
            assert!(screen.apply(Action::EditRequested(customer.clone())).is_empty());
            assert!(screen.apply(Action::DeleteRequested(customer)).is_empty());
            assert_eq!(screen.modal(), &Modal::Closed);
        }
    }

    #[test]
    fn delete_closes_the_confirmation_whatever_happens() {
        let ana = customer(Some(3), "Ana");
        let mut screen = loaded_screen(vec![ana.clone()]);

        screen.apply(Action::DeleteRequested(ana.clone()));
        let effects = screen.apply(Action::DeleteConfirmed);
        assert_eq!(effects, vec![Effect::Send(Mutation::Delete(3))]);
        let effects = screen.apply(Action::Completed {
            mutation: Mutation::Delete(3),
            result: Err(ApiError::Status(500)),
        });
        assert_eq!(screen.modal(), &Modal::Closed);
        assert_eq!(
            effects,
            vec![Effect::Alert(Alert::error("Falha ao excluir cliente (500)"))]
        );
        assert_eq!(screen.customers().len(), 1);

        screen.apply(Action::DeleteRequested(ana));
        screen.apply(Action::DeleteConfirmed);
        let effects = screen.apply(Action::Completed {
            mutation: Mutation::Delete(3),
            result: Ok(StoreAck {
                affected_rows: 1,
                insert_id: None,
            }),
        });
        assert_eq!(screen.modal(), &Modal::Closed);
        assert!(screen.customers().is_empty());
        assert_eq!(
            effects,
            vec![
                Effect::Alert(Alert::success("Cliente excluído com sucesso!")),
                Effect::Fetch { generation: 2 },
            ]
        );
    }

    #[test]
    fn cancel_discards_the_draft_without_requests() {
        let mut screen = loaded_screen(vec![]);
        screen.apply(Action::NewRequested);
        fill(&mut screen, "Ana", "30", "SP");
        assert!(screen.apply(Action::Cancelled).is_empty());
        assert_eq!(screen.modal(), &Modal::Closed);

        screen.apply(Action::NewRequested);
        assert_eq!(
            screen.modal(),
            &Modal::Form {
                editing: None,
                draft: Draft::default()
            }
        );
    }

    #[test]
    fn rows_fall_back_for_missing_fields() {
        let row = RowView::from(&Customer {
            id: Some(5),
            nome: Some(String::new()),
            idade: None,
            uf: None,
        });
        assert_eq!(row.nome, NAME_FALLBACK);
        assert_eq!(row.details(), "Idade: N/A | UF: N/A");
        assert_eq!(row.id, "5");
        assert!(row.actionable);
    }
}
