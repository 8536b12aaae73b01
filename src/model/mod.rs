mod customer;
mod migrations;

use rusqlite::{params, Connection, OptionalExtension, Row};
use tokio::sync::oneshot;

use crate::error::Error;

pub use customer::{Age, Customer, CustomerDraft, StoreAck};

const SQL_SELECT_ALL: &str = "SELECT ID, Nome, Idade, UF FROM clientes ORDER BY ID";
const SQL_SELECT_BY_ID: &str = "SELECT ID, Nome, Idade, UF FROM clientes WHERE ID = ?1";
const SQL_INSERT: &str = "INSERT INTO clientes (Nome, Idade, UF) VALUES (?1, ?2, ?3)";
const SQL_UPDATE_BY_ID: &str = "UPDATE clientes SET Nome = ?1, Idade = ?2, UF = ?3 WHERE ID = ?4";
const SQL_DELETE_BY_ID: &str = "DELETE FROM clientes WHERE ID = ?1";

type Responder<T> = oneshot::Sender<Result<T, Error>>;

#[derive(Debug)]
pub enum StoreMessages {
    SelectAll(Responder<Vec<Customer>>),
    SelectById(i64, Responder<Option<Customer>>),
    Insert(CustomerDraft, Responder<StoreAck>),
    UpdateById(i64, CustomerDraft, Responder<StoreAck>),
    DeleteById(i64, Responder<StoreAck>),
    Shutdown(Responder<()>),
}

/// Cloneable front door to the store thread. The thread exits once every handle is dropped.
#[derive(Clone, Debug)]
pub struct Store {
    sender: crossbeam_channel::Sender<StoreMessages>,
}

impl Store {
    /// Opens (or creates) the database, brings the schema up to date and starts the store thread.
    pub fn open(path: &str) -> Result<(Self, std::thread::JoinHandle<()>), Error> {
        let mut connection = Connection::open(path).map_err(Error::StoreOpenFailed)?;
        migrations::migrate_to_latest(&mut connection)?;
        info!("Store opened at {}", path);

        let (sender, receiver) = crossbeam_channel::unbounded();
        let thread_handle = std::thread::spawn(move || Self::run(connection, receiver));
        Ok((Self { sender }, thread_handle))
    }

    fn run(connection: Connection, receiver: crossbeam_channel::Receiver<StoreMessages>) {
        // Err from recv means every Store handle is gone
        while let Ok(message) = receiver.recv() {
            let delivered = match message {
                StoreMessages::SelectAll(responder) => {
                    responder.send(select_all(&connection)).is_ok()
                }
                StoreMessages::SelectById(id, responder) => {
                    responder.send(select_by_id(&connection, id)).is_ok()
                }
                StoreMessages::Insert(draft, responder) => {
                    responder.send(insert(&connection, &draft)).is_ok()
                }
                StoreMessages::UpdateById(id, draft, responder) => {
                    responder.send(update_by_id(&connection, id, &draft)).is_ok()
                }
                StoreMessages::DeleteById(id, responder) => {
                    responder.send(delete_by_id(&connection, id)).is_ok()
                }
                StoreMessages::Shutdown(responder) => {
                    if responder.send(Ok(())).is_err() {
                        warn!("Store shutdown was requested by a caller that went away");
                    }
                    break;
                }
            };
            if !delivered {
                warn!("Store response was dropped; the requester went away");
            }
        }
        debug!("Store thread finished");
    }

    async fn request<T>(
        &self,
        message: impl FnOnce(Responder<T>) -> StoreMessages,
    ) -> Result<T, Error> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(message(tx))
            .map_err(|_| Error::StoreUnavailable)?;
        rx.await.map_err(|_| Error::StoreResponderClosed)?
    }

    pub async fn select_all(&self) -> Result<Vec<Customer>, Error> {
        self.request(StoreMessages::SelectAll).await
    }

    pub async fn select_by_id(&self, id: i64) -> Result<Option<Customer>, Error> {
        self.request(|tx| StoreMessages::SelectById(id, tx)).await
    }

    pub async fn insert(&self, draft: CustomerDraft) -> Result<StoreAck, Error> {
        self.request(|tx| StoreMessages::Insert(draft, tx)).await
    }

    pub async fn update_by_id(&self, id: i64, draft: CustomerDraft) -> Result<StoreAck, Error> {
        self.request(|tx| StoreMessages::UpdateById(id, draft, tx))
            .await
    }

    pub async fn delete_by_id(&self, id: i64) -> Result<StoreAck, Error> {
        self.request(|tx| StoreMessages::DeleteById(id, tx)).await
    }

    /// Stops the store thread even while other handles are alive. Later requests fail with
    /// [`Error::StoreUnavailable`].
    pub async fn shutdown(&self) -> Result<(), Error> {
        self.request(StoreMessages::Shutdown).await
    }
}

fn customer_from_row(row: &Row<'_>) -> rusqlite::Result<Customer> {
    Ok(Customer {
        id: row.get("ID")?,
        nome: row.get("Nome")?,
        idade: row.get("Idade")?,
        uf: row.get("UF")?,
    })
}

fn select_all(connection: &Connection) -> Result<Vec<Customer>, Error> {
    let mut statement = connection.prepare(SQL_SELECT_ALL)?;
    let customers = statement
        .query_map([], customer_from_row)?
        .collect::<rusqlite::Result<Vec<Customer>>>()?;
    Ok(customers)
}

fn select_by_id(connection: &Connection, id: i64) -> Result<Option<Customer>, Error> {
    let customer = connection
        .query_row(SQL_SELECT_BY_ID, params![id], customer_from_row)
        .optional()?;
    Ok(customer)
}

fn insert(connection: &Connection, draft: &CustomerDraft) -> Result<StoreAck, Error> {
    let affected_rows = connection.execute(SQL_INSERT, params![draft.nome, draft.idade, draft.uf])?;
    Ok(StoreAck {
        affected_rows,
        insert_id: Some(connection.last_insert_rowid()),
    })
}

fn update_by_id(connection: &Connection, id: i64, draft: &CustomerDraft) -> Result<StoreAck, Error> {
    let affected_rows = connection.execute(
        SQL_UPDATE_BY_ID,
        params![draft.nome, draft.idade, draft.uf, id],
    )?;
    Ok(StoreAck {
        affected_rows,
        insert_id: None,
    })
}

fn delete_by_id(connection: &Connection, id: i64) -> Result<StoreAck, Error> {
    let affected_rows = connection.execute(SQL_DELETE_BY_ID, params![id])?;
    Ok(StoreAck {
        affected_rows,
        insert_id: None,
    })
}
