use clientes::api::{ApiClient, ApiError};
use clientes::gateway;
use clientes::model::{Age, CustomerDraft, Store};
use clientes::screen::{Action, Effect, Field, Mutation, Screen};

async fn spawn_gateway() -> ApiClient {
    let (store, _thread) = Store::open(":memory:").expect("in-memory store should open");
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let address = listener.local_addr().unwrap();
    tokio::spawn(gateway::serve(listener, store));
    ApiClient::new(&format!("http://{}", address))
}

fn draft(nome: &str, idade: &str, uf: &str) -> CustomerDraft {
    CustomerDraft {
        nome: Some(nome.to_string()),
        idade: Some(Age::Text(idade.to_string())),
        uf: Some(uf.to_string()),
    }
}

#[tokio::test]
async fn client_round_trips_every_route() {
    let client = spawn_gateway().await;
    assert!(client.list().await.unwrap().is_empty());

    let ack = client.create(&draft("Ana", "30", "SP")).await.unwrap();
    let id = ack.insert_id.unwrap();
    let ana = client.get(id).await.unwrap().unwrap();
    assert_eq!(ana.nome.as_deref(), Some("Ana"));
    assert_eq!(ana.idade, Some(Age::Number(30)));

    let ack = client.update(id, &draft("Ana", "31", "RJ")).await.unwrap();
    assert_eq!(ack.affected_rows, 1);
    assert_eq!(client.get(id).await.unwrap().unwrap().uf.as_deref(), Some("RJ"));

    assert_eq!(client.delete(id).await.unwrap().affected_rows, 1);
    assert_eq!(client.get(id).await.unwrap(), None);
    assert_eq!(client.delete(id).await.unwrap().affected_rows, 0);
}

#[tokio::test]
async fn unreachable_gateway_is_a_network_error() {
    // Bind then drop to get a port nobody is listening on.
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let address = listener.local_addr().unwrap();
    drop(listener);

    let client = ApiClient::new(&format!("http://{}", address));
    match client.list().await {
        Err(ApiError::Network(_)) => {}
        other => panic!("expected a network error, got {:?}", other),
    }
}

// Drives the screen the way the terminal client does, with real requests.
#[tokio::test]
async fn screen_create_flow_against_a_live_gateway() {
    let client = spawn_gateway().await;
    let mut screen = Screen::new();

    let mut pending = screen.apply(Action::Mounted);
    let mut alerts = Vec::new();
    while let Some(effect) = pending.pop() {
        let follow_up = match effect {
            Effect::Fetch { generation } => screen.apply(Action::Loaded {
                generation,
                result: client.list().await,
            }),
            Effect::Send(mutation) => {
                let result = match &mutation {
                    Mutation::Create(draft) => client.create(draft).await,
                    Mutation::Update(id, draft) => client.update(*id, draft).await,
                    Mutation::Delete(id) => client.delete(*id).await,
                };
                screen.apply(Action::Completed { mutation, result })
            }
            Effect::Alert(alert) => {
                alerts.push(alert);
                vec![]
            }
        };
        pending.extend(follow_up);

        if pending.is_empty() && screen.customers().is_empty() && alerts.is_empty() {
            screen.apply(Action::NewRequested);
            screen.apply(Action::DraftChanged(Field::Nome, "Ana".to_string()));
            screen.apply(Action::DraftChanged(Field::Idade, "30".to_string()));
            screen.apply(Action::DraftChanged(Field::Uf, "sp".to_string()));
            pending.extend(screen.apply(Action::SaveRequested));
        }
    }

    assert_eq!(alerts.len(), 1);
    assert_eq!(alerts[0].message, "Cliente criado!");
    assert!(!screen.is_loading());
    let rows = screen.rows();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].uf, "SP");
    assert_eq!(rows[0].idade, "30");
    assert!(rows[0].actionable);
}
