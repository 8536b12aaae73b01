//! HTTP surface of the registry: five routes passed straight through to the [`Store`].

use std::collections::HashMap;

use axum::extract::{FromRequest, Path, Query, Request, State};
use axum::http::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE, ORIGIN};
use axum::http::{HeaderName, Method, StatusCode};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{body::Bytes, Form, Json, Router};
use serde::Serialize;
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};

use crate::error::Error;
use crate::model::{Customer, CustomerDraft, StoreAck, Store};

// Strongest first: each source overrides the ones after it.
const OVERRIDE_HEADERS: [&str; 3] = [
    "x-method-override",
    "x-http-method-override",
    "x-http-method",
];
const OVERRIDE_QUERY_KEY: &str = "_method";

/// Builds the complete application: routes, method override and CORS.
pub fn router(store: Store) -> Router {
    let routes = Router::new()
        .route("/", get(list_customers))
        .route("/clientes", post(create_customer))
        .route("/clientes/", post(create_customer))
        .route(
            "/clientes/{id}",
            get(get_customer)
                .put(update_customer)
                .delete(delete_customer),
        )
        .with_state(store);

    // The override has to rewrite the method before routing happens.
    let routes = ServiceBuilder::new()
        .layer(middleware::from_fn(method_override))
        .service(routes);

    Router::new().fallback_service(routes).layer(cors())
}

pub async fn serve(listener: tokio::net::TcpListener, store: Store) -> std::io::Result<()> {
    if let Ok(address) = listener.local_addr() {
        info!("Gateway listening at http://{}", address);
    }
    axum::serve(listener, router(store)).await
}

/// Any origin; preflight requests are answered by the layer itself with a bare 200.
pub fn cors() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_headers([
            ORIGIN,
            HeaderName::from_static("x-requested-with"),
            CONTENT_TYPE,
            ACCEPT,
            AUTHORIZATION,
        ])
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
}

async fn list_customers(State(store): State<Store>) -> Result<Json<Vec<Customer>>, GatewayError> {
    let customers = store
        .select_all()
        .await
        .map_err(|error| GatewayError::new(error, None))?;
    info!("GET / -> {:?}", customers);
    Ok(Json(customers))
}

async fn get_customer(
    State(store): State<Store>,
    Path(id): Path<String>,
) -> Result<Json<Option<Customer>>, GatewayError> {
    let customer = match parse_id(&id) {
        Some(id) => store
            .select_by_id(id)
            .await
            .map_err(|error| GatewayError::new(error, Some(id)))?,
        None => None,
    };
    info!("GET /clientes/{} -> {:?}", id, customer);
    Ok(Json(customer))
}

async fn create_customer(
    State(store): State<Store>,
    DraftBody(draft): DraftBody,
) -> Result<Json<StoreAck>, GatewayError> {
    let ack = store
        .insert(draft)
        .await
        .map_err(|error| GatewayError::new(error, None))?;
    info!("POST /clientes/ -> {:?}", ack);
    Ok(Json(ack))
}

async fn update_customer(
    State(store): State<Store>,
    Path(id): Path<String>,
    DraftBody(draft): DraftBody,
) -> Result<Json<StoreAck>, GatewayError> {
    let ack = match parse_id(&id) {
        Some(id) => store
            .update_by_id(id, draft)
            .await
            .map_err(|error| GatewayError::new(error, Some(id)))?,
        None => StoreAck::default(),
    };
    info!("PUT /clientes/{} -> {:?}", id, ack);
    Ok(Json(ack))
}

async fn delete_customer(
    State(store): State<Store>,
    Path(id): Path<String>,
) -> Result<Json<StoreAck>, GatewayError> {
    let ack = match parse_id(&id) {
        Some(id) => store
            .delete_by_id(id)
            .await
            .map_err(|error| GatewayError::new(error, Some(id)))?,
        None => StoreAck::default(),
    };
    info!("DELETE /clientes/{} -> {:?}", id, ack);
    Ok(Json(ack))
}

// A path segment that is not an integer can never match a row.
fn parse_id(raw: &str) -> Option<i64> {
    raw.trim().parse().ok()
}

async fn method_override(mut request: Request, next: Next) -> Response {
    if request.method() == Method::POST {
        if let Some(method) = requested_method(&request) {
            debug!("Overriding POST {} as {}", request.uri(), method);
            *request.method_mut() = method;
        }
    }
    next.run(request).await
}

fn requested_method(request: &Request) -> Option<Method> {
    let from_query = Query::<HashMap<String, String>>::try_from_uri(request.uri())
        .ok()
        .and_then(|Query(mut params)| params.remove(OVERRIDE_QUERY_KEY));
    let from_headers = OVERRIDE_HEADERS.iter().map(|name| {
        request
            .headers()
            .get(*name)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string)
    });
    // An unknown method in one source leaves the weaker sources in charge.
    std::iter::once(from_query)
        .chain(from_headers)
        .flatten()
        .find_map(|requested| known_method(&requested))
}

fn known_method(requested: &str) -> Option<Method> {
    match requested.trim().to_ascii_uppercase().as_str() {
        "GET" => Some(Method::GET),
        "POST" => Some(Method::POST),
        "PUT" => Some(Method::PUT),
        "DELETE" => Some(Method::DELETE),
        "PATCH" => Some(Method::PATCH),
        "HEAD" => Some(Method::HEAD),
        "OPTIONS" => Some(Method::OPTIONS),
        _ => None,
    }
}

/// Insert/update body, taken from JSON or from a urlencoded form. An empty body is an empty draft.
pub struct DraftBody(pub CustomerDraft);

impl<S> FromRequest<S> for DraftBody
where
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request(request: Request, state: &S) -> Result<Self, Self::Rejection> {
        let is_form = request
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map_or(false, |value| {
                value.starts_with("application/x-www-form-urlencoded")
            });
        if is_form {
            let Form(draft) = Form::<CustomerDraft>::from_request(request, state)
                .await
                .map_err(IntoResponse::into_response)?;
            return Ok(Self(draft));
        }

        let bytes = Bytes::from_request(request, state)
            .await
            .map_err(IntoResponse::into_response)?;
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(Self(CustomerDraft::default()));
        }
        let Json(draft) = Json::<CustomerDraft>::from_bytes(&bytes).map_err(IntoResponse::into_response)?;
        Ok(Self(draft))
    }
}

/// Error envelope returned when the store fails underneath a request.
#[derive(Debug)]
pub struct GatewayError {
    error: Error,
    id: Option<i64>,
}

#[derive(Serialize)]
struct ErrorEnvelope<'a> {
    kind: &'a str,
    message: String,
    id: Option<i64>,
}

impl GatewayError {
    pub fn new(error: Error, id: Option<i64>) -> Self {
        Self { error, id }
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        error!("Store request failed (id {:?}): {}", self.id, self.error);
        let body = ErrorEnvelope {
            kind: self.error.kind(),
            message: self.error.to_string(),
            id: self.id,
        };
        (StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;

    fn post(uri: &str) -> axum::http::request::Builder {
        Request::builder().method(Method::POST).uri(uri)
    }

    #[test]
    fn override_query_wins_over_headers() {
        let request = post("/clientes/1?_method=DELETE")
            .header("X-HTTP-Method-Override", "put")
            .body(Body::empty())
            .unwrap();
        assert_eq!(requested_method(&request), Some(Method::DELETE));

        let request = post("/clientes/1?_method=%20delete+")
            .body(Body::empty())
            .unwrap();
        assert_eq!(requested_method(&request), Some(Method::DELETE));
    }

    #[test]
    fn later_override_headers_win() {
        let request = post("/clientes/1")
            .header("X-HTTP-Method", "PUT")
            .header("X-HTTP-Method-Override", "PATCH")
            .body(Body::empty())
            .unwrap();
        assert_eq!(requested_method(&request), Some(Method::PATCH));

        let request = post("/clientes/1")
            .header("X-HTTP-Method", "PUT")
            .header("X-HTTP-Method-Override", "PATCH")
            .header("X-Method-Override", "DELETE")
            .body(Body::empty())
            .unwrap();
        assert_eq!(requested_method(&request), Some(Method::DELETE));
    }

    #[test]
    fn unknown_override_methods_are_ignored() {
        let request = post("/clientes/1")
            .header("X-Method-Override", "TELEPORT")
            .body(Body::empty())
            .unwrap();
        assert_eq!(requested_method(&request), None);

        let request = post("/clientes/1?_method=TELEPORT")
            .header("X-HTTP-Method", "PUT")
            .body(Body::empty())
            .unwrap();
        assert_eq!(requested_method(&request), Some(Method::PUT));
    }

    #[test]
    fn ids_must_be_integers() {
        assert_eq!(parse_id("42"), Some(42));
        assert_eq!(parse_id("abc"), None);
        assert_eq!(parse_id("4.5"), None);
    }

    #[tokio::test]
    async fn form_bodies_become_drafts() {
        let request = post("/clientes/")
            .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from("Nome=Ana&Idade=30&UF=sp"))
            .unwrap();
        let DraftBody(draft) = DraftBody::from_request(request, &()).await.unwrap();
        assert_eq!(draft.nome.as_deref(), Some("Ana"));
        assert_eq!(draft.uf.as_deref(), Some("sp"));
        assert_eq!(draft.idade.map(|age| age.to_string()).as_deref(), Some("30"));
    }

    #[tokio::test]
    async fn empty_bodies_become_empty_drafts() {
        let request = post("/clientes/").body(Body::empty()).unwrap();
        let DraftBody(draft) = DraftBody::from_request(request, &()).await.unwrap();
        assert_eq!(draft, CustomerDraft::default());
    }
}
