use crate::composer::{Composition, SceneComposer};
use crate::error::ComposeError;
use crate::export::EngineDocument;
use crate::health::{plain, HealthState};
use crate::intent::SceneIntent;
use crate::jobs::{JobError, JobId, JobStatus, JobTable};
use bytes::Bytes;
use http_body_util::{BodyExt, Full, LengthLimitError, Limited};
use hyper::body::Incoming;
use hyper::header::{HeaderValue, CONTENT_TYPE};
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Method, Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use serde::Serialize;
use serde_json::json;
use std::convert::Infallible;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{debug, error, info, warn};

/// Everything a request handler needs. Cheap to clone per connection.
#[derive(Clone)]
pub struct AppState {
    pub composer: Arc<SceneComposer>,
    pub jobs: JobTable,
    pub health: HealthState,
    pub max_body_bytes: usize,
}

impl AppState {
    pub fn new(composer: Arc<SceneComposer>, max_retained_jobs: usize, max_body_bytes: usize) -> Self {
        Self {
            composer,
            jobs: JobTable::new(max_retained_jobs),
            health: HealthState::new(),
            max_body_bytes,
        }
    }
}

type HttpResponse = Response<Full<Bytes>>;

fn json_response<T: Serialize>(status: StatusCode, value: &T) -> HttpResponse {
    match serde_json::to_vec(value) {
        Ok(body) => {
            let mut response = Response::new(Full::new(Bytes::from(body)));
            *response.status_mut() = status;
            response
                .headers_mut()
                .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
            response
        }
        Err(e) => {
            error!("Failed to serialize response: {}", e);
            plain(StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error")
        }
    }
}

fn error_response(status: StatusCode, message: impl Into<String>) -> HttpResponse {
    json_response(status, &json!({ "error": message.into() }))
}

pub fn compose_error_status(err: &ComposeError) -> StatusCode {
    match err {
        ComposeError::InvalidInput(_) => StatusCode::BAD_REQUEST,
        ComposeError::CapacityExceeded { .. } | ComposeError::PlacementExhausted { .. } => {
            StatusCode::UNPROCESSABLE_ENTITY
        }
    }
}

/// Read the whole body, refusing anything over `limit` bytes
async fn read_body(req: Request<Incoming>, limit: usize) -> Result<Bytes, HttpResponse> {
    match Limited::new(req.into_body(), limit).collect().await {
        Ok(collected) => Ok(collected.to_bytes()),
        Err(e) if e.downcast_ref::<LengthLimitError>().is_some() => Err(error_response(
            StatusCode::PAYLOAD_TOO_LARGE,
            format!("request body exceeds {} bytes", limit),
        )),
        Err(e) => Err(error_response(
            StatusCode::BAD_REQUEST,
            format!("failed to read request body: {}", e),
        )),
    }
}

async fn read_intent(req: Request<Incoming>, limit: usize) -> Result<SceneIntent, HttpResponse> {
    let body = read_body(req, limit).await?;
    serde_json::from_slice(&body)
        .map_err(|e| error_response(StatusCode::BAD_REQUEST, format!("malformed intent document: {}", e)))
}

async fn run_composition(
    composer: Arc<SceneComposer>,
    intent: SceneIntent,
) -> Result<Composition, HttpResponse> {
    match tokio::task::spawn_blocking(move || composer.compose(&intent)).await {
        Ok(Ok(composition)) => Ok(composition),
        Ok(Err(e)) => Err(error_response(compose_error_status(&e), e.to_string())),
        Err(e) => {
            error!("Composition task failed: {}", e);
            Err(error_response(StatusCode::INTERNAL_SERVER_ERROR, "composition task failed"))
        }
    }
}

async fn handle_compose(req: Request<Incoming>, state: &AppState) -> HttpResponse {
    let intent = match read_intent(req, state.max_body_bytes).await {
        Ok(intent) => intent,
        Err(response) => return response,
    };

    match run_composition(state.composer.clone(), intent).await {
        Ok(composition) => {
            json_response(StatusCode::OK, &EngineDocument::from_scene(&composition.scene))
        }
        Err(response) => response,
    }
}

async fn handle_submit_job(req: Request<Incoming>, state: &AppState) -> HttpResponse {
    let intent = match read_intent(req, state.max_body_bytes).await {
        Ok(intent) => intent,
        Err(response) => return response,
    };

    let id = match state.jobs.create().await {
        Ok(id) => id,
        Err(e @ JobError::TableFull(_)) => {
            return error_response(StatusCode::SERVICE_UNAVAILABLE, e.to_string())
        }
    };

    tokio::spawn(run_job(state.jobs.clone(), state.composer.clone(), id, intent));

    json_response(StatusCode::ACCEPTED, &json!({ "jobId": id }))
}

/// Background worker for one job
async fn run_job(jobs: JobTable, composer: Arc<SceneComposer>, id: JobId, intent: SceneIntent) {
    if !jobs.set_status(id, JobStatus::Running).await {
        debug!("Job {} finished before it started", id);
        return;
    }
    jobs.log(id, "composing").await;

    match tokio::task::spawn_blocking(move || composer.compose(&intent)).await {
        Ok(Ok(composition)) => {
            let report = &composition.report;
            for sub in &report.substitutions {
                jobs.log(
                    id,
                    format!(
                        "step {}: unknown piece '{}' replaced by '{}'",
                        sub.step, sub.requested, sub.substitute
                    ),
                )
                .await;
            }
            jobs.log(
                id,
                format!(
                    "{} building(s), {} road piece(s), {} adapter(s), {} foliage (seed {})",
                    report.buildings_placed,
                    report.road_pieces,
                    report.adapters_inserted,
                    report.foliage_placed,
                    composition.scene.seed
                ),
            )
            .await;

            if !jobs.complete(id, EngineDocument::from_scene(&composition.scene)).await {
                info!("Job {} result discarded", id);
            }
        }
        Ok(Err(e)) => {
            warn!("Job {} failed: {}", id, e);
            jobs.fail(id, e.to_string()).await;
        }
        Err(e) => {
            error!("Job {} worker panicked: {}", id, e);
            jobs.fail(id, "composition task failed").await;
        }
    }
}

async fn handle_job(method: &Method, id: &str, action: Option<&str>, state: &AppState) -> HttpResponse {
    let id = match JobId::parse_str(id) {
        Ok(id) => id,
        Err(_) => return error_response(StatusCode::NOT_FOUND, "unknown job"),
    };

    match (method, action) {
        (&Method::POST, Some("cancel")) => match state.jobs.cancel(id).await {
            Some(status) => json_response(StatusCode::OK, &json!({ "jobId": id, "status": status })),
            None => error_response(StatusCode::NOT_FOUND, "unknown job"),
        },
        (&Method::GET, action) => {
            let job = match state.jobs.get(id).await {
                Some(job) => job,
                None => return error_response(StatusCode::NOT_FOUND, "unknown job"),
            };

            match action {
                None => json_response(
                    StatusCode::OK,
                    &json!({
                        "jobId": job.id,
                        "status": job.status,
                        "logs": job.logs,
                        "error": job.error,
                    }),
                ),
                Some("logs") => json_response(StatusCode::OK, &json!({ "jobId": job.id, "logs": job.logs })),
                Some("result") => match job.result {
                    Some(document) if job.status == JobStatus::Done => {
                        json_response(StatusCode::OK, &document)
                    }
                    _ => json_response(
                        StatusCode::CONFLICT,
                        &json!({ "status": job.status, "error": job.error }),
                    ),
                },
                Some("cancel") => {
                    error_response(StatusCode::METHOD_NOT_ALLOWED, "Method Not Allowed")
                }
                Some(_) => error_response(StatusCode::NOT_FOUND, "Not Found"),
            }
        }
        (_, None) | (_, Some("logs")) | (_, Some("result")) | (_, Some("cancel")) => {
            error_response(StatusCode::METHOD_NOT_ALLOWED, "Method Not Allowed")
        }
        _ => error_response(StatusCode::NOT_FOUND, "Not Found"),
    }
}

async fn route(req: Request<Incoming>, state: AppState) -> Result<HttpResponse, Infallible> {
    let method = req.method().clone();
    let path = req.uri().path().to_string();
    debug!("{} {}", method, path);

    let segments: Vec<&str> = path.trim_matches('/').split('/').collect();

    let response = match (&method, segments.as_slice()) {
        (&Method::GET, ["health"]) => state.health.health_response().await,
        (&Method::GET, ["ready"]) => state.health.ready_response().await,
        (&Method::POST, ["compose"]) => handle_compose(req, &state).await,
        (&Method::POST, ["jobs"]) => handle_submit_job(req, &state).await,
        (_, ["jobs", id]) => handle_job(&method, id, None, &state).await,
        (_, ["jobs", id, action]) => handle_job(&method, id, Some(*action), &state).await,
        (_, ["health"]) | (_, ["ready"]) | (_, ["compose"]) | (_, ["jobs"]) => {
            error_response(StatusCode::METHOD_NOT_ALLOWED, "Method Not Allowed")
        }
        _ => plain(StatusCode::NOT_FOUND, "Not Found"),
    };

    Ok(response)
}

/// Accept connections on `listener` until the task is dropped
pub async fn serve(listener: TcpListener, state: AppState) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    info!("Scene composer listening on {}", listener.local_addr()?);

    loop {
        let (stream, _) = match listener.accept().await {
            Ok(conn) => conn,
            Err(e) => {
                error!("Failed to accept connection: {}", e);
                continue;
            }
        };

        let io = TokioIo::new(stream);
        let state = state.clone();

        tokio::spawn(async move {
            let service = service_fn(move |req| route(req, state.clone()));

            if let Err(err) = http1::Builder::new().serve_connection(io, service).await {
                error!("Error serving connection: {}", err);
            }
        });
    }
}

pub async fn run_server(bind_addr: &str, state: AppState) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    info!("Starting scene composer service on {}", bind_addr);

    let listener = TcpListener::bind(bind_addr).await?;
    serve(listener, state).await
}
