use anyhow::{Context, Result};
use axum::{
    extract::State,
    http::StatusCode,
    response::Html,
    routing::{get, post},
    Json, Router, serve,
};
use minijinja::Environment;
use std::{
    net::SocketAddr,
    path::PathBuf,
    sync::Arc,
};
use tokio::sync::RwLock;
use tower::ServiceBuilder;
use tower_http::{services::ServeDir, trace::TraceLayer};
use tracing::{error, info, instrument};

use crate::api::{BotResponse, ChatRequest, HealthResponse, LearnRequest};
use crate::constants::{self, LEARNED_RESPONSE};
use crate::error::ApiError;
use crate::knowledge_base::{normalize, KnowledgeBase};
use crate::responder;

/// Settings for one server instance.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub port: u16,
    pub knowledge_base_path: PathBuf,
    pub static_dir: PathBuf,
    pub title: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: *constants::DEFAULT_PORT,
            knowledge_base_path: PathBuf::from(constants::KNOWLEDGE_BASE_PATH.as_str()),
            static_dir: PathBuf::from(constants::STATIC_DIR.as_str()),
            title: constants::PAGE_TITLE.clone(),
        }
    }
}

// Shared application state
#[derive(Clone)]
pub struct AppState {
    templates: Arc<Environment<'static>>,
    knowledge_base: Arc<RwLock<KnowledgeBase>>,
    // Where /learn persists the knowledge base
    knowledge_base_path: Arc<PathBuf>,
    title: Arc<String>,
}

impl AppState {
    pub fn new(knowledge_base: KnowledgeBase, knowledge_base_path: PathBuf, title: String) -> Result<Self> {
        Ok(Self {
            templates: Arc::new(create_template_env().context("Failed to initialize template engine")?),
            knowledge_base: Arc::new(RwLock::new(knowledge_base)),
            knowledge_base_path: Arc::new(knowledge_base_path),
            title: Arc::new(title),
        })
    }
}

fn create_template_env() -> Result<Environment<'static>> {
    let mut env = Environment::new();
    env.add_template("index.html", include_str!("../templates/index.html"))?;
    Ok(env)
}

async fn index_handler(
    State(state): State<AppState>,
) -> Result<Html<String>, (StatusCode, Html<String>)> {
    state
        .templates
        .get_template("index.html")
        .and_then(|tmpl| {
            tmpl.render(minijinja::context! {
                title => state.title.as_str(),
            })
        })
        .map(Html)
        .map_err(|e| {
            error!("Failed to get or render template: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Html(format!("Internal Server Error: {}", e)),
            )
        })
}

#[instrument(skip(state))]
async fn chat_handler(
    State(state): State<AppState>,
    Json(request): Json<ChatRequest>,
) -> Result<Json<BotResponse>, ApiError> {
    if request.message.trim().is_empty() {
        return Err(ApiError::BadRequest("message must not be empty".to_string()));
    }

    let kb = state.knowledge_base.read().await;
    let response = responder::respond(&request.message, &kb, &mut rand::thread_rng());
    info!(teach = responder::is_teach_request(&response), "Answered chat message");
    Ok(Json(BotResponse { response }))
}

#[instrument(skip(state))]
async fn learn_handler(
    State(state): State<AppState>,
    Json(request): Json<LearnRequest>,
) -> Result<Json<BotResponse>, ApiError> {
    let question = normalize(&request.question);
    let answer = request.answer.trim();
    if question.is_empty() || answer.is_empty() {
        return Err(ApiError::BadRequest("question and answer must not be empty".to_string()));
    }

    // Held across the save so concurrent learns reach disk in order; the
    // shared base only changes once the update is on disk.
    let mut kb = state.knowledge_base.write().await;
    let mut updated = kb.clone();
    updated.learn(&question, answer);
    updated.save(state.knowledge_base_path.as_path()).await?;
    *kb = updated;
    info!(questions = kb.len(), "Learned a new answer");

    Ok(Json(BotResponse {
        response: LEARNED_RESPONSE.to_string(),
    }))
}

async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    let questions = state.knowledge_base.read().await.len();
    Json(HealthResponse {
        status: "ok".to_string(),
        questions,
    })
}

/// Builds the application router: the widget page, its static assets and the JSON API.
pub fn build_router(state: AppState, static_dir: impl Into<PathBuf>) -> Router {
    Router::new()
        .route("/", get(index_handler))
        .route("/chat", post(chat_handler))
        .route("/learn", post(learn_handler))
        .route("/health", get(health_handler))
        .nest_service("/static", ServeDir::new(static_dir.into()))
        .with_state(state)
        .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http())) // Add request logging
}

pub async fn start_web_server(config: ServerConfig) -> Result<()> {
    let knowledge_base = KnowledgeBase::load(&config.knowledge_base_path)
        .await
        .context("Failed to load knowledge base")?;

    let state = AppState::new(knowledge_base, config.knowledge_base_path.clone(), config.title.clone())?;
    let app = build_router(state, config.static_dir.clone());

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    info!("Web server listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context(format!("Failed to bind to address {}", addr))?;

    serve(listener, app.into_make_service())
        .await
        .context("Web server failed")?;

    Ok(())
}
