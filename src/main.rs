//! VFS Tree Server - file explorer backend for a persistent workspace tree
//!
//! - Sled embedded database for entries and the change log
//! - Axum HTTP API driving the tree engine's intent handlers
//! - One engine per process, shared behind an async mutex

use axum::{
    extract::State,
    http::Method,
    response::IntoResponse,
    routing::{get, post, put},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::{net::SocketAddr, sync::Arc, time::Instant};
use tokio::sync::Mutex;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::info;

use vfs_tree::{
    sample_entries, ContextMenuCommand, EntryKind, Interaction, MenuPosition, ParentRef,
    PendingCreate, RenameTrigger, ServerConfig, SledPersistence, TreeEngine, ViewNode,
};

type Engine = TreeEngine<SledPersistence>;

// ============================================================================
// APPLICATION STATE
// ============================================================================

/// Shared application state
pub struct AppState {
    /// The workspace tree; the mutex serializes overlapping requests
    engine: Mutex<Engine>,
    /// Display name of the workspace root
    project_name: String,
    /// Server start time
    started_at: Instant,
}

impl AppState {
    fn new(engine: Engine, project_name: String) -> Self {
        Self {
            engine: Mutex::new(engine),
            project_name,
            started_at: Instant::now(),
        }
    }

    fn snapshot(&self, engine: &Engine) -> TreeSnapshot {
        TreeSnapshot {
            project_name: self.project_name.clone(),
            nodes: engine.ordered_view_nodes().to_vec(),
            pending_create: engine.pending_create().cloned(),
            interaction: engine.interaction().clone(),
        }
    }

    fn respond(&self, engine: &Engine, changed: bool) -> Json<MutationResponse> {
        Json(MutationResponse {
            changed,
            tree: self.snapshot(engine),
        })
    }
}

// ============================================================================
// API TYPES
// ============================================================================

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: String,
    version: String,
    uptime_seconds: u64,
    entry_count: usize,
    change_count: usize,
    total_size_bytes: u64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct TreeSnapshot {
    project_name: String,
    nodes: Vec<ViewNode>,
    pending_create: Option<PendingCreate>,
    interaction: Interaction,
}

#[derive(Debug, Serialize)]
struct MutationResponse {
    changed: bool,
    #[serde(flatten)]
    tree: TreeSnapshot,
}

#[derive(Debug, Serialize)]
struct VisibleRow {
    index: usize,
    #[serde(flatten)]
    node: ViewNode,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ClickRequest {
    index: usize,
    is_folder: bool,
}

#[derive(Debug, Deserialize)]
struct ContextMenuRequest {
    path: String,
    kind: EntryKind,
    index: usize,
    #[serde(default)]
    position: MenuPosition,
}

#[derive(Debug, Deserialize)]
struct CommandRequest {
    command: ContextMenuCommand,
}

#[derive(Debug, Deserialize)]
struct CreateRequest {
    parent: ParentRef,
    kind: EntryKind,
}

#[derive(Debug, Deserialize)]
struct IndexRequest {
    index: usize,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RenameRequest {
    index: usize,
    new_name: String,
    trigger: Option<RenameTrigger>,
}

#[derive(Debug, Deserialize)]
struct MoveRequest {
    index: usize,
    target: ParentRef,
}

#[derive(Debug, Deserialize)]
struct ContentRequest {
    path: String,
    content: String,
}

// ============================================================================
// HTTP HANDLERS
// ============================================================================

/// Health check endpoint
async fn health_check(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let engine = state.engine.lock().await;
    let stats = engine.persistence().stats();

    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds: state.started_at.elapsed().as_secs(),
        entry_count: stats.entry_count,
        change_count: stats.change_count,
        total_size_bytes: stats.total_size_bytes,
    })
}

/// Every row, hidden ones included
async fn get_tree(State(state): State<Arc<AppState>>) -> Json<TreeSnapshot> {
    let engine = state.engine.lock().await;
    Json(state.snapshot(&engine))
}

/// Rows to render
async fn get_visible(State(state): State<Arc<AppState>>) -> Json<Vec<VisibleRow>> {
    let engine = state.engine.lock().await;
    Json(
        engine
            .visible_nodes()
            .into_iter()
            .map(|(index, node)| VisibleRow {
                index,
                node: node.clone(),
            })
            .collect(),
    )
}

async fn click(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ClickRequest>,
) -> Json<MutationResponse> {
    let mut engine = state.engine.lock().await;
    let changed = engine.on_node_click(req.index, req.is_folder);
    state.respond(&engine, changed)
}

async fn open_context_menu(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ContextMenuRequest>,
) -> Json<MutationResponse> {
    let mut engine = state.engine.lock().await;
    let changed = engine.on_context_menu_requested(&req.path, req.kind, req.index, req.position);
    state.respond(&engine, changed)
}

async fn run_context_menu_command(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CommandRequest>,
) -> Json<MutationResponse> {
    let mut engine = state.engine.lock().await;
    let changed = engine.on_context_menu_command(req.command).await;
    state.respond(&engine, changed)
}

async fn dismiss_context_menu(State(state): State<Arc<AppState>>) -> Json<MutationResponse> {
    let mut engine = state.engine.lock().await;
    let changed = engine.on_context_menu_dismissed();
    state.respond(&engine, changed)
}

async fn request_create(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateRequest>,
) -> Json<MutationResponse> {
    let mut engine = state.engine.lock().await;
    let changed = engine.on_create_requested(req.parent, req.kind);
    state.respond(&engine, changed)
}

async fn cancel_create(State(state): State<Arc<AppState>>) -> Json<MutationResponse> {
    let mut engine = state.engine.lock().await;
    let changed = engine.on_create_cancelled();
    state.respond(&engine, changed)
}

async fn begin_rename(
    State(state): State<Arc<AppState>>,
    Json(req): Json<IndexRequest>,
) -> Json<MutationResponse> {
    let mut engine = state.engine.lock().await;
    let changed = engine.on_rename_requested(req.index);
    state.respond(&engine, changed)
}

async fn confirm_rename(
    State(state): State<Arc<AppState>>,
    Json(req): Json<RenameRequest>,
) -> Json<MutationResponse> {
    let mut engine = state.engine.lock().await;
    let trigger = req.trigger.unwrap_or(RenameTrigger::Enter);
    let changed = engine
        .on_rename_confirmed(req.index, &req.new_name, trigger)
        .await;
    state.respond(&engine, changed)
}

async fn delete_node(
    State(state): State<Arc<AppState>>,
    Json(req): Json<IndexRequest>,
) -> Json<MutationResponse> {
    let mut engine = state.engine.lock().await;
    let changed = engine.on_delete_requested(req.index).await;
    state.respond(&engine, changed)
}

async fn move_node(
    State(state): State<Arc<AppState>>,
    Json(req): Json<MoveRequest>,
) -> Json<MutationResponse> {
    let mut engine = state.engine.lock().await;
    let changed = engine.on_move_requested(req.index, req.target).await;
    state.respond(&engine, changed)
}

async fn update_content(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ContentRequest>,
) -> Json<MutationResponse> {
    let mut engine = state.engine.lock().await;
    let changed = engine.update_content(&req.path, &req.content).await;
    state.respond(&engine, changed)
}

// ============================================================================
// MAIN ENTRY POINT
// ============================================================================

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "vfs_tree=info,tower_http=info".into()),
        )
        .init();

    // Load environment variables
    dotenvy::dotenv().ok();

    let config = ServerConfig::from_env()?;

    info!("Initializing storage at: {}", config.storage_path);
    let storage = SledPersistence::open(config.storage())?;

    let mut engine = TreeEngine::load(storage).await?;
    if config.seed_sample {
        let seeded = engine.seed(sample_entries()).await?;
        if seeded > 0 {
            info!("Empty workspace seeded with {} sample entries", seeded);
        }
    }

    let state = Arc::new(AppState::new(engine, config.project_name.clone()));

    // Set up CORS
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::OPTIONS])
        .allow_headers(Any);

    // Build router
    let app = Router::new()
        // Health check
        .route("/health", get(health_check))
        // Tree snapshots
        .route("/api/tree", get(get_tree))
        .route("/api/tree/visible", get(get_visible))
        // Intents
        .route("/api/tree/click", post(click))
        .route("/api/tree/context-menu", post(open_context_menu))
        .route("/api/tree/context-menu/command", post(run_context_menu_command))
        .route("/api/tree/context-menu/dismiss", post(dismiss_context_menu))
        .route("/api/tree/create", post(request_create))
        .route("/api/tree/create/cancel", post(cancel_create))
        .route("/api/tree/rename/begin", post(begin_rename))
        .route("/api/tree/rename", post(confirm_rename))
        .route("/api/tree/delete", post(delete_node))
        .route("/api/tree/move", post(move_node))
        .route("/api/files/content", put(update_content))
        // Add state and middleware
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(cors);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));

    info!("VFS Tree server v{} starting", env!("CARGO_PKG_VERSION"));
    info!("   Project: {}", config.project_name);
    info!("   Listening on: http://{}", addr);
    info!("   Health check: http://{}/health", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
