// Cardforge - Web Server
// REST API with Axum: BIN lookup/search/stats + card generation

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json},
    routing::{get, post},
    Router,
};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::CorsLayer;

use cardforge::{
    load_table, BinFilter, BinRecord, BinTable, CardError, CardGenerator, GenerateOptions,
    GeneratedCard, TableStats,
};

/// Shared application state - the table is read-only after load, so a bare
/// Arc is enough (no lock)
#[derive(Clone)]
struct AppState {
    table: Arc<BinTable>,
}

/// API Response wrapper
#[derive(Serialize)]
struct ApiResponse<T> {
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl<T> ApiResponse<T> {
    fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    fn err(message: String) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message),
        }
    }
}

/// Map core errors to HTTP statuses
fn error_status(err: &CardError) -> StatusCode {
    match err {
        CardError::InvalidInput(_) | CardError::InvalidBin(_) => StatusCode::BAD_REQUEST,
        CardError::BlockedBin { .. } => StatusCode::FORBIDDEN,
        CardError::BatchLimitExceeded { .. } => StatusCode::BAD_REQUEST,
    }
}

fn error_response(err: CardError) -> axum::response::Response {
    (
        error_status(&err),
        Json(ApiResponse::<()>::err(err.to_string())),
    )
        .into_response()
}

// ============================================================================
// Request / Response types
// ============================================================================

/// BIN record response (string key forms for the wire)
#[derive(Serialize)]
struct BinResponse {
    bin: String,
    brand: String,
    #[serde(rename = "type")]
    card_type: String,
    category: String,
    issuer: String,
    country: String,
    country_code: String,
    currency: String,
    bank_phone: String,
    bank_url: String,
}

impl From<&BinRecord> for BinResponse {
    fn from(record: &BinRecord) -> Self {
        Self {
            bin: record.bin_display(),
            brand: record.brand.as_str().to_string(),
            card_type: record.card_type.as_str().to_string(),
            category: record.category.clone(),
            issuer: record.issuer.clone(),
            country: record.country.clone(),
            country_code: record.country_code.clone(),
            currency: record.currency.clone(),
            bank_phone: record.bank_phone.clone(),
            bank_url: record.bank_url.clone(),
        }
    }
}

#[derive(Deserialize)]
struct SearchParams {
    brand: Option<String>,
    country: Option<String>,
    issuer: Option<String>,
    #[serde(rename = "type")]
    card_type: Option<String>,
    limit: Option<usize>,
}

#[derive(Deserialize)]
struct GenerateRequest {
    bin: String,
    #[serde(default = "default_count")]
    count: usize,
    #[serde(flatten)]
    options: GenerateOptions,
}

fn default_count() -> usize {
    1
}

#[derive(Serialize)]
struct BulkCardResponse {
    cards: Vec<GeneratedCard>,
    count: usize,
    bin: String,
}

// ============================================================================
// API Handlers
// ============================================================================

/// GET /api/health - Health check
async fn health_check() -> impl IntoResponse {
    Json(ApiResponse::ok("OK"))
}

/// GET /api/bins/lookup/:bin - Lookup one BIN prefix
async fn lookup_bin(
    State(state): State<AppState>,
    Path(bin): Path<String>,
) -> impl IntoResponse {
    match state.table.lookup(&bin) {
        Ok(Some(record)) => {
            (StatusCode::OK, Json(ApiResponse::ok(BinResponse::from(record)))).into_response()
        }
        Ok(None) => (
            StatusCode::NOT_FOUND,
            Json(ApiResponse::<()>::err("BIN not found in dataset".to_string())),
        )
            .into_response(),
        Err(e) => error_response(e),
    }
}

/// GET /api/bins/search - Filtered search
async fn search_bins(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> impl IntoResponse {
    let filter = BinFilter {
        brand: params.brand,
        country: params.country,
        issuer: params.issuer,
        card_type: params.card_type,
        limit: params.limit,
    };

    let results: Vec<BinResponse> = state
        .table
        .search(&filter)
        .into_iter()
        .map(BinResponse::from)
        .collect();

    (StatusCode::OK, Json(ApiResponse::ok(results))).into_response()
}

/// GET /api/bins/stats - Dataset statistics
async fn bin_stats(State(state): State<AppState>) -> impl IntoResponse {
    let stats: TableStats = state.table.stats();
    Json(ApiResponse::ok(stats))
}

/// GET /api/bins/brands - Distinct brands
async fn list_brands(State(state): State<AppState>) -> impl IntoResponse {
    Json(ApiResponse::ok(state.table.brands()))
}

/// GET /api/bins/countries - Distinct countries
async fn list_countries(State(state): State<AppState>) -> impl IntoResponse {
    Json(ApiResponse::ok(state.table.countries()))
}

/// GET /api/cards/generate/:bin - One card, default options
async fn generate_single(
    State(state): State<AppState>,
    Path(bin): Path<String>,
) -> impl IntoResponse {
    let generator = CardGenerator::new(&state.table);

    match generator.generate(&bin, &GenerateOptions::default()) {
        Ok(card) => (StatusCode::OK, Json(ApiResponse::ok(card))).into_response(),
        Err(e) => error_response(e),
    }
}

/// POST /api/cards/generate - Bulk generation with options
async fn generate_bulk(
    State(state): State<AppState>,
    Json(request): Json<GenerateRequest>,
) -> impl IntoResponse {
    let generator = CardGenerator::new(&state.table);

    match generator.generate_many(&request.bin, request.count, &request.options) {
        Ok(cards) => {
            let response = BulkCardResponse {
                count: cards.len(),
                bin: request.bin,
                cards,
            };
            (StatusCode::OK, Json(ApiResponse::ok(response))).into_response()
        }
        Err(e) => error_response(e),
    }
}

// ============================================================================
// Main Server
// ============================================================================

#[tokio::main]
async fn main() {
    println!("🌐 Cardforge - Web Server");
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

    // Open database (import must have run first)
    let db_path = std::env::var("CARDFORGE_DB").unwrap_or_else(|_| "cardforge.db".to_string());
    let db_path = std::path::Path::new(&db_path);

    if !db_path.exists() {
        eprintln!("❌ Database not found at {:?}", db_path);
        eprintln!("   Run: cardforge import <dataset.csv>");
        eprintln!("   to import the BIN dataset first.");
        std::process::exit(1);
    }

    let conn = Connection::open(db_path).expect("Failed to open database");
    let table = load_table(&conn).expect("Failed to load BIN table");
    println!("✓ Loaded {} BIN records from {:?}", table.len(), db_path);

    // Create shared state (table is immutable from here on)
    let state = AppState {
        table: Arc::new(table),
    };

    // Build API routes
    let bin_routes = Router::new()
        .route("/lookup/:bin", get(lookup_bin))
        .route("/search", get(search_bins))
        .route("/stats", get(bin_stats))
        .route("/brands", get(list_brands))
        .route("/countries", get(list_countries));

    let card_routes = Router::new()
        .route("/generate/:bin", get(generate_single))
        .route("/generate", post(generate_bulk));

    let api_routes = Router::new()
        .route("/health", get(health_check))
        .nest("/bins", bin_routes)
        .nest("/cards", card_routes)
        .with_state(state);

    let app = Router::new()
        .nest("/api", api_routes)
        .layer(CorsLayer::permissive());

    // Start server
    let addr = std::env::var("CARDFORGE_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".to_string());
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .expect("Failed to bind to address");

    println!("\n🚀 Server running on http://{}", addr);
    println!("   Lookup:   http://{}/api/bins/lookup/400050", addr);
    println!("   Generate: http://{}/api/cards/generate/400050", addr);
    println!("\n   Press Ctrl+C to stop\n");

    axum::serve(listener, app)
        .await
        .expect("Failed to start server");
}
