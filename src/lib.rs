//! workshop-api
//!
//! Backend API for multi-branch vehicle service workshops. An order opens
//! ("started order") the moment a vehicle arrives, knowing only its plate and
//! the branch; when an invoice is later issued for that vehicle the invoice
//! links to the started order in a single transaction instead of duplicating
//! customer or order records.
#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![allow(elided_lifetimes_in_paths)]
#![warn(clippy::all, clippy::perf, clippy::dbg_macro)]

pub mod config;
pub mod db;
pub mod entities;
pub mod errors;
pub mod events;
pub mod handlers;
pub mod migrator;
pub mod services;

use axum::Router;
use sea_orm::DatabaseConnection;
use std::sync::Arc;
use tower_http::{compression::CompressionLayer, cors::CorsLayer, trace::TraceLayer};

use events::EventSender;
use services::{
    customers::CustomerService, invoices::InvoiceService, orders::OrderService,
    vehicles::VehicleService,
};

/// Shared application state: the pool, configuration, and one instance of
/// each service.
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<DatabaseConnection>,
    pub config: config::AppConfig,
    pub orders: OrderService,
    pub customers: CustomerService,
    pub vehicles: VehicleService,
    pub invoices: InvoiceService,
}

impl AppState {
    pub fn new(
        db: Arc<DatabaseConnection>,
        config: config::AppConfig,
        event_sender: Option<Arc<EventSender>>,
    ) -> Self {
        let orders = OrderService::new(db.clone(), event_sender.clone());
        let customers = CustomerService::new(db.clone(), event_sender.clone());
        let vehicles = VehicleService::new(db.clone());
        let invoices = InvoiceService::new(
            db.clone(),
            event_sender,
            orders.clone(),
            customers.clone(),
            vehicles.clone(),
        );
        Self {
            db,
            config,
            orders,
            customers,
            vehicles,
            invoices,
        }
    }
}

/// Assembles the full application router.
pub fn app_router(state: AppState) -> Router {
    Router::new()
        .merge(handlers::health::health_routes())
        .nest("/api/v1/orders", handlers::orders::order_routes())
        .nest("/api/v1/invoices", handlers::invoices::invoice_routes())
        .nest("/api/v1/customers", handlers::customers::customer_routes())
        .layer(TraceLayer::new_for_http())
        .layer(CompressionLayer::new())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
