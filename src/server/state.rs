//! Shared application state handed to every Axum handler.

use std::sync::Arc;

use crate::catalog::Catalog;
use crate::crdt::CrdtManager;
use crate::server::edit_ws::DocBroadcasts;
use crate::transfer::TransferEngine;

#[derive(Clone)]
pub struct AppState {
    pub crdt: Arc<CrdtManager>,
    pub catalog: Arc<Catalog>,
    pub transfer: Arc<TransferEngine>,
    pub broadcasts: Arc<DocBroadcasts>,
}

impl AppState {
    pub fn new(site_id: impl Into<String>, catalog: Catalog, transfer: TransferEngine) -> Self {
        AppState {
            crdt: Arc::new(CrdtManager::new(site_id)),
            catalog: Arc::new(catalog),
            transfer: Arc::new(transfer),
            broadcasts: Arc::new(DocBroadcasts::new()),
        }
    }
}
