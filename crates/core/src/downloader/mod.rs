//! Download backends and the dispatch layer.
//!
//! `DownloadBackend` is the capability set every concrete client
//! implements; the dispatcher holds only the trait object and never
//! branches on backend identity. Backends: qBittorrent (cookie session)
//! and Transmission (JSON-RPC).

mod dispatcher;
mod path;
mod qbittorrent;
mod transmission;
mod types;

pub use dispatcher::DownloadDispatcher;
pub use path::gen_save_path;
pub use qbittorrent::QBittorrentBackend;
pub use transmission::TransmissionBackend;
pub use types::{
    AddRequest, AddSource, BackendError, DispatchOutcome, DownloadBackend, StatusFilter,
    TorrentListFilter, TorrentRecord,
};
