// src/service.rs
use log::{debug, error, info, warn};
use parking_lot::{Mutex, RwLock};
use reqwest::Client;
use std::collections::BTreeSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use tokio::sync::{mpsc, watch};

use crate::config::Config;
use crate::error::{Error, Result};
use crate::index::{AutocompleteIndex, TagSnapshot};
use crate::models::filter::{FilterRequest, ListType, ServerFilters, ServerTags, SortOrder};
use crate::models::pins::PinConfig;
use crate::models::server::{PingValue, ServerRecord};
use crate::names::tidy_project_vars;
use crate::source::{fetch_single_server, HttpListSource, ListSource, PinStore};
use crate::storage::ServerStore;
use crate::worker::{spawn_worker, WorkerEvent, WorkerHandle, WorkerRequest};

/// Result of one sort request, in display order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SortedServers {
    pub id: u64,
    pub endpoints: Vec<String>,
}

#[derive(Default)]
struct SortState {
    in_flight: Option<u64>,
    queued: Option<FilterRequest>,
}

struct Inner {
    config: Config,
    client: Client,
    store: ServerStore,
    /// Download whose records the store holds.
    fetch_generation: Mutex<u64>,
    worker: WorkerHandle,
    pins: PinStore,
    sort_state: Mutex<SortState>,
    next_sort_id: AtomicU64,
    last_request: RwLock<Option<FilterRequest>>,
    tags: watch::Sender<TagSnapshot>,
    autocomplete: watch::Sender<AutocompleteIndex>,
    sorted: watch::Sender<SortedServers>,
    loading: watch::Sender<bool>,
}

impl Inner {
    fn dispatch_sort(&self, state: &mut SortState, request: FilterRequest) -> Result<u64> {
        let id = self.next_sort_id.fetch_add(1, Ordering::SeqCst) + 1;
        state.in_flight = Some(id);
        self.worker.send(WorkerRequest::Sort { id, request })?;
        Ok(id)
    }

    fn request_sort(&self, request: FilterRequest, interactive: bool) -> Result<Option<u64>> {
        let mut state = self.sort_state.lock();
        *self.last_request.write() = Some(request.clone());

        if !interactive && state.in_flight.is_some() {
            // latest wins
            state.queued = Some(request);
            return Ok(None);
        }

        state.queued = None;
        self.dispatch_sort(&mut state, request).map(Some)
    }

    fn resort(&self) {
        let request = self.last_request.read().clone();

        if let Some(request) = request {
            if let Err(e) = self.request_sort(request, false) {
                error!("Failed to re-sort servers: {}", e);
            }
        }
    }

    fn finish_sort(&self, id: u64) {
        let mut state = self.sort_state.lock();

        if state.in_flight != Some(id) {
            return;
        }
        state.in_flight = None;

        if let Some(request) = state.queued.take() {
            if let Err(e) = self.dispatch_sort(&mut state, request) {
                error!("Failed to dispatch queued sort: {}", e);
            }
        }
    }

    fn handle_event(&self, event: WorkerEvent) {
        match event {
            WorkerEvent::AddServers { generation, records } => {
                {
                    let current = self.fetch_generation.lock();
                    if *current != generation {
                        debug!("Dropping {} servers from superseded fetch {}", records.len(), generation);
                        return;
                    }

                    debug!("Received {} servers", records.len());
                    self.store.upsert(records);
                }
                self.resort();
            }
            WorkerEvent::UpdateTags(snapshot) => {
                self.tags.send_replace(snapshot);
            }
            WorkerEvent::UpdateAutocomplete(index) => {
                self.autocomplete.send_replace(index);
            }
            WorkerEvent::ServersDone { generation } => {
                if *self.fetch_generation.lock() != generation {
                    return;
                }

                info!("Server list loaded, {} servers", self.store.len());
                self.loading.send_replace(false);
                self.resort();
            }
            WorkerEvent::FetchFailed { generation, reason } => {
                warn!("Server list unavailable (fetch {}): {}", generation, reason);
            }
            WorkerEvent::SortedServers { id, endpoints } => {
                self.sorted.send_replace(SortedServers { id, endpoints });
                self.finish_sort(id);
            }
        }
    }
}

async fn pump_events(inner: Weak<Inner>, mut events: mpsc::UnboundedReceiver<WorkerEvent>) {
    while let Some(event) = events.recv().await {
        let Some(inner) = inner.upgrade() else {
            break;
        };

        inner.handle_event(event);
    }

    debug!("Worker event pump stopped");
}

/// Cheap to clone; all clones share one worker. Must be created inside a
/// tokio runtime.
#[derive(Clone)]
pub struct ServersService {
    inner: Arc<Inner>,
}

impl ServersService {
    /// Streams the list over HTTP from `config.servers_stream_url`.
    pub fn start(config: Config) -> Self {
        let client = Client::new();
        let source = Arc::new(HttpListSource::new(
            client.clone(),
            config.servers_stream_url.clone(),
        ));

        Self::build(config, client, source)
    }

    pub fn with_source(config: Config, source: Arc<dyn ListSource>) -> Self {
        Self::build(config, Client::new(), source)
    }

    fn build(config: Config, client: Client, source: Arc<dyn ListSource>) -> Self {
        let (worker, events) = spawn_worker(source, config.clone());

        let inner = Arc::new(Inner {
            pins: PinStore::new(client.clone(), config.pins_url.clone()),
            config,
            client,
            store: ServerStore::new(),
            fetch_generation: Mutex::new(0),
            worker,
            sort_state: Mutex::new(SortState::default()),
            next_sort_id: AtomicU64::new(0),
            last_request: RwLock::new(None),
            tags: watch::channel(TagSnapshot::default()).0,
            autocomplete: watch::channel(AutocompleteIndex::default()).0,
            sorted: watch::channel(SortedServers::default()).0,
            loading: watch::channel(false).0,
        });

        tokio::spawn(pump_events(Arc::downgrade(&inner), events));

        Self { inner }
    }

    pub fn config(&self) -> &Config {
        &self.inner.config
    }

    /// Drops every known record and downloads the list again. Batches still
    /// in flight from an earlier download are discarded on arrival.
    pub fn refresh_servers(&self) -> Result<()> {
        let mut generation = self.inner.fetch_generation.lock();
        *generation += 1;

        self.inner.loading.send_replace(true);
        self.inner.store.clear();
        self.inner.worker.send(WorkerRequest::QueryServers {
            generation: *generation,
        })
    }

    /// Interactive requests always dispatch. Other requests made while a sort
    /// is outstanding are queued, and only the latest queued one runs.
    /// Returns the id the result will carry, or `None` when queued.
    pub fn request_sort(&self, request: FilterRequest, interactive: bool) -> Result<Option<u64>> {
        self.inner.request_sort(request, interactive)
    }

    /// Looks up one server through the JSON endpoint and adds it to the
    /// cache. Lookup failures are logged and give `None`.
    pub async fn load_server(&self, address: &str) -> Result<Option<ServerRecord>> {
        let Some(mut record) = fetch_single_server(&self.inner.client, &self.inner.config, address).await else {
            return Ok(None);
        };

        tidy_project_vars(&mut record.data);

        self.inner.store.upsert([record.clone()]);
        self.inner.worker.send(WorkerRequest::AddServers(vec![record.clone()]))?;

        Ok(Some(record))
    }

    /// Attaches a ping result and hands the updated record to the worker so
    /// ping filters and ordering see it.
    pub fn set_ping(&self, end_point: &str, ping: PingValue) -> Result<bool> {
        if !self.inner.store.set_ping(end_point, ping) {
            return Ok(false);
        }

        if let Some(record) = self.inner.store.get(end_point) {
            self.inner.worker.send(WorkerRequest::AddServers(vec![record]))?;
        }

        Ok(true)
    }

    pub async fn refresh_pins(&self) -> Result<PinConfig> {
        self.inner.pins.refresh().await
    }

    pub fn set_pin_config(&self, config: PinConfig) {
        self.inner.pins.set(config);
    }

    pub fn pin_config(&self) -> PinConfig {
        self.inner.pins.current()
    }

    pub fn subscribe_servers(&self) -> mpsc::UnboundedReceiver<ServerRecord> {
        self.inner.store.subscribe()
    }

    pub fn get_server(&self, end_point: &str) -> Option<ServerRecord> {
        self.inner.store.get(end_point)
    }

    pub fn server_count(&self) -> usize {
        self.inner.store.len()
    }

    /// Records for a sort result, in order. Endpoints no longer known are
    /// skipped.
    pub fn resolve(&self, sorted: &SortedServers) -> Vec<ServerRecord> {
        sorted
            .endpoints
            .iter()
            .filter_map(|end_point| self.inner.store.get(end_point))
            .collect()
    }

    pub fn tags(&self) -> watch::Receiver<TagSnapshot> {
        self.inner.tags.subscribe()
    }

    pub fn autocomplete(&self) -> watch::Receiver<AutocompleteIndex> {
        self.inner.autocomplete.subscribe()
    }

    pub fn sorted(&self) -> watch::Receiver<SortedServers> {
        self.inner.sorted.subscribe()
    }

    pub fn loading(&self) -> watch::Receiver<bool> {
        self.inner.loading.subscribe()
    }

    pub fn shutdown(&self) {
        self.inner.worker.shutdown();
    }
}

#[derive(Debug, Clone, Default)]
struct FiltersState {
    filters: ServerFilters,
    tags: ServerTags,
    sort_order: SortOrder,
    list_type: ListType,
    list_endpoints: Option<BTreeSet<String>>,
}

struct FiltersInner {
    servers: ServersService,
    state: RwLock<FiltersState>,
    debounce: mpsc::UnboundedSender<()>,
}

impl FiltersInner {
    fn current_request(&self) -> FilterRequest {
        let state = self.state.read();

        FilterRequest {
            filters: state.filters.clone(),
            tags: state.tags.clone(),
            sort_order: state.sort_order,
            pin_config: self.servers.pin_config(),
            list_type: state.list_type,
            list_endpoints: state.list_endpoints.clone(),
        }
    }

    fn apply(&self) -> Result<Option<u64>> {
        self.servers.request_sort(self.current_request(), true)
    }
}

/// Waits for input to settle: every poke restarts the timer, and the
/// request goes out once no poke arrived for the whole window.
async fn debounce_loop(inner: Weak<FiltersInner>, mut pokes: mpsc::UnboundedReceiver<()>, window: std::time::Duration) {
    while pokes.recv().await.is_some() {
        loop {
            tokio::select! {
                poke = pokes.recv() => {
                    if poke.is_none() {
                        return;
                    }
                }
                _ = tokio::time::sleep(window) => break,
            }
        }

        let Some(inner) = inner.upgrade() else {
            return;
        };

        if let Err(e) = inner.apply() {
            error!("Failed to apply filters: {}", e);
        }
    }
}

/// Current filter state of one server list view.
#[derive(Clone)]
pub struct FiltersService {
    inner: Arc<FiltersInner>,
}

impl FiltersService {
    pub fn new(servers: ServersService) -> Self {
        let window = servers.config().filter_debounce();
        let (debounce, pokes) = mpsc::unbounded_channel();

        let inner = Arc::new(FiltersInner {
            servers,
            state: RwLock::new(FiltersState::default()),
            debounce,
        });

        tokio::spawn(debounce_loop(Arc::downgrade(&inner), pokes, window));

        Self { inner }
    }

    pub fn filters(&self) -> ServerFilters {
        self.inner.state.read().filters.clone()
    }

    /// Search text and checkbox changes; applied after the debounce window.
    pub fn set_filters(&self, filters: ServerFilters) -> Result<()> {
        self.inner.state.write().filters = filters;
        self.inner
            .debounce
            .send(())
            .map_err(|_| Error::WorkerGone)
    }

    pub fn set_tags(&self, tags: ServerTags) -> Result<Option<u64>> {
        self.inner.state.write().tags = tags;
        self.inner.apply()
    }

    pub fn set_sort_order(&self, sort_order: SortOrder) -> Result<Option<u64>> {
        self.inner.state.write().sort_order = sort_order;
        self.inner.apply()
    }

    /// Switches list; `endpoints` is the membership set for the favorites and
    /// history lists.
    pub fn set_list(&self, list_type: ListType, endpoints: Option<BTreeSet<String>>) -> Result<Option<u64>> {
        {
            let mut state = self.inner.state.write();
            state.list_type = list_type;
            state.list_endpoints = endpoints;
        }
        self.inner.apply()
    }

    pub fn current_request(&self) -> FilterRequest {
        self.inner.current_request()
    }

    /// Dispatches the current state right away, skipping the debounce.
    pub fn apply_now(&self) -> Result<Option<u64>> {
        self.inner.apply()
    }
}
