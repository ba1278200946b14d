// src/worker.rs
//! Background task owning the record cache, indexes and name caches.
use log::{debug, error, info, warn};
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::Instant;

use crate::config::Config;
use crate::error::{Error, Result};
use crate::filter::ServerFilter;
use crate::index::{AutocompleteIndex, AutocompleteIndexer, LocaleIndexer, TagIndexer, TagSnapshot};
use crate::models::filter::FilterRequest;
use crate::models::server::ServerRecord;
use crate::names::{tidy_project_vars, NameCache};
use crate::protocol::{decode_server, FrameReader};
use crate::sort::sort_servers;
use crate::source::ListSource;

#[derive(Debug, Clone)]
pub enum WorkerRequest {
    /// Drop the cached records and download the full list again. Events
    /// from this download carry `generation`.
    QueryServers { generation: u64 },
    /// Replace records obtained outside the list stream.
    AddServers(Vec<ServerRecord>),
    Sort { id: u64, request: FilterRequest },
    Shutdown,
}

#[derive(Debug, Clone)]
pub enum WorkerEvent {
    AddServers { generation: u64, records: Vec<ServerRecord> },
    UpdateTags(TagSnapshot),
    UpdateAutocomplete(AutocompleteIndex),
    ServersDone { generation: u64 },
    FetchFailed { generation: u64, reason: String },
    SortedServers { id: u64, endpoints: Vec<String> },
}

enum FetchMessage {
    Batch(Vec<ServerRecord>),
    Failed(String),
    Done,
}

pub struct WorkerHandle {
    requests: mpsc::UnboundedSender<WorkerRequest>,
    task: JoinHandle<()>,
}

impl WorkerHandle {
    pub fn send(&self, request: WorkerRequest) -> Result<()> {
        self.requests.send(request).map_err(|_| Error::WorkerGone)
    }

    /// Asks the worker to stop; any running fetch is aborted.
    pub fn shutdown(&self) {
        if self.send(WorkerRequest::Shutdown).is_err() {
            debug!("Server worker already stopped");
        }
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

pub fn spawn_worker(
    source: Arc<dyn ListSource>,
    config: Config,
) -> (WorkerHandle, mpsc::UnboundedReceiver<WorkerEvent>) {
    let (request_tx, request_rx) = mpsc::unbounded_channel();
    let (event_tx, event_rx) = mpsc::unbounded_channel();

    let worker = Worker {
        source,
        config,
        events: event_tx,
        state: WorkerState::default(),
    };
    let task = tokio::spawn(worker.run(request_rx));

    (
        WorkerHandle {
            requests: request_tx,
            task,
        },
        event_rx,
    )
}

/// Record cache plus everything derived from it.
#[derive(Default)]
struct WorkerState {
    servers: BTreeMap<String, ServerRecord>,
    tags: TagIndexer,
    locales: LocaleIndexer,
    autocomplete: AutocompleteIndexer,
    names: NameCache,
}

struct IngestOutcome {
    tags_changed: bool,
    autocomplete_changed: bool,
}

impl WorkerState {
    fn reset_servers(&mut self) {
        self.servers.clear();
        self.names.clear();
    }

    fn ingest(&mut self, records: &mut [ServerRecord]) -> IngestOutcome {
        let mut outcome = IngestOutcome {
            tags_changed: false,
            autocomplete_changed: false,
        };

        for record in records.iter_mut() {
            tidy_project_vars(&mut record.data);

            outcome.tags_changed |= self.tags.add(record);
            outcome.tags_changed |= self.locales.add(record);
            outcome.autocomplete_changed |= self.autocomplete.add(record);

            self.names.update(record);
            self.servers.insert(record.end_point.clone(), record.clone());
        }

        outcome
    }

    fn tag_snapshot(&self) -> TagSnapshot {
        TagSnapshot {
            tags: self.tags.index().clone(),
            locales: self.locales.index().clone(),
        }
    }

    fn sort(&self, request: &FilterRequest) -> Vec<String> {
        let filter = ServerFilter::new(request);

        let mut servers: Vec<&ServerRecord> = self
            .servers
            .values()
            .filter(|record| filter.matches(record, &self.names))
            .collect();

        sort_servers(&mut servers, request, &self.names);

        servers.into_iter().map(|r| r.end_point.clone()).collect()
    }
}

struct Worker {
    source: Arc<dyn ListSource>,
    config: Config,
    events: mpsc::UnboundedSender<WorkerEvent>,
    state: WorkerState,
}

impl Worker {
    fn emit(&self, event: WorkerEvent) {
        if self.events.send(event).is_err() {
            debug!("Dropping worker event, nobody is listening");
        }
    }

    /// Records from a download are announced under its generation; records
    /// handed in by the caller are not.
    fn ingest(&mut self, mut records: Vec<ServerRecord>, announce: Option<u64>) {
        if records.is_empty() {
            return;
        }

        let outcome = self.state.ingest(&mut records);

        if let Some(generation) = announce {
            self.emit(WorkerEvent::AddServers { generation, records });
        }
        if outcome.tags_changed {
            self.emit(WorkerEvent::UpdateTags(self.state.tag_snapshot()));
        }
        if outcome.autocomplete_changed {
            self.emit(WorkerEvent::UpdateAutocomplete(self.state.autocomplete.index().clone()));
        }
    }

    async fn run(mut self, mut requests: mpsc::UnboundedReceiver<WorkerRequest>) {
        let (fetch_tx, mut fetch_rx) = mpsc::channel::<(u64, FetchMessage)>(16);
        let mut fetch_task: Option<JoinHandle<()>> = None;
        let mut generation = 0;

        loop {
            tokio::select! {
                request = requests.recv() => {
                    let Some(request) = request else {
                        break;
                    };

                    match request {
                        WorkerRequest::QueryServers { generation: requested } => {
                            if let Some(task) = fetch_task.take() {
                                debug!("Superseding running server list fetch");
                                task.abort();
                            }

                            generation = requested;
                            self.state.reset_servers();

                            fetch_task = Some(tokio::spawn(run_fetch(
                                self.source.clone(),
                                self.config.clone(),
                                generation,
                                fetch_tx.clone(),
                            )));
                        }
                        WorkerRequest::AddServers(records) => self.ingest(records, None),
                        WorkerRequest::Sort { id, request } => {
                            let endpoints = self.state.sort(&request);
                            debug!("Sort {} produced {} servers", id, endpoints.len());
                            self.emit(WorkerEvent::SortedServers { id, endpoints });
                        }
                        WorkerRequest::Shutdown => break,
                    }
                }
                Some((fetch_generation, message)) = fetch_rx.recv() => {
                    if fetch_generation != generation {
                        continue;
                    }

                    match message {
                        FetchMessage::Batch(records) => self.ingest(records, Some(generation)),
                        FetchMessage::Failed(reason) => {
                            self.emit(WorkerEvent::FetchFailed { generation, reason })
                        }
                        FetchMessage::Done => self.emit(WorkerEvent::ServersDone { generation }),
                    }
                }
            }
        }

        if let Some(task) = fetch_task {
            task.abort();
        }
        debug!("Server worker stopped");
    }
}

/// Downloads the list, retrying the whole stream after a fixed delay. Always
/// finishes with [`FetchMessage::Done`].
async fn run_fetch(
    source: Arc<dyn ListSource>,
    config: Config,
    generation: u64,
    tx: mpsc::Sender<(u64, FetchMessage)>,
) {
    let mut failures = 0;

    loop {
        match stream_servers(source.as_ref(), &config, generation, &tx).await {
            Ok(count) => {
                info!("Fetched {} servers", count);
                break;
            }
            Err(Error::WorkerGone) => return,
            Err(e) => {
                failures += 1;
                warn!("Fetching server list failed: {}", e);

                if failures >= config.fetch_retry_attempts {
                    error!("Giving up on the server list after {} attempts", failures);
                    let _ = tx.send((generation, FetchMessage::Failed(e.to_string()))).await;
                    break;
                }

                tokio::time::sleep(config.fetch_retry_delay()).await;
            }
        }
    }

    let _ = tx.send((generation, FetchMessage::Done)).await;
}

async fn flush(
    batch: &mut Vec<ServerRecord>,
    generation: u64,
    tx: &mpsc::Sender<(u64, FetchMessage)>,
) -> Result<usize> {
    if batch.is_empty() {
        return Ok(0);
    }

    let records = std::mem::take(batch);
    let count = records.len();

    tx.send((generation, FetchMessage::Batch(records)))
        .await
        .map_err(|_| Error::WorkerGone)?;

    Ok(count)
}

async fn stream_servers(
    source: &dyn ListSource,
    config: &Config,
    generation: u64,
    tx: &mpsc::Sender<(u64, FetchMessage)>,
) -> Result<usize> {
    let mut reader = FrameReader::new(source.open().await?);
    let mut batch = Vec::with_capacity(config.batch_size);
    let mut deadline = Instant::now() + config.batch_interval();
    let mut total = 0;

    loop {
        tokio::select! {
            frame = reader.next_frame() => {
                let Some(frame) = frame? else {
                    break;
                };

                batch.push(decode_server(&frame)?);

                if batch.len() >= config.batch_size {
                    total += flush(&mut batch, generation, tx).await?;
                }
            }
            _ = tokio::time::sleep_until(deadline) => {
                total += flush(&mut batch, generation, tx).await?;
                deadline = Instant::now() + config.batch_interval();
            }
        }
    }

    total += flush(&mut batch, generation, tx).await?;
    Ok(total)
}
