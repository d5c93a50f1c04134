//! Background analysis worker.
//!
//! One named thread owns the data source and the store and runs requests
//! in order. Submitting a request supersedes every earlier one: their cancel
//! tokens are tripped, and any response they still produce is dropped on the
//! receiving side.

use crate::domain::error::AnalyzerError;
use crate::domain::metrics::MetricsConfig;
use crate::domain::pipeline::{AnalysisOutcome, AnalysisPipeline, AnalysisRequest, CancelToken};
use crate::ports::data_port::DataPort;
use crate::ports::store_port::StorePort;
use std::sync::mpsc::{self, Receiver, Sender, TryRecvError};
use std::thread::{self, JoinHandle};
use tracing::{debug, info};

pub type RequestId = u64;

enum WorkerCommand {
    Analyze {
        id: RequestId,
        request: AnalysisRequest,
        cancel: CancelToken,
    },
    Shutdown,
}

#[derive(Debug)]
pub enum WorkerResponse {
    Completed {
        id: RequestId,
        outcome: Box<AnalysisOutcome>,
    },
    Failed {
        id: RequestId,
        error: AnalyzerError,
    },
}

impl WorkerResponse {
    pub fn id(&self) -> RequestId {
        match self {
            WorkerResponse::Completed { id, .. } | WorkerResponse::Failed { id, .. } => *id,
        }
    }
}

pub struct AnalysisWorker {
    commands: Sender<WorkerCommand>,
    responses: Receiver<WorkerResponse>,
    handle: Option<JoinHandle<()>>,
    next_id: RequestId,
    latest: Option<(RequestId, CancelToken)>,
}

impl AnalysisWorker {
    pub fn spawn(
        data: Box<dyn DataPort + Send>,
        store: Box<dyn StorePort + Send>,
        config: MetricsConfig,
    ) -> Result<Self, AnalyzerError> {
        let (cmd_tx, cmd_rx) = mpsc::channel();
        let (resp_tx, resp_rx) = mpsc::channel();

        let handle = thread::Builder::new()
            .name("analysis-worker".into())
            .spawn(move || worker_loop(cmd_rx, resp_tx, data, store, config))?;

        Ok(Self {
            commands: cmd_tx,
            responses: resp_rx,
            handle: Some(handle),
            next_id: 0,
            latest: None,
        })
    }

    /// Queue `request`, cancelling whatever was submitted before it.
    pub fn submit(&mut self, request: AnalysisRequest) -> Result<RequestId, AnalyzerError> {
        if let Some((_, cancel)) = self.latest.take() {
            cancel.cancel();
        }

        self.next_id += 1;
        let id = self.next_id;
        let cancel = CancelToken::new();

        self.commands
            .send(WorkerCommand::Analyze {
                id,
                request,
                cancel: cancel.clone(),
            })
            .map_err(|_| AnalyzerError::Cancelled)?;

        self.latest = Some((id, cancel));
        Ok(id)
    }

    pub fn latest_id(&self) -> Option<RequestId> {
        self.latest.as_ref().map(|(id, _)| *id)
    }

    fn is_current(&self, response: &WorkerResponse) -> bool {
        self.latest_id() == Some(response.id())
    }

    /// Block until the response for the latest request arrives. Returns
    /// `None` once the worker has stopped.
    pub fn recv(&self) -> Option<WorkerResponse> {
        loop {
            let response = self.responses.recv().ok()?;
            if self.is_current(&response) {
                return Some(response);
            }
            debug!(id = response.id(), "discarding superseded response");
        }
    }

    /// Non-blocking variant of [`recv`](Self::recv).
    pub fn try_recv(&self) -> Option<WorkerResponse> {
        loop {
            match self.responses.try_recv() {
                Ok(response) if self.is_current(&response) => return Some(response),
                Ok(response) => debug!(id = response.id(), "discarding superseded response"),
                Err(TryRecvError::Empty | TryRecvError::Disconnected) => return None,
            }
        }
    }

    pub fn shutdown(mut self) {
        self.stop();
    }

    fn stop(&mut self) {
        if let Some((_, cancel)) = &self.latest {
            cancel.cancel();
        }
        let _ = self.commands.send(WorkerCommand::Shutdown);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for AnalysisWorker {
    fn drop(&mut self) {
        self.stop();
    }
}

fn worker_loop(
    rx: Receiver<WorkerCommand>,
    tx: Sender<WorkerResponse>,
    data: Box<dyn DataPort + Send>,
    store: Box<dyn StorePort + Send>,
    config: MetricsConfig,
) {
    info!(source = data.name(), "analysis worker started");
    let pipeline = AnalysisPipeline::new(data.as_ref(), store.as_ref()).with_config(config);

    loop {
        match rx.recv() {
            Ok(WorkerCommand::Shutdown) | Err(_) => break,
            Ok(WorkerCommand::Analyze { id, request, cancel }) => {
                if cancel.is_cancelled() {
                    debug!(id, instrument = %request.instrument, "skipping superseded request");
                    continue;
                }
                let response = match pipeline.run_cancellable(&request, &cancel) {
                    Ok(outcome) => WorkerResponse::Completed {
                        id,
                        outcome: Box::new(outcome),
                    },
                    Err(error) => WorkerResponse::Failed { id, error },
                };
                if tx.send(response).is_err() {
                    break;
                }
            }
        }
    }

    info!("analysis worker stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::bar_series::BarSeries;
    use crate::domain::ohlcv::RawBar;
    use chrono::NaiveDate;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    struct SlowData {
        delay: Duration,
        rows: Vec<RawBar>,
    }

    impl DataPort for SlowData {
        fn fetch_ohlcv(
            &self,
            _instrument: &str,
            _start_date: NaiveDate,
            _end_date: NaiveDate,
        ) -> Result<Vec<RawBar>, AnalyzerError> {
            thread::sleep(self.delay);
            Ok(self.rows.clone())
        }

        fn name(&self) -> &str {
            "slow"
        }
    }

    #[derive(Clone, Default)]
    struct SharedStore(Arc<Mutex<Vec<String>>>);

    impl StorePort for SharedStore {
        fn upsert(&self, series: &BarSeries) -> Result<usize, AnalyzerError> {
            self.0.lock().unwrap().push(series.instrument().to_string());
            Ok(series.len())
        }
    }

    fn rows() -> Vec<RawBar> {
        [100.0, 101.0, 99.5, 102.0]
            .iter()
            .enumerate()
            .map(|(i, &p)| RawBar {
                date: NaiveDate::from_ymd_opt(2024, 5, (i + 1) as u32).unwrap(),
                open: p,
                high: p,
                low: p,
                close: p,
                adj_close: p,
                volume: 10,
            })
            .collect()
    }

    fn request(instrument: &str) -> AnalysisRequest {
        AnalysisRequest::parse(instrument, "2024-05-01", "2024-06-01").unwrap()
    }

    fn worker(delay_ms: u64, rows: Vec<RawBar>, store: SharedStore) -> AnalysisWorker {
        let data = SlowData {
            delay: Duration::from_millis(delay_ms),
            rows,
        };
        AnalysisWorker::spawn(Box::new(data), Box::new(store), MetricsConfig::default()).unwrap()
    }

    #[test]
    fn completes_a_request() {
        let store = SharedStore::default();
        let mut w = worker(0, rows(), store.clone());
        let id = w.submit(request("aapl")).unwrap();

        match w.recv() {
            Some(WorkerResponse::Completed { id: got, outcome }) => {
                assert_eq!(got, id);
                assert_eq!(outcome.series.instrument(), "AAPL");
                assert_eq!(outcome.rows_persisted, 4);
            }
            other => panic!("unexpected response: {other:?}"),
        }
        assert_eq!(store.0.lock().unwrap().as_slice(), ["AAPL"]);
        w.shutdown();
    }

    #[test]
    fn reports_failures() {
        let mut w = worker(0, vec![], SharedStore::default());
        let id = w.submit(request("MSFT")).unwrap();

        match w.recv() {
            Some(WorkerResponse::Failed { id: got, error }) => {
                assert_eq!(got, id);
                assert!(matches!(error, AnalyzerError::NoData { .. }));
            }
            other => panic!("unexpected response: {other:?}"),
        }
    }

    #[test]
    fn newer_submission_supersedes_older() {
        let store = SharedStore::default();
        let mut w = worker(50, rows(), store.clone());
        let first = w.submit(request("OLD")).unwrap();
        let second = w.submit(request("NEW")).unwrap();
        assert!(second > first);

        match w.recv() {
            Some(WorkerResponse::Completed { id, outcome }) => {
                assert_eq!(id, second);
                assert_eq!(outcome.series.instrument(), "NEW");
            }
            other => panic!("unexpected response: {other:?}"),
        }
        assert_eq!(store.0.lock().unwrap().as_slice(), ["NEW"]);
    }

    #[test]
    fn try_recv_is_empty_before_completion() {
        let mut w = worker(200, rows(), SharedStore::default());
        w.submit(request("SLOW")).unwrap();
        assert!(w.try_recv().is_none());
    }

    #[test]
    fn drop_joins_the_thread() {
        let mut w = worker(10, rows(), SharedStore::default());
        w.submit(request("X")).unwrap();
        drop(w);
    }
}
