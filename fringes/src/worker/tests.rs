use std::sync::Mutex;
use std::time::Duration;

use tokio::sync::mpsc::unbounded_channel;
use tokio::time::timeout;

use super::*;
use crate::config::DetectionMethod;
use crate::testing::{init_tracing, vertical_fringes};

const WAIT: Duration = Duration::from_secs(30);

fn small_parameters() -> Parameters {
    Parameters {
        min_sigma: 1.0,
        max_sigma: 2.0,
        transform_size: 0,
        ..Default::default()
    }
}

fn frame() -> Buffer2<f64> {
    vertical_fringes(32, 32, 4.25, 0.1, 1)
}

/// Worker whose callback reports the frame id and then blocks until released.
fn gated_worker(params: Parameters) -> (Worker, UnboundedReceiver<Report>, std::sync::mpsc::Sender<()>) {
    let (report_tx, report_rx) = unbounded_channel();
    let (gate_tx, gate_rx) = std::sync::mpsc::channel::<()>();
    let gate_rx = Mutex::new(gate_rx);
    let worker = Worker::new(params, move |report| {
        let _ = report_tx.send(report);
        let _ = gate_rx.lock().unwrap().recv();
    })
    .unwrap();
    (worker, report_rx, gate_tx)
}

async fn next_report(rx: &mut UnboundedReceiver<Report>) -> Report {
    timeout(WAIT, rx.recv())
        .await
        .expect("timed out waiting for a report")
        .expect("worker stopped")
}

#[tokio::test]
async fn test_worker_reports_analysis() {
    init_tracing();
    let (tx, mut rx) = unbounded_channel();
    let mut worker = Worker::new(small_parameters(), move |report| {
        let _ = tx.send(report);
    })
    .unwrap();

    let id = worker.submit(frame());
    let report = next_report(&mut rx).await;
    assert_eq!(report.frame_id, id);
    assert_eq!(report.analysis.log_power.dimensions(), (32, 32));
    assert_eq!(*report.parameters, small_parameters());

    worker.exit().await;
    assert!(!worker.is_running());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_latest_frame_wins() {
    let (mut worker, mut rx, gate) = gated_worker(small_parameters());

    let first = worker.submit(frame());
    assert_eq!(next_report(&mut rx).await.frame_id, first);

    // the worker is blocked in the callback: these pile up in the slot
    let _second = worker.submit(frame());
    let _third = worker.submit(frame());
    let last = worker.submit(frame());
    assert_eq!(worker.dropped_frames(), 2);

    gate.send(()).unwrap();
    assert_eq!(next_report(&mut rx).await.frame_id, last);
    gate.send(()).unwrap();

    // nothing else was queued
    assert!(timeout(Duration::from_millis(200), rx.recv()).await.is_err());

    worker.exit().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_parameters_snapshot_per_run() {
    let (mut worker, mut rx, gate) = gated_worker(small_parameters());

    let first = worker.submit(frame());
    let report = next_report(&mut rx).await;
    assert_eq!(report.frame_id, first);

    // update while the first run is still in its callback
    let updated = Parameters {
        method: DetectionMethod::Log,
        num_sigma: 3,
        ..small_parameters()
    };
    worker.update_parameters(updated.clone()).unwrap();
    let second = worker.submit(frame());

    assert_eq!(report.parameters.method, DetectionMethod::Dog);
    gate.send(()).unwrap();

    let report = next_report(&mut rx).await;
    assert_eq!(report.frame_id, second);
    assert_eq!(*report.parameters, updated);
    gate.send(()).unwrap();

    worker.exit().await;
}

#[tokio::test]
async fn test_invalid_update_is_rejected() {
    let (tx, mut rx) = unbounded_channel();
    let mut worker = Worker::new(small_parameters(), move |report| {
        let _ = tx.send(report);
    })
    .unwrap();

    let err = worker
        .update_parameters(Parameters {
            min_sigma: -1.0,
            ..small_parameters()
        })
        .unwrap_err();
    assert!(matches!(err, ConfigError::NonPositive { name: "min_sigma", .. }));

    worker.submit(frame());
    let report = next_report(&mut rx).await;
    assert_eq!(*report.parameters, small_parameters());

    worker.exit().await;
}

#[tokio::test]
async fn test_invalid_initial_parameters() {
    let result = Worker::new(
        Parameters {
            threshold: 0.0,
            ..Default::default()
        },
        |_| {},
    );
    assert!(result.is_err());
}

#[tokio::test]
async fn test_exit_without_frames() {
    let mut worker = Worker::new(small_parameters(), |_| {}).unwrap();
    worker.exit().await;
    assert!(!worker.is_running());
    // a second exit is harmless
    worker.exit().await;
}
