use anyhow::{anyhow, Result};
use ndarray::Array2;
use std::io::Write;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use flowguard_lib::classifier::{InferenceEngine, ModelOutput};
use flowguard_lib::config::DetectorConfig;
use flowguard_lib::processor::{AlertLog, Detector, Normalizer, ReportSink, Scaler, StreamMonitor};
use flowguard_lib::{PredictionResult, RawFeatures, Severity};

const CLASSES: [&str; 4] = ["BenignTraffic", "DDoS-ICMP_Flood", "VulnerabilityScan", "Recon-PingSweep"];

/// Picks the output from the `kind` feature and encodes the sample id in a
/// small probability mass so ordering can be checked on the results.
struct StubModel;

impl InferenceEngine for StubModel {
    fn infer(&self, input: &Array2<f32>) -> Result<ModelOutput> {
        let row = input.row(0);
        let (id, kind) = (row[0], row[1] as i32);
        let tag = id * 1e-4;
        let probabilities = match kind {
            0 => vec![0.98 - tag, tag, 0.01, 0.01],
            1 => vec![0.05, 0.85 - tag, 0.05 + tag, 0.05],
            2 => vec![0.05, tag, 0.85 - tag, 0.10],
            3 => vec![0.1, 0.2, 0.3 - tag, 0.4 + tag],
            5 => {
                thread::sleep(Duration::from_millis(25));
                vec![0.98 - tag, tag, 0.01, 0.01]
            }
            7 => panic!("engine blew up on {}", id),
            _ => return Err(anyhow!("corrupt sample {}", id)),
        };
        Ok(ModelOutput { logits: probabilities.clone(), probabilities })
    }
}

#[derive(Clone, Default)]
struct SharedBuf(Arc<Mutex<Vec<u8>>>);

impl SharedBuf {
    fn text(&self) -> String {
        String::from_utf8(self.0.lock().unwrap().clone()).unwrap()
    }
}

impl Write for SharedBuf {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

struct Harness {
    monitor: StreamMonitor,
    output: SharedBuf,
    alert_path: std::path::PathBuf,
    _dir: tempfile::TempDir,
}

fn harness() -> Harness {
    let dir = tempfile::tempdir().unwrap();
    let alert_path = dir.path().join("attack_log.json");
    let output = SharedBuf::default();

    let normalizer = Normalizer::new(vec!["id".into(), "kind".into()], Box::new(Scaler::Identity));
    let classes = CLASSES.iter().map(|s| s.to_string()).collect();
    let detector = Detector::new(normalizer, Box::new(StubModel), classes, &DetectorConfig::default());

    let monitor = StreamMonitor::with_sink(
        detector,
        AlertLog::new(&alert_path),
        ReportSink::from_writer(output.clone()),
        Duration::from_millis(10),
    );
    Harness { monitor, output, alert_path, _dir: dir }
}

fn sample(id: usize, kind: i32) -> RawFeatures {
    [("id".to_string(), id as f64), ("kind".to_string(), kind as f64)].into_iter().collect()
}

fn decoded_id(r: &PredictionResult) -> usize {
    let p = match r.predicted_class.as_str() {
        "BenignTraffic" => r.all_probabilities[1],
        "DDoS-ICMP_Flood" => r.all_probabilities[2] - 0.05,
        "VulnerabilityScan" => r.all_probabilities[1],
        _ => r.all_probabilities[3] - 0.4,
    };
    (p * 1e4).round() as usize
}

#[test]
fn drained_results_match_enqueue_order() {
    let mut h = harness();
    h.monitor.start().unwrap();

    let n = 50;
    for id in 0..n {
        h.monitor.enqueue(sample(id, (id % 3) as i32)).unwrap();
    }
    assert_eq!(h.monitor.drain(), 0);
    assert_eq!(h.monitor.pending(), 0);

    let results = h.monitor.results().unwrap();
    assert_eq!(results.len(), n);
    let ids: Vec<usize> = results.iter().map(decoded_id).collect();
    assert_eq!(ids, (0..n).collect::<Vec<_>>());

    let stats = h.monitor.statistics().unwrap();
    assert_eq!(stats.total_predictions, n as u64);
    h.monitor.stop();
    h.monitor.join();
}

#[test]
fn routes_each_sample_to_one_bucket_and_logs_critical_only() {
    let mut h = harness();
    h.monitor.start().unwrap();

    h.monitor.enqueue(sample(1, 0)).unwrap(); // benign
    h.monitor.enqueue(sample(2, 1)).unwrap(); // DDoS at 0.85
    h.monitor.enqueue(sample(3, 2)).unwrap(); // low-threat scan at 0.85
    h.monitor.enqueue(sample(4, 3)).unwrap(); // low confidence
    h.monitor.drain();
    h.monitor.stop();
    h.monitor.join();

    let severities: Vec<Severity> = h.monitor.results().unwrap().iter().map(|r| r.severity()).collect();
    assert_eq!(
        severities,
        vec![Severity::Normal, Severity::Critical, Severity::Suspicious, Severity::LowRisk]
    );

    let out = h.output.text();
    assert!(out.contains("✅ NORMAL TRAFFIC: BenignTraffic"));
    assert!(out.contains("🚨 CRITICAL ATTACK: DDoS-ICMP_Flood"));
    assert!(out.contains("⚠️ SUSPICIOUS ACTIVITY: VulnerabilityScan"));
    assert!(out.contains("🔍 LOW RISK: Recon-PingSweep"));

    let alerts = std::fs::read_to_string(&h.alert_path).unwrap();
    let lines: Vec<&str> = alerts.lines().collect();
    assert_eq!(lines.len(), 1);
    let logged: PredictionResult = serde_json::from_str(lines[0]).unwrap();
    assert_eq!(logged.predicted_class, "DDoS-ICMP_Flood");
    assert!(logged.is_attack && logged.is_ddos);
}

#[test]
fn bad_sample_is_reported_and_stream_continues() {
    let mut h = harness();
    h.monitor.start().unwrap();

    h.monitor.enqueue(sample(1, 0)).unwrap();
    h.monitor.enqueue(sample(2, 9)).unwrap();
    h.monitor.enqueue(sample(3, 0)).unwrap();
    assert_eq!(h.monitor.drain(), 0);

    let results = h.monitor.results().unwrap();
    assert_eq!(results.len(), 2);
    assert_eq!(results.iter().map(decoded_id).collect::<Vec<_>>(), vec![1, 3]);
    assert!(h.output.text().contains("Processing error: corrupt sample 2"));
    // failed samples are not counted as predictions
    assert_eq!(h.monitor.statistics().unwrap().total_predictions, 2);
}

#[test]
fn stop_is_idempotent_and_leaves_queue_alone() {
    let mut h = harness();
    assert!(!h.monitor.is_running());
    h.monitor.start().unwrap();
    assert!(h.monitor.start().is_err());

    h.monitor.stop();
    h.monitor.stop();
    h.monitor.join();
    assert!(!h.monitor.is_running());

    h.monitor.enqueue(sample(1, 0)).unwrap();
    // not running: drain returns at once with the sample still queued
    assert_eq!(h.monitor.drain(), 1);
    assert!(h.monitor.results().unwrap().is_empty());

    // a restarted worker picks it up
    h.monitor.start().unwrap();
    assert_eq!(h.monitor.drain(), 0);
    assert_eq!(h.monitor.results().unwrap().len(), 1);
}

#[test]
fn finalize_writes_aggregate_report() {
    let mut h = harness();
    h.monitor.start().unwrap();
    for (id, kind) in [(1, 1), (2, 0), (3, 1), (4, 2)] {
        h.monitor.enqueue(sample(id, kind)).unwrap();
    }
    h.monitor.drain();
    h.monitor.stop();
    h.monitor.join();

    let report = h.monitor.finalize().unwrap();
    assert_eq!(report.total(), 4);
    assert_eq!(report.count(Severity::Critical), 2);
    assert_eq!(report.critical_by_class.get("DDoS-ICMP_Flood"), Some(&2));

    let out = h.output.text();
    assert!(out.contains("=== ANALYSIS RESULTS ==="));
    assert!(out.contains("Critical attack rate: 50.00%"));
    assert!(out.contains("DDoS-ICMP_Flood: 2 occurrences"));
    assert!(out.contains("Sample 4: ⚠️ SUSPICIOUS ACTIVITY"));
}

#[test]
fn interrupt_cuts_drain_short() {
    let mut h = harness();
    h.monitor.start().unwrap();
    for id in 0..40 {
        h.monitor.enqueue(sample(id, 5)).unwrap();
    }

    let interrupt = Arc::new(AtomicBool::new(false));
    let flag = interrupt.clone();
    let ctrl_c = thread::spawn(move || {
        thread::sleep(Duration::from_millis(100));
        flag.store(true, Ordering::SeqCst);
    });

    let t0 = Instant::now();
    let left = h.monitor.drain_until(&interrupt);
    ctrl_c.join().unwrap();

    // forty samples at 25 ms each would take a full second
    assert!(left > 0, "drain waited for the whole queue");
    assert!(t0.elapsed() < Duration::from_millis(800));

    h.monitor.stop();
    h.monitor.join();
    let report = h.monitor.finalize().unwrap();
    assert!(report.total() < 40);
}

#[test]
fn panicking_engine_does_not_wedge_drain() {
    let mut h = harness();
    h.monitor.start().unwrap();

    h.monitor.enqueue(sample(1, 0)).unwrap();
    h.monitor.enqueue(sample(2, 7)).unwrap();
    h.monitor.enqueue(sample(3, 0)).unwrap();
    assert_eq!(h.monitor.drain(), 0);

    let results = h.monitor.results().unwrap();
    assert_eq!(results.iter().map(decoded_id).collect::<Vec<_>>(), vec![1, 3]);
    assert!(h.output.text().contains("Processing error: Prediction panicked: engine blew up on 2"));
    assert_eq!(h.monitor.statistics().unwrap().total_predictions, 2);
}
