//! The queue depth gauge settles at zero once the worker has caught up.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, OnceLock};

use metrics::{
    Counter, Gauge, GaugeFn, Histogram, Key, KeyName, Metadata, Recorder, SharedString, Unit,
};
use synchrolog::delivery::{DeliveryQueue, RemoteSink};
use synchrolog::events::{Endpoint, Envelope, Event, EventBody, LogEvent};

mod common;

use common::RecordingTransport;

const PRODUCERS: usize = 8;
const PER_PRODUCER: usize = 50;

/// Last value written to a gauge, stored as `f64` bits.
#[derive(Default)]
struct LastValue(AtomicU64);

impl LastValue {
    fn get(&self) -> f64 {
        f64::from_bits(self.0.load(Ordering::Acquire))
    }
}

impl GaugeFn for LastValue {
    fn increment(&self, value: f64) {
        self.set(self.get() + value);
    }

    fn decrement(&self, value: f64) {
        self.set(self.get() - value);
    }

    fn set(&self, value: f64) {
        self.0.store(value.to_bits(), Ordering::Release);
    }
}

/// Recorder that only keeps the queue depth gauge.
struct DepthRecorder {
    depth: Arc<LastValue>,
}

impl Recorder for DepthRecorder {
    fn describe_counter(&self, _: KeyName, _: Option<Unit>, _: SharedString) {}
    fn describe_gauge(&self, _: KeyName, _: Option<Unit>, _: SharedString) {}
    fn describe_histogram(&self, _: KeyName, _: Option<Unit>, _: SharedString) {}

    fn register_counter(&self, _: &Key, _: &Metadata<'_>) -> Counter {
        Counter::noop()
    }

    fn register_gauge(&self, key: &Key, _: &Metadata<'_>) -> Gauge {
        if key.name() == "synchrolog_queue_depth" {
            Gauge::from_arc(Arc::clone(&self.depth))
        } else {
            Gauge::noop()
        }
    }

    fn register_histogram(&self, _: &Key, _: &Metadata<'_>) -> Histogram {
        Histogram::noop()
    }
}

fn depth_gauge() -> Arc<LastValue> {
    static DEPTH: OnceLock<Arc<LastValue>> = OnceLock::new();
    DEPTH
        .get_or_init(|| {
            let depth = Arc::new(LastValue::default());
            let recorder = DepthRecorder {
                depth: Arc::clone(&depth),
            };
            metrics::set_global_recorder(recorder).unwrap();
            depth
        })
        .clone()
}

fn envelope(message: String) -> Envelope {
    Envelope {
        endpoint: Endpoint::TrackBackend,
        body: EventBody {
            timestamp: "2026-01-01T00:00:00Z".into(),
            anonymous_id: "visitor".into(),
            user_id: None,
            source: "backend".into(),
            event: Event::Log {
                log: LogEvent {
                    timestamp: "2026-01-01T00:00:00Z".into(),
                    message,
                },
            },
        },
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_depth_gauge_reads_zero_after_flush() {
    let depth = depth_gauge();
    let transport = RecordingTransport::new();
    let sink = RemoteSink::new(transport.clone(), "123");
    let queue = Arc::new(DeliveryQueue::start(Arc::new(sink)).unwrap());

    let producers: Vec<_> = (0..PRODUCERS)
        .map(|producer| {
            let queue = Arc::clone(&queue);
            std::thread::spawn(move || {
                for i in 0..PER_PRODUCER {
                    assert!(queue.push(envelope(format!("producer-{producer} event-{i}"))));
                }
            })
        })
        .collect();
    for producer in producers {
        producer.join().unwrap();
    }
    queue.flush().await;

    assert_eq!(transport.posts().len(), PRODUCERS * PER_PRODUCER);
    assert_eq!(queue.depth(), 0);
    assert_eq!(depth.get(), 0.0);

    queue.close().await;
}
