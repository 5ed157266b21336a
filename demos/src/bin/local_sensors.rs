//! Датчики и анализатор в одном процессе: `Notifier` вызывает анализатор
//! напрямую.
//!
//! Запуск: `cargo run -p topicast_demos --bin local_sensors`

use std::{sync::Arc, time::Duration};

use rand::Rng;
use serde_json::{json, Value};
use topicast::{init_logging, Notifier, NotifyError, Settings, Subscriber, SubscriberError};
use tracing::info;

const READ_INTERVAL: Duration = Duration::from_secs(2);

struct SensorsReader {
    notifier: Notifier,
}

impl SensorsReader {
    fn new() -> Self {
        Self {
            notifier: Notifier::new(),
        }
    }

    fn read_once(&self) -> Result<(), NotifyError> {
        let (temperature, humidity) = {
            let mut rng = rand::thread_rng();
            (rng.gen_range(0.0..40.0), rng.gen_range(20.0..100.0))
        };
        self.notifier
            .notify(&json!({ "value": temperature }), "temperature")?;
        self.notifier
            .notify(&json!({ "value": humidity }), "humidity")?;
        Ok(())
    }
}

struct SensorDataAnalyzer;

impl Subscriber for SensorDataAnalyzer {
    fn update(
        &self,
        payload: &Value,
        topic: &str,
    ) -> Result<(), SubscriberError> {
        println!("Sensor data observed, analysing {topic}: {payload}");
        Ok(())
    }

    fn name(&self) -> &str {
        "sensor-data-analyzer"
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let settings = Settings::load()?;
    let logging = init_logging(settings.logging).map_err(|e| anyhow::anyhow!(e))?;

    let reader = SensorsReader::new();
    let analyzer: Arc<dyn Subscriber> = Arc::new(SensorDataAnalyzer);
    reader
        .notifier
        .register(analyzer, ["temperature", "humidity"]);

    info!("Reading sensors, press Ctrl+C to stop");
    let mut ticker = tokio::time::interval(READ_INTERVAL);
    loop {
        tokio::select! {
            _ = ticker.tick() => reader.read_once()?,
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    info!(
        notifications = reader.notifier.notify_count(),
        deliveries = reader.notifier.delivered_count(),
        "Stopped"
    );
    logging.shutdown();
    Ok(())
}
