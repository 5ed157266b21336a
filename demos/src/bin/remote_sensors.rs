//! Датчики публикуют показания в сокет, анализатор получает их через
//! `RemoteSubscriber`, подписанный только на `temperature`.
//!
//! Адрес берётся из настроек (`TOPICAST_ENDPOINT`, по умолчанию TCP на
//! loopback), например `TOPICAST_ENDPOINT=inproc://sensors`.
//!
//! Запуск: `cargo run -p topicast_demos --bin remote_sensors`

use std::{sync::Arc, time::Duration};

use rand::Rng;
use serde_json::{json, Value};
use topicast::{
    init_logging, Context, RemotePublisher, RemoteSubscriber, Settings, Subscriber,
    SubscriberError,
};
use tracing::{info, warn};

const READ_INTERVAL: Duration = Duration::from_secs(1);

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

fn read_sensors() -> (Value, Value) {
    let mut rng = rand::thread_rng();
    (
        json!({ "value": rng.gen_range(0.0..40.0) }),
        json!({ "value": rng.gen_range(20.0..100.0) }),
    )
}

async fn read_sensors_loop(publisher: &RemotePublisher) -> anyhow::Result<()> {
    let mut ticker = tokio::time::interval(READ_INTERVAL);
    loop {
        ticker.tick().await;
        let (temperature, humidity) = read_sensors();
        publisher.notify(&temperature, "temperature").await?;
        publisher.notify(&humidity, "humidity").await?;
        info!(subscribers = publisher.subscriber_count(), "Sent");
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let settings = Settings::load()?;
    let logging = init_logging(settings.logging).map_err(|e| anyhow::anyhow!(e))?;

    let ctx = Context::with_config(settings.transport);
    let publisher = RemotePublisher::bind(&ctx, &settings.endpoint).await?;
    let endpoint = publisher.local_endpoint().to_string();

    let analyzer = Arc::new(
        RemoteSubscriber::<_, Value>::connect(&ctx, &endpoint, "temperature", SensorDataAnalyzer)
            .await?,
    );
    let listener = {
        let analyzer = analyzer.clone();
        tokio::spawn(async move {
            analyzer
                .listen_until(async {
                    let _ = tokio::signal::ctrl_c().await;
                })
                .await
        })
    };

    tokio::select! {
        res = read_sensors_loop(&publisher) => res?,
        res = listener => match res? {
            Ok(()) => info!("Stopped"),
            Err(e) => warn!(error = %e, "Listener ended"),
        },
    }

    info!(stats = ?analyzer.stats(), "Analyzer statistics");
    logging.shutdown();
    Ok(())
}
