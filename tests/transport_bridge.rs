use std::{sync::Arc, time::Duration};

use parking_lot::Mutex;
use rstest::rstest;
use serde_json::{json, Value};
use tokio::task::JoinHandle;

use topicast::{
    Context, ListenMode, ListenStrategy, Notifier, RemotePublisher, RemoteSubscriber, Subscriber,
    SubscriberError, Topics, TransportConfig, TransportError, WILDCARD,
};

type Inbox = Arc<Mutex<Vec<(String, Value)>>>;
type Remote = RemoteSubscriber<Recorder, Value>;

const WAIT: Duration = Duration::from_secs(5);

/// Складывает полученные (тема, данные) во входящий ящик.
struct Recorder {
    name: String,
    inbox: Inbox,
}

impl Recorder {
    fn new(
        name: &str,
        inbox: &Inbox,
    ) -> Self {
        Self {
            name: name.to_string(),
            inbox: inbox.clone(),
        }
    }
}

impl Subscriber for Recorder {
    fn update(
        &self,
        payload: &Value,
        topic: &str,
    ) -> Result<(), SubscriberError> {
        self.inbox.lock().push((topic.to_string(), payload.clone()));
        Ok(())
    }

    fn name(&self) -> &str {
        &self.name
    }
}

async fn subscribe(
    ctx: &Context,
    endpoint: &str,
    topics: impl Into<Topics>,
    inbox: &Inbox,
) -> Arc<Remote> {
    let sub = RemoteSubscriber::connect(ctx, endpoint, topics, Recorder::new("inbox", inbox))
        .await
        .expect("subscriber must connect");
    Arc::new(sub)
}

fn spawn_listener(sub: &Arc<Remote>) -> JoinHandle<Result<(), TransportError>> {
    let sub = sub.clone();
    tokio::spawn(async move { sub.listen().await })
}

async fn wait_until(cond: impl Fn() -> bool) {
    tokio::time::timeout(WAIT, async {
        while !cond() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("condition not reached in time");
}

/// TCP-издатель не буферизует фреймы для ещё не принятых соединений.
async fn wait_for_subscribers(
    publisher: &RemotePublisher,
    n: usize,
) {
    wait_until(|| publisher.subscriber_count() >= n).await;
}

/// Тест проверяет сквозной сценарий датчиков: подписчик на
/// `sensors.temperature` получает декодированные данные, а подписчик на
/// `sensors.humidity` не получает ничего.
#[rstest]
#[case::inproc("inproc://bridge-round-trip")]
#[case::tcp("tcp://127.0.0.1:0")]
#[tokio::test]
async fn test_round_trip_respects_topic_filter(#[case] endpoint: &str) {
    let ctx = Context::new();
    let publisher = RemotePublisher::bind(&ctx, endpoint).await.unwrap();
    let endpoint = publisher.local_endpoint().to_string();

    let temperature = Inbox::default();
    let humidity = Inbox::default();
    let temp_sub = subscribe(&ctx, &endpoint, "sensors.temperature", &temperature).await;
    let hum_sub = subscribe(&ctx, &endpoint, "sensors.humidity", &humidity).await;
    let listeners = [spawn_listener(&temp_sub), spawn_listener(&hum_sub)];
    wait_for_subscribers(&publisher, 2).await;

    publisher
        .notify(&json!({"value": 23.5}), "sensors.temperature")
        .await
        .unwrap();

    wait_until(|| !temperature.lock().is_empty()).await;
    assert_eq!(
        temperature.lock()[0],
        ("sensors.temperature".to_string(), json!({"value": 23.5}))
    );

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(humidity.lock().is_empty());
    assert_eq!(hum_sub.stats().received, 0);

    for listener in listeners {
        listener.abort();
    }
}

/// Wildcard-подписчик получает все темы в порядке отправки.
#[rstest]
#[case::inproc("inproc://bridge-wildcard")]
#[case::tcp("tcp://127.0.0.1:0")]
#[tokio::test]
async fn test_wildcard_receives_all_in_order(#[case] endpoint: &str) {
    let ctx = Context::new();
    let publisher = RemotePublisher::bind(&ctx, endpoint).await.unwrap();
    let endpoint = publisher.local_endpoint().to_string();

    let inbox = Inbox::default();
    let sub = subscribe(&ctx, &endpoint, WILDCARD, &inbox).await;
    let listener = spawn_listener(&sub);
    wait_for_subscribers(&publisher, 1).await;

    let topics = ["temperature", "humidity", "pressure", "temperature"];
    for (i, topic) in topics.iter().enumerate() {
        publisher.notify(&json!({"seq": i}), topic).await.unwrap();
    }

    wait_until(|| inbox.lock().len() == topics.len()).await;
    let received: Vec<(String, Value)> = inbox.lock().clone();
    let expected: Vec<(String, Value)> = topics
        .iter()
        .enumerate()
        .map(|(i, t)| (t.to_string(), json!({"seq": i})))
        .collect();
    assert_eq!(received, expected);

    listener.abort();
}

/// Режим опроса доставляет те же данные, что и блокирующий.
#[tokio::test]
async fn test_polling_mode_from_config() {
    let ctx = Context::with_config(TransportConfig {
        listen_mode: ListenStrategy::Polling,
        poll_interval_ms: 2,
        ..Default::default()
    });
    let publisher = RemotePublisher::bind(&ctx, "inproc://bridge-polling").await.unwrap();
    let inbox = Inbox::default();
    let sub = subscribe(&ctx, "inproc://bridge-polling", "temperature", &inbox).await;
    assert_eq!(
        sub.mode(),
        ListenMode::Polling {
            interval: Duration::from_millis(2)
        }
    );
    let listener = spawn_listener(&sub);

    for value in [20.5, 21.0, 21.5] {
        publisher
            .notify(&json!({"value": value}), "temperature")
            .await
            .unwrap();
    }

    wait_until(|| inbox.lock().len() == 3).await;
    assert_eq!(inbox.lock()[2].1, json!({"value": 21.5}));
    listener.abort();
}

/// Фильтры можно менять, пока цикл приёма работает.
#[tokio::test]
async fn test_observe_while_listening() {
    let ctx = Context::new();
    let publisher = RemotePublisher::bind(&ctx, "inproc://bridge-observe").await.unwrap();
    let inbox = Inbox::default();
    let sub = subscribe(&ctx, "inproc://bridge-observe", "temperature", &inbox).await;
    let listener = spawn_listener(&sub);

    // Фрейм по чужой теме отбрасывается; маркер подтверждает, что цикл
    // его уже прошёл.
    publisher.notify(&json!(1), "humidity").await.unwrap();
    publisher.notify(&json!(0), "temperature").await.unwrap();
    wait_until(|| inbox.lock().len() == 1).await;

    sub.observe("humidity");
    publisher.notify(&json!(2), "humidity").await.unwrap();
    wait_until(|| inbox.lock().len() == 2).await;
    assert_eq!(inbox.lock()[1], ("humidity".to_string(), json!(2)));

    sub.stop_observing("humidity");
    publisher.notify(&json!(3), "humidity").await.unwrap();
    publisher.notify(&json!(4), "temperature").await.unwrap();
    wait_until(|| inbox.lock().len() == 3).await;
    assert_eq!(inbox.lock()[2], ("temperature".to_string(), json!(4)));

    listener.abort();
}

/// Отмена задачи с `listen` закрывает сокет.
#[tokio::test]
async fn test_cancelled_listener_closes_socket() {
    let ctx = Context::new();
    let publisher = RemotePublisher::bind(&ctx, "inproc://bridge-cancel").await.unwrap();
    let inbox = Inbox::default();
    let sub = subscribe(&ctx, "inproc://bridge-cancel", WILDCARD, &inbox).await;

    let listener = spawn_listener(&sub);
    publisher.notify(&json!("ping"), "t").await.unwrap();
    wait_until(|| inbox.lock().len() == 1).await;
    listener.abort();
    assert!(listener.await.unwrap_err().is_cancelled());

    let err = sub.listen().await.unwrap_err();
    assert!(matches!(err, TransportError::Closed { .. }), "{err}");
}

/// Потеря TCP-соединения завершает `listen` ошибкой.
#[tokio::test]
async fn test_lost_publisher_ends_listen_with_error() {
    let ctx = Context::new();
    let publisher = RemotePublisher::bind(&ctx, "tcp://127.0.0.1:0").await.unwrap();
    let endpoint = publisher.local_endpoint().to_string();
    let inbox = Inbox::default();
    let sub = subscribe(&ctx, &endpoint, WILDCARD, &inbox).await;
    let listener = spawn_listener(&sub);
    wait_for_subscribers(&publisher, 1).await;

    drop(publisher);

    let res = tokio::time::timeout(WAIT, listener)
        .await
        .expect("listener must stop")
        .unwrap();
    assert!(matches!(res, Err(TransportError::ConnectionLost { .. })), "{res:?}");
    assert!(matches!(sub.listen().await, Err(TransportError::Closed { .. })));
}

#[tokio::test]
async fn test_connect_to_unreachable_endpoint_fails_on_construction() {
    let ctx = Context::with_config(TransportConfig {
        connect_timeout_ms: 200,
        ..Default::default()
    });
    let port = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    };
    let inbox = Inbox::default();
    let res = RemoteSubscriber::<_, Value>::connect(
        &ctx,
        &format!("tcp://127.0.0.1:{port}"),
        WILDCARD,
        Recorder::new("unreachable", &inbox),
    )
    .await;
    assert!(res.is_err());

    let err = RemotePublisher::bind(&ctx, "udp://127.0.0.1:1").await.unwrap_err();
    assert!(matches!(err, TransportError::UnsupportedScheme { .. }));
}

/// Локальный `Notifier` с зарегистрированным `RemotePublisher` доставляет
/// уведомления и локальным, и сетевым подписчикам.
#[tokio::test]
async fn test_local_and_remote_subscribers_side_by_side() {
    let ctx = Context::new();
    let publisher = RemotePublisher::bind(&ctx, "inproc://bridge-mirror").await.unwrap();

    let remote_inbox = Inbox::default();
    let remote = subscribe(&ctx, "inproc://bridge-mirror", "temperature", &remote_inbox).await;
    let listener = spawn_listener(&remote);

    let local_inbox = Inbox::default();
    let notifier: Notifier = Notifier::new();
    notifier.register(Arc::new(Recorder::new("local", &local_inbox)), "temperature");
    notifier.register(Arc::new(publisher), WILDCARD);

    notifier.notify(&json!({"value": 18.0}), "temperature").unwrap();
    notifier.notify(&json!({"value": 55.0}), "humidity").unwrap();

    wait_until(|| remote_inbox.lock().len() == 1).await;
    assert_eq!(*local_inbox.lock(), *remote_inbox.lock());

    // Сетевой подписчик подставляется туда же, куда и локальный.
    let as_local: Arc<dyn Subscriber> = remote.clone();
    as_local.update(&json!(0), "direct").unwrap();
    assert_eq!(remote_inbox.lock().len(), 2);

    listener.abort();
}
