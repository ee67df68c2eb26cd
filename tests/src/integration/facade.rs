//! # Facade End-to-End
//!
//! `execute`, `broadcast`, `register` and `subscribe` on a default
//! Application (real RPC client/server over the memory collaborators), and
//! forwarding to scripted collaborators.
//!
//! ```text
//!   app.execute("greeter", "Greeter.Hello", req)
//!        │ RpcClient ─→ MemoryRegistry ─→ MemoryTransport
//!        ▼
//!   RpcServer accept loop ─→ Routes["Greeter.Hello"] ─→ reply
//! ```

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    use nitro_app::{options, AppError, Application};
    use nitro_broker::{Broker, MemoryBroker};
    use nitro_registry::{MemoryRegistry, Registry};
    use nitro_rpc::error::codes;
    use nitro_rpc::{ClientError, EventHandler, Routes, RpcError, ServerError};
    use nitro_transport::{MemoryTransport, Transport};
    use parking_lot::Mutex;
    use serde::{Deserialize, Serialize};
    use serde_json::{json, Value};
    use tokio::time::timeout;

    use crate::mocks::{entries, journal, MockClient, MockServer};

    #[derive(Debug, Serialize, Deserialize)]
    struct HelloRequest {
        name: String,
    }

    #[derive(Debug, Serialize, Deserialize, PartialEq)]
    struct HelloResponse {
        msg: String,
    }

    #[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
    struct Greeted {
        name: String,
    }

    fn greeter() -> Routes {
        Routes::new("Greeter").route("Greeter.Hello", |req: HelloRequest| async move {
            if req.name.is_empty() {
                return Err(RpcError::bad_request("name is required"));
            }
            Ok(HelloResponse {
                msg: format!("Hello {}", req.name),
            })
        })
    }

    async fn hello(app: &Application, service: &str, name: &str) -> Result<HelloResponse, AppError> {
        timeout(
            Duration::from_secs(1),
            app.execute(
                service,
                "Greeter.Hello",
                &HelloRequest {
                    name: name.to_string(),
                },
            ),
        )
        .await
        .expect("timeout")
    }

    // =========================================================================
    // DEFAULT APPLICATION
    // =========================================================================

    #[tokio::test]
    async fn test_default_application_execute() {
        let app = Application::new(vec![options::name("greeter")]);
        app.register(greeter()).await.unwrap();
        app.start().await.unwrap();

        let reply = hello(&app, "greeter", "John").await.unwrap();
        assert_eq!(reply.msg, "Hello John");

        app.stop().await.unwrap();
    }

    #[tokio::test]
    async fn test_remote_errors_surface_as_client_errors() {
        let app = Application::new(vec![options::name("greeter")]);
        app.register(greeter()).await.unwrap();
        app.start().await.unwrap();

        match hello(&app, "greeter", "").await {
            Err(AppError::Client(ClientError::Remote(e))) => {
                assert_eq!(e.code, codes::BAD_REQUEST);
                assert_eq!(e.detail, "name is required");
            }
            other => panic!("expected remote error, got {other:?}"),
        }

        let result: Result<Value, AppError> = app
            .execute("greeter", "Greeter.Missing", &json!({}))
            .await;
        assert!(matches!(
            result,
            Err(AppError::Client(ClientError::Remote(RpcError { code: 404, .. })))
        ));

        app.stop().await.unwrap();
    }

    #[tokio::test]
    async fn test_execute_before_start_finds_nothing() {
        let app = Application::new(vec![options::name("greeter")]);
        app.register(greeter()).await.unwrap();

        let result = hello(&app, "greeter", "John").await;
        assert!(matches!(
            result,
            Err(AppError::Client(ClientError::ServiceNotFound(_)))
        ));
    }

    #[tokio::test]
    async fn test_default_application_broadcast_and_subscribe() {
        let app = Application::default();
        let received = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&received);
        app.subscribe(
            "greeted",
            EventHandler::new(move |event: Greeted| {
                let sink = Arc::clone(&sink);
                async move {
                    sink.lock().push(event);
                    Ok::<(), RpcError>(())
                }
            }),
        )
        .await
        .unwrap();
        app.start().await.unwrap();

        app.broadcast("greeted", &Greeted { name: "a".into() })
            .await
            .unwrap();
        app.broadcast("greeted", &Greeted { name: "b".into() })
            .await
            .unwrap();
        app.broadcast("ignored", &json!({"x": 1})).await.unwrap();

        assert_eq!(
            *received.lock(),
            vec![Greeted { name: "a".into() }, Greeted { name: "b".into() }]
        );

        app.stop().await.unwrap();
    }

    #[tokio::test]
    async fn test_broadcast_without_start_connects_broker() {
        let app = Application::default();
        app.broadcast("nobody-listens", &json!(1)).await.unwrap();
        assert!(app.options().broker.is_connected());
    }

    #[tokio::test]
    async fn test_duplicate_register_is_server_error() {
        let app = Application::default();
        app.register(greeter()).await.unwrap();

        let err = app.register(greeter()).await.unwrap_err();
        assert!(matches!(
            err,
            AppError::Server(ServerError::DuplicateHandler(name)) if name == "Greeter"
        ));
    }

    // =========================================================================
    // SHARED COLLABORATORS ACROSS APPLICATIONS
    // =========================================================================

    #[tokio::test]
    async fn test_two_applications_on_shared_collaborators() {
        let broker: Arc<dyn Broker> = Arc::new(MemoryBroker::new());
        let registry: Arc<dyn Registry> = Arc::new(MemoryRegistry::new());
        let transport: Arc<dyn Transport> = Arc::new(MemoryTransport::new());
        let shared = || {
            vec![
                options::broker(Arc::clone(&broker)),
                options::registry(Arc::clone(&registry)),
                options::transport(Arc::clone(&transport)),
            ]
        };

        let mut provider = Application::new(shared());
        provider.init(vec![options::name("greeter")]);
        provider.register(greeter()).await.unwrap();

        let counter = Arc::new(AtomicU64::new(0));
        let seen = Arc::clone(&counter);
        provider
            .subscribe(
                "pings",
                EventHandler::new(move |_: Value| {
                    let seen = Arc::clone(&seen);
                    async move {
                        seen.fetch_add(1, Ordering::SeqCst);
                        Ok::<(), RpcError>(())
                    }
                }),
            )
            .await
            .unwrap();
        provider.start().await.unwrap();

        let mut consumer = Application::new(shared());
        consumer.init(vec![options::name("consumer")]);

        let reply = hello(&consumer, "greeter", "Ann").await.unwrap();
        assert_eq!(reply.msg, "Hello Ann");

        consumer.broadcast("pings", &json!(null)).await.unwrap();
        assert_eq!(counter.load(Ordering::SeqCst), 1);

        provider.stop().await.unwrap();
        assert!(matches!(
            hello(&consumer, "greeter", "Ann").await,
            Err(AppError::Client(ClientError::ServiceNotFound(_)))
        ));
    }

    // =========================================================================
    // FORWARDING TO SCRIPTED COLLABORATORS
    // =========================================================================

    #[tokio::test]
    async fn test_facade_forwards_to_collaborators() {
        let j = journal();
        let client = Arc::new(MockClient::new(&j));
        let server = Arc::new(MockServer::new(&j));
        let app = Application::new(vec![
            options::client(client.clone()),
            options::server(server.clone()),
        ]);

        let echoed: Value = app
            .execute("svc", "Svc.Echo", &json!({"k": "v"}))
            .await
            .unwrap();
        assert_eq!(echoed, json!({"k": "v"}));

        app.broadcast("topic", &json!(1)).await.unwrap();
        app.register(greeter()).await.unwrap();
        app.subscribe(
            "topic",
            EventHandler::new(|_: Value| async { Ok::<(), RpcError>(()) }),
        )
        .await
        .unwrap();

        assert_eq!(
            entries(&j),
            vec![
                "client.call svc Svc.Echo",
                "client.publish topic",
                "server.handle",
                "server.subscribe",
            ]
        );
        assert_eq!(server.handlers(), vec!["Greeter"]);
        assert_eq!(server.subscribers(), vec!["topic"]);
        // Facade calls use a background context
        assert_eq!(client.cancelled_contexts(), vec![false, false]);
    }

    #[tokio::test]
    async fn test_client_errors_propagate_unchanged() {
        let j = journal();
        let client = MockClient::new(&j).failing(ClientError::Timeout(Duration::from_secs(5)));
        let app = Application::new(vec![options::client(Arc::new(client))]);

        let result: Result<Value, AppError> = app.execute("svc", "Svc.Echo", &json!({})).await;
        assert!(matches!(
            result,
            Err(AppError::Client(ClientError::Timeout(d))) if d == Duration::from_secs(5)
        ));

        let err = app.broadcast("topic", &json!({})).await.unwrap_err();
        assert!(matches!(err, AppError::Client(ClientError::Timeout(_))));
    }
}
