//! # Lifecycle Ordering
//!
//! Hook and server call ordering for `start`, `stop` and `run`, observed
//! through a scripted server.
//!
//! ```text
//! start:  before_start[0..k] ─(fail-fast)→ server.start ─→ after_start[..] (fail-fast)
//! stop:   before_stop[..] (all) ─→ server.stop ─(fail-fast)→ after_stop[..] (all)
//! ```

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use nitro_app::{options, AppError, Application, HookPhase, LifecycleState, OptionFn};
    use nitro_rpc::ServerError;
    use nitro_types::Context;
    use tokio::time::timeout;

    use crate::mocks::{entries, hook, journal, Journal, MockServer};

    fn app(server: MockServer, mut extra: Vec<OptionFn>) -> Application {
        let mut opts = vec![options::server(Arc::new(server))];
        opts.append(&mut extra);
        Application::new(opts)
    }

    // =========================================================================
    // START
    // =========================================================================

    #[tokio::test]
    async fn test_before_start_failure_stops_at_failing_hook() {
        let j = journal();
        let app = app(
            MockServer::new(&j),
            vec![
                options::before_start(hook(&j, "bs1", false)),
                options::before_start(hook(&j, "bs2", false)),
                options::before_start(hook(&j, "bs3", true)),
                options::before_start(hook(&j, "bs4", false)),
                options::after_start(hook(&j, "as1", false)),
            ],
        );

        let err = app.start().await.unwrap_err();

        assert_eq!(err.hook_phase(), Some(HookPhase::BeforeStart));
        assert_eq!(err.to_string(), "before_start hook failed: bs3 failed");
        assert_eq!(entries(&j), vec!["bs1", "bs2", "bs3"]);
    }

    #[tokio::test]
    async fn test_server_start_failure_skips_after_start() {
        let j = journal();
        let app = app(
            MockServer::new(&j).failing_start(ServerError::AlreadyStarted),
            vec![
                options::before_start(hook(&j, "bs1", false)),
                options::after_start(hook(&j, "as1", false)),
            ],
        );

        let err = app.start().await.unwrap_err();

        assert!(matches!(err, AppError::Server(ServerError::AlreadyStarted)));
        assert_eq!(entries(&j), vec!["bs1", "server.start"]);
    }

    #[tokio::test]
    async fn test_after_start_failure_aborts_remaining_hooks() {
        let j = journal();
        let app = app(
            MockServer::new(&j),
            vec![
                options::after_start(hook(&j, "as1", true)),
                options::after_start(hook(&j, "as2", false)),
            ],
        );

        let err = app.start().await.unwrap_err();

        assert_eq!(err.hook_phase(), Some(HookPhase::AfterStart));
        assert_eq!(entries(&j), vec!["server.start", "as1"]);
        // No compensating stop
        assert_eq!(app.state(), LifecycleState::Started);
    }

    #[tokio::test]
    async fn test_start_without_hooks_only_starts_server() {
        let j = journal();
        let app = app(MockServer::new(&j), vec![]);

        app.start().await.unwrap();
        assert_eq!(entries(&j), vec!["server.start"]);
    }

    // =========================================================================
    // STOP
    // =========================================================================

    #[tokio::test]
    async fn test_before_stop_failures_do_not_stop_the_sequence() {
        let j = journal();
        let app = app(
            MockServer::new(&j),
            vec![
                options::before_stop(hook(&j, "bt1", true)),
                options::before_stop(hook(&j, "bt2", false)),
                options::before_stop(hook(&j, "bt3", true)),
                options::after_stop(hook(&j, "at1", false)),
            ],
        );

        let err = app.stop().await.unwrap_err();

        assert_eq!(err.to_string(), "before_stop hook failed: bt3 failed");
        assert_eq!(
            entries(&j),
            vec!["bt1", "bt2", "bt3", "server.stop", "at1"]
        );
    }

    #[tokio::test]
    async fn test_after_stop_failure_overrides_before_stop_failure() {
        let j = journal();
        let app = app(
            MockServer::new(&j),
            vec![
                options::before_stop(hook(&j, "bt1", true)),
                options::after_stop(hook(&j, "at1", true)),
                options::after_stop(hook(&j, "at2", false)),
            ],
        );

        let err = app.stop().await.unwrap_err();

        assert_eq!(err.hook_phase(), Some(HookPhase::AfterStop));
        assert_eq!(err.to_string(), "after_stop hook failed: at1 failed");
        assert_eq!(entries(&j), vec!["bt1", "server.stop", "at1", "at2"]);
    }

    #[tokio::test]
    async fn test_server_stop_failure_wins_and_skips_after_stop() {
        let j = journal();
        let app = app(
            MockServer::new(&j).failing_stop(ServerError::NotStarted),
            vec![
                options::before_stop(hook(&j, "bt1", true)),
                options::after_stop(hook(&j, "at1", false)),
            ],
        );

        let err = app.stop().await.unwrap_err();

        assert!(matches!(err, AppError::Server(ServerError::NotStarted)));
        assert_eq!(entries(&j), vec!["bt1", "server.stop"]);
    }

    #[tokio::test]
    async fn test_clean_stop_succeeds() {
        let j = journal();
        let app = app(
            MockServer::new(&j),
            vec![
                options::before_stop(hook(&j, "bt1", false)),
                options::after_stop(hook(&j, "at1", false)),
            ],
        );

        app.stop().await.unwrap();
        assert_eq!(entries(&j), vec!["bt1", "server.stop", "at1"]);
        assert_eq!(app.state(), LifecycleState::Stopped);
    }

    // =========================================================================
    // RUN
    // =========================================================================

    fn full_hooks(j: &Journal) -> Vec<OptionFn> {
        vec![
            options::before_start(hook(j, "bs", false)),
            options::after_start(hook(j, "as", false)),
            options::before_stop(hook(j, "bt", false)),
            options::after_stop(hook(j, "at", false)),
        ]
    }

    #[tokio::test]
    async fn test_run_with_cancelled_context_stops_immediately() {
        let j = journal();
        let (ctx, cancel) = Context::with_cancel();
        cancel.cancel();

        let mut opts = full_hooks(&j);
        opts.push(options::context(ctx));
        let app = app(MockServer::new(&j), opts);

        timeout(Duration::from_secs(1), app.run())
            .await
            .expect("timeout")
            .unwrap();

        assert_eq!(
            entries(&j),
            vec!["bs", "server.start", "as", "bt", "server.stop", "at"]
        );
    }

    #[tokio::test]
    async fn test_run_returns_stop_result() {
        let j = journal();
        let (ctx, cancel) = Context::with_cancel();
        cancel.cancel();

        let app = app(
            MockServer::new(&j),
            vec![
                options::context(ctx),
                options::after_stop(hook(&j, "at", true)),
            ],
        );

        let err = timeout(Duration::from_secs(1), app.run())
            .await
            .expect("timeout")
            .unwrap_err();

        assert_eq!(err.to_string(), "after_stop hook failed: at failed");
        let stops = entries(&j).iter().filter(|e| *e == "server.stop").count();
        assert_eq!(stops, 1);
    }

    #[tokio::test]
    async fn test_run_start_failure_never_stops() {
        let j = journal();
        let (ctx, _cancel) = Context::with_cancel();

        let mut opts = full_hooks(&j);
        opts.push(options::context(ctx));
        let app = app(
            MockServer::new(&j).failing_start(ServerError::InvalidHandler("bad".into())),
            opts,
        );

        let err = timeout(Duration::from_secs(1), app.run())
            .await
            .expect("timeout")
            .unwrap_err();

        assert!(matches!(
            err,
            AppError::Server(ServerError::InvalidHandler(_))
        ));
        assert_eq!(entries(&j), vec!["bs", "server.start"]);
    }

    #[tokio::test]
    async fn test_run_blocks_until_cancelled() {
        let j = journal();
        let (ctx, cancel) = Context::with_cancel();

        let mut opts = full_hooks(&j);
        opts.push(options::context(ctx));
        let app = Arc::new(app(MockServer::new(&j), opts));

        let runner = Arc::clone(&app);
        let handle = tokio::spawn(async move { runner.run().await });

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(!handle.is_finished());
        assert_eq!(entries(&j), vec!["bs", "server.start", "as"]);

        cancel.cancel();
        timeout(Duration::from_secs(1), handle)
            .await
            .expect("timeout")
            .unwrap()
            .unwrap();

        assert_eq!(
            entries(&j),
            vec!["bs", "server.start", "as", "bt", "server.stop", "at"]
        );
    }

    #[tokio::test]
    async fn test_run_on_real_server_with_cancel() {
        let (ctx, cancel) = Context::with_cancel();
        let app = Arc::new(Application::new(vec![
            options::name("runner"),
            options::context(ctx),
        ]));

        let runner = Arc::clone(&app);
        let handle = tokio::spawn(async move { runner.run().await });

        tokio::time::sleep(Duration::from_millis(50)).await;
        let registered = app.options().registry.get_service("runner").await.unwrap();
        assert_eq!(registered.len(), 1);

        cancel.cancel();
        timeout(Duration::from_secs(1), handle)
            .await
            .expect("timeout")
            .unwrap()
            .unwrap();

        assert!(app.options().registry.get_service("runner").await.is_err());
        assert_eq!(app.state(), LifecycleState::Stopped);
    }
}
