//! End-to-end scenarios over the in-memory transport pair: two live
//! sessions, real demux loops, real spawned handlers.

use std::sync::Arc;
use std::time::Duration;

use serde_json::json;

use osprey::{
    code, spawn_timeout_sweeper, Arg, MethodBinding, ProxyBuilder, RpcError, Service,
    ServiceBuilder, SessionConfig, TypeExpect, DEFAULT_SWEEP_INTERVAL,
};
use osprey_testkit::linked_sessions;

fn echo_service() -> Arc<Service> {
    let mut service = ServiceBuilder::new();
    service
        .method(
            MethodBinding::positional("echo", &[TypeExpect::String]),
            |args| async move {
                let s: String = args.required(0).map_err(|e| e.to_payload())?;
                Ok(s.into())
            },
        )
        .unwrap();
    service.build()
}

#[tokio::test]
async fn echo_roundtrip_via_proxy() {
    osprey_testkit::install_tracing();
    let (client, server) = linked_sessions(SessionConfig::default(), SessionConfig::default());
    server.bind(echo_service());

    let mut proxy = ProxyBuilder::new();
    proxy
        .method(MethodBinding::positional("echo", &[TypeExpect::String]))
        .unwrap();
    let proxy = proxy.build(client);

    let echoed: String = proxy.call("echo", vec![json!("hello")]).await.unwrap();
    assert_eq!(echoed, "hello");
}

#[tokio::test]
async fn raw_call_without_a_proxy() {
    osprey_testkit::install_tracing();
    let (client, server) = linked_sessions(SessionConfig::default(), SessionConfig::default());
    server.bind(echo_service());

    let result = client.call("echo", vec![json!("raw")]).await;
    assert_eq!(result, Ok(json!("raw")));
    assert_eq!(client.pending_calls(), 0);
}

#[tokio::test]
async fn unknown_method_is_a_coded_remote_error() {
    osprey_testkit::install_tracing();
    let (client, server) = linked_sessions(SessionConfig::default(), SessionConfig::default());
    server.bind(echo_service());

    let err = client.call("frobnicate", vec![]).await.unwrap_err();
    assert_eq!(err.remote_code(), Some(code::NO_SUCH_METHOD));
}

#[tokio::test]
async fn no_bound_service_still_answers_requests() {
    osprey_testkit::install_tracing();
    let (client, _server) = linked_sessions(SessionConfig::default(), SessionConfig::default());

    let err = client.call("anything", vec![]).await.unwrap_err();
    assert_eq!(err.remote_code(), Some(code::NO_SUCH_METHOD));
    assert_eq!(client.pending_calls(), 0);
}

#[tokio::test]
async fn argument_mismatch_is_rejected_before_the_handler_runs() {
    osprey_testkit::install_tracing();
    let (client, server) = linked_sessions(SessionConfig::default(), SessionConfig::default());
    server.bind(echo_service());

    // Wrong kind.
    let err = client.call("echo", vec![json!(5)]).await.unwrap_err();
    assert_eq!(err.remote_code(), Some(code::INVALID_ARGUMENTS));

    // Too few arguments.
    let err = client.call("echo", vec![]).await.unwrap_err();
    assert_eq!(err.remote_code(), Some(code::INVALID_ARGUMENTS));
}

#[tokio::test]
async fn handler_error_payload_travels_verbatim() {
    osprey_testkit::install_tracing();
    let (client, server) = linked_sessions(SessionConfig::default(), SessionConfig::default());
    let mut service = ServiceBuilder::new();
    service
        .method(MethodBinding::positional("fail", &[]), |_args| async {
            Err(json!({"kind": "db", "retryable": true}))
        })
        .unwrap();
    server.bind(service.build());

    let err = client.call("fail", vec![]).await.unwrap_err();
    let RpcError::Remote(payload) = err else {
        panic!("expected a remote error");
    };
    assert_eq!(payload, json!({"kind": "db", "retryable": true}));
}

#[tokio::test]
async fn notify_returns_before_the_handler_runs() {
    osprey_testkit::install_tracing();
    let (client, server) = linked_sessions(SessionConfig::default(), SessionConfig::default());
    let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
    let mut service = ServiceBuilder::new();
    service
        .method(
            MethodBinding::positional("event", &[TypeExpect::String]),
            move |args| {
                let tx = tx.clone();
                async move {
                    let name: String = args.required(0).map_err(|e| e.to_payload())?;
                    tx.send(name).ok();
                    Ok(json!(null))
                }
            },
        )
        .unwrap();
    server.bind(service.build());

    client.notify("event", vec![json!("boot")]).await.unwrap();
    // No correlation, nothing pending.
    assert_eq!(client.pending_calls(), 0);
    assert_eq!(rx.recv().await, Some("boot".to_owned()));

    // Notifications to unknown methods vanish without breaking the
    // session.
    client.notify("ghost", vec![]).await.unwrap();
    assert_eq!(rx.try_recv().ok(), None);
}

#[tokio::test]
async fn completion_callback_fires_off_the_demux_loop() {
    osprey_testkit::install_tracing();
    let (client, server) = linked_sessions(SessionConfig::default(), SessionConfig::default());
    server.bind(echo_service());

    let (tx, rx) = tokio::sync::oneshot::channel();
    let future = client.call_async("echo", vec![json!("cb")]).await;
    future.on_complete(move |outcome| {
        tx.send(outcome).ok();
    });
    assert_eq!(rx.await.unwrap(), Ok(json!("cb")));
}

#[tokio::test]
async fn handle_style_handler_replies_once() {
    osprey_testkit::install_tracing();
    let (client, server) = linked_sessions(SessionConfig::default(), SessionConfig::default());
    let mut service = ServiceBuilder::new();
    service
        .method_with_handle(
            MethodBinding::positional("first_wins", &[]),
            |request, _args| async move {
                request.send_result(json!("one")).await;
                // Swallowed by the at-most-once guard.
                request.send_error(json!("two")).await;
            },
        )
        .unwrap();
    server.bind(service.build());

    assert_eq!(client.call("first_wins", vec![]).await, Ok(json!("one")));

    // The duplicate never reached the wire: the next call correlates
    // cleanly.
    assert_eq!(client.call("first_wins", vec![]).await, Ok(json!("one")));
    assert_eq!(client.pending_calls(), 0);
}

#[tokio::test]
async fn close_fails_every_pending_call() {
    osprey_testkit::install_tracing();
    let (client, server) = linked_sessions(SessionConfig::default(), SessionConfig::default());
    let mut service = ServiceBuilder::new();
    service
        .method_with_handle(
            MethodBinding::positional("black_hole", &[]),
            |_request, _args| async {},
        )
        .unwrap();
    server.bind(service.build());

    let f1 = client.call_async("black_hole", vec![]).await;
    let f2 = client.call_async("black_hole", vec![]).await;
    assert_eq!(client.pending_calls(), 2);

    client.close();
    assert_eq!(f1.wait().await, Err(RpcError::SessionClosed));
    assert_eq!(f2.wait().await, Err(RpcError::SessionClosed));
    assert_eq!(client.pending_calls(), 0);
    assert!(client.is_closed());

    // Calls issued after close fail immediately without touching the
    // transport.
    let f3 = client.call_async("black_hole", vec![]).await;
    assert_eq!(f3.wait().await, Err(RpcError::SessionClosed));

    // Idempotent.
    client.close();
}

#[tokio::test(start_paused = true)]
async fn slow_handler_times_out_and_the_late_response_is_dropped() {
    osprey_testkit::install_tracing();
    let (client, server) = linked_sessions(
        SessionConfig::with_request_timeout(1),
        SessionConfig::default(),
    );
    let mut service = ServiceBuilder::new();
    service
        .method(MethodBinding::positional("slow", &[]), |_args| async {
            tokio::time::sleep(Duration::from_secs(3)).await;
            Ok(json!("late"))
        })
        .unwrap();
    service
        .method(MethodBinding::positional("fast", &[]), |_args| async {
            Ok(json!("quick"))
        })
        .unwrap();
    server.bind(service.build());
    let _sweeper = spawn_timeout_sweeper(client.clone(), DEFAULT_SWEEP_INTERVAL);

    let err = client.call("slow", vec![]).await.unwrap_err();
    assert_eq!(err, RpcError::Timeout);

    // The sweep (not the waiter's deadline) removes the table entry.
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(client.pending_calls(), 0);

    // The handler answers at t=3s; the response finds no entry and is
    // dropped, and the session keeps working.
    tokio::time::sleep(Duration::from_secs(5)).await;
    assert_eq!(client.pending_calls(), 0);
    assert_eq!(client.call("fast", vec![]).await, Ok(json!("quick")));
}

#[tokio::test(start_paused = true)]
async fn zero_timeout_calls_are_exempt_from_the_sweep() {
    osprey_testkit::install_tracing();
    let (client, server) = linked_sessions(
        SessionConfig::with_request_timeout(0),
        SessionConfig::default(),
    );
    let mut service = ServiceBuilder::new();
    service
        .method_with_handle(
            MethodBinding::positional("black_hole", &[]),
            |_request, _args| async {},
        )
        .unwrap();
    server.bind(service.build());
    let _sweeper = spawn_timeout_sweeper(client.clone(), DEFAULT_SWEEP_INTERVAL);

    let future = client.call_async("black_hole", vec![]).await;
    tokio::time::sleep(Duration::from_secs(120)).await;
    assert!(!future.is_complete());
    assert_eq!(client.pending_calls(), 1);

    client.close();
    assert_eq!(future.wait().await, Err(RpcError::SessionClosed));
}

#[tokio::test(start_paused = true)]
async fn request_timeout_is_adjustable_at_runtime() {
    osprey_testkit::install_tracing();
    let (client, server) = linked_sessions(
        SessionConfig::with_request_timeout(1),
        SessionConfig::default(),
    );
    let mut service = ServiceBuilder::new();
    service
        .method_with_handle(
            MethodBinding::positional("black_hole", &[]),
            |_request, _args| async {},
        )
        .unwrap();
    server.bind(service.build());
    let _sweeper = spawn_timeout_sweeper(client.clone(), DEFAULT_SWEEP_INTERVAL);

    assert_eq!(client.request_timeout(), 1);
    client.set_request_timeout(0);

    // The change applies to calls issued afterwards.
    let future = client.call_async("black_hole", vec![]).await;
    tokio::time::sleep(Duration::from_secs(10)).await;
    assert!(!future.is_complete());
    client.close();
}

#[tokio::test(start_paused = true)]
async fn waiter_deadline_leaves_the_call_in_flight() {
    osprey_testkit::install_tracing();
    let (client, server) = linked_sessions(
        SessionConfig::with_request_timeout(0),
        SessionConfig::default(),
    );
    let mut service = ServiceBuilder::new();
    service
        .method(MethodBinding::positional("slow", &[]), |_args| async {
            tokio::time::sleep(Duration::from_secs(2)).await;
            Ok(json!("eventually"))
        })
        .unwrap();
    server.bind(service.build());

    let future = client.call_async("slow", vec![]).await;
    assert_eq!(
        future.wait_deadline(Duration::from_secs(1)).await,
        Err(RpcError::Timeout)
    );
    // The deadline belonged to the waiter; the call survives it.
    assert_eq!(client.pending_calls(), 1);
    assert_eq!(future.wait().await, Ok(json!("eventually")));
    assert_eq!(client.pending_calls(), 0);
}

#[tokio::test]
async fn mixed_policies_reorder_across_the_wire() {
    osprey_testkit::install_tracing();
    fn binding() -> MethodBinding {
        MethodBinding::builder("describe")
            .arg(Arg::required(TypeExpect::String))
            .arg(Arg::ignore())
            .arg(Arg::of(TypeExpect::Integer).at(2))
            .arg(Arg::optional(TypeExpect::String))
            .build()
            .unwrap()
    }

    let (client, server) = linked_sessions(SessionConfig::default(), SessionConfig::default());
    let mut service = ServiceBuilder::new();
    service
        .method(binding(), |args| async move {
            let name: String = args.required(0).map_err(|e| e.to_payload())?;
            let size: Option<i64> = args.nullable(2).map_err(|e| e.to_payload())?;
            let color: String = args.optional(3).map_err(|e| e.to_payload())?;
            Ok(json!(format!("{name}/{size:?}/{color:?}")))
        })
        .unwrap();
    server.bind(service.build());

    let mut proxy = ProxyBuilder::new();
    proxy.method(binding()).unwrap();
    let proxy = proxy.build(client);

    // Declaration order: name, (ignored), size, color.
    let described: String = proxy
        .call(
            "describe",
            vec![json!("crate"), json!(null), json!(7), json!("blue")],
        )
        .await
        .unwrap();
    assert_eq!(described, "crate/Some(7)/\"blue\"");

    // Null for the optional parameter leaves it defaulted server-side.
    let described: String = proxy
        .call(
            "describe",
            vec![json!("crate"), json!(null), json!(null), json!(null)],
        )
        .await
        .unwrap();
    assert_eq!(described, "crate/None/\"\"");
}
