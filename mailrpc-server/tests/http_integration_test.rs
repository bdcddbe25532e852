//! End-to-end tests of the HTTP endpoint, served in-process with warp::test

use chrono::{DateTime, FixedOffset};
use mailrpc_core::{Error, Result, RpcError};
use mailrpc_macros::RpcParams;
use mailrpc_server::{RequestContext, RpcServer, RpcService, ServiceMethod, JSON_CONTENT_TYPE};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

#[derive(Debug, Default, Serialize, Deserialize, RpcParams)]
struct SendMailRequest {
    message: String,
}

#[derive(Debug, Default, Serialize, Deserialize, RpcParams)]
#[serde(rename_all = "camelCase")]
struct ScheduleRequest {
    message: String,
    send_at: Option<DateTime<FixedOffset>>,
}

#[derive(Debug, Default, Serialize, Deserialize, RpcParams)]
struct TaggedRequest {
    message: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tags: Vec<String>,
}

#[derive(Default)]
struct Outbox {
    sent: AtomicUsize,
}

impl Outbox {
    async fn send_mail(&self, _ctx: RequestContext, req: SendMailRequest) -> Result<bool> {
        if req.message == "explode" {
            return Err(Error::Internal("dial tcp: connection refused".into()));
        }
        self.sent.fetch_add(1, Ordering::SeqCst);
        Ok(true)
    }

    async fn schedule(&self, _ctx: RequestContext, req: ScheduleRequest) -> Result<Value> {
        let send_at = req
            .send_at
            .ok_or_else(|| RpcError::invalid_request("sendAt is required"))?;
        Ok(json!({"message": req.message, "at": send_at.timestamp()}))
    }

    async fn tag(&self, _ctx: RequestContext, req: TaggedRequest) -> Result<usize> {
        Ok(req.tags.len())
    }

    async fn whoami(&self, ctx: RequestContext, _req: SendMailRequest) -> Result<Option<String>> {
        Ok(ctx.header("x-user").map(str::to_string))
    }
}

impl RpcService for Outbox {
    fn methods(self: Arc<Self>) -> Vec<ServiceMethod> {
        vec![
            ServiceMethod::bound(&self, "SendMail", |svc, ctx, req| async move {
                svc.send_mail(ctx, req).await
            }),
            ServiceMethod::bound(&self, "Schedule", |svc, ctx, req| async move {
                svc.schedule(ctx, req).await
            }),
            ServiceMethod::bound(&self, "Tag", |svc, ctx, req| async move {
                svc.tag(ctx, req).await
            }),
            ServiceMethod::bound(&self, "WhoAmI", |svc, ctx, req| async move {
                svc.whoami(ctx, req).await
            }),
        ]
    }
}

fn server(outbox: Arc<Outbox>) -> RpcServer {
    RpcServer::builder()
        .bind(([127, 0, 0, 1], 0))
        .service(outbox, "Service")
        .build()
        .unwrap()
}

async fn post(server: &RpcServer, body: &str) -> warp::http::Response<warp::hyper::body::Bytes> {
    warp::test::request()
        .method("POST")
        .path("/")
        .header("content-type", "application/json")
        .body(body)
        .reply(&server.routes())
        .await
}

fn json_body(res: &warp::http::Response<warp::hyper::body::Bytes>) -> Value {
    serde_json::from_slice(res.body()).unwrap()
}

#[tokio::test]
async fn test_send_mail_call() {
    let outbox = Arc::new(Outbox::default());
    let server = server(Arc::clone(&outbox));

    let res = post(
        &server,
        r#"{"jsonrpc":"2.0","method":"Service.SendMail","params":{"message":"hi"},"id":1}"#,
    )
    .await;

    assert_eq!(res.status(), 200);
    assert_eq!(res.headers()["content-type"], JSON_CONTENT_TYPE);
    assert_eq!(res.body().as_ref(), b"{\"jsonrpc\":\"2.0\",\"result\":true,\"id\":1}\n");
    assert_eq!(outbox.sent.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_send_mail_notification_has_no_body() {
    let outbox = Arc::new(Outbox::default());
    let server = server(Arc::clone(&outbox));

    let res = post(
        &server,
        r#"{"jsonrpc":"2.0","method":"Service.SendMail","params":{"message":"hi"}}"#,
    )
    .await;

    assert_eq!(res.status(), 200);
    assert!(res.body().is_empty());
    assert_eq!(res.headers()["json-rpc"], "notify");
    assert_eq!(outbox.sent.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_notification_to_unregistered_service_is_silent() {
    let server = RpcServer::builder()
        .bind(([127, 0, 0, 1], 0))
        .build()
        .unwrap();

    let res = post(&server, r#"{"jsonrpc":"2.0","method":"Service.SendMail","params":{"message":"hi"}}"#).await;
    assert!(res.body().is_empty());

    let res = post(
        &server,
        r#"{"jsonrpc":"2.0","method":"Service.SendMail","params":{"message":"hi"},"id":null}"#,
    )
    .await;
    assert!(res.body().is_empty());
}

#[tokio::test]
async fn test_unregistered_call_reports_method_not_found() {
    let server = RpcServer::builder()
        .bind(([127, 0, 0, 1], 0))
        .build()
        .unwrap();

    let res = post(
        &server,
        r#"{"jsonrpc":"2.0","method":"Service.SendMail","params":{"message":"hi"},"id":"q"}"#,
    )
    .await;

    assert_eq!(
        json_body(&res),
        json!({"jsonrpc": "2.0", "error": {"code": -32601, "message": "can't find service"}, "id": "q"})
    );
}

#[tokio::test]
async fn test_malformed_json_always_answered() {
    let server = server(Arc::new(Outbox::default()));
    let res = post(&server, r#"{"jsonrpc":"2.0","method":"Service.SendMail""#).await;

    assert_eq!(res.status(), 200);
    let body = json_body(&res);
    assert_eq!(body["error"]["code"], -32700);
    assert_eq!(body["id"], Value::Null);
}

#[tokio::test]
async fn test_wrong_version_rejected_before_dispatch() {
    let outbox = Arc::new(Outbox::default());
    let server = server(Arc::clone(&outbox));

    let res = post(
        &server,
        r#"{"jsonrpc":"2.1","method":"Service.SendMail","params":{"message":"hi"},"id":7}"#,
    )
    .await;

    let body = json_body(&res);
    assert_eq!(body["error"]["code"], -32600);
    assert_eq!(body["id"], 7);
    assert_eq!(outbox.sent.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_null_version_and_method_are_invalid_requests() {
    let server = server(Arc::new(Outbox::default()));

    let res = post(
        &server,
        r#"{"jsonrpc":null,"method":"Service.SendMail","params":{"message":"hi"},"id":1}"#,
    )
    .await;
    assert_eq!(json_body(&res)["error"]["code"], -32600);

    let res = post(&server, r#"{"jsonrpc":"2.0","method":null}"#).await;
    let body = json_body(&res);
    assert_eq!(body["error"]["code"], -32600);
    assert_eq!(body["error"]["message"], "service/method request ill-formed");
}

#[tokio::test]
async fn test_handler_failure_is_internal_error() {
    let server = server(Arc::new(Outbox::default()));
    let res = post(
        &server,
        r#"{"jsonrpc":"2.0","method":"Service.SendMail","params":{"message":"explode"},"id":2}"#,
    )
    .await;

    let body = json_body(&res);
    assert_eq!(body["error"]["code"], -32603);
    assert!(body.get("result").is_none());
}

#[tokio::test]
async fn test_timestamp_param_bound_through_hook() {
    let server = server(Arc::new(Outbox::default()));
    let res = post(
        &server,
        r#"{"jsonrpc":"2.0","method":"Service.Schedule","params":{"message":"later","sendAt":"2024-03-01T12:00:00+01:00"},"id":3}"#,
    )
    .await;

    let body = json_body(&res);
    assert_eq!(body["result"], json!({"message": "later", "at": 1709290800}));
}

#[tokio::test]
async fn test_bad_timestamp_is_invalid_params() {
    let server = server(Arc::new(Outbox::default()));
    let res = post(
        &server,
        r#"{"jsonrpc":"2.0","method":"Service.Schedule","params":{"sendAt":"tomorrow"},"id":4}"#,
    )
    .await;

    let body = json_body(&res);
    assert_eq!(body["error"]["code"], -32602);
    assert_eq!(body["error"]["data"], json!({"sendAt": "tomorrow"}));
}

#[tokio::test]
async fn test_member_skipped_on_serialize_may_be_omitted() {
    let server = server(Arc::new(Outbox::default()));

    let res = post(
        &server,
        r#"{"jsonrpc":"2.0","method":"Service.Tag","params":{"message":"hi"},"id":12}"#,
    )
    .await;
    assert_eq!(json_body(&res)["result"], 0);

    let res = post(
        &server,
        r#"{"jsonrpc":"2.0","method":"Service.Tag","params":{"tags":["a","b"]},"id":13}"#,
    )
    .await;
    assert_eq!(json_body(&res)["result"], 2);
}

#[tokio::test]
async fn test_handler_protocol_error_passes_through() {
    let server = server(Arc::new(Outbox::default()));
    let res = post(
        &server,
        r#"{"jsonrpc":"2.0","method":"Service.Schedule","params":{"message":"now"},"id":5}"#,
    )
    .await;

    assert_eq!(
        json_body(&res)["error"],
        json!({"code": -32600, "message": "sendAt is required"})
    );
}

#[tokio::test]
async fn test_handler_sees_request_headers() {
    let server = server(Arc::new(Outbox::default()));
    let res = warp::test::request()
        .method("POST")
        .header("content-type", "application/json; charset=utf-8")
        .header("x-user", "ops")
        .body(r#"{"jsonrpc":"2.0","method":"Service.WhoAmI","id":6}"#)
        .reply(&server.routes())
        .await;

    assert_eq!(json_body(&res)["result"], "ops");
}

#[tokio::test]
async fn test_missing_content_type_uses_only_codec() {
    let server = server(Arc::new(Outbox::default()));
    let res = warp::test::request()
        .method("POST")
        .body(r#"{"jsonrpc":"2.0","method":"Service.SendMail","params":{"message":"hi"},"id":8}"#)
        .reply(&server.routes())
        .await;

    assert_eq!(json_body(&res)["result"], true);
}

#[tokio::test]
async fn test_positional_params_opt_in() {
    let server = RpcServer::builder()
        .bind(([127, 0, 0, 1], 0))
        .positional_params(true)
        .service(Arc::new(Outbox::default()), "Service")
        .build()
        .unwrap();

    let res = post(
        &server,
        r#"{"jsonrpc":"2.0","method":"Service.SendMail","params":["hi"],"id":9}"#,
    )
    .await;

    assert_eq!(json_body(&res)["result"], true);
}

#[tokio::test]
async fn test_body_limit() {
    let server = RpcServer::builder()
        .bind(([127, 0, 0, 1], 0))
        .max_body_bytes(32)
        .service(Arc::new(Outbox::default()), "Service")
        .build()
        .unwrap();

    let res = post(
        &server,
        r#"{"jsonrpc":"2.0","method":"Service.SendMail","params":{"message":"a long message"},"id":10}"#,
    )
    .await;

    assert_eq!(res.status(), 413);
}

#[tokio::test]
async fn test_register_after_build() {
    let server = RpcServer::builder()
        .bind(([127, 0, 0, 1], 0))
        .build()
        .unwrap();
    server.register(Arc::new(Outbox::default()), "Late").unwrap();

    let res = post(
        &server,
        r#"{"jsonrpc":"2.0","method":"Late.SendMail","params":{"message":"hi"},"id":11}"#,
    )
    .await;

    assert_eq!(json_body(&res)["result"], true);
}

#[tokio::test]
async fn test_run_until_stops_on_signal() {
    let server = server(Arc::new(Outbox::default()));
    server.run_until(async {}).await.unwrap();
}

#[tokio::test]
async fn test_run_fails_on_taken_port() {
    let taken = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = taken.local_addr().unwrap();

    let server = RpcServer::builder()
        .bind(addr)
        .service(Arc::new(Outbox::default()), "Service")
        .build()
        .unwrap();

    assert!(matches!(server.run_until(async {}).await, Err(Error::Io(_))));
}
