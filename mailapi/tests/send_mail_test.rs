//! `Service.SendMail` over HTTP against an in-memory mailer

use mailapi::testing::RecordingMailer;
use mailapi::{Mail, MailService};
use mailrpc_server::{JsonCodec, RpcServer};
use serde_json::{json, Value};
use std::sync::Arc;

fn server(mailer: RecordingMailer) -> RpcServer {
    let service = MailService::new(mailer, "bot@example.com", "ops@example.com", "Contact form");
    RpcServer::builder()
        .bind(([127, 0, 0, 1], 0))
        .codec("application/json", Arc::new(JsonCodec))
        .service(Arc::new(service), "Service")
        .build()
        .unwrap()
}

async fn post(server: &RpcServer, body: Value) -> warp::http::Response<warp::hyper::body::Bytes> {
    warp::test::request()
        .method("POST")
        .header("content-type", "application/json")
        .body(body.to_string())
        .reply(&server.routes())
        .await
}

#[tokio::test]
async fn test_send_mail_delivers_and_answers_true() {
    let mailer = RecordingMailer::default();
    let server = server(mailer.clone());

    let res = post(
        &server,
        json!({"jsonrpc": "2.0", "method": "Service.SendMail", "params": {"message": "<p>hi</p>"}, "id": 1}),
    )
    .await;

    assert_eq!(res.status(), 200);
    assert_eq!(res.body().as_ref(), b"{\"jsonrpc\":\"2.0\",\"result\":true,\"id\":1}\n");
    assert_eq!(
        mailer.sent(),
        vec![Mail {
            from: "bot@example.com".into(),
            to: "ops@example.com".into(),
            subject: "Contact form".into(),
            html_body: "<p>hi</p>".into(),
        }]
    );
}

#[tokio::test]
async fn test_send_mail_notification_still_delivers() {
    let mailer = RecordingMailer::default();
    let server = server(mailer.clone());

    let res = post(
        &server,
        json!({"jsonrpc": "2.0", "method": "Service.SendMail", "params": {"message": "hi"}}),
    )
    .await;

    assert!(res.body().is_empty());
    assert_eq!(mailer.sent().len(), 1);
}

#[tokio::test]
async fn test_delivery_failure_is_internal_error() {
    let server = server(RecordingMailer::failing());

    let res = post(
        &server,
        json!({"jsonrpc": "2.0", "method": "Service.SendMail", "params": {"message": "hi"}, "id": "m-1"}),
    )
    .await;

    let body: Value = serde_json::from_slice(res.body()).unwrap();
    assert_eq!(body["error"]["code"], -32603);
    assert_eq!(body["id"], "m-1");
}

#[tokio::test]
async fn test_wrong_param_type_is_invalid_params() {
    let mailer = RecordingMailer::default();
    let server = server(mailer.clone());

    let res = post(
        &server,
        json!({"jsonrpc": "2.0", "method": "Service.SendMail", "params": {"message": 42}, "id": 2}),
    )
    .await;

    let body: Value = serde_json::from_slice(res.body()).unwrap();
    assert_eq!(body["error"]["code"], -32602);
    assert!(mailer.sent().is_empty());
}

#[tokio::test]
async fn test_missing_message_sends_empty_body() {
    let mailer = RecordingMailer::default();
    let server = server(mailer.clone());

    post(
        &server,
        json!({"jsonrpc": "2.0", "method": "Service.SendMail", "params": {}, "id": 3}),
    )
    .await;

    assert_eq!(mailer.sent()[0].html_body, "");
}

#[tokio::test]
async fn test_unknown_method() {
    let server = server(RecordingMailer::default());

    let res = post(
        &server,
        json!({"jsonrpc": "2.0", "method": "Service.Unsubscribe", "params": {}, "id": 4}),
    )
    .await;

    let body: Value = serde_json::from_slice(res.body()).unwrap();
    assert_eq!(body["error"]["code"], -32601);
    assert_eq!(body["error"]["message"], "rpc: can't find method");
}
