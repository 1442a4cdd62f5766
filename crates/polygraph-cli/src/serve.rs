//! HTTP front end.
//!
//! - `GET /`: HTML form
//! - `POST /check`: form `fact=...`, renders the verdict into the page
//! - `POST /api/check`: form or JSON `{"fact": ...}`, returns `{fact, verdict}`
//! - `GET /healthz`
//!
//! One [`Pipeline`] is built at startup and shared by every connection.

use anyhow::{anyhow, Result};
use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::body::Incoming;
use hyper::header::CONTENT_TYPE;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Method, Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{error, info};
use url::form_urlencoded;

use polygraph_agent::Pipeline;

#[derive(Debug, Deserialize)]
struct CheckRequest {
    #[serde(default)]
    fact: String,
}

#[derive(Debug, Serialize)]
struct CheckResponse<'a> {
    fact: &'a str,
    verdict: bool,
}

pub async fn serve(pipeline: Arc<Pipeline>, listen: SocketAddr) -> Result<()> {
    let listener = TcpListener::bind(listen)
        .await
        .map_err(|e| anyhow!("serve: failed to bind {listen}: {e}"))?;
    let bound = listener
        .local_addr()
        .map_err(|e| anyhow!("serve: failed to read bound addr: {e}"))?;
    info!(addr = %bound, "listening");
    eprintln!("serve: listening on http://{bound}");

    loop {
        let (stream, _peer) = listener
            .accept()
            .await
            .map_err(|e| anyhow!("serve: accept failed: {e}"))?;
        let io = TokioIo::new(stream);
        let pipeline = pipeline.clone();

        tokio::spawn(async move {
            let service = service_fn(move |req| handle_request(req, pipeline.clone()));
            if let Err(e) = http1::Builder::new().serve_connection(io, service).await {
                error!(error = %e, "connection error");
            }
        });
    }
}

async fn handle_request(
    req: Request<Incoming>,
    pipeline: Arc<Pipeline>,
) -> Result<Response<Full<Bytes>>, hyper::Error> {
    let method = req.method().clone();
    let path = req.uri().path().to_string();
    let content_type = req
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    let body = req.into_body().collect().await?.to_bytes();

    Ok(route(&pipeline, &method, &path, content_type.as_deref(), &body).await)
}

async fn route(
    pipeline: &Pipeline,
    method: &Method,
    path: &str,
    content_type: Option<&str>,
    body: &[u8],
) -> Response<Full<Bytes>> {
    match (method, path) {
        (&Method::GET, "/healthz") => text_response(StatusCode::OK, "ok\n"),
        (&Method::GET, "/") => html_response(StatusCode::OK, &render_page("", None, None)),
        (&Method::POST, "/check") => {
            let fact = form_field(body, "fact").unwrap_or_default();
            let fact = fact.trim();
            if fact.is_empty() {
                return html_response(
                    StatusCode::OK,
                    &render_page("", None, Some("Enter a claim to check.")),
                );
            }
            match pipeline.run(fact).await {
                Ok(state) => html_response(
                    StatusCode::OK,
                    &render_page(fact, Some(state.verdict().unwrap_or(false)), None),
                ),
                Err(e) => {
                    error!(error = %e, "check failed");
                    html_response(StatusCode::OK, &render_page(fact, None, Some(&e.to_string())))
                }
            }
        }
        (&Method::POST, "/api/check") => {
            let fact = match api_fact(content_type, body) {
                Ok(fact) => fact,
                Err(e) => return json_error(StatusCode::BAD_REQUEST, &e.to_string()),
            };
            let fact = fact.trim();
            if fact.is_empty() {
                return json_error(StatusCode::BAD_REQUEST, "fact must not be empty");
            }
            match pipeline.run(fact).await {
                Ok(state) => json_response(
                    StatusCode::OK,
                    &CheckResponse {
                        fact,
                        verdict: state.verdict().unwrap_or(false),
                    },
                ),
                Err(e) => {
                    error!(error = %e, "api check failed");
                    json_error(StatusCode::INTERNAL_SERVER_ERROR, &e.to_string())
                }
            }
        }
        _ => text_response(StatusCode::NOT_FOUND, "not found\n"),
    }
}

fn form_field(body: &[u8], name: &str) -> Option<String> {
    form_urlencoded::parse(body)
        .find(|(k, _)| k == name)
        .map(|(_, v)| v.into_owned())
}

fn api_fact(content_type: Option<&str>, body: &[u8]) -> Result<String> {
    let is_json = content_type
        .map(|ct| ct.trim().to_ascii_lowercase().starts_with("application/json"))
        .unwrap_or(false);
    if is_json {
        let req: CheckRequest =
            serde_json::from_slice(body).map_err(|e| anyhow!("failed to parse check request JSON: {e}"))?;
        Ok(req.fact)
    } else {
        Ok(form_field(body, "fact").unwrap_or_default())
    }
}

fn render_page(fact: &str, verdict: Option<bool>, message: Option<&str>) -> String {
    let result = match (verdict, message) {
        (_, Some(msg)) => format!("<pre class=\"error\">{}</pre>", escape_html(msg)),
        (Some(true), None) => "<p class=\"verdict true\">Verdict: <strong>true</strong></p>".to_string(),
        (Some(false), None) => "<p class=\"verdict false\">Verdict: <strong>false</strong></p>".to_string(),
        (None, None) => String::new(),
    };
    format!(
        r#"<!doctype html>
<html>
<head>
<meta charset="utf-8">
<title>Polygraph</title>
<style>
body {{ font-family: sans-serif; max-width: 40rem; margin: 3rem auto; }}
textarea {{ width: 100%; }}
.true {{ color: #137333; }}
.false {{ color: #b3261e; }}
.error {{ color: #b3261e; white-space: pre-wrap; }}
</style>
</head>
<body>
<h1>Polygraph</h1>
<form method="post" action="/check">
<textarea name="fact" rows="3" placeholder="2 + 2 = 4, or Paris is the capital of France">{fact}</textarea>
<p><button type="submit">Check</button></p>
</form>
{result}
</body>
</html>
"#,
        fact = escape_html(fact),
        result = result,
    )
}

fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

fn text_response(status: StatusCode, body: &str) -> Response<Full<Bytes>> {
    Response::builder()
        .status(status)
        .header(CONTENT_TYPE, "text/plain; charset=utf-8")
        .body(Full::new(Bytes::from(body.to_string())))
        .unwrap_or_else(|_| Response::new(Full::new(Bytes::from_static(b"internal error"))))
}

fn html_response(status: StatusCode, body: &str) -> Response<Full<Bytes>> {
    Response::builder()
        .status(status)
        .header(CONTENT_TYPE, "text/html; charset=utf-8")
        .body(Full::new(Bytes::from(body.to_string())))
        .unwrap_or_else(|_| Response::new(Full::new(Bytes::from_static(b"internal error"))))
}

fn json_response<T: Serialize>(status: StatusCode, value: &T) -> Response<Full<Bytes>> {
    let body = serde_json::to_vec(value).unwrap_or_else(|_| b"{\"error\":\"serialize\"}".to_vec());
    Response::builder()
        .status(status)
        .header(CONTENT_TYPE, "application/json")
        .body(Full::new(Bytes::from(body)))
        .unwrap_or_else(|_| Response::new(Full::new(Bytes::from_static(b"{\"error\":\"internal\"}"))))
}

fn json_error(status: StatusCode, msg: &str) -> Response<Full<Bytes>> {
    let v = serde_json::json!({ "error": msg });
    json_response(status, &v)
}
