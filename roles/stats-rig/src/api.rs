use bytes::Bytes;
use http_body_util::Full;
use hyper::{
    body::Incoming, server::conn::http1, service::service_fn, Method, Request, Response, StatusCode,
};
use hyper_util::rt::TokioIo;
use serde::Serialize;
use serde_json::json;
use std::{convert::Infallible, sync::Arc, time::Duration};
use tokio::net::TcpListener;
use tracing::{error, info};

use rig_stats::{ReportCache, RigReport};

const NO_DATA: &str = r#"{"error":"no data available"}"#;

pub async fn run_http_server(
    address: String,
    reports: Arc<ReportCache>,
    staleness_threshold: Duration,
) -> Result<(), Box<dyn std::error::Error>> {
    let listener = TcpListener::bind(&address).await?;
    info!("🌐 HTTP rig stats listening on http://{}", address);

    loop {
        let (stream, _) = listener.accept().await?;
        let io = TokioIo::new(stream);
        let reports = reports.clone();

        tokio::task::spawn(async move {
            let service = service_fn(move |req| {
                let reports = reports.clone();
                async move { handle_request(req, reports, staleness_threshold).await }
            });

            if let Err(err) = http1::Builder::new()
                .keep_alive(true)
                .serve_connection(io, service)
                .await
            {
                error!("Error serving connection: {:?}", err);
            }
        });
    }
}

async fn handle_request(
    req: Request<Incoming>,
    reports: Arc<ReportCache>,
    staleness_threshold: Duration,
) -> Result<Response<Full<Bytes>>, Infallible> {
    Ok(route(req.method(), req.uri().path(), &reports, staleness_threshold))
}

fn route(
    method: &Method,
    path: &str,
    reports: &ReportCache,
    staleness_threshold: Duration,
) -> Response<Full<Bytes>> {
    if method != Method::GET {
        return text_response(StatusCode::METHOD_NOT_ALLOWED, "Method Not Allowed");
    }

    match path {
        "/api/report" => serve_report(reports, |report| json!(report)),
        "/api/short" => serve_report(reports, |report| json!(report.short)),
        "/api/long" => serve_report(reports, |report| json!(report.long)),
        "/api/overall" => serve_report(reports, |report| json!(report.overall)),
        "/api/short/chart" => serve_report(reports, |report| report.short.window.chart_columns()),
        "/api/long/chart" => serve_report(reports, |report| report.long.chart_columns()),
        "/health" => serve_health(reports, staleness_threshold),
        _ => text_response(StatusCode::NOT_FOUND, "Not Found"),
    }
}

fn serve_report<F, T>(reports: &ReportCache, select: F) -> Response<Full<Bytes>>
where
    F: FnOnce(&RigReport) -> T,
    T: Serialize,
{
    match reports.latest() {
        Some(report) => {
            let json =
                serde_json::to_string(&select(&report)).unwrap_or_else(|_| "{}".to_string());
            json_response(StatusCode::OK, json)
        }
        None => json_response(StatusCode::SERVICE_UNAVAILABLE, NO_DATA.to_string()),
    }
}

fn serve_health(reports: &ReportCache, staleness_threshold: Duration) -> Response<Full<Bytes>> {
    let stale = reports.is_stale(staleness_threshold);
    let status_code = if stale {
        StatusCode::SERVICE_UNAVAILABLE
    } else {
        StatusCode::OK
    };
    let json_response_body = json!({
        "healthy": !stale,
        "stale": stale,
        "age_secs": reports.age().map(|age| age.as_secs()),
    });
    json_response(status_code, json_response_body.to_string())
}

fn json_response(status: StatusCode, body: String) -> Response<Full<Bytes>> {
    let mut response = Response::new(Full::new(Bytes::from(body)));
    *response.status_mut() = status;
    response.headers_mut().insert(
        hyper::header::CONTENT_TYPE,
        hyper::header::HeaderValue::from_static("application/json"),
    );
    response
}

fn text_response(status: StatusCode, body: &'static str) -> Response<Full<Bytes>> {
    let mut response = Response::new(Full::new(Bytes::from(body)));
    *response.status_mut() = status;
    response
}
