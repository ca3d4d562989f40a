use http::{Request, Response};
use std::convert::Infallible;
use tower::{service_fn, ServiceBuilder, ServiceExt};
use tracing::info;
use tracing_cloud_logging::init::init_tracing_with_config;
use tracing_cloud_logging::middleware::RequestContextLayer;
use tracing_cloud_logging::Options;

async fn handle(req: Request<()>) -> Result<Response<&'static str>, Infallible> {
    info!(path = req.uri().path(), "handling request");
    Ok(Response::new("ok"))
}

#[tokio::main]
async fn main() {
    if let Err(e) = init_tracing_with_config(std::io::stdout(), Options::new().project_id("my-project")) {
        eprintln!("failed to set up logging: {}", e);
        return;
    }

    let service = ServiceBuilder::new()
        .layer(RequestContextLayer::new())
        .service(service_fn(handle));

    let req = Request::get("/orders/7")
        .header("User-Agent", "demo/1.0")
        .header("X-Cloud-Trace-Context", "105445aa7843bc8bf206b12000100000/1;o=1")
        .body(())
        .expect("valid request");
    if let Err(e) = service.oneshot(req).await {
        eprintln!("request failed: {}", e);
    }

    info!("outside of any request");
}
