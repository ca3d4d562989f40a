use tracing::{error, info, info_span, warn};
use tracing_cloud_logging::init::init_tracing_with_config;
use tracing_cloud_logging::{Level, Options};

fn main() {
    let options = Options::new()
        .level(Level::DEBUG)
        .add_source(true)
        .project_id("my-project");
    if let Err(e) = init_tracing_with_config(std::io::stdout(), options) {
        eprintln!("failed to set up logging: {}", e);
        return;
    }

    info!("starting service");
    warn!(disk_free_mb = 512, "disk space low");

    let span = info_span!("job", job_id = 42);
    let _guard = span.enter();
    error!(reason = "invalid input", "job failed");
}
