pub mod context;
pub mod lifecycle;
mod upstream_bridge;

pub use lifecycle::{run_standalone, serve};

pub async fn run() -> anyhow::Result<()> {
    run_standalone().await
}
