mod cli;
mod demo;
mod infra;
mod routes;
mod server;

use readiness_score::error::AppError;

pub async fn run() -> Result<(), AppError> {
    cli::run().await
}
