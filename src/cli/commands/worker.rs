use anyhow::Result;
use tokio::io::BufReader;

use crate::parallel::serve_worker;

/// Child side of the process pool; stdout carries reply frames only
pub async fn execute() -> Result<()> {
    serve_worker(BufReader::new(tokio::io::stdin()), tokio::io::stdout()).await
}
