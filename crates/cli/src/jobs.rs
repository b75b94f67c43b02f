//! Text transport for jobs: one framed job per line, standard base64.

use anyhow::Context;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as B64;

use rooks_search::{Job, JobRegistry};

pub fn encode_line(registry: &JobRegistry, job: &Job) -> String {
    B64.encode(registry.encode(job))
}

pub fn decode_line(registry: &JobRegistry, line: &str) -> anyhow::Result<Job> {
    let bytes = B64
        .decode(line.trim().as_bytes())
        .context("job is not valid base64")?;
    registry.decode(&bytes).context("decode job")
}
