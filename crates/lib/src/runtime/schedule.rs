//! Deferred bootstrap scheduling.
//!
//! The host shows its UI first; the bootstrap runs one scheduling tick later
//! on the blocking pool, since first-run extraction can be slow.

use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::error;

use crate::platform::paths::RuntimeLayout;

use super::{error_text, run_script};

/// Spawn a single-shot bootstrap task on `runtime`, resolving to the text to
/// display.
///
/// Callable from synchronous code; the task only starts once `runtime` is
/// driven.
pub fn schedule_bootstrap(runtime: &Handle, layout: RuntimeLayout, script_source: String) -> JoinHandle<String> {
  runtime.spawn(async move {
    tokio::task::yield_now().await;
    match tokio::task::spawn_blocking(move || run_script(&layout, &script_source)).await {
      Ok(text) => text,
      Err(e) => {
        error!(error = %e, "bootstrap task panicked");
        error_text(&e)
      }
    }
  })
}
