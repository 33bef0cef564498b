//! The auto-generator: admits synthetic items on a jittered timer.
//!
//! Each firing redraws its delay, so arrivals are irregular. The loop checks
//! for cancellation while it waits; stopping it never touches runs that are
//! already in flight.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use sluice_core::{item::Item, store::DurableStore};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::{
  Error, Result, config::GeneratorConfig, pipeline::Engine,
  templates::TemplatePool,
};

#[derive(Default)]
pub struct Generator {
  running: Mutex<Option<CancellationToken>>,
}

impl Generator {
  pub fn new() -> Self { Self::default() }

  pub fn is_running(&self) -> bool { self.lock().is_some() }

  /// Start generating. Fails with [`Error::AlreadyRunning`] if a generator
  /// is already active.
  pub fn start<S>(
    &self,
    engine: Engine<S>,
    templates: Arc<TemplatePool>,
    config: GeneratorConfig,
  ) -> Result<()>
  where
    S: DurableStore + 'static,
  {
    let mut running = self.lock();
    if running.is_some() {
      return Err(Error::AlreadyRunning);
    }
    let token = CancellationToken::new();
    *running = Some(token.clone());

    tokio::spawn(generate(engine, templates, config, token));
    info!("demo generator started");
    Ok(())
  }

  /// Stop generating. Returns whether a generator was running.
  pub fn stop(&self) -> bool {
    match self.lock().take() {
      Some(token) => {
        token.cancel();
        info!("demo generator stopped");
        true
      }
      None => false,
    }
  }

  fn lock(&self) -> MutexGuard<'_, Option<CancellationToken>> {
    self.running.lock().unwrap_or_else(PoisonError::into_inner)
  }
}

async fn generate<S>(
  engine: Engine<S>,
  templates: Arc<TemplatePool>,
  config: GeneratorConfig,
  token: CancellationToken,
) where
  S: DurableStore + 'static,
{
  loop {
    let delay = config.next_delay();
    tokio::select! {
      _ = token.cancelled() => break,
      _ = tokio::time::sleep(delay) => {}
    }

    let active = engine.active_processing();
    if active >= config.ceiling {
      debug!(active, ceiling = config.ceiling, "at ceiling; skipping admission");
      continue;
    }
    if let Err(e) = engine.admit(Item::from_template(templates.pick())) {
      warn!(error = %e, "generator failed to admit item");
    }
  }
}
