//! Diagnostics sink for the worker thread.
//!
//! The runtime never installs a global subscriber. Callers build a
//! [`Dispatch`] here and hand it over in
//! [`RuntimeConfig::dispatch`](crate::runtime::RuntimeConfig::dispatch).

use tracing::Dispatch;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::MakeWriter;

/// Stderr sink. `RUST_LOG` wins over `verbose` when set.
pub fn diagnostics_dispatch(verbose: bool) -> Dispatch {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter(verbose));
    build(filter, std::io::stderr)
}

/// Sink writing to `writer`, filtered by `verbose` only.
pub fn diagnostics_dispatch_with_writer<W>(verbose: bool, writer: W) -> Dispatch
where
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    build(default_filter(verbose), writer)
}

fn default_filter(verbose: bool) -> EnvFilter {
    EnvFilter::new(if verbose { "debug" } else { "info" })
}

fn build<W>(filter: EnvFilter, writer: W) -> Dispatch
where
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(writer)
        .with_ansi(false)
        .with_thread_names(true)
        .finish();
    Dispatch::new(subscriber)
}
