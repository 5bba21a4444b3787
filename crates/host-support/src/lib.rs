/*
 * SPDX-FileCopyrightText: Copyright (c) 2026 Arsenal Project contributors. All rights reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

//! arsenal-host-support is a library that is used by the registration
//! tooling that runs on arsenal managed hosts

use std::sync::Once;

use tracing::metadata::LevelFilter;
use tracing_subscriber::filter::EnvFilter;
use tracing_subscriber::prelude::*;
use tracing_subscriber::util::SubscriberInitExt;

pub mod client_config;
pub mod facter;
pub mod facts;
pub mod guest_vms;
pub mod interfaces;
pub mod registration;
pub mod unique_id;

static LOG_SETUP: Once = Once::new();

/// Initialize global logging output to STDOUT. Applies to all threads.
/// Use `export RUST_LOG=trace|debug|info|warn|error` to change log level.
pub fn init_logging() -> eyre::Result<()> {
    LOG_SETUP.call_once(|| {
        subscriber()
            .try_init()
            .expect("tracing_subscriber setup failed");
    });
    Ok(())
}

// A logging subscriber for use on the current thread.
// Usually you want `init_logging()` instead.
//
// Usage: `let guard = subscriber().set_default()`
// Subscriber is unregistered when guard is dropped.
pub fn subscriber() -> impl SubscriberInitExt {
    let env_filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy()
        .add_directive("hyper=warn".parse().unwrap())
        .add_directive("reqwest=warn".parse().unwrap())
        .add_directive("rustls=warn".parse().unwrap());
    let stdout_formatter = tracing_subscriber::fmt::layer();
    Box::new(tracing_subscriber::registry().with(stdout_formatter.with_filter(env_filter)))
}
