/*
 * SPDX-FileCopyrightText: Copyright (c) 2026 Arsenal Project contributors. All rights reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

use std::time::Duration;

use clap::Parser;

fn main() -> eyre::Result<()> {
    host_support::init_logging()?;

    let rt = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    rt.block_on(register::run(register::command_line::Options::parse()))?;
    rt.shutdown_timeout(Duration::from_secs(2));
    Ok(())
}
