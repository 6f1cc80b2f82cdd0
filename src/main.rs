use anyhow::Result;
use clap::Parser;
use std::path::Path;

mod cli;
mod ctl;
mod msg;
mod render;
mod status;
mod tune;
mod units;

use cli::PathOptions;
use ctl::CtlError;
use msg::{PathPatch, PathState, IFNAME_MAX};
use status::StatusFilter;

/// What one invocation does: enumerate matching paths, or apply one patch.
#[derive(Debug)]
enum Action {
    Status(StatusFilter),
    Modify(PathPatch),
}

/// Decide between enumeration and mutation, validating before any channel
/// exists. A name alone is a query; mutating fields need a named target.
fn plan(opts: &PathOptions) -> Result<Action, CtlError> {
    if let Some(name) = opts.ifname.as_deref() {
        if name.len() > IFNAME_MAX {
            return Err(CtlError::Argument(format!(
                "interface name '{name}' is longer than {IFNAME_MAX} bytes"
            )));
        }
    }

    let needs_target = opts.rate_mode.is_some()
        || opts.rate_tx.is_some()
        || opts.rate_rx.is_some()
        || opts.beat.is_some()
        || opts.loss_limit.is_some()
        || opts.rtt_limit.is_some();
    let mutating = needs_target || opts.state.is_some() || opts.preferred;

    if opts.ifname.is_some() && mutating {
        return Ok(Action::Modify(tune::build_patch(opts)));
    }
    if needs_target {
        return Err(CtlError::Argument(
            "an interface name is required to modify a path".into(),
        ));
    }
    Ok(Action::Status(StatusFilter {
        state: opts.state.unwrap_or(PathState::Empty),
        ifname: opts.ifname.clone(),
    }))
}

fn main() -> Result<()> {
    let opts = cli::Cli::parse().into_options();
    let action = plan(&opts)?;
    let mut chan = ctl::connect(opts.dev.as_deref(), Path::new(ctl::RUN_DIR))?;
    match action {
        Action::Status(filter) => status::run(&mut chan, &filter)?,
        Action::Modify(patch) => tune::run(&mut chan, &patch)?,
    }
    Ok(())
}
