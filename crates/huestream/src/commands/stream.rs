//! `huestream stream`: the render loop.
//!
//! Acts as the color source for the manager: each tick writes a pattern
//! frame into the color buffer and calls `update()`. Ctrl-C, `--duration`,
//! or a failed reconnect end the loop; the area is always deactivated on
//! the way out.

use std::time::Duration;

use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info};

use huestream_core::{ConnectionManager, StreamState, UpdateOutcome};

use crate::cli::{GlobalOpts, StreamArgs};
use crate::config;
use crate::error::CliError;
use crate::output;
use crate::pattern::{self, ColorSource};

const MAX_FPS: u32 = 60;

pub async fn handle(args: StreamArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let base = pattern::parse_hex(&args.color)?;
    let bound = config::connect(global).await?;
    let profile = bound.profile()?;

    if !profile.enabled {
        return Err(CliError::StreamingDisabled {
            profile: bound.profile_name.clone(),
        });
    }
    let area_id = args
        .area
        .or_else(|| profile.area.clone())
        .ok_or_else(|| CliError::NoAreaSelected {
            profile: bound.profile_name.clone(),
        })?;
    let fps = args
        .fps
        .unwrap_or(bound.loaded.config.defaults.fps)
        .clamp(1, MAX_FPS);

    let manager = bound.manager.clone();
    let area = manager
        .find_area(&area_id)
        .await?
        .ok_or_else(|| CliError::NotFound {
            resource_type: "area".into(),
            identifier: area_id,
            list_command: "areas list".into(),
        })?;
    let channels = area.channel_count();
    let name = area.name.clone();
    manager.set_area(area).await;
    manager.set_enabled(true);

    if !start_or_interrupt(&manager).await? {
        manager.dispose().await;
        return Ok(());
    }
    output::success(
        &global.color,
        global.quiet,
        &format!("Streaming to '{name}' ({channels} channels) at {fps} fps, Ctrl-C to stop"),
    );

    let source = ColorSource::new(args.pattern, base);
    let started = Instant::now();
    let outcome = render(&manager, &source, channels, fps, args.duration, global).await;

    manager.stop().await;
    manager.dispose().await;
    info!(
        elapsed_ms = started.elapsed().as_millis(),
        "stream stopped, area deactivated"
    );
    outcome
}

/// Start streaming; `Ok(false)` when Ctrl-C arrived first.
async fn start_or_interrupt(manager: &ConnectionManager) -> Result<bool, CliError> {
    let starting = manager.start();
    tokio::pin!(starting);

    tokio::select! {
        result = &mut starting => {
            result?;
            Ok(true)
        }
        _ = tokio::signal::ctrl_c() => {
            debug!("interrupted during start");
            manager.stop().await;
            // The cancelled start settles with `Cancelled`.
            let _ = starting.await;
            Ok(false)
        }
    }
}

async fn render(
    manager: &ConnectionManager,
    source: &ColorSource,
    channels: usize,
    fps: u32,
    duration: Option<u64>,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let mut errors = manager.errors();
    let mut state = manager.state();
    state.mark_unchanged();

    let mut ticker = tokio::time::interval(Duration::from_secs_f64(1.0 / f64::from(fps)));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    let started = Instant::now();
    let deadline = async {
        match duration {
            Some(secs) => tokio::time::sleep_until(started + Duration::from_secs(secs)).await,
            None => std::future::pending().await,
        }
    };
    tokio::pin!(deadline);
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    let mut frames: u64 = 0;
    let outcome = loop {
        tokio::select! {
            _ = &mut ctrl_c => {
                debug!("interrupted");
                break Ok(());
            }
            () = &mut deadline => break Ok(()),
            Ok(report) = errors.recv() => {
                output::warning(&global.color, &report.message);
            }
            Ok(()) = state.changed() => {
                let current = *state.borrow_and_update();
                debug!(state = %current, "stream state changed");
                if current == StreamState::Idle {
                    break Err(CliError::Streaming {
                        message: "Lost the connection to the bridge and could not reconnect".into(),
                    });
                }
            }
            _ = ticker.tick() => {
                if let Err(e) = manager.set_colors(&source.frame(channels, started.elapsed())) {
                    break Err(e.into());
                }
                match manager.update() {
                    UpdateOutcome::Sent => frames += 1,
                    UpdateOutcome::ReconnectScheduled => output::warning(
                        &global.color,
                        "Frame delivery failed, reconnecting",
                    ),
                    UpdateOutcome::Skipped => {}
                }
            }
        }
    };

    info!(frames, "render loop finished");
    outcome
}
