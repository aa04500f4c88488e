use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use fieldmap::{
    api::{places::HttpPlaceSource, push::HttpLinePushSource},
    navigation::provider::ScriptedPositionProvider,
    render::surface::LogSurface,
    FieldMapConfig, LatLng, MapSession,
};

/// How often pending live updates and position changes are applied
const EVENT_POLL_INTERVAL: Duration = Duration::from_millis(200);

/// Headless runner: keeps the marker set in sync and logs every render command.
///
/// Usage: `fieldmap-app [config.json] [lat,lng]`. With a position, the runner
/// navigates to the nearest marker after the first refresh.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    fieldmap::init_logging();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let config = match args.first() {
        Some(path) => FieldMapConfig::from_file(path)
            .with_context(|| format!("failed to load config from {}", path))?,
        None => FieldMapConfig::default(),
    };
    let start_position = args
        .get(1)
        .map(|arg| parse_position(arg))
        .transpose()?;

    let positions = ScriptedPositionProvider::new();
    if let Some(position) = start_position {
        positions.set_position(position);
    }

    let places = HttpPlaceSource::from_config(&config)?;
    let mut session = MapSession::new(config.clone(), LogSurface, Arc::new(positions));
    if config.live.endpoint.is_some() {
        session = session.with_push_source(Arc::new(HttpLinePushSource::new()?));
    }

    session.on_foreground();
    match session.refresh_from(&places).await {
        Ok(diff) => log::info!("Loaded {} markers", diff.added.len()),
        Err(e) => log::warn!("Initial load failed: {}", e),
    }

    if start_position.is_some() {
        match session.navigate_to_nearest().await {
            Ok((marker, route)) => log::info!(
                "Navigating to {} ({:.2} km)",
                marker.id,
                route.remaining_km()
            ),
            Err(e) => log::warn!("Cannot navigate: {}", e),
        }
    }

    let mut refresh = tokio::time::interval(config.refresh.interval());
    refresh.tick().await;
    let mut events = tokio::time::interval(EVENT_POLL_INTERVAL);
    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = refresh.tick(), if config.refresh.enabled => {
                if let Err(e) = session.refresh_from(&places).await {
                    log::warn!("Refresh failed, keeping {} markers: {}", session.store().len(), e);
                }
                if !session.is_live() && session.is_foreground() {
                    // server hung up or never answered; retry at refresh pace
                    session.on_foreground();
                }
            }
            _ = events.tick() => {
                let report = session.poll_live();
                for notice in &report.notices {
                    log::info!("Live channel: {:?}", notice);
                }
                session.pump_navigation();
            }
            _ = &mut shutdown => {
                log::info!("Shutting down");
                break;
            }
        }
    }

    session.teardown();
    Ok(())
}

fn parse_position(arg: &str) -> anyhow::Result<LatLng> {
    let (lat, lng) = arg
        .split_once(',')
        .with_context(|| format!("expected 'lat,lng', got '{}'", arg))?;
    let position = LatLng::new(lat.trim().parse()?, lng.trim().parse()?);
    anyhow::ensure!(position.is_valid(), "position {} is out of range", position);
    Ok(position)
}
