mod cli;

use anyhow::{bail, Context};
use clap::Parser;
use datamaps::prelude::*;
use datamaps::rendering::headless::View;

/// Headless map viewer: loads a map, applies the requested toggles and
/// prints what a reader would see.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    datamaps::init_logging();
    let args = cli::Cli::parse();

    let config = MapConfig::load(&args.config)
        .with_context(|| format!("Loading map definition {}", args.config.display()))?;
    let state = match &args.storage {
        Some(path) => PersistentState::new(
            args.page.clone(),
            Box::new(
                FileStorage::open(path)
                    .with_context(|| format!("Opening storage {}", path.display()))?,
            ),
        ),
        None => PersistentState::in_memory(args.page.clone()),
    };

    let mut map = MapController::new(args.page.clone(), Arc::new(config), HeadlessSurface::new(), state)
        .with_context(|| "Building map")?;
    if let Some(link) = &args.link {
        map = map.with_link(link).with_context(|| "Reading page address")?;
    }
    if let Some(revision) = args.revision {
        map = map.with_revision(revision);
    }
    map.on_error(|error| log::error!("{}", error));

    let report = match (&args.api, &args.markers) {
        (Some(endpoint), _) => {
            let source = ApiMarkerSource::new(endpoint)?;
            map.stream_markers(&source, None).await
        }
        (None, Some(path)) => {
            let payload = MarkerPayload::load(path)
                .with_context(|| format!("Loading markers {}", path.display()))?;
            map.stream_markers(&StaticMarkerSource::new(payload), None).await
        }
        (None, None) => bail!("either a marker file or --api is required"),
    }
    .with_context(|| "Loading markers")?;
    if let Some(report) = &report {
        log::info!(
            "{} markers in {} layers",
            report.markers,
            report.layers.len()
        );
    }

    if let Some(index) = args.background {
        map.set_background(index)?;
    }
    for layer in &args.hide {
        map.set_layer_visibility(layer, false)?;
    }
    for layer in &args.show {
        map.set_layer_visibility(layer, true)?;
    }
    for marker in &args.toggle {
        let dismissed = map
            .toggle_dismissed(&StableKey::new(marker.as_str()))
            .with_context(|| format!("Toggling {}", marker))?;
        println!("{} {}", if dismissed { "collected" } else { "restored" }, marker);
    }

    for event in map.process_events() {
        log::debug!("{:?}", event);
    }

    if let Some(query) = &args.search {
        for marker in map.search(query) {
            println!("{}\t{}", marker.key(), marker.group());
        }
        return Ok(());
    }

    print_summary(&map);
    Ok(())
}

fn print_summary(map: &MapController<HeadlessSurface>) {
    println!("background: {}", map.background());
    if let Some(View::Center { center, .. }) = map.surface().view() {
        println!("centered on: {:.2}, {:.2}", center.lat, center.lng);
    }
    if let Some(focused) = map.focused() {
        println!("focused: {}", focused);
    }
    if let Some(link) = map.link() {
        println!("link: {}", link);
    }

    for marker in map.markers() {
        if !map.is_marker_visible(marker.key()) {
            continue;
        }
        let position = marker.render_position().unwrap_or_default();
        let title = map
            .popup(marker.key())
            .map(|popup| popup.title)
            .unwrap_or_default();
        println!(
            "{}\t{}\t{:.3}, {:.3}\t{}{}",
            marker.key(),
            marker.group(),
            position.lat,
            position.lng,
            title,
            if marker.is_dismissed() { "\t(collected)" } else { "" }
        );
    }
}
