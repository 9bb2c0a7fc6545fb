//! Fetch command - fetch a grid of tiles and write the composited frame as PNG.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tileflow::config::{PipelineConfig, SurfaceConfig};
use tileflow::coordinator::{CoordinatorStats, TileEvent, TileFetchCoordinator};
use tileflow::decode::ImageTileDecoder;
use tileflow::logging::{default_log_dir, default_log_file, init_logging};
use tileflow::network::ReqwestNetwork;
use tileflow::surface::{CompositorSurface, DestRect, OffscreenPresenter, SurfaceSize};
use tileflow::tile::{FetchErrorKind, TileSpec};
use tokio::runtime::Handle;
use tracing::info;

use super::load_config;
use crate::error::CliError;

/// Largest frame edge in pixels.
const MAX_FRAME_DIMENSION: u32 = 16384;

/// Most tiles fetched by one invocation.
const MAX_GRID_TILES: u64 = 4096;

/// Arguments for the fetch command.
pub struct FetchArgs {
    pub map_id: u32,
    pub zoom: u8,
    pub x: u32,
    pub y: u32,
    /// Tile columns; defaults to covering the configured frame width.
    pub cols: Option<u32>,
    /// Tile rows; defaults to covering the configured frame height.
    pub rows: Option<u32>,
    pub output: PathBuf,
    pub config: Option<PathBuf>,
    pub workers: Option<usize>,
}

/// One tile of the requested grid and where it lands in the frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct GridCell {
    spec: TileSpec,
    col: u32,
    row: u32,
}

#[derive(Debug)]
struct GridPlan {
    cells: Vec<GridCell>,
    frame: SurfaceSize,
    tile_size: u32,
}

#[derive(Debug, Default)]
struct FetchReport {
    drawn: usize,
    failures: Vec<(TileSpec, FetchErrorKind, String)>,
    stats: CoordinatorStats,
}

impl FetchReport {
    fn reported(&self) -> usize {
        self.drawn + self.failures.len()
    }
}

pub fn run(args: FetchArgs) -> Result<(), CliError> {
    let mut config = load_config(args.config.as_deref())?.into_config();
    if let Some(workers) = args.workers {
        config.decode.workers = workers;
    }
    let plan = plan_grid(&args, &config.surface)?;

    let _log_guard =
        init_logging(&default_log_dir(), default_log_file()).map_err(CliError::LoggingInit)?;
    info!(
        map_id = args.map_id,
        zoom = args.zoom,
        tiles = plan.cells.len(),
        frame = %plan.frame,
        source = %config.source.url_template,
        "Fetching tile grid"
    );

    let presenter = OffscreenPresenter::new();
    let mut surface = CompositorSurface::new(Box::new(presenter.clone()), plan.frame)?;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(CliError::Runtime)?;
    let started = Instant::now();
    let report = runtime.block_on(fetch_tiles(&config, &plan, &mut surface))?;

    surface.swap_buffers()?;
    for ack in presenter.take_acks() {
        surface.on_swap_complete(ack);
    }

    let frame = presenter.last_frame().ok_or(CliError::NoFrame)?;
    let (width, height) = (frame.width, frame.height);
    let image = image::RgbaImage::from_raw(width, height, frame.pixels).ok_or(CliError::NoFrame)?;
    image
        .save_with_format(&args.output, image::ImageFormat::Png)
        .map_err(|source| CliError::FileWrite {
            path: args.output.clone(),
            source,
        })?;

    println!(
        "Fetched {}/{} tiles in {:.2}s",
        report.drawn,
        plan.cells.len(),
        started.elapsed().as_secs_f64()
    );
    for (spec, kind, message) in &report.failures {
        println!("  {} failed: {} ({})", spec, kind, message);
    }
    println!("  {}", report.stats);
    println!("Wrote {}x{} frame to {}", width, height, args.output.display());
    Ok(())
}

/// Expand the requested origin and extent into grid cells and a frame size.
///
/// Without `--cols`/`--rows` the grid covers the configured frame size, and
/// tiles past its edge are clipped.
fn plan_grid(args: &FetchArgs, surface: &SurfaceConfig) -> Result<GridPlan, CliError> {
    let tile_size = surface.tile_size;
    if tile_size == 0 {
        return Err(CliError::InvalidArgs("tile size must be positive".to_string()));
    }
    let (default_cols, default_rows) = surface.grid_extent();
    let cols = args.cols.unwrap_or(default_cols);
    let rows = args.rows.unwrap_or(default_rows);
    if cols == 0 || rows == 0 {
        return Err(CliError::InvalidArgs(
            "--cols and --rows must be at least 1".to_string(),
        ));
    }
    if cols as u64 * rows as u64 > MAX_GRID_TILES {
        return Err(CliError::InvalidArgs(format!(
            "a {}x{} grid exceeds the limit of {} tiles",
            cols, rows, MAX_GRID_TILES
        )));
    }

    let frame = SurfaceSize::new(
        frame_edge(args.cols.map(|_| cols), tile_size, surface.width, "width")?,
        frame_edge(args.rows.map(|_| rows), tile_size, surface.height, "height")?,
    );

    let mut cells = Vec::with_capacity((cols * rows) as usize);
    for row in 0..rows {
        for col in 0..cols {
            let (Some(x), Some(y)) = (args.x.checked_add(col), args.y.checked_add(row)) else {
                return Err(CliError::InvalidArgs("tile coordinates overflow".to_string()));
            };
            let spec = TileSpec::new(args.map_id, args.zoom, x, y);
            if !spec.is_in_grid() {
                return Err(CliError::InvalidArgs(format!(
                    "tile {} is outside the {}x{} grid of zoom {}",
                    spec,
                    spec.grid_size(),
                    spec.grid_size(),
                    args.zoom
                )));
            }
            cells.push(GridCell { spec, col, row });
        }
    }
    Ok(GridPlan {
        cells,
        frame,
        tile_size,
    })
}

/// Frame edge along one axis: `count` tiles when given, else the configured size.
fn frame_edge(
    count: Option<u32>,
    tile_size: u32,
    configured: u32,
    axis: &str,
) -> Result<u32, CliError> {
    let edge = match count {
        Some(count) => count.checked_mul(tile_size),
        None => Some(configured),
    };
    match edge {
        Some(edge) if edge > 0 && edge <= MAX_FRAME_DIMENSION => Ok(edge),
        _ => Err(CliError::InvalidArgs(format!(
            "frame {} must be between 1 and {} pixels",
            axis, MAX_FRAME_DIMENSION
        ))),
    }
}

/// What woke the event loop.
enum Step {
    Network(Option<tileflow::network::NetworkEvent>),
    Decoded,
    Tick,
}

/// Run the coordinator until every cell has been reported, drawing each
/// ready tile into `surface` as it arrives.
async fn fetch_tiles(
    config: &PipelineConfig,
    plan: &GridPlan,
    surface: &mut CompositorSurface,
) -> Result<FetchReport, CliError> {
    let (network, mut network_events) =
        ReqwestNetwork::new(Handle::current(), config.network.timeout())?;
    let network = network.with_max_payload(config.network.max_payload_bytes);
    let (coordinator, mut tile_events) = TileFetchCoordinator::new(
        Box::new(network),
        config.source.tile_source(),
        Arc::new(ImageTileDecoder::new()),
    );
    let mut coordinator = match config.decode.build_pool()? {
        Some(pool) => coordinator.with_decode_pool(pool),
        None => coordinator,
    };

    let placement: HashMap<TileSpec, DestRect> = plan
        .cells
        .iter()
        .map(|cell| {
            (
                cell.spec,
                DestRect::grid_cell(cell.col, cell.row, plan.tile_size),
            )
        })
        .collect();
    for cell in &plan.cells {
        coordinator.request_tile(cell.spec);
    }

    let expiry = config.network.expiry();
    let mut ticker = tokio::time::interval(Duration::from_secs(1));
    let mut report = FetchReport::default();

    while report.reported() < plan.cells.len() {
        let decoding = coordinator.decodes_in_flight() > 0;
        let step = tokio::select! {
            event = network_events.recv() => Step::Network(event),
            _ = coordinator.recv_decoded(), if decoding => Step::Decoded,
            _ = ticker.tick() => Step::Tick,
        };

        match step {
            Step::Network(Some(event)) => coordinator.handle_network_event(event),
            Step::Network(None) => break,
            Step::Decoded => {}
            Step::Tick => {
                coordinator.expire_stale(Instant::now(), expiry);
            }
        }

        while let Ok(event) = tile_events.try_recv() {
            let spec = apply_tile_event(event, &placement, surface, &mut report)?;
            coordinator.evict(spec);
        }
    }

    report.stats = coordinator.stats();
    Ok(report)
}

/// Draw a ready tile at its cell or record the failure. Returns the tile's spec.
fn apply_tile_event(
    event: TileEvent,
    placement: &HashMap<TileSpec, DestRect>,
    surface: &mut CompositorSurface,
    report: &mut FetchReport,
) -> Result<TileSpec, CliError> {
    let spec = event.spec();
    match event {
        TileEvent::Ready { tile, .. } => {
            if let Some(dest) = placement.get(&spec) {
                surface.draw_tile(tile, *dest)?;
                report.drawn += 1;
            }
        }
        TileEvent::Failed { kind, message, .. } => report.failures.push((spec, kind, message)),
    }
    Ok(spec)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tileflow::decode::DecodedTile;

    fn args(zoom: u8, x: u32, y: u32, cols: u32, rows: u32) -> FetchArgs {
        FetchArgs {
            map_id: 1,
            zoom,
            x,
            y,
            cols: Some(cols),
            rows: Some(rows),
            output: PathBuf::from("frame.png"),
            config: None,
            workers: None,
        }
    }

    #[test]
    fn test_plan_grid_row_major() {
        let plan = plan_grid(&args(3, 2, 5, 2, 2), &SurfaceConfig::default()).unwrap();

        let placed: Vec<(u32, u32, u32, u32)> = plan
            .cells
            .iter()
            .map(|c| (c.spec.x(), c.spec.y(), c.col, c.row))
            .collect();
        assert_eq!(
            placed,
            vec![(2, 5, 0, 0), (3, 5, 1, 0), (2, 6, 0, 1), (3, 6, 1, 1)]
        );
        assert_eq!(plan.frame, SurfaceSize::new(512, 512));
    }

    #[test]
    fn test_plan_grid_defaults_to_configured_frame() {
        let surface = SurfaceConfig::default()
            .with_size(600, 256)
            .with_tile_size(256);
        let mut request = args(4, 0, 0, 1, 1);
        request.cols = None;
        request.rows = None;

        let plan = plan_grid(&request, &surface).unwrap();
        assert_eq!(plan.cells.len(), 3);
        assert_eq!(plan.frame, SurfaceSize::new(600, 256));
    }

    #[test]
    fn test_plan_grid_rejects_tiles_outside_zoom() {
        assert!(matches!(
            plan_grid(&args(1, 1, 0, 2, 1), &SurfaceConfig::default()),
            Err(CliError::InvalidArgs(_))
        ));
    }

    #[test]
    fn test_plan_grid_rejects_empty_extent() {
        assert!(matches!(
            plan_grid(&args(3, 0, 0, 0, 1), &SurfaceConfig::default()),
            Err(CliError::InvalidArgs(_))
        ));
    }

    #[test]
    fn test_plan_grid_rejects_oversized_extent() {
        for (cols, rows) in [(70_000, 70_000), (u32::MAX, 1), (100, 1)] {
            assert!(matches!(
                plan_grid(&args(31, 0, 0, cols, rows), &SurfaceConfig::default()),
                Err(CliError::InvalidArgs(_))
            ));
        }
    }

    #[test]
    fn test_every_ready_tile_is_drawn() {
        let tile_size = 4;
        let plan = plan_grid(
            &args(5, 0, 0, 17, 17),
            &SurfaceConfig::default().with_tile_size(tile_size),
        )
        .unwrap();
        let placement: HashMap<TileSpec, DestRect> = plan
            .cells
            .iter()
            .map(|c| (c.spec, DestRect::grid_cell(c.col, c.row, tile_size)))
            .collect();
        let presenter = OffscreenPresenter::new();
        let mut surface = CompositorSurface::new(Box::new(presenter), plan.frame).unwrap();
        let mut report = FetchReport::default();

        for cell in &plan.cells {
            let tile = DecodedTile::solid(cell.spec, tile_size, tile_size, [0, 200, 0, 255]).unwrap();
            let event = TileEvent::Ready {
                spec: cell.spec,
                tile,
            };
            assert_eq!(
                apply_tile_event(event, &placement, &mut surface, &mut report).unwrap(),
                cell.spec
            );
        }

        assert_eq!(report.drawn, 289);
        assert!(report.failures.is_empty());
        for cell in &plan.cells {
            let (x, y) = (cell.col * tile_size + 1, cell.row * tile_size + 1);
            assert_eq!(surface.pixel_at(x, y), Some([0, 200, 0, 255]));
        }
    }

    #[test]
    fn test_failed_tile_is_recorded() {
        let spec = TileSpec::new(1, 2, 0, 0);
        let mut surface = CompositorSurface::new(
            Box::new(OffscreenPresenter::new()),
            SurfaceSize::new(4, 4),
        )
        .unwrap();
        let mut report = FetchReport::default();
        let event = TileEvent::Failed {
            spec,
            kind: FetchErrorKind::Communication,
            message: "HTTP 404".to_string(),
        };

        apply_tile_event(event, &HashMap::new(), &mut surface, &mut report).unwrap();
        assert_eq!(report.drawn, 0);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.reported(), 1);
    }
}
