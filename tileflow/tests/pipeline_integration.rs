//! End-to-end tests of the fetch → decode → composite → present pipeline.

use std::io::{Cursor, Read, Write};
use std::net::TcpListener;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use bytes::Bytes;
use image::{ImageFormat, Rgba, RgbaImage};
use tokio::runtime::Handle;

use tileflow::cache::DecodedTileCache;
use tileflow::config::{DecodeConfig, PipelineConfig};
use tileflow::coordinator::{TileEvent, TileFetchCoordinator};
use tileflow::decode::ImageTileDecoder;
use tileflow::network::{RecordingNetwork, ReqwestNetwork, TileSource};
use tileflow::surface::{
    CompositorSurface, DestRect, OffscreenPresenter, SurfaceSize, SurfaceState, SwapEvent,
};
use tileflow::tile::{FetchErrorKind, TileSpec};

const TILE: u32 = 16;
const RED: [u8; 4] = [255, 0, 0, 255];
const BLUE: [u8; 4] = [0, 0, 255, 255];

fn png(color: [u8; 4]) -> Vec<u8> {
    let mut buf = Vec::new();
    image::DynamicImage::ImageRgba8(RgbaImage::from_pixel(TILE, TILE, Rgba(color)))
        .write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)
        .unwrap();
    buf
}

fn color_for(x: u32) -> [u8; 4] {
    if x % 2 == 0 {
        RED
    } else {
        BLUE
    }
}

/// Minimal HTTP tile server.
///
/// Serves `/{map}/{z}/{x}/{y}.png` as a solid tile whose colour depends on
/// `x`. Map 404 answers "not found", map 500 answers garbage.
fn start_tile_server() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();

    thread::spawn(move || {
        for stream in listener.incoming() {
            let Ok(mut stream) = stream else { continue };
            let mut request = Vec::new();
            let mut buf = [0u8; 1024];
            while !request.windows(4).any(|w| w == b"\r\n\r\n") {
                match stream.read(&mut buf) {
                    Ok(0) | Err(_) => break,
                    Ok(n) => request.extend_from_slice(&buf[..n]),
                }
            }

            let text = String::from_utf8_lossy(&request);
            let path = text.split_whitespace().nth(1).unwrap_or("/").to_string();
            let parts: Vec<&str> = path.trim_start_matches('/').split('/').collect();
            let x: u32 = parts.get(2).and_then(|p| p.parse().ok()).unwrap_or(0);

            let (status, body) = match parts.first().copied() {
                Some("404") => ("404 Not Found", b"missing".to_vec()),
                Some("500") => ("200 OK", b"<html>not a tile</html>".to_vec()),
                _ => ("200 OK", png(color_for(x))),
            };
            let header = format!(
                "HTTP/1.1 {}\r\nContent-Type: image/png\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
                status,
                body.len()
            );
            let _ = stream.write_all(header.as_bytes());
            let _ = stream.write_all(&body);
        }
    });

    format!("http://{}", addr)
}

/// Pump network events into the coordinator until `count` tile events arrived.
async fn collect_events(
    coordinator: &mut TileFetchCoordinator,
    network_events: &mut tokio::sync::mpsc::UnboundedReceiver<tileflow::network::NetworkEvent>,
    tile_events: &mut tokio::sync::mpsc::UnboundedReceiver<TileEvent>,
    count: usize,
) -> Vec<TileEvent> {
    let mut collected = Vec::new();
    while collected.len() < count {
        let event = tokio::time::timeout(Duration::from_secs(10), network_events.recv())
            .await
            .expect("network event timed out")
            .expect("network channel closed");
        coordinator.handle_network_event(event);
        while let Ok(tile_event) = tile_events.try_recv() {
            collected.push(tile_event);
        }
    }
    collected
}

#[tokio::test]
async fn test_http_tiles_are_composited_and_presented() {
    let base = start_tile_server();
    let (network, mut network_events) =
        ReqwestNetwork::new(Handle::current(), Duration::from_secs(5)).unwrap();
    let (mut coordinator, mut tile_events) = TileFetchCoordinator::new(
        Box::new(network),
        TileSource::new(format!("{}/{{map}}/{{z}}/{{x}}/{{y}}.png", base), "png"),
        Arc::new(ImageTileDecoder::new()),
    );

    let presenter = OffscreenPresenter::new();
    let mut surface = CompositorSurface::new(
        Box::new(presenter.clone()),
        SurfaceSize::new(2 * TILE, TILE),
    )
    .unwrap();

    for x in 0..2 {
        coordinator.request_tile(TileSpec::new(1, 1, x, 0));
    }
    let events = collect_events(&mut coordinator, &mut network_events, &mut tile_events, 2).await;

    for event in events {
        match event {
            TileEvent::Ready { spec, tile } => {
                surface
                    .draw_tile(tile, DestRect::grid_cell(spec.x(), spec.y(), TILE))
                    .unwrap();
                assert!(coordinator.evict(spec));
            }
            TileEvent::Failed { spec, message, .. } => panic!("{} failed: {}", spec, message),
        }
    }
    surface.swap_buffers().unwrap();

    let frame = presenter.last_frame().unwrap();
    assert_eq!((frame.width, frame.height), (2 * TILE, TILE));
    let pixel = |x: u32, y: u32| {
        let i = ((y * frame.width + x) * 4) as usize;
        [frame.pixels[i], frame.pixels[i + 1], frame.pixels[i + 2], frame.pixels[i + 3]]
    };
    assert_eq!(pixel(2, 2), RED);
    assert_eq!(pixel(TILE + 2, 2), BLUE);
    assert_eq!(coordinator.tracked(), 0);
}

#[tokio::test]
async fn test_http_errors_are_classified() {
    let base = start_tile_server();
    let (network, mut network_events) =
        ReqwestNetwork::new(Handle::current(), Duration::from_secs(5)).unwrap();
    let (mut coordinator, mut tile_events) = TileFetchCoordinator::new(
        Box::new(network),
        TileSource::new(format!("{}/{{map}}/{{z}}/{{x}}/{{y}}.png", base), "png"),
        Arc::new(ImageTileDecoder::new()),
    );

    let missing = TileSpec::new(404, 0, 0, 0);
    let garbage = TileSpec::new(500, 0, 0, 0);
    coordinator.request_tile(missing);
    coordinator.request_tile(garbage);

    let events = collect_events(&mut coordinator, &mut network_events, &mut tile_events, 2).await;

    for event in events {
        match event {
            TileEvent::Failed {
                spec,
                kind,
                message,
            } if spec == missing => {
                assert_eq!(kind, FetchErrorKind::Communication);
                assert!(message.contains("404"));
            }
            TileEvent::Failed { spec, kind, .. } if spec == garbage => {
                assert_eq!(kind, FetchErrorKind::Decode);
            }
            other => panic!("unexpected event: {:?}", other),
        }
    }
    assert_eq!(coordinator.stats().failed, 2);
}

#[test]
fn test_pooled_pipeline_with_cache_and_visibility() {
    let config = PipelineConfig::default().with_decode(DecodeConfig::default().with_workers(2));
    let network = RecordingNetwork::new();
    let (coordinator, mut tile_events) = TileFetchCoordinator::new(
        Box::new(network.clone()),
        config.source.tile_source(),
        Arc::new(ImageTileDecoder::new()),
    );
    let mut coordinator = coordinator.with_decode_pool(config.decode.build_pool().unwrap().unwrap());

    let cache = Arc::new(DecodedTileCache::new(config.cache.max_bytes));
    let presenter = OffscreenPresenter::new();
    let mut surface = CompositorSurface::new(
        Box::new(presenter.clone()),
        SurfaceSize::new(2 * TILE, 2 * TILE),
    )
    .unwrap()
    .with_cache(cache.clone());
    let mut swaps = surface.subscribe_swaps();

    // Four tiles of a 2x2 grid, each requested twice.
    let specs: Vec<TileSpec> = (0..4).map(|i| TileSpec::new(7, 1, i % 2, i / 2)).collect();
    for spec in specs.iter().chain(specs.iter()) {
        coordinator.request_tile(*spec);
    }
    assert_eq!(network.issued_count(), 4);

    for ((transfer, _url), spec) in network.issued().into_iter().zip(&specs) {
        coordinator.on_network_finished(transfer, Bytes::from(png(color_for(spec.x()))));
    }
    while coordinator.decodes_in_flight() > 0 {
        assert!(coordinator.wait_decoded());
    }

    while let Ok(event) = tile_events.try_recv() {
        match event {
            TileEvent::Ready { tile, .. } => assert!(cache.insert(tile)),
            TileEvent::Failed { message, .. } => panic!("unexpected failure: {}", message),
        }
    }
    assert_eq!(cache.len(), 4);

    // Draw only the top row; the bottom row stays cached.
    for spec in &specs[..2] {
        let tile = cache.take(spec).unwrap();
        surface
            .draw_tile(tile, DestRect::grid_cell(spec.x(), spec.y(), TILE))
            .unwrap();
    }
    let token = surface.swap_buffers().unwrap();
    assert_eq!(swaps.try_recv().unwrap(), SwapEvent::Presented { token, frame: 1 });

    // Hiding drops cached tiles that are not part of the visible frame.
    surface.set_visible(false);
    assert_eq!(surface.state(), SurfaceState::Suspended);
    assert!(cache.is_empty());

    // Acknowledgement arriving while hidden is still honored.
    for ack in presenter.take_acks() {
        assert!(surface.on_swap_complete(ack));
    }
    assert_eq!(swaps.try_recv().unwrap(), SwapEvent::Completed { token });

    surface.set_visible(true);
    assert_eq!(surface.pixel_at(1, 1), Some(RED));
    assert_eq!(surface.pixel_at(TILE + 1, 1), Some(BLUE));
    assert_eq!(surface.pixel_at(1, TILE + 1), Some([0, 0, 0, 0]));

    let stats = coordinator.stats();
    assert_eq!(stats.requested, 4);
    assert_eq!(stats.deduplicated, 4);
    assert_eq!(stats.ready, 4);
    assert_eq!(stats.in_flight, 0);
}

#[test]
fn test_cancelled_tile_never_reaches_surface() {
    let network = RecordingNetwork::new();
    let (mut coordinator, mut tile_events) = TileFetchCoordinator::new(
        Box::new(network.clone()),
        TileSource::new("http://tiles/{map}/{z}/{x}/{y}.png", "png"),
        Arc::new(ImageTileDecoder::new()),
    );

    let spec = TileSpec::new(1, 3, 2, 5);
    let handle = coordinator.request_tile(spec);
    let transfer = network.last_transfer().unwrap();

    assert!(coordinator.cancel_tile(spec));
    coordinator.on_network_finished(transfer, Bytes::from(png(RED)));
    coordinator.on_network_finished(transfer, Bytes::from(png(RED)));

    assert!(tile_events.try_recv().is_err());
    assert!(coordinator.request(handle).unwrap().is_aborted());
    assert_eq!(network.aborted(), vec![transfer]);

    // A fresh request after eviction fetches again.
    assert!(coordinator.evict(spec));
    coordinator.request_tile(spec);
    coordinator.on_network_finished(network.last_transfer().unwrap(), Bytes::from(png(BLUE)));
    assert!(tile_events.try_recv().unwrap().is_ready());
}
