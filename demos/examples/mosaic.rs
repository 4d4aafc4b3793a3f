// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! A stack of image tiles: stacking order + HV/VH spatial index.
//!
//! Tiles live in their own pixel coordinate systems and are indexed in world space.
//! This example shows how to:
//! - layer a `RelativeIndex` over an `HvvhTree` with `CombinedIndex`,
//! - ask which tiles cover a point, topmost last,
//! - restack tiles one step or to either end, and find the tiles interacting with one of them.
//!
//! Run:
//! - `RUST_LOG=trace cargo run -p understory_hvvh_demos --example mosaic`

use kurbo::{Affine, Rect};
use understory_hvvh::{
    CombinedIndex, CoordSys, Criterion, Extent, HvvhTree, Indexable, ObjectIndex, Parameters,
    RelativeIndex, SearchCriteria, Spatial,
};

/// An image tile placed in the world by its own pixel transform.
#[derive(Debug)]
struct Tile {
    name: &'static str,
    /// Pixel size, unknown until the image header has been read.
    size: Option<(f64, f64)>,
    placement: CoordSys,
}

impl Spatial for Tile {
    fn extent(&self) -> Extent {
        match self.size {
            Some((w, h)) => Extent::new(Rect::new(0.0, 0.0, w, h), self.placement),
            None => Extent::undefined(self.placement),
        }
    }
}

fn tile(name: &'static str, size: (f64, f64), at: (f64, f64), scale: f64) -> Tile {
    Tile {
        name,
        size: Some(size),
        placement: CoordSys::new(Affine::translate(at) * Affine::scale(scale)),
    }
}

fn names(tiles: &[Indexable<Tile>]) -> Vec<&'static str> {
    tiles.iter().map(|t| t.name).collect()
}

fn main() {
    env_logger::init();

    let mut mosaic = CombinedIndex::new(
        RelativeIndex::new(),
        HvvhTree::new(Parameters::default().with_max_node_load(4)),
    );

    // A 4x3 grid of 256px tiles at half resolution, then a few overlays on top.
    for row in 0..3 {
        for col in 0..4 {
            let at = (f64::from(col) * 128.0, f64::from(row) * 128.0);
            let name = ["r0", "r1", "r2"][row as usize];
            mosaic
                .add(tile(name, (256.0, 256.0), at, 0.5))
                .expect("fresh tiles are never tracked yet");
        }
    }
    let overlay = mosaic
        .add(tile("overlay", (100.0, 100.0), (100.0, 100.0), 1.0))
        .expect("fresh tiles are never tracked yet");
    let banner = mosaic
        .add(tile("banner", (500.0, 20.0), (0.0, 180.0), 1.0))
        .expect("fresh tiles are never tracked yet");
    // A tile without a known size is tracked but only shows up for "void" queries.
    let pending = mosaic
        .add(Tile {
            name: "pending",
            size: None,
            placement: CoordSys::WORLD,
        })
        .expect("fresh tiles are never tracked yet");

    let probe = SearchCriteria::region(Extent::world(130.0, 185.0, 130.0, 185.0));
    println!("covering (130, 185): {:?}", names(&mosaic.query_indexables(&probe, true)));

    mosaic
        .first_mut()
        .back(&banner)
        .expect("banner is tracked");
    println!("after sending banner back: {:?}", names(&mosaic.query_indexables(&probe, true)));

    mosaic
        .first_mut()
        .promote(&banner)
        .expect("banner is tracked");
    println!("banner one step up: {:?}", names(&mosaic.query_indexables(&probe, true)));

    let above_banner = probe.clone().with(Criterion::Above(banner.clone()));
    println!("above banner: {:?}", names(&mosaic.query_indexables(&above_banner, true)));

    println!(
        "interacting with overlay: {:?}",
        names(&mosaic.interacting_objects(&[overlay.clone()]))
    );

    let void = SearchCriteria::region(Extent::undefined(CoordSys::WORLD));
    println!("unplaceable: {:?}", names(&mosaic.query_indexables(&void, true)));

    mosaic.remove(&overlay).expect("overlay is tracked");
    mosaic.remove(&pending).expect("pending is tracked");
    println!("after removals: {:?}", names(&mosaic.query_indexables(&probe, true)));
    println!("tree: {:?}", mosaic.second().stats());
}
