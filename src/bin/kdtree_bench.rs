// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! A micro-benchmark and demonstration harness for `aabb_kdtree`.
//!
//! Not part of the library's public contract: flags, output format, and
//! behavior here can change freely between releases.

use aabb_kdtree::{Aabb, ItemId, Tree};
use clap::Parser;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use std::time::Instant;

#[derive(Parser, Debug)]
#[command(author, version, about = "Build a random kd-tree and time queries against it")]
struct Arguments {
    /// Number of random boxes to build the tree over.
    #[arg(short, long, default_value_t = 100_000)]
    items: usize,

    /// Number of dimensions per box.
    #[arg(short, long, default_value_t = 3)]
    dims: usize,

    /// Leaf-size threshold passed to construction.
    #[arg(short, long, default_value_t = 16)]
    leaf_size: usize,

    /// Number of random queries to run after building.
    #[arg(short, long, default_value_t = 10_000)]
    queries: usize,

    /// Seed for the random box and query generator.
    #[arg(short, long, default_value_t = 0)]
    seed: u64,
}

fn random_box(rng: &mut SmallRng, dims: usize, world: f64, extent: f64) -> Aabb {
    let min: Vec<f64> = (0..dims).map(|_| rng.gen_range(0.0..world)).collect();
    let max: Vec<f64> = min.iter().map(|&lo| lo + rng.gen_range(0.0..extent)).collect();
    Aabb::new(min, max).expect("equal-length min/max vectors")
}

fn main() {
    tracing_subscriber::fmt::init();
    let args = Arguments::parse();

    let mut rng = SmallRng::seed_from_u64(args.seed);
    let world = 1000.0;
    let extent = 10.0;
    let boxes: Vec<Aabb> = (0..args.items).map(|_| random_box(&mut rng, args.dims, world, extent)).collect();

    let build_start = Instant::now();
    let tree = Tree::build(args.dims, args.leaf_size, &boxes).expect("valid input boxes");
    let build_elapsed = build_start.elapsed();

    println!(
        "built tree: {} items, {} nodes, {} leaves in {:?}",
        tree.item_count(),
        tree.node_count(),
        tree.leaf_count(),
        build_elapsed
    );

    let mut total_hits: u64 = 0;
    let query_start = Instant::now();
    for _ in 0..args.queries {
        let query_box = random_box(&mut rng, args.dims, world, extent * 4.0);
        let hits = tree
            .query(&query_box.min, &query_box.max, |id: ItemId, min: &mut [f64], max: &mut [f64]| {
                let b = &boxes[id as usize];
                min.copy_from_slice(&b.min);
                max.copy_from_slice(&b.max);
                Ok(())
            })
            .expect("query_box dims matches tree dims")
            .count();
        total_hits += hits as u64;
    }
    let query_elapsed = query_start.elapsed();

    println!(
        "ran {} queries, {} total hits, {:?} total, {:?} avg",
        args.queries,
        total_hits,
        query_elapsed,
        query_elapsed / u32::try_from(args.queries.max(1)).unwrap_or(u32::MAX)
    );
}
