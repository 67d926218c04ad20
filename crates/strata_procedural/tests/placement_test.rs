//! # Building Placement and Resource Tests
//!
//! Occupancy bookkeeping for multi-tile buildings, coordinate mapping at
//! the zero boundary, harvesting, and config loading.

use strata_core::{EntityId, Registry};
use strata_procedural::{
    BuildingComponent, ChunkCoord, OreType, ResourceNodeComponent, TerrainClassifier, TileIndex,
    TileType, WorldError, WorldManager, WorldManagerConfig, CHUNK_HEIGHT, CHUNK_WIDTH,
};

type Field = fn(f64, f64) -> f64;

/// Grass everywhere except a water column at x == 10; ore on every tile
/// with x == y.
fn test_world(registry: &mut Registry) -> WorldManager<Field> {
    let config = WorldManagerConfig {
        view_distance: 1,
        ..WorldManagerConfig::default()
    };
    let classifier = TerrainClassifier::<Field>::with_fields(
        |x, _| if x == 10.0 { -1.0 } else { 0.5 },
        |x, y| if x == y { 1.0 } else { -1.0 },
        |_, _| 0.9,
        &config,
    );
    let mut world = WorldManager::with_classifier(config, classifier, registry).unwrap();
    world
        .stream_around(registry, &[ChunkCoord::new(0, 0)])
        .unwrap();
    world
}

fn place(world: &mut WorldManager<Field>, registry: &mut Registry, at: TileIndex, w: u32, h: u32) -> EntityId {
    assert!(world.can_place_building(at, w, h), "footprint at {at:?} blocked");
    let building = registry.create_entity().unwrap();
    world.place_building(registry, building, at, w, h).unwrap();
    building
}

/// Test: 2x2 at (1,1) blocks an overlapping footprint but not an adjacent one.
#[test]
fn test_two_by_two_overlap() {
    let mut registry = Registry::new(100_000).unwrap();
    let mut world = test_world(&mut registry);

    let building = place(&mut world, &mut registry, TileIndex::new(1, 1), 2, 2);

    assert!(!world.can_place_building(TileIndex::new(2, 2), 2, 2));
    assert!(world.can_place_building(TileIndex::new(3, 1), 1, 1));

    let record = registry.get_component::<BuildingComponent>(building).unwrap();
    let mut tiles = record.occupied_tiles.clone();
    tiles.sort_unstable();
    assert_eq!(
        tiles,
        vec![
            TileIndex::new(1, 1),
            TileIndex::new(1, 2),
            TileIndex::new(2, 1),
            TileIndex::new(2, 2),
        ]
    );
    for tile in &tiles {
        assert_eq!(world.tile_at_tile_index(*tile).unwrap().occupying_entity, building);
    }
}

/// Test: Removal with the recorded tiles makes the footprint placeable again.
#[test]
fn test_remove_restores_footprint() {
    let mut registry = Registry::new(100_000).unwrap();
    let mut world = test_world(&mut registry);

    let first = place(&mut world, &mut registry, TileIndex::new(-3, -3), 3, 3);
    assert!(!world.can_place_building(TileIndex::new(-3, -3), 3, 3));
    assert!(!world.can_place_building(TileIndex::new(-1, -1), 1, 1));

    let tiles = registry
        .get_component::<BuildingComponent>(first)
        .unwrap()
        .occupied_tiles
        .clone();
    assert_eq!(world.remove_building(first, &tiles), 9);
    assert!(world.can_place_building(TileIndex::new(-3, -3), 3, 3));

    // Stale removal never clears someone else's tiles.
    let second = place(&mut world, &mut registry, TileIndex::new(-3, -3), 3, 3);
    assert_eq!(world.remove_building(first, &tiles), 0);
    assert_eq!(
        world.tile_at_tile_index(TileIndex::new(-2, -2)).unwrap().occupying_entity,
        second
    );
}

/// Test: Buildings may span chunk borders, including the zero boundary.
#[test]
fn test_footprint_across_chunk_borders() {
    let mut registry = Registry::new(100_000).unwrap();
    let mut world = test_world(&mut registry);

    let building = place(&mut world, &mut registry, TileIndex::new(-1, -1), 2, 2);
    let record = registry.get_component::<BuildingComponent>(building).unwrap();
    assert_eq!(record.occupied_tiles.len(), 4);

    let chunks: std::collections::BTreeSet<ChunkCoord> = record
        .occupied_tiles
        .iter()
        .map(|t| ChunkCoord::from_tile_index(*t))
        .collect();
    assert_eq!(chunks.len(), 4);
}

/// Test: Water and unloaded tiles reject placement.
#[test]
fn test_water_and_unloaded_reject() {
    let mut registry = Registry::new(100_000).unwrap();
    let world = test_world(&mut registry);

    assert_eq!(world.tile_at_tile_index(TileIndex::new(10, 4)).unwrap().kind, TileType::Water);
    assert!(!world.can_place_building(TileIndex::new(9, 4), 2, 1));
    assert!(world.can_place_building(TileIndex::new(11, 4), 2, 1));

    // Radius 1 around (0,0) covers tiles [-32, 64).
    assert!(world.can_place_building(TileIndex::new(62, 0), 2, 1));
    assert!(!world.can_place_building(TileIndex::new(63, 0), 2, 1));
    assert!(!world.can_place_building(TileIndex::new(-33, 0), 1, 1));
}

/// Test: Tile <-> chunk mapping recovers every tile around the origin.
#[test]
fn test_coordinate_round_trip() {
    let mut registry = Registry::new(100_000).unwrap();
    let world = test_world(&mut registry);

    for y in -40..40 {
        for x in -40..40 {
            let tile = TileIndex::new(x, y);
            let chunk = ChunkCoord::from_tile_index(tile);
            let (lx, ly) = chunk.local_tile_coords(tile).unwrap();
            assert!(lx < CHUNK_WIDTH && ly < CHUNK_HEIGHT);
            assert_eq!(chunk.tile_index_of_local(lx, ly), tile);
        }
    }

    assert_eq!(ChunkCoord::from_tile_index(TileIndex::new(-1, 0)), ChunkCoord::new(-1, 0));
    assert_eq!(ChunkCoord::from_tile_index(TileIndex::new(0, -1)), ChunkCoord::new(0, -1));

    let (cx, cy) = TileIndex::new(-1, -1).world_center();
    assert_eq!(world.tile_index_from_world_position(cx, cy), TileIndex::new(-1, -1));
    assert_eq!(world.tile_index_from_world_position(-0.001, 0.0), TileIndex::new(-1, 0));
}

/// Test: Partially mined nodes keep their amount across eviction.
#[test]
fn test_harvest_survives_eviction() {
    let mut registry = Registry::new(100_000).unwrap();
    let mut world = test_world(&mut registry);
    let tile = TileIndex::new(7, 7);

    let node = world.tile_at_tile_index(tile).unwrap().ore_entity;
    let mined = world.harvest_ore(&mut registry, tile, 30).unwrap();
    assert_eq!(mined, Some((OreType::Gold, 30)));

    world
        .stream_around(&mut registry, &[ChunkCoord::new(50, 50)])
        .unwrap();
    assert_eq!(world.harvest_ore(&mut registry, tile, 30).unwrap(), None);

    world
        .stream_around(&mut registry, &[ChunkCoord::new(0, 0)])
        .unwrap();
    assert_eq!(world.tile_at_tile_index(tile).unwrap().ore_entity, node);
    let remaining = registry
        .get_component::<ResourceNodeComponent>(node)
        .unwrap()
        .remaining_amount;
    assert_eq!(remaining, world.max_ore_amount() - 30);
}

/// Test: A node destroyed elsewhere is dropped from its tile on harvest.
#[test]
fn test_harvest_dangling_node() {
    let mut registry = Registry::new(100_000).unwrap();
    let mut world = test_world(&mut registry);
    let tile = TileIndex::new(3, 3);

    let node = world.tile_at_tile_index(tile).unwrap().ore_entity;
    registry.destroy_entity(node).unwrap();

    assert_eq!(world.harvest_ore(&mut registry, tile, 5).unwrap(), None);
    assert!(!world.tile_at_tile_index(tile).unwrap().has_ore());
}

/// Test: Config round-trips through a file on disk.
#[test]
fn test_config_load_from_file() {
    let path = std::env::temp_dir().join(format!("strata_world_{}.toml", std::process::id()));
    std::fs::write(&path, "seed = 99\nview_distance = 4\nore_threshold = 0.7\n").unwrap();

    let config = WorldManagerConfig::load(&path).unwrap();
    std::fs::remove_file(&path).unwrap();

    assert_eq!(config.seed, 99);
    assert_eq!(config.view_distance, 4);
    assert!((config.ore_threshold - 0.7).abs() < f64::EPSILON);

    let mut registry = Registry::new(100_000).unwrap();
    let world = WorldManager::new(config, &mut registry).unwrap();
    assert_eq!(world.view_distance(), 4);

    let err = WorldManagerConfig::from_toml_str("view_distance = -1").unwrap_err();
    assert!(matches!(err, WorldError::ConfigParse(_)));
}
