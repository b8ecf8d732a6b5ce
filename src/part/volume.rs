//! Volume translation: engine tiles into a dense grid.

use tracing::warn;

use super::PartTranslator;
use crate::engine::{VolumeInfo, VolumeTile};
use crate::output::VolumeRecord;
use crate::util::{Result, TransformRecord};

/// Host transform of a volume. Engine volumes span the [-1, 1] box, the host
/// draws a unit box, so the scale is doubled.
pub(crate) fn volume_transform(info: &VolumeInfo) -> TransformRecord {
    let mut transform = info.transform;
    transform.scale *= 2.0;
    TransformRecord::from_transform(&transform)
}

/// Scatter tiles into a dense x-fastest grid. Voxels outside the volume and
/// malformed tiles are skipped.
pub(crate) fn assemble_grid(info: &VolumeInfo, tiles: &[VolumeTile]) -> Vec<f32> {
    let [rx, ry, rz] = info.resolution.map(|r| r as i64);
    let mut grid = vec![0.0f32; info.voxel_count()];
    let ts = info.tile_size.max(1) as i64;
    let tile_len = (ts * ts * ts) as usize;

    for tile in tiles {
        if tile.values.len() != tile_len {
            warn!(volume = %info.name, values = tile.values.len(), expected = tile_len, "malformed tile skipped");
            continue;
        }
        for (i, &value) in tile.values.iter().enumerate() {
            let i = i as i64;
            let x = tile.min[0] as i64 - info.min[0] as i64 + i % ts;
            let y = tile.min[1] as i64 - info.min[1] as i64 + (i / ts) % ts;
            let z = tile.min[2] as i64 - info.min[2] as i64 + i / (ts * ts);
            if (0..rx).contains(&x) && (0..ry).contains(&y) && (0..rz).contains(&z) {
                grid[(x + y * rx + z * rx * ry) as usize] = value;
            }
        }
    }
    grid
}

/// Fill a volume record. Unsupported or unreadable volumes keep their name,
/// resolution and transform with an empty grid.
pub(super) fn fill_volume(t: &PartTranslator<'_>, volume: &mut VolumeRecord) -> Result<()> {
    let engine = t.engine();
    let (geo, part) = (t.geo().id, t.info().id);
    let info = engine.volume_info(geo, part)?;
    volume.name = info.name.clone();
    volume.resolution = info.resolution;
    volume.transform = volume_transform(&info);
    volume.grid.clear();

    if info.tuple_size != 1 || !info.storage.is_float() {
        warn!(volume = %info.name, tuple_size = info.tuple_size, storage = %info.storage, "only scalar float volumes are supported");
        return Ok(());
    }
    match engine.volume_tiles(geo, part) {
        Ok(tiles) => volume.grid = assemble_grid(&info, &tiles),
        Err(e) => warn!(volume = %info.name, error = %e, "volume could not be read, grid left empty"),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::util::{StorageType, Transform, Vec3};

    fn info(resolution: [u32; 3], tile_size: u32) -> VolumeInfo {
        VolumeInfo {
            name: "density".into(),
            resolution,
            min: [0, 0, 0],
            tuple_size: 1,
            storage: StorageType::Float,
            tile_size,
            transform: Transform::IDENTITY,
        }
    }

    #[test]
    fn test_assemble_grid_clips_tiles() {
        // 3x2x1 volume covered by one 2^3 tile and part of a second.
        let info = info([3, 2, 1], 2);
        let first = VolumeTile { min: [0, 0, 0], values: (0..8).map(|v| v as f32).collect() };
        let second = VolumeTile { min: [2, 0, 0], values: vec![9.0; 8] };
        let grid = assemble_grid(&info, &[first, second]);
        assert_eq!(grid, vec![0.0, 1.0, 9.0, 2.0, 3.0, 9.0]);
    }

    #[test]
    fn test_malformed_tile_skipped() {
        let info = info([2, 2, 2], 2);
        let grid = assemble_grid(&info, &[VolumeTile { min: [0, 0, 0], values: vec![1.0; 3] }]);
        assert_eq!(grid, vec![0.0; 8]);
    }

    #[test]
    fn test_volume_transform_doubles_scale() {
        let mut info = info([1, 1, 1], 1);
        info.transform.position = Vec3::new(1.0, 2.0, 3.0);
        let t = volume_transform(&info);
        assert_eq!(t.translate, Vec3::new(1.0, 2.0, 3.0));
        assert_eq!(t.scale, Vec3::splat(2.0));
    }
}
