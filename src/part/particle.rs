//! Particle cloud translation.

use tracing::warn;

use super::PartTranslator;
use crate::attribute::{AttributeLedger, AttributeReader, TupleArray};
use crate::output::ParticleRecord;
use crate::util::{AttributeOwner, Error, Result};

/// Point attribute read as one tuple per particle. Detail values are
/// broadcast; data on other owners is skipped.
fn read_per_point<'r, T: Copy>(
    reader: &AttributeReader<'r>,
    name: &str,
    count: usize,
    ledger: &mut AttributeLedger,
    read: impl Fn(&AttributeReader<'r>, AttributeOwner, &str) -> Result<Option<TupleArray<T>>>,
) -> Result<Option<TupleArray<T>>> {
    let Some(info) = reader.find(name)? else {
        return Ok(None);
    };
    let Some(attr) = read(reader, info.owner, name)? else {
        return Ok(None);
    };
    match attr.promote_to_point(count) {
        Ok(points) => {
            ledger.mark_used(name);
            Ok(Some(points))
        }
        Err(e) => {
            warn!(name, error = %e, "particle attribute skipped");
            Ok(None)
        }
    }
}

pub(super) fn fill_particles(
    t: &PartTranslator<'_>,
    particles: &mut ParticleRecord,
    ledger: &mut AttributeLedger,
) -> Result<()> {
    particles.clear();
    particles.current_time = t.time();
    let count = t.info().point_count;
    if count == 0 {
        return Ok(());
    }

    let reader = t.reader();
    let positions = reader
        .read_f32(AttributeOwner::Point, "P")?
        .ok_or_else(|| Error::missing(AttributeOwner::Point, "P"))?;
    if positions.len() != count {
        return Err(Error::shape(format!("{} positions for {count} particles", positions.len())));
    }
    ledger.mark_used("P");
    particles.positions = positions.to_vec3();

    let floats = AttributeReader::read_f32;
    particles.velocity = read_per_point(&reader, "v", count, ledger, floats)?.map(|a| a.to_vec3());
    particles.rgb_pp = read_per_point(&reader, "Cd", count, ledger, floats)?.map(|a| a.to_vec3());
    particles.opacity_pp = read_per_point(&reader, "Alpha", count, ledger, floats)?.map(|a| a.to_scalars());
    particles.radius_pp = read_per_point(&reader, "pscale", count, ledger, floats)?.map(|a| a.to_scalars());
    particles.age_pp = read_per_point(&reader, "age", count, ledger, floats)?.map(|a| a.to_scalars());
    particles.lifespan_pp = read_per_point(&reader, "life", count, ledger, floats)?.map(|a| a.to_scalars());
    particles.particle_id = read_per_point(&reader, "id", count, ledger, AttributeReader::read_i32)?
        .map(|a| a.data.chunks_exact(a.tuple_size).map(|t| t[0]).collect());
    Ok(())
}
