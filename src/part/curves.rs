//! Curve translation.

use tracing::warn;

use super::PartTranslator;
use crate::attribute::AttributeLedger;
use crate::engine::CurveType;
use crate::output::{CurveRecord, CurvesRecord};
use crate::util::{AttributeOwner, Error, Result};

/// Order used when the engine reports neither a constant nor per-curve order.
fn default_order(curve_type: CurveType) -> u32 {
    match curve_type {
        CurveType::Linear => 2,
        CurveType::Nurbs | CurveType::Bezier => 4,
    }
}

pub(super) fn fill_curves(t: &PartTranslator<'_>, curves: &mut CurvesRecord, ledger: &mut AttributeLedger) -> Result<()> {
    curves.curves.clear();
    let engine = t.engine();
    let (geo, part) = (t.geo().id, t.info().id);
    let info = engine.curve_info(geo, part)?;
    curves.is_bezier = info.curve_type == CurveType::Bezier;
    curves.is_periodic = info.is_periodic;

    let counts = engine.curve_counts(geo, part)?;
    if counts.len() != info.curve_count || counts.iter().any(|&c| c < 0) {
        return Err(Error::shape(format!(
            "{} curve counts for {} curves",
            counts.len(),
            info.curve_count
        )));
    }
    let total: usize = counts.iter().map(|&c| c as usize).sum();
    if total == 0 {
        return Ok(());
    }

    let positions = t
        .reader()
        .find_f32("P")?
        .ok_or_else(|| Error::missing(AttributeOwner::Point, "P"))?
        .to_vec3();
    if positions.len() != total {
        return Err(Error::shape(format!("{} positions for {total} curve points", positions.len())));
    }
    ledger.mark_used("P");

    let orders: Vec<u32> = match info.order {
        Some(order) => vec![order; counts.len()],
        None => {
            let per_curve = engine.curve_orders(geo, part)?;
            if per_curve.is_empty() {
                vec![default_order(info.curve_type); counts.len()]
            } else if per_curve.len() == counts.len() {
                per_curve.iter().map(|&o| o.max(1) as u32).collect()
            } else {
                return Err(Error::shape(format!(
                    "{} curve orders for {} curves",
                    per_curve.len(),
                    counts.len()
                )));
            }
        }
    };

    // Knot vectors hold count + order values per curve.
    let mut knots = if info.has_knots { Some(engine.curve_knots(geo, part)?) } else { None };
    if let Some(k) = &knots {
        let expected: usize = counts.iter().zip(&orders).map(|(&c, &o)| c as usize + o as usize).sum();
        if k.len() != expected {
            warn!(part = %t.info().name, knots = k.len(), expected, "knot vector does not match curves, dropped");
            knots = None;
        }
    }

    let (mut point, mut knot) = (0usize, 0usize);
    for (&count, &order) in counts.iter().zip(&orders) {
        let count = count as usize;
        let curve_knots = knots.as_ref().map(|k| {
            let n = count + order as usize;
            let slice = k[knot..knot + n].to_vec();
            knot += n;
            slice
        });
        curves.curves.push(CurveRecord {
            positions: positions[point..point + count].to_vec(),
            order,
            knots: curve_knots,
        });
        point += count;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_order() {
        assert_eq!(default_order(CurveType::Linear), 2);
        assert_eq!(default_order(CurveType::Nurbs), 4);
    }
}
