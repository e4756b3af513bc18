//! Overlaying and merging one map into another.

use scenery_core::progress::checkpoint;
use scenery_core::tokens::TERRAIN_NATURAL;
use scenery_core::{Progress, Result, SceneryError, NO_VALUE};
use tracing::debug;

use crate::build::{map_edges, Arrangement, SRC_A, SRC_B};
use crate::data::FaceData;
use crate::pmwx::{FaceId, Pmwx, UNBOUNDED};
use crate::validate::commit;

const STAGES: usize = 3;

/// Node `dst` and `src` together. `src` pieces come first so their
/// half-edge data wins when edges coincide.
fn arrange(dst: &Pmwx, src: &Pmwx, progress: &mut dyn Progress) -> Result<Arrangement> {
    checkpoint(progress, 0, STAGES, "Inserting edges", 0.0)?;
    let mut inputs = map_edges(src, &dst.kernel, SRC_B);
    inputs.extend(map_edges(dst, &dst.kernel, SRC_A));
    Arrangement::build(dst.kernel, inputs)
}

/// Insert all of `src` into `dst`; `src` faces replace whatever `dst` had
/// under them. In exchange `src` receives the `dst` content that was
/// covered, so its footprint survives with the old data inside.
pub fn overlay_map(dst: &mut Pmwx, src: &mut Pmwx, progress: &mut dyn Progress) -> Result<()> {
    if src
        .edges()
        .any(|h| src.is_unbounded(src.face_of(h)) && src.is_unbounded(src.face_of(h.twin())))
    {
        return Err(SceneryError::Topology(
            "overlay source has dangling edges in its unbounded face".to_string(),
        ));
    }
    let arr = arrange(dst, src, progress)?;

    checkpoint(progress, 1, STAGES, "Classifying faces", 0.0)?;
    let ld = arr.labels(SRC_A);
    let ls = arr.labels(SRC_B);
    let covered = |f: FaceId| ls[f.0] != UNBOUNDED;
    let touches_outside = |k: usize| {
        let (l, r) = arr.edge_faces(k);
        !covered(l) || !covered(r)
    };

    checkpoint(progress, 2, STAGES, "Rebuilding maps", 0.0)?;
    let (new_dst, _) = arr.extract(
        |k| arr.edges[k].has_source(SRC_B) || (arr.edges[k].has_source(SRC_A) && touches_outside(k)),
        |k| {
            let outside = touches_outside(k);
            arr.edges[k].merged(|p| p.source == SRC_B || outside)
        },
        |f| {
            if covered(f) {
                src.face_data(ls[f.0]).clone()
            } else {
                dst.face_data(ld[f.0]).clone()
            }
        },
        dst.face_data(UNBOUNDED).clone(),
    )?;
    let (new_src, _) = arr.extract(
        |k| {
            let e = &arr.edges[k];
            (e.has_source(SRC_B) && touches_outside(k)) || (e.has_source(SRC_A) && !touches_outside(k))
        },
        |k| {
            let outside = touches_outside(k);
            arr.edges[k].merged(|p| (p.source == SRC_B) == outside)
        },
        |f| {
            if covered(f) {
                dst.face_data(ld[f.0]).clone()
            } else {
                src.face_data(UNBOUNDED).clone()
            }
        },
        src.face_data(UNBOUNDED).clone(),
    )?;
    checkpoint(progress, 2, STAGES, "Rebuilding maps", 1.0)?;
    debug!(
        dst_faces = new_dst.num_faces(),
        src_faces = new_src.num_faces(),
        "overlaid map"
    );

    new_src.validate()?;
    commit(dst, new_dst)?;
    *src = new_src;
    Ok(())
}

/// Fold `src` into `dst`. All edges of both survive. Where faces overlap,
/// `src` terrain and area features are copied only onto untyped `dst`
/// faces unless `force_src_props` is set; untyped `src` faces never
/// overwrite anything. Returns the `dst` faces that lie under `src` faces.
pub fn merge_maps(
    dst: &mut Pmwx,
    src: &Pmwx,
    force_src_props: bool,
    progress: &mut dyn Progress,
) -> Result<Vec<FaceId>> {
    let arr = arrange(dst, src, progress)?;

    checkpoint(progress, 1, STAGES, "Classifying faces", 0.0)?;
    let ld = arr.labels(SRC_A);
    let ls = arr.labels(SRC_B);

    checkpoint(progress, 2, STAGES, "Rebuilding map", 0.0)?;
    let (merged, origins) = arr.extract(
        |_| true,
        |k| {
            if force_src_props {
                arr.edges[k].merged(|_| true)
            } else {
                let (mut fwd, mut bwd) = arr.edges[k].merged(|p| p.source == SRC_A);
                let (sf, sb) = arr.edges[k].merged(|p| p.source == SRC_B);
                fwd.merge(&sf);
                bwd.merge(&sb);
                (fwd, bwd)
            }
        },
        |f| merge_face(dst.face_data(ld[f.0]), (ls[f.0] != UNBOUNDED).then(|| src.face_data(ls[f.0])), force_src_props),
        dst.face_data(UNBOUNDED).clone(),
    )?;
    checkpoint(progress, 2, STAGES, "Rebuilding map", 1.0)?;

    let out_faces: Vec<FaceId> = origins
        .iter()
        .enumerate()
        .filter(|(_, o)| o.is_some_and(|a| ls[a.0] != UNBOUNDED))
        .map(|(i, _)| FaceId(i))
        .collect();
    debug!(faces = merged.num_faces(), from_src = out_faces.len(), "merged maps");
    commit(dst, merged)?;
    Ok(out_faces)
}

fn merge_face(d: &FaceData, s: Option<&FaceData>, force: bool) -> FaceData {
    let mut out = d.clone();
    let Some(s) = s else {
        return out;
    };
    if s.terrain_type != TERRAIN_NATURAL && (force || d.terrain_type == TERRAIN_NATURAL) {
        out.terrain_type = s.terrain_type;
    }
    if s.area_feature.feat_type != NO_VALUE && (force || d.area_feature.feat_type == NO_VALUE) {
        out.area_feature = s.area_feature.clone();
    }
    out
}
