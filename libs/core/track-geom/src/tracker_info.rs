//! The detector layout: an ordered array of layers plus the derived,
//! once-built steering plan for each eta-region.

use crate::layer::LayerInfo;
use crate::region::EtaRegion;
use crate::steering_plan::{PlanStep, SteeringPlan};
use std::collections::HashMap;
use tracing::{debug, info};

/// The three eta boundaries that separate the five regions, mirroring the
/// geometry-specific values a real detector config would supply (CMS-2017
/// uses `0.9 / 1.7 / 2.45`, set once at geometry build time and never
/// touched again).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EtaRegionBoundaries {
    pub transition_start: f64,
    pub transition_end: f64,
    pub endcap_outer_cut: f64,
}

impl Default for EtaRegionBoundaries {
    fn default() -> Self {
        Self { transition_start: 0.9, transition_end: 1.7, endcap_outer_cut: 2.45 }
    }
}

/// Static, read-only-after-init description of the detector.
#[derive(Debug, Clone)]
pub struct TrackerInfo {
    layers: Vec<LayerInfo>,
    eta_regions: EtaRegionBoundaries,
    plans: HashMap<EtaRegion, SteeringPlan>,
}

impl TrackerInfo {
    /// Builds a tracker layout from an already-assembled layer list and eta
    /// boundaries, then derives (and caches) the per-region steering plans.
    /// This is the one-time initialization step; everything returned by
    /// `&self` afterward is read-only.
    #[must_use]
    pub fn new(layers: Vec<LayerInfo>, eta_regions: EtaRegionBoundaries) -> Self {
        info!(n_layers = layers.len(), "building tracker layout");
        let plans = Self::build_plans(&layers);
        Self { layers, eta_regions, plans }
    }

    /// A synthetic CMS-2017-shaped geometry: `n_barrel` concentric barrel
    /// cylinders and `n_endcap` disks on each of the `+z`/`-z` arms. Exact
    /// radii and the endcap sub-detector boundaries (pixel/TID/TEC-style
    /// breaks) are implementation detail — the spec treats detector-specific
    /// numerical constants as an out-of-scope external table, so this
    /// generates a structurally faithful, monotonically increasing layout
    /// rather than reproducing any specific detector's published numbers.
    #[must_use]
    pub fn synthetic_default(n_barrel: usize, n_endcap: usize) -> Self {
        let mut layers = Vec::with_capacity(n_barrel + 2 * n_endcap);

        for i in 0..n_barrel {
            let rin = 3.0 + 4.5 * i as f64;
            let rout = rin + 0.5;
            let zmax = 25.0 + 9.0 * i as f64;
            layers.push(LayerInfo::new(layers.len(), rin, rout, -zmax, zmax, true));
        }
        if let Some(last_barrel) = layers.iter_mut().filter(|l| l.is_barrel).last() {
            last_barrel.is_outer = true;
        }

        for side in [1.0_f64, -1.0_f64] {
            let mut previous_id: Option<usize> = None;
            for i in 0..n_endcap {
                let z0 = side * (30.0 + 6.0 * i as f64);
                let (zmin, zmax) = if side > 0.0 { (z0, z0 + 1.0) } else { (z0 - 1.0, z0) };
                let rin = 4.0 + 0.3 * i as f64;
                let rout = 35.0 + 1.2 * i as f64;
                let layer_id = layers.len();
                let mut layer = LayerInfo::new(layer_id, rin, rout, zmin, zmax, false);
                if i == n_endcap - 1 {
                    layer.is_outer = true;
                }
                if let Some(prev) = previous_id {
                    layer.neighbour_ids.push(prev);
                    layers[prev].neighbour_ids.push(layer_id);
                }
                previous_id = Some(layer_id);
                layers.push(layer);
            }
        }

        Self::new(layers, EtaRegionBoundaries::default())
    }

    #[must_use]
    pub fn layers(&self) -> &[LayerInfo] {
        &self.layers
    }

    #[must_use]
    pub fn layer(&self, layer_id: usize) -> Option<&LayerInfo> {
        self.layers.get(layer_id)
    }

    #[must_use]
    pub fn eta_regions(&self) -> EtaRegionBoundaries {
        self.eta_regions
    }

    /// The outermost barrel layer, used by the partitioner's `canReachRadius`
    /// probe before committing a seed to a region.
    #[must_use]
    pub fn outer_barrel_layer(&self) -> Option<&LayerInfo> {
        self.layers.iter().filter(|l| l.is_barrel).max_by(|a, b| {
            a.rout.partial_cmp(&b.rout).expect("layer radii are never NaN")
        })
    }

    /// The innermost endcap layer on the side matching `z_dir_pos`.
    #[must_use]
    pub fn first_endcap_layer(&self, z_dir_pos: bool) -> Option<&LayerInfo> {
        self.layers
            .iter()
            .filter(|l| !l.is_barrel && (l.zmin >= 0.0) == z_dir_pos)
            .min_by(|a, b| {
                a.zmin.abs().partial_cmp(&b.zmin.abs()).expect("layer z is never NaN")
            })
    }

    /// The barrel layer conventionally used as the innermost TIB/TOB probe
    /// in the partitioner's transition-region test (spec §4.7 point 3):
    /// the `index`-th barrel layer, counting from the inside.
    #[must_use]
    pub fn barrel_layer_by_index(&self, index: usize) -> Option<&LayerInfo> {
        self.layers.iter().filter(|l| l.is_barrel).nth(index)
    }

    #[must_use]
    pub fn plan_for(&self, region: EtaRegion) -> Option<&SteeringPlan> {
        self.plans.get(&region)
    }

    /// Derives the five per-region plans from the layer list once, at
    /// construction time. Barrel walks all barrel layers forward; the two
    /// transition regions continue into the matching endcap arm; the two
    /// endcap regions lead with back-fit-only steps on the outer barrel,
    /// then a pickup-only step on the innermost endcap disk, then the
    /// remaining endcap disks forward (spec §4.1's worked example).
    fn build_plans(layers: &[LayerInfo]) -> HashMap<EtaRegion, SteeringPlan> {
        let barrel_ids: Vec<usize> =
            layers.iter().filter(|l| l.is_barrel).map(|l| l.layer_id).collect();
        let endcap_pos_ids: Vec<usize> = layers
            .iter()
            .filter(|l| !l.is_barrel && l.zmin >= 0.0)
            .map(|l| l.layer_id)
            .collect();
        let endcap_neg_ids: Vec<usize> = layers
            .iter()
            .filter(|l| !l.is_barrel && l.zmin < 0.0)
            .map(|l| l.layer_id)
            .collect();

        let barrel_plan = SteeringPlan::new(barrel_ids.iter().map(|&id| PlanStep::forward(id)).collect());

        let transition_plan = |endcap_ids: &[usize]| {
            let mut steps: Vec<PlanStep> =
                barrel_ids.iter().map(|&id| PlanStep::forward(id)).collect();
            steps.extend(endcap_ids.iter().map(|&id| PlanStep::forward(id)));
            SteeringPlan::new(steps)
        };

        let endcap_plan = |endcap_ids: &[usize]| {
            let mut steps = Vec::new();
            for &id in barrel_ids.iter().rev().take(2) {
                steps.push(PlanStep::back_fit_only(id));
            }
            if let Some((&first, rest)) = endcap_ids.split_first() {
                steps.push(PlanStep::pickup_only(first));
                steps.extend(rest.iter().map(|&id| PlanStep::forward(id)));
            }
            SteeringPlan::new(steps)
        };

        let mut plans = HashMap::new();
        debug!("deriving per-region steering plans");
        plans.insert(EtaRegion::Barrel, barrel_plan);
        plans.insert(EtaRegion::TransitionPos, transition_plan(&endcap_pos_ids));
        plans.insert(EtaRegion::TransitionNeg, transition_plan(&endcap_neg_ids));
        plans.insert(EtaRegion::EndcapPos, endcap_plan(&endcap_pos_ids));
        plans.insert(EtaRegion::EndcapNeg, endcap_plan(&endcap_neg_ids));
        plans
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn synthetic_default_builds_all_five_region_plans() {
        let tracker = TrackerInfo::synthetic_default(18, 27);
        for region in EtaRegion::ALL {
            assert!(tracker.plan_for(region).is_some(), "missing plan for {region:?}");
        }
    }

    #[test]
    fn outer_barrel_layer_is_the_largest_radius_barrel_layer() {
        let tracker = TrackerInfo::synthetic_default(6, 4);
        let outer = tracker.outer_barrel_layer().expect("has barrel layers");
        for layer in tracker.layers().iter().filter(|l| l.is_barrel) {
            assert!(layer.rout <= outer.rout);
        }
    }

    #[test]
    fn endcap_plan_leads_with_back_fit_only_steps() {
        let tracker = TrackerInfo::synthetic_default(6, 4);
        let plan = tracker.plan_for(EtaRegion::EndcapPos).expect("plan exists");
        assert!(plan.steps()[0].bk_fit_only);
        assert!(plan.steps()[1].bk_fit_only);
    }
}
