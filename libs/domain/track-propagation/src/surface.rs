//! The target of one propagation step.

use trackforge_geom::LayerInfo;

/// A barrel step targets a fixed radius; an endcap step targets a fixed z.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Surface {
    Barrel { radius: f64 },
    Endcap { z: f64 },
}

impl Surface {
    #[must_use]
    pub fn of_layer(layer: &LayerInfo) -> Self {
        if layer.is_barrel {
            Surface::Barrel { radius: layer.nominal_radius() }
        } else {
            let z = 0.5 * (layer.zmin + layer.zmax);
            Surface::Endcap { z }
        }
    }
}
