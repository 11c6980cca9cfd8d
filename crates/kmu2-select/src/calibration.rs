use kmu2_core::LkrCluster;
use serde::{Deserialize, Serialize};

/// Clusters with at most this many cells skip the non-linearity correction.
const NONLINEARITY_MIN_CELLS: u32 = 9;

/// Energy above which the correction factor is frozen (GeV).
const NONLINEARITY_FREEZE: f64 = 65.0;

fn default_energy_scale() -> f64 {
    1.03
}

/// Calorimeter energy correction: zero-suppression non-linearity then a
/// global scale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnergyCorrection {
    /// Multiplicative scale applied to every cluster after the non-linearity step.
    #[serde(default = "default_energy_scale")]
    pub scale: f64,
}

impl Default for EnergyCorrection {
    fn default() -> Self {
        Self {
            scale: default_energy_scale(),
        }
    }
}

impl EnergyCorrection {
    /// Corrected energy (GeV) of a cluster. The cluster itself is not modified.
    pub fn apply(&self, cluster: &LkrCluster) -> f64 {
        nonlinearity(cluster.energy, cluster.cells) * self.scale
    }

    /// Corrected energies of every cluster, in input order.
    pub fn apply_all(&self, clusters: &[LkrCluster]) -> Vec<f64> {
        clusters.iter().map(|cluster| self.apply(cluster)).collect()
    }
}

fn nonlinearity(energy: f64, cells: u32) -> f64 {
    // log is undefined for empty clusters
    if cells <= NONLINEARITY_MIN_CELLS || energy <= 0.0 {
        return energy;
    }
    if energy < 22.0 {
        energy / (0.7666 + 0.057_348_9 * energy.ln())
    } else if energy < NONLINEARITY_FREEZE {
        energy / (0.828_962 + 0.036_979_7 * energy.ln())
    } else {
        energy / (0.828_962 + 0.036_979_7 * NONLINEARITY_FREEZE.ln())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::Vector2;

    fn cluster(energy: f64, cells: u32) -> LkrCluster {
        LkrCluster {
            position: Vector2::zeros(),
            time: 0.0,
            energy,
            seed_energy: 0.0,
            cells,
            dead_cell_distance: 10.0,
        }
    }

    #[test]
    fn small_clusters_only_get_the_scale() {
        let correction = EnergyCorrection::default();
        assert_eq!(correction.apply(&cluster(0.5, 3)), 0.5 * 1.03);
        assert_eq!(correction.apply(&cluster(10.0, 9)), 10.0 * 1.03);
    }

    #[test]
    fn regimes_are_selected_by_energy() {
        let low = nonlinearity(10.0, 12);
        assert!((low - 10.0 / (0.7666 + 0.057_348_9 * 10.0f64.ln())).abs() < 1e-12);
        let mid = nonlinearity(30.0, 12);
        assert!((mid - 30.0 / (0.828_962 + 0.036_979_7 * 30.0f64.ln())).abs() < 1e-12);
        let frozen = nonlinearity(100.0, 12) / 100.0;
        let at_freeze = nonlinearity(80.0, 12) / 80.0;
        assert!((frozen - at_freeze).abs() < 1e-12);
    }

    #[test]
    fn empty_cluster_is_left_alone() {
        assert_eq!(nonlinearity(0.0, 20), 0.0);
    }
}
