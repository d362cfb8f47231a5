//! Ground models: friction and fluid profiles looked up at contact time.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::error::{Result, SimError};

/// Index of a model inside a [`GroundModelRegistry`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GroundModelId(pub u16);

/// Particle effect parameters consumed by the effects collaborator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GroundEffects {
    pub kind: u32,
    pub colour: [f32; 4],
    pub particle_name: String,
    pub particle_amount: u32,
    pub particle_min_velo: f32,
    pub particle_max_velo: f32,
    pub particle_fade: f32,
    pub particle_timedelta: f32,
    pub particle_velo_factor: f32,
    pub particle_ttl: f32,
}

impl Default for GroundEffects {
    fn default() -> Self {
        Self {
            kind: 0,
            colour: [1.0, 1.0, 1.0, 1.0],
            particle_name: String::new(),
            particle_amount: 0,
            particle_min_velo: 5.0,
            particle_max_velo: 99_999.0,
            particle_fade: -1.0,
            particle_timedelta: 1.0,
            particle_velo_factor: 0.7,
            particle_ttl: 1.0,
        }
    }
}

/// Friction/fluid profile of a surface material.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GroundModel {
    pub name: String,
    pub basename: String,
    /// Adhesion velocity (m/s).
    pub va: f32,
    /// Static friction coefficient.
    pub ms: f32,
    /// Sliding friction coefficient.
    pub mc: f32,
    /// Hydrodynamic friction (s/m).
    pub t2: f32,
    /// Stribeck velocity (m/s).
    pub vs: f32,
    /// Stribeck curve exponent.
    pub alpha: f32,
    /// Ground strength, scales the reaction used for friction.
    pub strength: f32,
    pub fluid_density: f32,
    pub flow_consistency_index: f32,
    /// <1 pseudoplastic, =1 Newtonian, >1 dilatant.
    pub flow_behavior_index: f32,
    /// Depth of the solid ground below the fluid surface; 0 for plain solid ground.
    pub solid_ground_level: f32,
    /// Upward/downward drag anisotropy, 1 for isotropic.
    pub drag_anisotropy: f32,
    pub effects: GroundEffects,
}

impl Default for GroundModel {
    fn default() -> Self {
        Self::solid("default", 5.0, 1.0, 0.8)
    }
}

impl GroundModel {
    /// A plain solid surface.
    pub fn solid(name: &str, va: f32, ms: f32, mc: f32) -> Self {
        Self {
            name: name.to_owned(),
            basename: name.to_owned(),
            va,
            ms,
            mc,
            t2: 0.0,
            vs: 1.0,
            alpha: 2.0,
            strength: 1.0,
            fluid_density: 0.0,
            flow_consistency_index: 0.0,
            flow_behavior_index: 1.0,
            solid_ground_level: 0.0,
            drag_anisotropy: 1.0,
            effects: GroundEffects::default(),
        }
    }

    /// A soft layer of power-law fluid over solid ground `depth` metres down.
    pub fn fluid(
        name: &str,
        density: f32,
        consistency: f32,
        behavior: f32,
        depth: f32,
        drag_anisotropy: f32,
    ) -> Self {
        Self {
            fluid_density: density,
            flow_consistency_index: consistency,
            flow_behavior_index: behavior,
            solid_ground_level: depth,
            drag_anisotropy,
            ..Self::solid(name, 0.5, 0.6, 0.4)
        }
    }

    pub fn has_fluid(&self) -> bool {
        self.solid_ground_level != 0.0
    }
}

/// Immutable-after-load collection of ground models, shared by all vehicles.
#[derive(Debug, Clone, Default)]
pub struct GroundModelRegistry {
    models: Vec<GroundModel>,
    by_name: HashMap<String, GroundModelId>,
}

/// The surfaces every registry built by `with_defaults` starts with.
pub fn stock_models() -> Vec<GroundModel> {
    let mut ice = GroundModel::solid("ice", 0.1, 0.05, 0.03);
    ice.alpha = 1.0;
    let mut gravel = GroundModel::solid("gravel", 2.0, 0.75, 0.55);
    gravel.strength = 0.8;
    let mut wet = GroundModel::solid("wet_asphalt", 3.0, 0.8, 0.6);
    wet.t2 = 0.02;
    vec![
        GroundModel::solid("concrete", 5.0, 1.0, 0.8),
        GroundModel::solid("asphalt", 5.0, 0.95, 0.75),
        wet,
        gravel,
        GroundModel::solid("grass", 1.0, 0.6, 0.45),
        ice,
        GroundModel::fluid("mud", 1_800.0, 1_500.0, 0.7, 0.4, 0.3),
        GroundModel::fluid("snow", 400.0, 300.0, 0.6, 0.3, 0.5),
        GroundModel::fluid("water", 1_000.0, 40.0, 1.0, 50.0, 1.0),
    ]
}

impl GroundModelRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry preloaded with the stock surfaces.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        for model in stock_models() {
            let inserted = registry.insert(model);
            debug_assert!(inserted.is_ok(), "stock ground model rejected: {inserted:?}");
        }
        registry
    }

    pub fn from_models(models: impl IntoIterator<Item = GroundModel>) -> Result<Self> {
        let mut registry = Self::new();
        for model in models {
            registry.insert(model)?;
        }
        Ok(registry)
    }

    pub fn insert(&mut self, model: GroundModel) -> Result<GroundModelId> {
        if self.by_name.contains_key(&model.name) {
            return Err(SimError::InvalidConfig(format!(
                "duplicate ground model '{}'",
                model.name
            )));
        }
        if self.models.len() >= u16::MAX as usize {
            return Err(SimError::out_of_range("ground model", self.models.len(), u16::MAX as usize));
        }
        if model.va <= 0.0 || model.vs <= 0.0 {
            return Err(SimError::InvalidConfig(format!(
                "ground model '{}' needs positive adhesion and stribeck velocities",
                model.name
            )));
        }
        let id = GroundModelId(self.models.len() as u16);
        self.by_name.insert(model.name.clone(), id);
        self.models.push(model);
        Ok(id)
    }

    pub fn get(&self, id: GroundModelId) -> Option<&GroundModel> {
        self.models.get(id.0 as usize)
    }

    pub fn find(&self, name: &str) -> Result<GroundModelId> {
        self.by_name
            .get(name)
            .copied()
            .ok_or_else(|| SimError::UnknownGroundModel(name.to_owned()))
    }

    pub fn by_name(&self, name: &str) -> Option<&GroundModel> {
        self.by_name.get(name).and_then(|&id| self.get(id))
    }

    pub fn len(&self) -> usize {
        self.models.len()
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_resolve_by_name() {
        let registry = GroundModelRegistry::with_defaults();
        let mud = registry.find("mud").unwrap();
        assert!(registry.get(mud).unwrap().has_fluid());
        assert!(!registry.by_name("concrete").unwrap().has_fluid());
        assert!(matches!(
            registry.find("lava"),
            Err(SimError::UnknownGroundModel(_))
        ));
    }

    #[test]
    fn stock_models_register_cleanly() {
        let stock = stock_models();
        let count = stock.len();
        let registry = GroundModelRegistry::from_models(stock).unwrap();
        assert_eq!(registry.len(), count);
        assert_eq!(GroundModelRegistry::with_defaults().len(), count);
    }

    #[test]
    fn duplicate_names_are_rejected() {
        let mut registry = GroundModelRegistry::new();
        registry.insert(GroundModel::solid("a", 1.0, 1.0, 1.0)).unwrap();
        assert!(registry.insert(GroundModel::solid("a", 1.0, 1.0, 1.0)).is_err());
    }

    #[test]
    fn models_deserialize_with_defaults() {
        let model: GroundModel =
            serde_json::from_str(r#"{ "name": "tarmac", "ms": 1.1 }"#).unwrap();
        assert_eq!(model.name, "tarmac");
        assert_eq!(model.ms, 1.1);
        assert_eq!(model.va, 5.0);
    }
}
