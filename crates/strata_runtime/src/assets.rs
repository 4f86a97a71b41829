// assets.rs - Physics model registry
//
// Scene code references models by id; a missing id is recoverable at the
// call site. Model construction from files is a collaborator's concern.

use std::collections::HashMap;
use strata_physics::PhysicsModel;
use thiserror::Error;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct AssetId(pub u32);

#[derive(Debug, Error)]
pub enum AssetError {
    #[error("model asset {0:?} is not registered")]
    NotFound(AssetId),
}

/// Resource mapping asset ids to physics models.
#[derive(Default)]
pub struct ModelAssets {
    models: HashMap<AssetId, PhysicsModel>,
    next: u32,
}

impl ModelAssets {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, model: PhysicsModel) -> AssetId {
        let id = AssetId(self.next);
        self.next += 1;
        self.models.insert(id, model);
        id
    }

    pub fn get(&self, id: AssetId) -> Result<&PhysicsModel, AssetError> {
        self.models.get(&id).ok_or(AssetError::NotFound(id))
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
    use glam::Vec3;

    #[test]
    fn missing_asset_is_recoverable() {
        let mut assets = ModelAssets::new();
        let id = assets.insert(PhysicsModel::single_box(Vec3::splat(0.5)));
        assert!(assets.get(id).is_ok());
        assert!(matches!(
            assets.get(AssetId(999)),
            Err(AssetError::NotFound(_))
        ));
    }
}
