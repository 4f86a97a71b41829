// resources.rs - Type-keyed singleton resources
//
// One value per type, owned by the app and living as long as it. Systems
// declare the resources they consume; the declarations are validated when
// the schedule is bound.

use std::any::{Any, TypeId};
use std::collections::HashMap;

pub struct Resources {
    map: HashMap<TypeId, Box<dyn Any + Send + Sync>>,
}

impl Resources {
    pub fn new() -> Self {
        Self {
            map: HashMap::new(),
        }
    }

    /// Insert or replace the singleton of type `R`.
    pub fn insert<R: Send + Sync + 'static>(&mut self, value: R) {
        self.map.insert(TypeId::of::<R>(), Box::new(value));
    }

    pub fn get<R: Send + Sync + 'static>(&self) -> Option<&R> {
        self.map
            .get(&TypeId::of::<R>())
            .and_then(|b| b.downcast_ref::<R>())
    }

    pub fn get_mut<R: Send + Sync + 'static>(&mut self) -> Option<&mut R> {
        self.map
            .get_mut(&TypeId::of::<R>())
            .and_then(|b| b.downcast_mut::<R>())
    }

    pub fn remove<R: Send + Sync + 'static>(&mut self) -> Option<R> {
        self.map
            .remove(&TypeId::of::<R>())
            .and_then(|b| b.downcast::<R>().ok())
            .map(|b| *b)
    }

    pub fn contains<R: Send + Sync + 'static>(&self) -> bool {
        self.map.contains_key(&TypeId::of::<R>())
    }

    pub fn contains_type_id(&self, id: TypeId) -> bool {
        self.map.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

impl Default for Resources {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Gravity(f32);

    #[test]
    fn insert_get_replace() {
        let mut res = Resources::new();
        res.insert(Gravity(-9.8));
        assert_eq!(res.get::<Gravity>().map(|g| g.0), Some(-9.8));
        res.insert(Gravity(-1.6));
        assert_eq!(res.get::<Gravity>().map(|g| g.0), Some(-1.6));
        assert_eq!(res.len(), 1);
    }

    #[test]
    fn remove_returns_value() {
        let mut res = Resources::new();
        res.insert(Gravity(-9.8));
        let g = res.remove::<Gravity>();
        assert_eq!(g.map(|g| g.0), Some(-9.8));
        assert!(!res.contains::<Gravity>());
    }
}
