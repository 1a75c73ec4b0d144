use std::fs;
use std::io;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::{
    DietaryRestriction, Id, Ingredient, IngredientRestriction, Recipe, RecipeIngredient,
};

#[derive(Debug, Error)]
pub(crate) enum StorageError {
    #[error("primary key space exhausted")]
    KeysExhausted,

    #[error("snapshot encoding error: {0}")]
    Snapshot(#[from] bincode::Error),

    #[error("snapshot io error: {0}")]
    Io(#[from] io::Error),
}

/// Collections backing the business layer, plus the key generator.
///
/// Implementations hold data only: no validation, no cascading.
pub(crate) trait AppStorage {
    fn recipes(&self) -> &[Recipe];
    fn recipes_mut(&mut self) -> &mut Vec<Recipe>;

    fn ingredients(&self) -> &[Ingredient];
    fn ingredients_mut(&mut self) -> &mut Vec<Ingredient>;

    fn dietary_restrictions(&self) -> &[DietaryRestriction];
    // restrictions are only seeded through snapshots outside of tests
    #[allow(dead_code)]
    fn dietary_restrictions_mut(&mut self) -> &mut Vec<DietaryRestriction>;

    fn recipe_ingredients(&self) -> &[RecipeIngredient];
    fn recipe_ingredients_mut(&mut self) -> &mut Vec<RecipeIngredient>;

    fn ingredient_restrictions(&self) -> &[IngredientRestriction];
    fn ingredient_restrictions_mut(&mut self) -> &mut Vec<IngredientRestriction>;

    /// Returns an id never handed out before. Each call consumes a value.
    fn generate_primary_key(&mut self) -> Result<Id, StorageError>;
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub(crate) struct Snapshot {
    pub recipes: Vec<Recipe>,
    pub ingredients: Vec<Ingredient>,
    pub dietary_restrictions: Vec<DietaryRestriction>,
    pub recipe_ingredients: Vec<RecipeIngredient>,
    pub ingredient_restrictions: Vec<IngredientRestriction>,
    pub next_key: Id,
}

impl Snapshot {
    pub(crate) fn to_bytes(&self) -> Result<Vec<u8>, StorageError> {
        Ok(bincode::serialize(self)?)
    }

    pub(crate) fn from_u8(bytes: &[u8]) -> Result<Self, StorageError> {
        Ok(bincode::deserialize(bytes)?)
    }

    fn highest_id(&self) -> Id {
        let entity_ids = self
            .recipes
            .iter()
            .map(|r| r.id)
            .chain(self.ingredients.iter().map(|i| i.id))
            .chain(self.dietary_restrictions.iter().map(|d| d.id));
        let referenced_ids = self
            .recipe_ingredients
            .iter()
            .flat_map(|ri| [ri.recipe_id, ri.ingredient_id])
            .chain(
                self.ingredient_restrictions
                    .iter()
                    .flat_map(|ir| [ir.dietary_restriction_id, ir.ingredient_id]),
            );
        entity_ids.chain(referenced_ids).max().unwrap_or(0)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct InMemoryStorage {
    recipes: Vec<Recipe>,
    ingredients: Vec<Ingredient>,
    dietary_restrictions: Vec<DietaryRestriction>,
    recipe_ingredients: Vec<RecipeIngredient>,
    ingredient_restrictions: Vec<IngredientRestriction>,
    next_key: Id,
}

impl Default for InMemoryStorage {
    fn default() -> Self {
        InMemoryStorage {
            recipes: Vec::new(),
            ingredients: Vec::new(),
            dietary_restrictions: Vec::new(),
            recipe_ingredients: Vec::new(),
            ingredient_restrictions: Vec::new(),
            next_key: 1,
        }
    }
}

impl InMemoryStorage {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// The key counter is moved past every id the snapshot mentions, so a
    /// stale or hand-edited `next_key` cannot cause a key to be reissued.
    pub(crate) fn from_snapshot(snapshot: Snapshot) -> Self {
        let next_key = snapshot
            .next_key
            .max(snapshot.highest_id().saturating_add(1))
            .max(1);
        InMemoryStorage {
            recipes: snapshot.recipes,
            ingredients: snapshot.ingredients,
            dietary_restrictions: snapshot.dietary_restrictions,
            recipe_ingredients: snapshot.recipe_ingredients,
            ingredient_restrictions: snapshot.ingredient_restrictions,
            next_key,
        }
    }

    pub(crate) fn snapshot(&self) -> Snapshot {
        Snapshot {
            recipes: self.recipes.clone(),
            ingredients: self.ingredients.clone(),
            dietary_restrictions: self.dietary_restrictions.clone(),
            recipe_ingredients: self.recipe_ingredients.clone(),
            ingredient_restrictions: self.ingredient_restrictions.clone(),
            next_key: self.next_key,
        }
    }
}

impl AppStorage for InMemoryStorage {
    fn recipes(&self) -> &[Recipe] {
        &self.recipes
    }

    fn recipes_mut(&mut self) -> &mut Vec<Recipe> {
        &mut self.recipes
    }

    fn ingredients(&self) -> &[Ingredient] {
        &self.ingredients
    }

    fn ingredients_mut(&mut self) -> &mut Vec<Ingredient> {
        &mut self.ingredients
    }

    fn dietary_restrictions(&self) -> &[DietaryRestriction] {
        &self.dietary_restrictions
    }

    fn dietary_restrictions_mut(&mut self) -> &mut Vec<DietaryRestriction> {
        &mut self.dietary_restrictions
    }

    fn recipe_ingredients(&self) -> &[RecipeIngredient] {
        &self.recipe_ingredients
    }

    fn recipe_ingredients_mut(&mut self) -> &mut Vec<RecipeIngredient> {
        &mut self.recipe_ingredients
    }

    fn ingredient_restrictions(&self) -> &[IngredientRestriction] {
        &self.ingredient_restrictions
    }

    fn ingredient_restrictions_mut(&mut self) -> &mut Vec<IngredientRestriction> {
        &mut self.ingredient_restrictions
    }

    fn generate_primary_key(&mut self) -> Result<Id, StorageError> {
        let key = self.next_key;
        self.next_key = key.checked_add(1).ok_or(StorageError::KeysExhausted)?;
        Ok(key)
    }
}

/// A missing file is not an error: it means there is nothing to restore yet.
pub(crate) fn load_snapshot(path: &Path) -> Result<Option<InMemoryStorage>, StorageError> {
    match fs::read(path) {
        Ok(bytes) => {
            let snapshot = Snapshot::from_u8(&bytes)?;
            log::info!(
                "restored {} recipes and {} ingredients from {}",
                snapshot.recipes.len(),
                snapshot.ingredients.len(),
                path.display()
            );
            Ok(Some(InMemoryStorage::from_snapshot(snapshot)))
        }
        Err(err) if err.kind() == io::ErrorKind::NotFound => {
            log::warn!("no snapshot at {}, starting empty", path.display());
            Ok(None)
        }
        Err(err) => Err(err.into()),
    }
}

pub(crate) fn save_snapshot(storage: &InMemoryStorage, path: &Path) -> Result<(), StorageError> {
    let bytes = storage.snapshot().to_bytes()?;
    fs::write(path, bytes)?;
    log::info!("wrote snapshot to {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::MeasurementUnit;

    fn sample() -> InMemoryStorage {
        let mut storage = InMemoryStorage::new();
        storage.recipes_mut().push(Recipe {
            id: 1,
            name: "Soup".to_string(),
        });
        storage.ingredients_mut().push(Ingredient {
            id: 7,
            name: "Salt".to_string(),
        });
        storage.recipe_ingredients_mut().push(RecipeIngredient {
            recipe_id: 1,
            ingredient_id: 7,
            amount: 2.5,
            measurement_unit: MeasurementUnit::Grams,
        });
        storage
    }

    #[test]
    fn keys_are_never_repeated() {
        let mut storage = InMemoryStorage::new();
        let a = storage.generate_primary_key().unwrap();
        let b = storage.generate_primary_key().unwrap();
        let c = storage.generate_primary_key().unwrap();
        assert_eq!((a, b, c), (1, 2, 3));
    }

    #[test]
    fn exhausted_key_space_is_a_hard_error() {
        let mut storage = InMemoryStorage::from_snapshot(Snapshot {
            next_key: Id::MAX,
            ..Snapshot::default()
        });
        assert!(matches!(
            storage.generate_primary_key(),
            Err(StorageError::KeysExhausted)
        ));
    }

    #[test]
    fn snapshot_survives_encoding() {
        let storage = sample();
        let bytes = storage.snapshot().to_bytes().unwrap();
        let restored = InMemoryStorage::from_snapshot(Snapshot::from_u8(&bytes).unwrap());
        assert_eq!(restored, storage);
    }

    #[test]
    fn restored_counter_skips_existing_ids() {
        let mut snapshot = sample().snapshot();
        snapshot.next_key = 1;
        let mut restored = InMemoryStorage::from_snapshot(snapshot);
        assert_eq!(restored.generate_primary_key().unwrap(), 8);
    }

    #[test]
    fn garbage_snapshot_is_rejected() {
        assert!(matches!(
            Snapshot::from_u8(&[0xff, 0x01]),
            Err(StorageError::Snapshot(_))
        ));
    }

    #[test]
    fn snapshot_file_round_trip() {
        let path = std::env::temp_dir().join(format!(
            "recipe-store-snapshot-{}.bin",
            std::process::id()
        ));
        let storage = sample();
        save_snapshot(&storage, &path).unwrap();
        let restored = load_snapshot(&path).unwrap();
        let _ = fs::remove_file(&path);
        assert_eq!(restored, Some(storage));
    }

    #[test]
    fn missing_snapshot_file_loads_nothing() {
        let path = std::env::temp_dir().join("recipe-store-does-not-exist.bin");
        assert_eq!(load_snapshot(&path).unwrap(), None);
    }
}
