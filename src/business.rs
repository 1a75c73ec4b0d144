use std::collections::HashSet;

use crate::config::LayerConfig;
use crate::models::{DietaryRestriction, Id, Ingredient, Recipe, RecipeIngredient, RecipeInput};
use crate::storage::{AppStorage, StorageError};

/// Result of an ingredient delete request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum IngredientDeletion {
    /// The ingredient is gone. When it was used by exactly one recipe that
    /// recipe was removed with it.
    Deleted { cascaded_recipe: Option<Id> },
    NotFound,
    /// Refused: this many distinct recipes still use the ingredient.
    SharedByRecipes(usize),
}

impl IngredientDeletion {
    pub(crate) fn is_deleted(self) -> bool {
        matches!(self, IngredientDeletion::Deleted { .. })
    }
}

/// Queries and referential-integrity-aware mutations over an [`AppStorage`].
///
/// The layer keeps no state of its own beyond its configuration: every call
/// reads and writes the storage collections directly. It is not synchronized;
/// callers sharing it across threads must serialize access.
pub(crate) struct BusinessLogicLayer<S> {
    storage: S,
    config: LayerConfig,
}

impl<S: AppStorage> BusinessLogicLayer<S> {
    pub(crate) fn new(storage: S, config: LayerConfig) -> Self {
        BusinessLogicLayer { storage, config }
    }

    pub(crate) fn storage(&self) -> &S {
        &self.storage
    }

    /// Raw access. Changes made through here bypass the cascade rules.
    #[allow(dead_code)]
    pub(crate) fn storage_mut(&mut self) -> &mut S {
        &mut self.storage
    }

    #[allow(dead_code)]
    pub(crate) fn into_storage(self) -> S {
        self.storage
    }

    fn resolve_ingredient(&self, id: Option<Id>, name: Option<&str>) -> Option<Ingredient> {
        let ingredients = self.storage.ingredients();
        id.and_then(|id| ingredients.iter().find(|i| i.id == id))
            .or_else(|| name.and_then(|name| ingredients.iter().find(|i| i.name == name)))
            .cloned()
    }

    fn resolve_recipe(&self, id: Option<Id>, name: Option<&str>) -> Option<Recipe> {
        let recipes = self.storage.recipes();
        id.and_then(|id| recipes.iter().find(|r| r.id == id))
            .or_else(|| name.and_then(|name| recipes.iter().find(|r| r.name == name)))
            .cloned()
    }

    fn resolve_restriction(
        &self,
        name: Option<&str>,
        id: Option<Id>,
    ) -> Option<DietaryRestriction> {
        let restrictions = self.storage.dietary_restrictions();
        name.and_then(|name| restrictions.iter().find(|d| d.name == name))
            .or_else(|| id.and_then(|id| restrictions.iter().find(|d| d.id == id)))
            .cloned()
    }

    fn recipe_ids_using(&self, ingredient_ids: &HashSet<Id>) -> HashSet<Id> {
        self.storage
            .recipe_ingredients()
            .iter()
            .filter(|ri| ingredient_ids.contains(&ri.ingredient_id))
            .map(|ri| ri.recipe_id)
            .collect()
    }

    fn recipes_with_ids(&self, recipe_ids: &HashSet<Id>) -> Vec<Recipe> {
        self.storage
            .recipes()
            .iter()
            .filter(|r| recipe_ids.contains(&r.id))
            .cloned()
            .collect()
    }

    pub(crate) fn get_recipes_by_ingredient(
        &self,
        id: Option<Id>,
        name: Option<&str>,
    ) -> Vec<Recipe> {
        let ingredient = match self.resolve_ingredient(id, name) {
            Some(ingredient) => ingredient,
            None => return Vec::new(),
        };
        let recipe_ids = self.recipe_ids_using(&HashSet::from([ingredient.id]));
        self.recipes_with_ids(&recipe_ids)
    }

    /// Inserts the recipe and every listed ingredient as new rows, linking
    /// each ingredient to the recipe. Ingredients are never matched against
    /// existing ones by name.
    ///
    /// All keys are drawn before any collection is touched, so a generator
    /// failure leaves storage unchanged.
    pub(crate) fn add_recipe_and_ingredients(
        &mut self,
        input: RecipeInput,
    ) -> Result<Recipe, StorageError> {
        let recipe_id = self.storage.generate_primary_key()?;
        let ingredient_ids = input
            .ingredients
            .iter()
            .map(|_| self.storage.generate_primary_key())
            .collect::<Result<Vec<Id>, StorageError>>()?;

        let recipe = Recipe {
            id: recipe_id,
            name: input.recipe.name,
        };
        self.storage.recipes_mut().push(recipe.clone());

        for (ingredient_id, ingredient) in ingredient_ids.into_iter().zip(input.ingredients) {
            self.storage.ingredients_mut().push(Ingredient {
                id: ingredient_id,
                name: ingredient.name,
            });
            self.storage.recipe_ingredients_mut().push(RecipeIngredient {
                recipe_id,
                ingredient_id,
                amount: ingredient.amount.unwrap_or(self.config.default_amount),
                measurement_unit: ingredient
                    .measurement_unit
                    .unwrap_or(self.config.default_unit),
            });
        }

        log::debug!("added recipe {} ({})", recipe.id, recipe.name);
        Ok(recipe)
    }

    /// Recipes that contain at least one ingredient disallowed by the
    /// restriction.
    pub(crate) fn get_recipes_by_dietary_restriction(
        &self,
        name: Option<&str>,
        id: Option<Id>,
    ) -> Vec<Recipe> {
        let restriction = match self.resolve_restriction(name, id) {
            Some(restriction) => restriction,
            None => return Vec::new(),
        };
        let disallowed: HashSet<Id> = self
            .storage
            .ingredient_restrictions()
            .iter()
            .filter(|ir| ir.dietary_restriction_id == restriction.id)
            .map(|ir| ir.ingredient_id)
            .collect();
        let recipe_ids = self.recipe_ids_using(&disallowed);
        self.recipes_with_ids(&recipe_ids)
    }

    pub(crate) fn get_recipes_by_name_or_id(&self, name: &str, id: Option<Id>) -> Vec<Recipe> {
        let id = id.filter(|id| *id > 0);
        if name.is_empty() && id.is_none() {
            return Vec::new();
        }
        let mut seen = HashSet::new();
        self.storage
            .recipes()
            .iter()
            .filter(|r| {
                (!name.is_empty() && self.config.name_match.matches(&r.name, name))
                    || Some(r.id) == id
            })
            .filter(|r| seen.insert(r.id))
            .cloned()
            .collect()
    }

    pub(crate) fn does_recipe_exist(&self, name: &str) -> bool {
        self.storage.recipes().iter().any(|r| r.name == name)
    }

    #[allow(dead_code)]
    pub(crate) fn delete_ingredient(&mut self, id: Option<Id>, name: Option<&str>) -> bool {
        self.delete_ingredient_outcome(id, name).is_deleted()
    }

    /// An ingredient used by several recipes is kept. One used by exactly one
    /// recipe takes that recipe (and all of its association rows) with it.
    pub(crate) fn delete_ingredient_outcome(
        &mut self,
        id: Option<Id>,
        name: Option<&str>,
    ) -> IngredientDeletion {
        let ingredient = match self.resolve_ingredient(id, name) {
            Some(ingredient) => ingredient,
            None => return IngredientDeletion::NotFound,
        };
        let recipe_ids = self.recipe_ids_using(&HashSet::from([ingredient.id]));

        let cascaded_recipe = match recipe_ids.len() {
            0 => None,
            1 => recipe_ids.into_iter().next(),
            shared => {
                log::info!(
                    "refusing to delete ingredient {} ({}): used by {} recipes",
                    ingredient.id,
                    ingredient.name,
                    shared
                );
                return IngredientDeletion::SharedByRecipes(shared);
            }
        };

        if let Some(recipe_id) = cascaded_recipe {
            self.storage
                .recipe_ingredients_mut()
                .retain(|ri| ri.recipe_id != recipe_id && ri.ingredient_id != ingredient.id);
            self.storage.recipes_mut().retain(|r| r.id != recipe_id);
            log::debug!(
                "removed recipe {} with its only user of ingredient {}",
                recipe_id,
                ingredient.id
            );
        }
        self.storage
            .ingredient_restrictions_mut()
            .retain(|ir| ir.ingredient_id != ingredient.id);
        self.storage.ingredients_mut().retain(|i| i.id != ingredient.id);
        log::debug!("deleted ingredient {} ({})", ingredient.id, ingredient.name);

        IngredientDeletion::Deleted { cascaded_recipe }
    }

    /// Ingredients are left in place even when no other recipe uses them.
    pub(crate) fn delete_recipe(&mut self, id: Option<Id>, name: Option<&str>) -> bool {
        let recipe = match self.resolve_recipe(id, name) {
            Some(recipe) => recipe,
            None => return false,
        };
        self.storage.recipe_ingredients_mut().retain(|ri| ri.recipe_id != recipe.id);
        self.storage.recipes_mut().retain(|r| r.id != recipe.id);
        log::debug!("deleted recipe {} ({})", recipe.id, recipe.name);
        true
    }

    pub(crate) fn list_ingredients(&self) -> Vec<Ingredient> {
        self.storage.ingredients().to_vec()
    }

    pub(crate) fn list_dietary_restrictions(&self) -> Vec<DietaryRestriction> {
        self.storage.dietary_restrictions().to_vec()
    }

    pub(crate) fn get_recipe_ingredients(&self, recipe_id: Id) -> Vec<RecipeIngredient> {
        self.storage
            .recipe_ingredients()
            .iter()
            .filter(|ri| ri.recipe_id == recipe_id)
            .cloned()
            .collect()
    }
}
