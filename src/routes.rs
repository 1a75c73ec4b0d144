use std::sync::{Mutex, MutexGuard};

use actix_web::{delete, get, post, web, Error, HttpResponse};
use serde::Deserialize;
use serde_json::json;

use crate::business::{BusinessLogicLayer, IngredientDeletion};
use crate::models::{Id, RecipeInput};
use crate::storage::InMemoryStorage;

pub(crate) type SharedLayer = Mutex<BusinessLogicLayer<InMemoryStorage>>;

//one lock around the whole layer, held for a single call
fn lock(
    layer: &SharedLayer,
) -> Result<MutexGuard<'_, BusinessLogicLayer<InMemoryStorage>>, Error> {
    layer
        .lock()
        .map_err(|_| actix_web::error::ErrorInternalServerError("storage lock poisoned"))
}

#[derive(Debug, Deserialize)]
pub(crate) struct Lookup {
    pub id: Option<Id>,
    pub name: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct NameQuery {
    pub name: String,
}

#[get("/apis/recipes")]
async fn get_recipes_by_name_or_id(
    query: web::Query<Lookup>,
    layer: web::Data<SharedLayer>,
) -> Result<HttpResponse, Error> {
    let name = query.name.as_deref().unwrap_or("");
    let recipes = lock(&layer)?.get_recipes_by_name_or_id(name, query.id);
    Ok(HttpResponse::Ok().json(recipes))
}

#[get("/apis/recipes/exists")]
async fn recipe_exists(
    query: web::Query<NameQuery>,
    layer: web::Data<SharedLayer>,
) -> Result<HttpResponse, Error> {
    let exists = lock(&layer)?.does_recipe_exist(&query.name);
    Ok(HttpResponse::Ok().json(json!({ "exists": exists })))
}

#[get("/apis/recipes/by-ingredient")]
async fn get_recipes_by_ingredient(
    query: web::Query<Lookup>,
    layer: web::Data<SharedLayer>,
) -> Result<HttpResponse, Error> {
    let recipes = lock(&layer)?.get_recipes_by_ingredient(query.id, query.name.as_deref());
    Ok(HttpResponse::Ok().json(recipes))
}

#[get("/apis/recipes/by-restriction")]
async fn get_recipes_by_restriction(
    query: web::Query<Lookup>,
    layer: web::Data<SharedLayer>,
) -> Result<HttpResponse, Error> {
    let recipes = lock(&layer)?.get_recipes_by_dietary_restriction(query.name.as_deref(), query.id);
    Ok(HttpResponse::Ok().json(recipes))
}

#[get("/apis/recipes/{recipe_id}/ingredients")]
async fn get_recipe_ingredients(
    recipe_id: web::Path<Id>,
    layer: web::Data<SharedLayer>,
) -> Result<HttpResponse, Error> {
    let rows = lock(&layer)?.get_recipe_ingredients(recipe_id.into_inner());
    Ok(HttpResponse::Ok().json(rows))
}

//names are not unique in storage, so the check lives here and not in the layer
#[post("/apis/recipes")]
async fn add_recipe(
    input: web::Json<RecipeInput>,
    layer: web::Data<SharedLayer>,
) -> Result<HttpResponse, Error> {
    let input = input.into_inner();
    let mut layer = lock(&layer)?;
    if layer.does_recipe_exist(&input.recipe.name) {
        return Ok(HttpResponse::Conflict().json(json!({
            "error": format!("recipe {} already exists", input.recipe.name)
        })));
    }
    let recipe = layer
        .add_recipe_and_ingredients(input)
        .map_err(actix_web::error::ErrorInternalServerError)?;
    Ok(HttpResponse::Created().json(recipe))
}

#[delete("/apis/recipes")]
async fn delete_recipe(
    query: web::Query<Lookup>,
    layer: web::Data<SharedLayer>,
) -> Result<HttpResponse, Error> {
    if lock(&layer)?.delete_recipe(query.id, query.name.as_deref()) {
        Ok(HttpResponse::NoContent().finish())
    } else {
        Ok(HttpResponse::NotFound().finish())
    }
}

#[get("/apis/ingredients")]
async fn get_all_ingredients(layer: web::Data<SharedLayer>) -> Result<HttpResponse, Error> {
    let ingredients = lock(&layer)?.list_ingredients();
    Ok(HttpResponse::Ok().json(ingredients))
}

#[delete("/apis/ingredients")]
async fn delete_ingredient(
    query: web::Query<Lookup>,
    layer: web::Data<SharedLayer>,
) -> Result<HttpResponse, Error> {
    let outcome = lock(&layer)?.delete_ingredient_outcome(query.id, query.name.as_deref());
    Ok(match outcome {
        IngredientDeletion::Deleted { cascaded_recipe } => {
            if let Some(recipe_id) = cascaded_recipe {
                log::info!("recipe {} was removed along with its ingredient", recipe_id);
            }
            HttpResponse::NoContent().finish()
        }
        IngredientDeletion::NotFound => HttpResponse::NotFound().finish(),
        IngredientDeletion::SharedByRecipes(count) => HttpResponse::Conflict().json(json!({
            "error": format!("ingredient is used by {} recipes", count)
        })),
    })
}

#[get("/apis/restrictions")]
async fn get_all_restrictions(layer: web::Data<SharedLayer>) -> Result<HttpResponse, Error> {
    let restrictions = lock(&layer)?.list_dietary_restrictions();
    Ok(HttpResponse::Ok().json(restrictions))
}

pub(crate) fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(recipe_exists)
        .service(get_recipes_by_ingredient)
        .service(get_recipes_by_restriction)
        .service(get_recipe_ingredients)
        .service(get_recipes_by_name_or_id)
        .service(add_recipe)
        .service(delete_recipe)
        .service(get_all_ingredients)
        .service(delete_ingredient)
        .service(get_all_restrictions);
}
