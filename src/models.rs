use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub(crate) type Id = i32;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub(crate) struct Recipe {
    pub id: Id,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub(crate) struct Ingredient {
    pub id: Id,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub(crate) struct DietaryRestriction {
    pub id: Id,
    pub name: String,
}

// names travel as strings in JSON and snapshots alike, read ignoring case
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub(crate) enum MeasurementUnit {
    Grams,
    Milliliters,
    Units,
    Teaspoons,
    Tablespoons,
    Cups,
    Ounces,
    Pounds,
    Pinch,
}

impl MeasurementUnit {
    const ALL: [MeasurementUnit; 9] = [
        MeasurementUnit::Grams,
        MeasurementUnit::Milliliters,
        MeasurementUnit::Units,
        MeasurementUnit::Teaspoons,
        MeasurementUnit::Tablespoons,
        MeasurementUnit::Cups,
        MeasurementUnit::Ounces,
        MeasurementUnit::Pounds,
        MeasurementUnit::Pinch,
    ];

    pub(crate) fn as_str(self) -> &'static str {
        match self {
            MeasurementUnit::Grams => "Grams",
            MeasurementUnit::Milliliters => "Milliliters",
            MeasurementUnit::Units => "Units",
            MeasurementUnit::Teaspoons => "Teaspoons",
            MeasurementUnit::Tablespoons => "Tablespoons",
            MeasurementUnit::Cups => "Cups",
            MeasurementUnit::Ounces => "Ounces",
            MeasurementUnit::Pounds => "Pounds",
            MeasurementUnit::Pinch => "Pinch",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown measurement unit: {0}")]
pub(crate) struct UnknownUnit(pub String);

impl FromStr for MeasurementUnit {
    type Err = UnknownUnit;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        MeasurementUnit::ALL
            .iter()
            .copied()
            .find(|unit| unit.as_str().eq_ignore_ascii_case(trimmed))
            .ok_or_else(|| UnknownUnit(trimmed.to_string()))
    }
}

impl TryFrom<String> for MeasurementUnit {
    type Error = UnknownUnit;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<MeasurementUnit> for String {
    fn from(unit: MeasurementUnit) -> Self {
        unit.as_str().to_string()
    }
}

// recipe R uses ingredient I in quantity amount/unit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub(crate) struct RecipeIngredient {
    pub recipe_id: Id,     //foreign key
    pub ingredient_id: Id, //foreign key
    pub amount: f64,
    pub measurement_unit: MeasurementUnit,
}

// ingredient I is disallowed under restriction D
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub(crate) struct IngredientRestriction {
    pub dietary_restriction_id: Id, //foreign key
    pub ingredient_id: Id,          //foreign key
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub(crate) struct NewRecipe {
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub(crate) struct IngredientInput {
    pub name: String,
    #[serde(default)]
    pub amount: Option<f64>,
    #[serde(default)]
    pub measurement_unit: Option<MeasurementUnit>,
}

impl IngredientInput {
    #[allow(dead_code)]
    pub(crate) fn named(name: impl Into<String>) -> Self {
        IngredientInput {
            name: name.into(),
            amount: None,
            measurement_unit: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub(crate) struct RecipeInput {
    pub recipe: NewRecipe,
    #[serde(default)]
    pub ingredients: Vec<IngredientInput>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unit_parses_ignoring_case_and_whitespace() {
        assert_eq!("grams".parse::<MeasurementUnit>(), Ok(MeasurementUnit::Grams));
        assert_eq!(
            " TABLESPOONS ".parse::<MeasurementUnit>(),
            Ok(MeasurementUnit::Tablespoons)
        );
        assert_eq!(
            "bushels".parse::<MeasurementUnit>(),
            Err(UnknownUnit("bushels".to_string()))
        );
    }

    #[test]
    fn recipe_input_defaults_missing_portions() {
        let body = r#"{
            "recipe": {"name": "Soup"},
            "ingredients": [
                {"name": "Salt"},
                {"name": "Water", "amount": 500, "measurement_unit": "Milliliters"}
            ]
        }"#;
        let input: RecipeInput = serde_json::from_str(body).unwrap();
        assert_eq!(input.ingredients[0], IngredientInput::named("Salt"));
        assert_eq!(input.ingredients[1].amount, Some(500.0));
        assert_eq!(
            input.ingredients[1].measurement_unit,
            Some(MeasurementUnit::Milliliters)
        );
    }

    #[test]
    fn json_units_are_read_ignoring_case() {
        let input: IngredientInput =
            serde_json::from_str(r#"{"name":"Salt","measurement_unit":"grams"}"#).unwrap();
        assert_eq!(input.measurement_unit, Some(MeasurementUnit::Grams));

        let err = serde_json::from_str::<IngredientInput>(
            r#"{"name":"Salt","measurement_unit":"bushels"}"#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("unknown measurement unit: bushels"));
    }

    #[test]
    fn units_are_written_in_pascal_case() {
        let json = serde_json::to_string(&MeasurementUnit::Milliliters).unwrap();
        assert_eq!(json, r#""Milliliters""#);

        let bytes = bincode::serialize(&MeasurementUnit::Pinch).unwrap();
        let unit: MeasurementUnit = bincode::deserialize(&bytes).unwrap();
        assert_eq!(unit, MeasurementUnit::Pinch);
    }
}
