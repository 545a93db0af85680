use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::models::{DrinkPatch, NewDrink, Recipe};

/// Body of `POST /drinks`. Both fields are required; they are optional here
/// so a missing field reaches the handler as `None` instead of a
/// deserialization rejection.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateDrinkRequest {
    #[validate(length(max = 80, message = "Title must be at most 80 characters"))]
    pub title: Option<String>,

    pub recipe: Option<Recipe>,
}

impl CreateDrinkRequest {
    /// `None` when a field is missing or empty.
    pub fn into_new_drink(self) -> Option<NewDrink> {
        let title = self.title.filter(|t| !t.is_empty())?;
        let recipe = self.recipe.filter(|r| !r.is_empty())?;
        Some(NewDrink { title, recipe })
    }
}

/// Body of `PATCH /drinks/:id`.
#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdateDrinkRequest {
    #[validate(length(max = 80, message = "Title must be at most 80 characters"))]
    pub title: Option<String>,

    pub recipe: Option<Recipe>,
}

impl From<UpdateDrinkRequest> for DrinkPatch {
    /// Empty values mean "leave unchanged".
    fn from(req: UpdateDrinkRequest) -> Self {
        DrinkPatch {
            title: req.title.filter(|t| !t.is_empty()),
            recipe: req.recipe.filter(|r| !r.is_empty()),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DrinksResponse<T> {
    pub success: bool,
    pub status_code: u16,
    pub drinks: T,
}

impl<T> DrinksResponse<T> {
    pub fn ok(drinks: T) -> Self {
        Self {
            success: true,
            status_code: 200,
            drinks,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DeleteResponse {
    pub success: bool,
    pub status_code: u16,
    pub delete: i32,
}

impl DeleteResponse {
    pub fn ok(id: i32) -> Self {
        Self {
            success: true,
            status_code: 200,
            delete: id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn create_requires_both_fields() {
        let req: CreateDrinkRequest = serde_json::from_value(json!({"title": "Water"})).unwrap();
        assert!(req.into_new_drink().is_none());

        let req: CreateDrinkRequest = serde_json::from_value(json!({
            "title": "",
            "recipe": [{"name": "Water", "color": "blue", "parts": 1}]
        }))
        .unwrap();
        assert!(req.into_new_drink().is_none());
    }

    #[test]
    fn create_accepts_single_ingredient_object() {
        let req: CreateDrinkRequest = serde_json::from_value(json!({
            "title": "Water",
            "recipe": {"name": "Water", "color": "blue", "parts": 1}
        }))
        .unwrap();
        let drink = req.into_new_drink().unwrap();
        assert_eq!(drink.recipe.0.len(), 1);
    }

    #[test]
    fn overlong_title_fails_validation() {
        let req = CreateDrinkRequest {
            title: Some("x".repeat(81)),
            recipe: None,
        };
        assert!(req.validate().is_err());
    }

    #[test]
    fn empty_update_fields_are_absent() {
        let patch: DrinkPatch = UpdateDrinkRequest {
            title: Some(String::new()),
            recipe: Some(Recipe::default()),
        }
        .into();
        assert!(patch.is_empty());
    }
}
