//! Domain models for drinks-service.

mod drink;

pub use drink::{
    Drink, DrinkPatch, DrinkRow, Ingredient, LongDrink, NewDrink, Recipe, ShortDrink,
    ShortIngredient,
};
