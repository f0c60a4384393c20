pub mod attributes;
pub mod auth;
pub mod cart;
pub mod categories;
pub mod compare;
pub mod favorites;
pub mod orders;
pub mod products;
pub mod shipping;
