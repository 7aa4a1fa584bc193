//! Domain layer - Core business entities and logic
//!
//! This module contains the core domain models that represent
//! business concepts independent of infrastructure concerns.

pub mod category;
pub mod normalize;
pub mod product;
pub mod role;
pub mod user;

pub use category::{Category, CreateCategory, UpdateCategory};
pub use normalize::{normalize, NameStyle, Normalized};
pub use product::{CreateProduct, Product, UpdateProduct};
pub use role::Role;
pub use user::{CreateUser, UpdateUser, User};
