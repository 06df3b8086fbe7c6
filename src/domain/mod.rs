//! Domain layer - Core game state logic with no external dependencies
//!
//! This layer contains:
//! - Entities: Sheet, Player, Action, Item, Proficiency, Enemy, Augmentation
//! - Value Objects: Typed identifiers and relationship bridges
//! - Aggregates: The game document (entity store) and the turn order machine
//! - Domain Services: Formula evaluation and arithmetic reduction

pub mod aggregates;
pub mod entities;
pub mod services;
pub mod value_objects;
