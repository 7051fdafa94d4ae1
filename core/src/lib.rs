pub mod artifact;
pub mod castle;
pub mod color;
pub mod difficulty;
pub mod hero;
pub mod kingdom;
pub mod monster;
pub mod resource;
pub mod skill;
pub mod speed;
pub mod spell;
pub mod spell_info;
pub mod troop;
