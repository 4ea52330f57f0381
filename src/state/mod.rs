pub mod character_pool;

pub use character_pool::{
    create_shared_pool_store, Assignment, Character, CharacterPool, PoolStore, SharedPoolStore,
    WelcomeRef,
};
