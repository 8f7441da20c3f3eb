mod resolver;

pub use resolver::{RewindResolver, RewoundState, RewindSource};
