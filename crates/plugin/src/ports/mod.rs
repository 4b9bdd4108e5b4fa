//! Port definitions, hexagonal style: the application depends on these
//! traits; adapters implement them.

pub mod outbound;
