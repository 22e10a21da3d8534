// Persuasion-style layer: signal enums, colour scoring, routing, and directive assembly.
// Pure functions except the chunk retriever, which reads the style index.

pub mod assembler;
pub mod defaults;
pub mod handlers;
pub mod retriever;
pub mod router;
pub mod scoring_table;
pub mod signals;
