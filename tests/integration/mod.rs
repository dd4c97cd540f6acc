mod engine;
mod ordering;
