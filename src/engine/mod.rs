// Mnemo Engine — Importance scoring and memory lifecycle
// The behavioral layer: lexicon extractors, the weighted aggregator and
// tier classifier, the optional external-model scorer, and the periodic
// expiry/reinforcement sweeps. All persistence goes through the
// `MemoryStore` trait in atoms/traits.rs.

pub mod fakes;
pub mod lifecycle;
pub mod llm_scorer;
pub mod scoring;
