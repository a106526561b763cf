/// Constellation mapping and demapping
pub mod physical;

/// Convolutional encoder and Viterbi decoder
pub mod coding;

/// LLR quantizer
pub mod quantizer;

/// Scrambler and slot counter
pub mod scrambler;

/// Coded and uncoded link chains
pub mod link;
