//! Proving-system backend.
//!
//! The benchmark drives snarkjs for the trusted setup, proving and
//! verification. The backend only builds invocations; the engine runs them.

pub mod snarkjs;

pub use snarkjs::{SetupStep, SetupTokens, SnarkjsBackend};
