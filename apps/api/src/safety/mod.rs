// Safety guard: sensitive-input detection, forbidden-phrase checks and triage.
// Pattern lists are compiled once at startup and injected; see patterns.rs.

pub mod compliance;
pub mod patterns;
pub mod sensitivity;
pub mod triage;

pub use patterns::{SafetyLexicon, SafetyRules};
